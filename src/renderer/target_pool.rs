//! Transient Target Pool
//!
//! Per-frame offscreen color targets (the transmission capture) are leased
//! from this pool during the frame and returned at frame end. Targets are
//! never destroyed during normal rendering; they stay in the free pool for
//! reuse, so a steady-state frame allocates nothing. After a resolution
//! change the stale sizes age out through [`TargetPool::trim`].

use rustc_hash::FxHashMap;

use crate::renderer::backend::{RenderBackend, TargetDesc, TargetId, TextureId};

struct PooledTarget {
    desc: TargetDesc,
    target: TargetId,
    texture: TextureId,
    /// Frames spent unused in the free pool, aged by [`TargetPool::trim`].
    idle_frames: u32,
}

/// A target leased for the current frame.
#[derive(Debug, Clone, Copy)]
pub struct TargetLease {
    pub target: TargetId,
    pub texture: TextureId,
}

/// Pool of reusable offscreen color targets.
#[derive(Default)]
pub struct TargetPool {
    active: Vec<PooledTarget>,
    free: FxHashMap<TargetDesc, Vec<PooledTarget>>,
}

impl TargetPool {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Leases a target matching `desc`, reusing a free one when available.
    pub fn lease(&mut self, backend: &mut dyn RenderBackend, desc: TargetDesc) -> TargetLease {
        let pooled = match self.free.get_mut(&desc).and_then(Vec::pop) {
            Some(mut t) => {
                t.idle_frames = 0;
                t
            }
            None => {
                let target = backend.create_target(&desc);
                let texture = backend.target_texture(target);
                PooledTarget {
                    desc,
                    target,
                    texture,
                    idle_frames: 0,
                }
            }
        };

        let lease = TargetLease {
            target: pooled.target,
            texture: pooled.texture,
        };
        self.active.push(pooled);
        lease
    }

    /// Returns every active lease to the free pool. Call at frame end;
    /// outstanding [`TargetLease`] values become invalid.
    pub fn reset(&mut self) {
        for t in self.active.drain(..) {
            self.free.entry(t.desc).or_default().push(t);
        }
    }

    /// Ages the free pool and destroys targets idle longer than
    /// `max_idle_frames`. Call after resolution changes.
    pub fn trim(&mut self, backend: &mut dyn RenderBackend, max_idle_frames: u32) {
        for bucket in self.free.values_mut() {
            for t in &mut *bucket {
                t.idle_frames += 1;
            }
            bucket.retain(|t| {
                if t.idle_frames > max_idle_frames {
                    backend.destroy_target(t.target);
                    false
                } else {
                    true
                }
            });
        }
        self.free.retain(|_, bucket| !bucket.is_empty());
    }

    /// Total targets managed (active and free).
    #[must_use]
    pub fn total_target_count(&self) -> usize {
        self.active.len() + self.free.values().map(Vec::len).sum::<usize>()
    }

    /// Destroys every pooled target (teardown).
    pub fn dispose(&mut self, backend: &mut dyn RenderBackend) {
        for t in self.active.drain(..) {
            backend.destroy_target(t.target);
        }
        for (_, bucket) in self.free.drain() {
            for t in bucket {
                backend.destroy_target(t.target);
            }
        }
    }
}
