//! GPU State Cache
//!
//! Mirrors the pipeline state the device is believed to hold and forwards
//! a setter to the backend only when the requested value differs from the
//! mirror. For any setter call sequence, the number of backend calls equals
//! the number of distinct consecutive value changes — never more.
//!
//! # Desync
//!
//! If an external actor issues state calls behind the cache's back (a debug
//! overlay, a host compositor), the mirror desyncs. That is an accepted
//! limitation; [`GpuStateCache::reset`] is the recovery path: it re-reads
//! nothing and simply forgets, so every subsequent setter emits.

use crate::renderer::backend::{
    BlendStateKey, CullStateKey, DepthStateKey, ProgramId, RenderBackend, TargetId, TextureId,
    Viewport,
};

/// Texture units tracked by the cache. Units beyond this bind untracked
/// (still forwarded, never elided); the executor clamps earlier anyway.
pub const TRACKED_TEXTURE_UNITS: usize = 32;

/// Shadow copy of live pipeline state.
///
/// Every field is `Option`: `None` means unknown, and an unknown field
/// always emits. Mutated only by the setters below issuing actual backend
/// calls, which is what keeps mirror == device.
pub struct GpuStateCache {
    blend: Option<Option<BlendStateKey>>,
    depth: Option<DepthStateKey>,
    cull: Option<CullStateKey>,
    viewport: Option<Viewport>,
    program: Option<ProgramId>,
    target: Option<Option<TargetId>>,
    textures: [Option<TextureId>; TRACKED_TEXTURE_UNITS],

    emitted: u64,
    elided: u64,
}

impl Default for GpuStateCache {
    fn default() -> Self {
        Self::new()
    }
}

impl GpuStateCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            blend: None,
            depth: None,
            cull: None,
            viewport: None,
            program: None,
            target: None,
            textures: [None; TRACKED_TEXTURE_UNITS],
            emitted: 0,
            elided: 0,
        }
    }

    /// Forgets all mirrored state. Subsequent setters emit unconditionally
    /// until the mirror is rebuilt. Counters survive.
    pub fn reset(&mut self) {
        self.blend = None;
        self.depth = None;
        self.cull = None;
        self.viewport = None;
        self.program = None;
        self.target = None;
        self.textures = [None; TRACKED_TEXTURE_UNITS];
    }

    // ── Setters ──────────────────────────────────────────────────────────

    pub fn set_blend(&mut self, backend: &mut dyn RenderBackend, blend: Option<BlendStateKey>) {
        if self.blend == Some(blend) {
            self.elided += 1;
            return;
        }
        backend.set_blend(blend);
        self.blend = Some(blend);
        self.emitted += 1;
    }

    pub fn set_depth(&mut self, backend: &mut dyn RenderBackend, depth: DepthStateKey) {
        if self.depth == Some(depth) {
            self.elided += 1;
            return;
        }
        backend.set_depth(depth);
        self.depth = Some(depth);
        self.emitted += 1;
    }

    pub fn set_cull(&mut self, backend: &mut dyn RenderBackend, cull: CullStateKey) {
        if self.cull == Some(cull) {
            self.elided += 1;
            return;
        }
        backend.set_cull(cull);
        self.cull = Some(cull);
        self.emitted += 1;
    }

    pub fn set_viewport(&mut self, backend: &mut dyn RenderBackend, viewport: Viewport) {
        if self.viewport == Some(viewport) {
            self.elided += 1;
            return;
        }
        backend.set_viewport(viewport);
        self.viewport = Some(viewport);
        self.emitted += 1;
    }

    pub fn bind_program(&mut self, backend: &mut dyn RenderBackend, program: ProgramId) {
        if self.program == Some(program) {
            self.elided += 1;
            return;
        }
        backend.bind_program(program);
        self.program = Some(program);
        self.emitted += 1;
    }

    /// Currently bound program according to the mirror.
    #[must_use]
    pub fn current_program(&self) -> Option<ProgramId> {
        self.program
    }

    pub fn bind_texture(&mut self, backend: &mut dyn RenderBackend, unit: u32, texture: TextureId) {
        if let Some(slot) = self.textures.get_mut(unit as usize) {
            if *slot == Some(texture) {
                self.elided += 1;
                return;
            }
            backend.bind_texture(unit, texture);
            *slot = Some(texture);
            self.emitted += 1;
        } else {
            // Unit beyond the tracked range: forward untracked
            backend.bind_texture(unit, texture);
            self.emitted += 1;
        }
    }

    pub fn bind_target(&mut self, backend: &mut dyn RenderBackend, target: Option<TargetId>) {
        if self.target == Some(target) {
            self.elided += 1;
            return;
        }
        backend.bind_target(target);
        self.target = Some(target);
        self.emitted += 1;
    }

    // ── Stats ────────────────────────────────────────────────────────────

    /// Backend state calls actually issued.
    #[must_use]
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Setter calls absorbed because the mirror already matched.
    #[must_use]
    pub fn elided(&self) -> u64 {
        self.elided
    }
}
