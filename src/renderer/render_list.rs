//! Render Lists
//!
//! Partitions collected drawables into opaque / transmissive / transparent
//! buckets and sorts each with a packed 64-bit key. The orderings are a
//! correctness contract, not a tuning knob: opaque front-to-back maximizes
//! early depth rejection, transparent back-to-front is required for
//! correct blending, transmissive shares the transparent ordering but
//! draws in its own sub-pass after the opaque capture.

use slotmap::Key;

use crate::renderer::collector::CollectedScene;
use crate::resources::Resources;

/// Packed render sort key.
///
/// Layout (high → low):
/// - opaque: `[render order : 16][material index : 16][depth ascending : 32]`
/// - transparent: `[render order : 16][depth descending : 32][zero : 16]`
///
/// Depth uses the IEEE-754 bit trick: for non-negative floats the raw bit
/// pattern is monotonic, so integer comparison orders by distance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct RenderKey(u64);

impl RenderKey {
    fn order_bits(render_order: i32) -> u64 {
        // Bias so negative orders sort before positive ones
        (i64::from(render_order) + 0x8000) as u64 & 0xFFFF
    }

    fn depth_bits(distance_sq: f32) -> u64 {
        if distance_sq.is_sign_negative() {
            0
        } else {
            u64::from(distance_sq.to_bits())
        }
    }

    /// Opaque key: order, then material (grouping same-material draws to
    /// reduce program/state churn), then front-to-back.
    #[must_use]
    pub fn opaque(render_order: i32, material_index: u32, distance_sq: f32) -> Self {
        let order = Self::order_bits(render_order) << 48;
        let material = (u64::from(material_index) & 0xFFFF) << 32;
        let depth = Self::depth_bits(distance_sq);
        Self(order | material | depth)
    }

    /// Transparent key: order, then back-to-front.
    #[must_use]
    pub fn transparent(render_order: i32, distance_sq: f32) -> Self {
        let order = Self::order_bits(render_order) << 48;
        let depth = (0xFFFF_FFFF - Self::depth_bits(distance_sq)) << 16;
        Self(order | depth)
    }
}

/// A draw queued for submission: index into the collected item list plus
/// the bucket sort key.
#[derive(Clone, Copy, Debug)]
pub struct RenderCommand {
    pub item: u32,
    pub sort_key: RenderKey,
}

/// The three per-frame draw buckets. Built fresh each frame into reused
/// vectors; never persisted across frames.
#[derive(Default)]
pub struct RenderLists {
    pub opaque: Vec<RenderCommand>,
    pub transmissive: Vec<RenderCommand>,
    pub transparent: Vec<RenderCommand>,
}

impl RenderLists {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            opaque: Vec::with_capacity(capacity),
            transmissive: Vec::with_capacity(capacity / 4),
            transparent: Vec::with_capacity(capacity / 4),
        }
    }

    pub fn clear(&mut self) {
        self.opaque.clear();
        self.transmissive.clear();
        self.transparent.clear();
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.opaque.is_empty() && self.transmissive.is_empty() && self.transparent.is_empty()
    }

    /// Buckets and sorts the collected items.
    ///
    /// Bucketing rule: transmissive if the material's transmission factor
    /// is above zero; else transparent if the transparency flag is set or
    /// any blending mode is active; else opaque. Items whose material
    /// vanished since collection are dropped (cross-frame disposal is the
    /// caller's concern; within a frame this cannot happen).
    pub fn build_into(&mut self, collected: &CollectedScene, resources: &Resources) {
        self.clear();

        for (index, item) in collected.items.iter().enumerate() {
            let Some(material) = resources.material(item.material) else {
                continue;
            };

            let index = index as u32;
            if material.transmission() > 0.0 {
                self.transmissive.push(RenderCommand {
                    item: index,
                    sort_key: RenderKey::transparent(item.render_order, item.distance_sq),
                });
            } else if material.settings().needs_blending() {
                self.transparent.push(RenderCommand {
                    item: index,
                    sort_key: RenderKey::transparent(item.render_order, item.distance_sq),
                });
            } else {
                let material_index = item.material.data().as_ffi() as u32;
                self.opaque.push(RenderCommand {
                    item: index,
                    sort_key: RenderKey::opaque(
                        item.render_order,
                        material_index,
                        item.distance_sq,
                    ),
                });
            }
        }

        self.opaque.sort_unstable_by_key(|c| c.sort_key);
        self.transmissive.sort_unstable_by_key(|c| c.sort_key);
        self.transparent.sort_unstable_by_key(|c| c.sort_key);
    }
}
