//! Structural program cache keys.
//!
//! A [`ProgramKey`] is the structural fingerprint of a material under a
//! frame context: material family plus feature flags plus the frame-global
//! counts and modes that force distinct shader specializations. Two
//! materials producing the same key share one compiled program.
//!
//! The key replaces the classic concatenated-flag-string derivation with a
//! derived-`Hash` struct while preserving the equivalence classes exactly:
//! light/shadow/clip *counts* split programs, property *values* never do.

use std::hash::{Hash, Hasher};

use crate::resources::geometry::GeometryFeatures;
use crate::resources::material::{Material, MaterialFeatures, MaterialKind};
use crate::settings::{ColorSpace, RendererSettings, ToneMapping};

/// Frame-global context entering every program key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FrameContext {
    pub directional_lights: u8,
    pub point_lights: u8,
    pub spot_lights: u8,
    /// Shadow-casting lights across all kinds.
    pub shadow_casters: u8,
    pub clipping_planes: u8,
    pub color_space: ColorSpace,
    pub tone_mapping: ToneMapping,
}

/// Structural cache key for a compiled program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramKey {
    pub kind: MaterialKind,
    pub features: MaterialFeatures,
    pub directional_lights: u8,
    pub point_lights: u8,
    pub spot_lights: u8,
    pub shadow_casters: u8,
    pub clipping_planes: u8,
    pub color_space: ColorSpace,
    pub tone_mapping: ToneMapping,
    pub use_skinning: bool,
    pub use_morph_targets: bool,
    pub use_instancing: bool,
    pub double_sided: bool,
}

impl ProgramKey {
    /// Derives the key for drawing `material` on a geometry with
    /// `geometry_features` under `ctx`.
    #[must_use]
    pub fn derive(
        material: &Material,
        geometry_features: GeometryFeatures,
        ctx: &FrameContext,
    ) -> Self {
        Self {
            kind: material.kind(),
            features: material.features(),
            directional_lights: ctx.directional_lights,
            point_lights: ctx.point_lights,
            spot_lights: ctx.spot_lights,
            shadow_casters: ctx.shadow_casters,
            clipping_planes: ctx.clipping_planes,
            color_space: ctx.color_space,
            tone_mapping: ctx.tone_mapping,
            use_skinning: geometry_features.contains(GeometryFeatures::USE_SKINNING),
            use_morph_targets: geometry_features.contains(GeometryFeatures::USE_MORPH_TARGETS),
            use_instancing: geometry_features.contains(GeometryFeatures::USE_INSTANCING),
            double_sided: material.double_sided(),
        }
    }
}

/// Builds a `FrameContext` from counted lights and renderer settings.
impl FrameContext {
    #[must_use]
    pub fn new(
        directional: usize,
        point: usize,
        spot: usize,
        shadow_casters: usize,
        settings: &RendererSettings,
    ) -> Self {
        Self {
            directional_lights: directional as u8,
            point_lights: point as u8,
            spot_lights: spot as u8,
            shadow_casters: shadow_casters as u8,
            clipping_planes: settings.clipping_planes.len() as u8,
            color_space: settings.color_space,
            tone_mapping: settings.tone_mapping,
        }
    }
}

/// Compute a `u64` hash of any `Hash`-able value using `FxHasher`.
#[inline]
#[must_use]
pub fn fx_hash_key<K: Hash>(key: &K) -> u64 {
    let mut hasher = rustc_hash::FxHasher::default();
    key.hash(&mut hasher);
    hasher.finish()
}
