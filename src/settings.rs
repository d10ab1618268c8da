//! Renderer Settings
//!
//! Frame-global configuration that participates in program specialization.
//! Changing any field that feeds [`crate::renderer::program::ProgramKey`]
//! (color space, tone mapping, clipping planes) naturally re-specializes
//! programs on the next frame through the key derivation; no explicit
//! invalidation call is needed.

use glam::Vec4;
use smallvec::SmallVec;

/// Output color space of the final render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColorSpace {
    /// Linear working space, no encoding applied on output.
    Linear,
    /// sRGB-encoded output.
    #[default]
    Srgb,
}

/// Tone-mapping operator applied in the fragment stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ToneMapping {
    /// No tone mapping, values pass through (and clip).
    #[default]
    None,
    /// Simple exposure-scaled linear mapping.
    Linear,
    /// Reinhard operator.
    Reinhard,
    /// ACES filmic approximation.
    AcesFilmic,
}

/// Renderer-level configuration.
///
/// Owned by the [`crate::renderer::Renderer`]; read once per frame.
#[derive(Debug, Clone)]
pub struct RendererSettings {
    /// Output color space (enters the program cache key).
    pub color_space: ColorSpace,
    /// Tone-mapping operator (enters the program cache key).
    pub tone_mapping: ToneMapping,
    /// Upper bound on collected lights of each kind. Scenes exceeding the
    /// cap render with the nearest-first subset and a one-time diagnostic.
    pub max_lights_per_kind: usize,
    /// Global user clipping planes in world space. The plane *count* enters
    /// the program cache key; the plane values are uploaded as uniforms.
    pub clipping_planes: SmallVec<[Vec4; 4]>,
    /// Background clear color.
    pub clear_color: Vec4,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            color_space: ColorSpace::Srgb,
            tone_mapping: ToneMapping::None,
            max_lights_per_kind: 4,
            clipping_planes: SmallVec::new(),
            clear_color: Vec4::new(0.0, 0.0, 0.0, 1.0),
        }
    }
}
