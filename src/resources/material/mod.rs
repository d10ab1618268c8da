mod macros;

mod basic;
mod lambert;
mod phong;
mod physical;

pub use basic::MeshBasicMaterial;
pub use lambert::MeshLambertMaterial;
pub use phong::MeshPhongMaterial;
pub use physical::MeshPhysicalMaterial;

use std::borrow::Cow;

use bitflags::bitflags;
use glam::Vec4;
use smallvec::SmallVec;
use uuid::Uuid;

use crate::renderer::backend::{BlendComponentKey, BlendStateKey};
use crate::renderer::uniforms::UniformValue;
use crate::resources::pool::TextureHandle;

// ============================================================================
// Feature flags
// ============================================================================

bitflags! {
    /// Program variant switches derived from material state.
    ///
    /// These flags (not property values) enter the program cache key:
    /// binding a color map re-specializes the program, changing the color
    /// does not.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct MaterialFeatures: u32 {
        const USE_MAP           = 1 << 0;
        const USE_NORMAL_MAP    = 1 << 1;
        const USE_ROUGHNESS_MAP = 1 << 2;
        const USE_METALNESS_MAP = 1 << 3;
        const USE_EMISSIVE_MAP  = 1 << 4;
        const USE_AO_MAP        = 1 << 5;
        const USE_ENV_MAP       = 1 << 6;
        const USE_ALPHA_TEST    = 1 << 7;
        const USE_TRANSMISSION  = 1 << 8;
    }
}

// ============================================================================
// Shared settings
// ============================================================================

/// Face sides to render.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Side {
    Front,
    Back,
    Double,
}

/// Fixed-function blending mode.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash, Default)]
pub enum Blending {
    #[default]
    None,
    Alpha,
    Additive,
    Multiply,
}

impl Blending {
    /// The blend state this mode resolves to (`None` = blending disabled).
    #[must_use]
    pub fn blend_state(self) -> Option<BlendStateKey> {
        match self {
            Blending::None => None,
            Blending::Alpha => Some(BlendStateKey::from(wgpu::BlendState::ALPHA_BLENDING)),
            Blending::Additive => Some(BlendStateKey {
                color: BlendComponentKey {
                    src_factor: wgpu::BlendFactor::SrcAlpha,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
                alpha: BlendComponentKey {
                    src_factor: wgpu::BlendFactor::One,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
            }),
            Blending::Multiply => Some(BlendStateKey {
                color: BlendComponentKey {
                    src_factor: wgpu::BlendFactor::Zero,
                    dst_factor: wgpu::BlendFactor::Src,
                    operation: wgpu::BlendOperation::Add,
                },
                alpha: BlendComponentKey {
                    src_factor: wgpu::BlendFactor::Zero,
                    dst_factor: wgpu::BlendFactor::SrcAlpha,
                    operation: wgpu::BlendOperation::Add,
                },
            }),
        }
    }
}

/// Pipeline-affecting material settings.
#[derive(PartialEq, Clone, Debug)]
pub struct MaterialSettings {
    pub blending: Blending,
    pub transparent: bool,
    pub depth_write: bool,
    pub depth_test: bool,
    pub side: Side,
    pub alpha_test: Option<f32>,
}

impl Default for MaterialSettings {
    fn default() -> Self {
        Self {
            blending: Blending::None,
            transparent: false,
            depth_write: true,
            depth_test: true,
            side: Side::Front,
            alpha_test: None,
        }
    }
}

impl MaterialSettings {
    /// A material draws in the transparent bucket when flagged transparent
    /// or when any blending mode is active.
    #[must_use]
    pub fn needs_blending(&self) -> bool {
        self.transparent || self.blending != Blending::None
    }
}

// ============================================================================
// Material families
// ============================================================================

/// Shader family a material compiles against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialKind {
    Basic,
    Lambert,
    Phong,
    Physical,
}

impl MaterialKind {
    /// Shader template name handed to the backend.
    #[must_use]
    pub fn template_name(self) -> &'static str {
        match self {
            MaterialKind::Basic => "mesh_basic",
            MaterialKind::Lambert => "mesh_lambert",
            MaterialKind::Phong => "mesh_phong",
            MaterialKind::Physical => "mesh_physical",
        }
    }
}

/// Material data enum — one variant per family, closed property sets.
#[derive(Debug)]
pub enum MaterialData {
    Basic(MeshBasicMaterial),
    Lambert(MeshLambertMaterial),
    Phong(MeshPhongMaterial),
    Physical(MeshPhysicalMaterial),
}

impl MaterialData {
    #[must_use]
    pub fn kind(&self) -> MaterialKind {
        match self {
            Self::Basic(_) => MaterialKind::Basic,
            Self::Lambert(_) => MaterialKind::Lambert,
            Self::Phong(_) => MaterialKind::Phong,
            Self::Physical(_) => MaterialKind::Physical,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &MaterialSettings {
        match self {
            Self::Basic(m) => m.settings(),
            Self::Lambert(m) => m.settings(),
            Self::Phong(m) => m.settings(),
            Self::Physical(m) => m.settings(),
        }
    }

    #[must_use]
    pub fn features(&self) -> MaterialFeatures {
        match self {
            Self::Basic(m) => m.features(),
            Self::Lambert(m) => m.features(),
            Self::Phong(m) => m.features(),
            Self::Physical(m) => m.features(),
        }
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        match self {
            Self::Basic(m) => m.version(),
            Self::Lambert(m) => m.version(),
            Self::Phong(m) => m.version(),
            Self::Physical(m) => m.version(),
        }
    }

    /// Transmission factor; only the physical family can transmit.
    #[must_use]
    pub fn transmission(&self) -> f32 {
        match self {
            Self::Physical(m) => m.transmission(),
            _ => 0.0,
        }
    }

    pub fn collect_uniforms(&self, out: &mut Vec<(&'static str, UniformValue)>) {
        match self {
            Self::Basic(m) => m.collect_uniforms(out),
            Self::Lambert(m) => m.collect_uniforms(out),
            Self::Phong(m) => m.collect_uniforms(out),
            Self::Physical(m) => m.collect_uniforms(out),
        }
    }

    pub fn texture_bindings(&self, out: &mut SmallVec<[(&'static str, TextureHandle); 8]>) {
        match self {
            Self::Basic(m) => m.texture_bindings(out),
            Self::Lambert(m) => m.texture_bindings(out),
            Self::Phong(m) => m.texture_bindings(out),
            Self::Physical(m) => m.texture_bindings(out),
        }
    }
}

// ============================================================================
// Material wrapper
// ============================================================================

#[derive(Debug)]
pub struct Material {
    pub uuid: Uuid,
    pub name: Option<Cow<'static, str>>,
    pub data: MaterialData,
}

impl Material {
    #[must_use]
    pub fn new(data: MaterialData) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: None,
            data,
        }
    }

    // Convenience constructors
    #[must_use]
    pub fn new_basic(color: Vec4) -> Self {
        Self::from(MeshBasicMaterial::new(color))
    }

    #[must_use]
    pub fn new_lambert(color: Vec4) -> Self {
        Self::from(MeshLambertMaterial::new(color))
    }

    #[must_use]
    pub fn new_phong(color: Vec4) -> Self {
        Self::from(MeshPhongMaterial::new(color))
    }

    #[must_use]
    pub fn new_physical(color: Vec4) -> Self {
        Self::from(MeshPhysicalMaterial::new(color))
    }

    // Downcast helpers
    #[must_use]
    pub fn as_basic(&self) -> Option<&MeshBasicMaterial> {
        match &self.data {
            MaterialData::Basic(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_basic_mut(&mut self) -> Option<&mut MeshBasicMaterial> {
        match &mut self.data {
            MaterialData::Basic(m) => Some(m),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_lambert(&self) -> Option<&MeshLambertMaterial> {
        match &self.data {
            MaterialData::Lambert(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_lambert_mut(&mut self) -> Option<&mut MeshLambertMaterial> {
        match &mut self.data {
            MaterialData::Lambert(m) => Some(m),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_phong(&self) -> Option<&MeshPhongMaterial> {
        match &self.data {
            MaterialData::Phong(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_phong_mut(&mut self) -> Option<&mut MeshPhongMaterial> {
        match &mut self.data {
            MaterialData::Phong(m) => Some(m),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_physical(&self) -> Option<&MeshPhysicalMaterial> {
        match &self.data {
            MaterialData::Physical(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_physical_mut(&mut self) -> Option<&mut MeshPhysicalMaterial> {
        match &mut self.data {
            MaterialData::Physical(m) => Some(m),
            _ => None,
        }
    }

    // Delegates
    #[must_use]
    pub fn kind(&self) -> MaterialKind {
        self.data.kind()
    }

    #[must_use]
    pub fn settings(&self) -> &MaterialSettings {
        self.data.settings()
    }

    #[must_use]
    pub fn features(&self) -> MaterialFeatures {
        self.data.features()
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.data.version()
    }

    #[must_use]
    pub fn transmission(&self) -> f32 {
        self.data.transmission()
    }

    #[must_use]
    pub fn side(&self) -> Side {
        self.settings().side
    }

    #[must_use]
    pub fn double_sided(&self) -> bool {
        self.settings().side == Side::Double
    }
}

impl From<MeshBasicMaterial> for Material {
    fn from(data: MeshBasicMaterial) -> Self {
        Material::new(MaterialData::Basic(data))
    }
}

impl From<MeshLambertMaterial> for Material {
    fn from(data: MeshLambertMaterial) -> Self {
        Material::new(MaterialData::Lambert(data))
    }
}

impl From<MeshPhongMaterial> for Material {
    fn from(data: MeshPhongMaterial) -> Self {
        Material::new(MaterialData::Phong(data))
    }
}

impl From<MeshPhysicalMaterial> for Material {
    fn from(data: MeshPhysicalMaterial) -> Self {
        Material::new(MaterialData::Physical(data))
    }
}
