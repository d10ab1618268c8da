use glam::{Vec3, Vec4};

use crate::impl_material_api;
use crate::renderer::uniforms::UniformValue;
use crate::resources::material::{MaterialFeatures, MaterialSettings};
use crate::resources::pool::TextureHandle;
use crate::resources::version_tracker::ChangeTracker;

/// Diffuse-only lit material (Lambertian reflectance).
#[derive(Debug)]
pub struct MeshLambertMaterial {
    pub(crate) color: Vec4,
    pub(crate) emissive: Vec3,
    pub(crate) map: Option<TextureHandle>,
    pub(crate) emissive_map: Option<TextureHandle>,
    pub(crate) settings: MaterialSettings,
    pub(crate) version: ChangeTracker,
}

impl MeshLambertMaterial {
    #[must_use]
    pub fn new(color: Vec4) -> Self {
        Self {
            color,
            emissive: Vec3::ZERO,
            map: None,
            emissive_map: None,
            settings: MaterialSettings::default(),
            version: ChangeTracker::new(),
        }
    }

    #[must_use]
    pub fn features(&self) -> MaterialFeatures {
        let mut features = MaterialFeatures::empty();
        if self.map.is_some() {
            features |= MaterialFeatures::USE_MAP;
        }
        if self.emissive_map.is_some() {
            features |= MaterialFeatures::USE_EMISSIVE_MAP;
        }
        if self.settings.alpha_test.is_some() {
            features |= MaterialFeatures::USE_ALPHA_TEST;
        }
        features
    }

    pub fn collect_uniforms(&self, out: &mut Vec<(&'static str, UniformValue)>) {
        out.push(("color", UniformValue::Vec4(self.color)));
        out.push(("emissive", UniformValue::Vec3(self.emissive)));
        if let Some(threshold) = self.settings.alpha_test {
            out.push(("alpha_test", UniformValue::Float(threshold)));
        }
    }
}

impl_material_api!(
    MeshLambertMaterial,
    uniforms: [
        (color,    Vec4, "Base color (rgb) and opacity (a)."),
        (emissive, Vec3, "Emissive color."),
    ],
    textures: [
        (map,          "The color map."),
        (emissive_map, "The emissive map."),
    ]
);

impl Default for MeshLambertMaterial {
    fn default() -> Self {
        Self::new(Vec4::ONE)
    }
}
