use glam::{Vec3, Vec4};

use crate::impl_material_api;
use crate::renderer::uniforms::UniformValue;
use crate::resources::material::{MaterialFeatures, MaterialSettings};
use crate::resources::pool::TextureHandle;
use crate::resources::version_tracker::ChangeTracker;

/// Blinn-Phong lit material with a specular highlight term.
#[derive(Debug)]
pub struct MeshPhongMaterial {
    pub(crate) color: Vec4,
    pub(crate) specular: Vec3,
    pub(crate) shininess: f32,
    pub(crate) emissive: Vec3,
    pub(crate) map: Option<TextureHandle>,
    pub(crate) normal_map: Option<TextureHandle>,
    pub(crate) emissive_map: Option<TextureHandle>,
    pub(crate) settings: MaterialSettings,
    pub(crate) version: ChangeTracker,
}

impl MeshPhongMaterial {
    #[must_use]
    pub fn new(color: Vec4) -> Self {
        Self {
            color,
            specular: Vec3::splat(0.067),
            shininess: 30.0,
            emissive: Vec3::ZERO,
            map: None,
            normal_map: None,
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
        if self.normal_map.is_some() {
            features |= MaterialFeatures::USE_NORMAL_MAP;
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
        out.push(("specular", UniformValue::Vec3(self.specular)));
        out.push(("shininess", UniformValue::Float(self.shininess)));
        out.push(("emissive", UniformValue::Vec3(self.emissive)));
        if let Some(threshold) = self.settings.alpha_test {
            out.push(("alpha_test", UniformValue::Float(threshold)));
        }
    }
}

impl_material_api!(
    MeshPhongMaterial,
    uniforms: [
        (color,     Vec4, "Base color (rgb) and opacity (a)."),
        (specular,  Vec3, "Specular highlight color."),
        (shininess, f32,  "Specular exponent."),
        (emissive,  Vec3, "Emissive color."),
    ],
    textures: [
        (map,          "The color map."),
        (normal_map,   "The normal map."),
        (emissive_map, "The emissive map."),
    ]
);

impl Default for MeshPhongMaterial {
    fn default() -> Self {
        Self::new(Vec4::ONE)
    }
}
