use glam::Vec4;

use crate::impl_material_api;
use crate::renderer::uniforms::UniformValue;
use crate::resources::material::{MaterialFeatures, MaterialSettings};
use crate::resources::pool::TextureHandle;
use crate::resources::version_tracker::ChangeTracker;

/// Unlit material: flat color, optional color map. Ignores lights.
#[derive(Debug)]
pub struct MeshBasicMaterial {
    pub(crate) color: Vec4,
    pub(crate) map: Option<TextureHandle>,
    pub(crate) settings: MaterialSettings,
    pub(crate) version: ChangeTracker,
}

impl MeshBasicMaterial {
    #[must_use]
    pub fn new(color: Vec4) -> Self {
        Self {
            color,
            map: None,
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
        if self.settings.alpha_test.is_some() {
            features |= MaterialFeatures::USE_ALPHA_TEST;
        }
        features
    }

    pub fn collect_uniforms(&self, out: &mut Vec<(&'static str, UniformValue)>) {
        out.push(("color", UniformValue::Vec4(self.color)));
        if let Some(threshold) = self.settings.alpha_test {
            out.push(("alpha_test", UniformValue::Float(threshold)));
        }
    }
}

impl_material_api!(
    MeshBasicMaterial,
    uniforms: [
        (color, Vec4, "Base color (rgb) and opacity (a)."),
    ],
    textures: [
        (map, "The color map."),
    ]
);

impl Default for MeshBasicMaterial {
    fn default() -> Self {
        Self::new(Vec4::ONE)
    }
}
