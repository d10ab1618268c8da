use glam::{Vec3, Vec4};

use crate::impl_material_api;
use crate::renderer::uniforms::UniformValue;
use crate::resources::material::{MaterialFeatures, MaterialSettings};
use crate::resources::pool::TextureHandle;
use crate::resources::version_tracker::ChangeTracker;

/// Physically-based material (metal/rough workflow).
///
/// The only family with a transmission factor; a factor above zero routes
/// the drawable into the transmissive sub-pass, which samples a capture of
/// the opaque scene as its refraction source.
#[derive(Debug)]
pub struct MeshPhysicalMaterial {
    pub(crate) color: Vec4,
    pub(crate) roughness: f32,
    pub(crate) metalness: f32,
    pub(crate) emissive: Vec3,
    pub(crate) emissive_intensity: f32,
    pub(crate) ior: f32,
    pub(crate) transmission: f32,
    pub(crate) map: Option<TextureHandle>,
    pub(crate) normal_map: Option<TextureHandle>,
    pub(crate) roughness_map: Option<TextureHandle>,
    pub(crate) metalness_map: Option<TextureHandle>,
    pub(crate) ao_map: Option<TextureHandle>,
    pub(crate) emissive_map: Option<TextureHandle>,
    pub(crate) env_map: Option<TextureHandle>,
    pub(crate) settings: MaterialSettings,
    pub(crate) version: ChangeTracker,
}

impl MeshPhysicalMaterial {
    #[must_use]
    pub fn new(color: Vec4) -> Self {
        Self {
            color,
            roughness: 1.0,
            metalness: 0.0,
            emissive: Vec3::ZERO,
            emissive_intensity: 1.0,
            ior: 1.5,
            transmission: 0.0,
            map: None,
            normal_map: None,
            roughness_map: None,
            metalness_map: None,
            ao_map: None,
            emissive_map: None,
            env_map: None,
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
        if self.roughness_map.is_some() {
            features |= MaterialFeatures::USE_ROUGHNESS_MAP;
        }
        if self.metalness_map.is_some() {
            features |= MaterialFeatures::USE_METALNESS_MAP;
        }
        if self.ao_map.is_some() {
            features |= MaterialFeatures::USE_AO_MAP;
        }
        if self.emissive_map.is_some() {
            features |= MaterialFeatures::USE_EMISSIVE_MAP;
        }
        if self.env_map.is_some() {
            features |= MaterialFeatures::USE_ENV_MAP;
        }
        if self.settings.alpha_test.is_some() {
            features |= MaterialFeatures::USE_ALPHA_TEST;
        }
        if self.transmission > 0.0 {
            features |= MaterialFeatures::USE_TRANSMISSION;
        }
        features
    }

    pub fn collect_uniforms(&self, out: &mut Vec<(&'static str, UniformValue)>) {
        out.push(("color", UniformValue::Vec4(self.color)));
        out.push(("roughness", UniformValue::Float(self.roughness)));
        out.push(("metalness", UniformValue::Float(self.metalness)));
        out.push(("emissive", UniformValue::Vec3(self.emissive)));
        out.push(("emissive_intensity", UniformValue::Float(self.emissive_intensity)));
        out.push(("ior", UniformValue::Float(self.ior)));
        if self.transmission > 0.0 {
            out.push(("transmission", UniformValue::Float(self.transmission)));
        }
        if let Some(threshold) = self.settings.alpha_test {
            out.push(("alpha_test", UniformValue::Float(threshold)));
        }
    }
}

impl_material_api!(
    MeshPhysicalMaterial,
    uniforms: [
        (color,              Vec4, "Base color (rgb) and opacity (a)."),
        (roughness,          f32,  "Roughness factor."),
        (metalness,          f32,  "Metalness factor."),
        (emissive,           Vec3, "Emissive color."),
        (emissive_intensity, f32,  "Emissive intensity."),
        (ior,                f32,  "Index of refraction."),
        (transmission,       f32,  "Transmission factor; above zero enters the transmissive pass."),
    ],
    textures: [
        (map,           "The color map."),
        (normal_map,    "The normal map."),
        (roughness_map, "The roughness map."),
        (metalness_map, "The metalness map."),
        (ao_map,        "The AO map."),
        (emissive_map,  "The emissive map."),
        (env_map,       "The environment map."),
    ]
);

impl Default for MeshPhysicalMaterial {
    fn default() -> Self {
        Self::new(Vec4::ONE)
    }
}
