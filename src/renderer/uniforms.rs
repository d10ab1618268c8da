//! Uniform Values
//!
//! Typed uniform payloads exchanged with the [`RenderBackend`] plus the
//! per-frame global uniform block. Values compare by *value* (not identity)
//! so the executor's diff cache can elide re-uploads of unchanged data.
//!
//! [`RenderBackend`]: crate::renderer::backend::RenderBackend

use glam::{Mat4, Vec2, Vec3, Vec4};
use smallvec::SmallVec;

use crate::renderer::collector::CollectedScene;
use crate::scene::camera::Camera;
use crate::settings::RendererSettings;

/// A single uniform payload.
///
/// `PartialEq` here is what makes uniform diffing sound: two payloads are
/// re-uploaded only when they differ by value.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat4(Mat4),
    /// Flattened array payload (light tables, clipping planes).
    Vec4Array(SmallVec<[Vec4; 8]>),
    /// Sampler binding: the texture unit the sampler reads from.
    TextureUnit(u32),
}

// ─── Frame Globals ────────────────────────────────────────────────────────────

/// Per-frame global uniforms shared by every program.
///
/// Built once per frame from the camera and the collected light set, then
/// diff-uploaded to each program on its first bind of the frame.
#[derive(Debug, Clone, Default)]
pub struct FrameUniforms {
    pub view_matrix: Mat4,
    pub view_projection: Mat4,
    pub camera_position: Vec3,
    pub directional_lights: SmallVec<[Vec4; 8]>,
    pub point_lights: SmallVec<[Vec4; 8]>,
    pub spot_lights: SmallVec<[Vec4; 8]>,
    pub clipping_planes: SmallVec<[Vec4; 8]>,
}

impl FrameUniforms {
    /// Assembles the frame block from the camera and collected scene.
    ///
    /// Light packing (two/three `Vec4` per light, kind-dependent) is a wire
    /// format shared with the shader templates; the *count* of lights is
    /// baked into the program key, so programs never read past their table.
    #[must_use]
    pub fn build(camera: &Camera, collected: &CollectedScene, settings: &RendererSettings) -> Self {
        let mut out = Self {
            view_matrix: camera.view_matrix(),
            view_projection: camera.view_projection_matrix(),
            camera_position: camera.position(),
            ..Self::default()
        };

        for light in &collected.lights.directional {
            out.directional_lights
                .push(light.direction.extend(light.intensity));
            out.directional_lights.push(light.color.extend(0.0));
        }
        for light in &collected.lights.point {
            out.point_lights.push(light.position.extend(light.range));
            out.point_lights.push(light.color.extend(light.intensity));
        }
        for light in &collected.lights.spot {
            out.spot_lights.push(light.position.extend(light.range));
            out.spot_lights.push(light.direction.extend(light.intensity));
            out.spot_lights.push(light.color.extend(light.cone_cos));
        }

        out.clipping_planes
            .extend(settings.clipping_planes.iter().copied());
        out
    }

    /// Emits `(name, value)` pairs for diff-upload.
    pub fn collect(&self, out: &mut Vec<(&'static str, UniformValue)>) {
        out.push(("view_matrix", UniformValue::Mat4(self.view_matrix)));
        out.push(("view_projection", UniformValue::Mat4(self.view_projection)));
        out.push(("camera_position", UniformValue::Vec3(self.camera_position)));

        if !self.directional_lights.is_empty() {
            out.push((
                "directional_lights",
                UniformValue::Vec4Array(self.directional_lights.clone()),
            ));
        }
        if !self.point_lights.is_empty() {
            out.push(("point_lights", UniformValue::Vec4Array(self.point_lights.clone())));
        }
        if !self.spot_lights.is_empty() {
            out.push(("spot_lights", UniformValue::Vec4Array(self.spot_lights.clone())));
        }
        if !self.clipping_planes.is_empty() {
            out.push((
                "clipping_planes",
                UniformValue::Vec4Array(self.clipping_planes.clone()),
            ));
        }
    }
}

/// Per-object uniforms, recomputed for every draw.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectUniforms {
    pub model_matrix: Mat4,
    pub normal_matrix: Mat4,
}

impl ObjectUniforms {
    #[must_use]
    pub fn from_model(model_matrix: Mat4) -> Self {
        Self {
            model_matrix,
            normal_matrix: model_matrix.inverse().transpose(),
        }
    }

    pub fn collect(&self, out: &mut Vec<(&'static str, UniformValue)>) {
        out.push(("model_matrix", UniformValue::Mat4(self.model_matrix)));
        out.push(("normal_matrix", UniformValue::Mat4(self.normal_matrix)));
    }
}
