//! Geometry Descriptor
//!
//! CPU-side description of a drawable geometry: pooled buffer handles, the
//! draw range, topology and an optional bounding volume. Vertex data itself
//! lives behind the resource pool; this module never touches bytes.

use core::ops::Range;

use bitflags::bitflags;
use glam::Vec3;

use crate::resources::pool::BufferHandle;

bitflags! {
    /// Geometry-derived program variants.
    ///
    /// These flags enter the program cache key: a skinned and a non-skinned
    /// mesh can never share a compiled program even with identical materials.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct GeometryFeatures: u32 {
        const USE_SKINNING      = 1 << 0;
        const USE_MORPH_TARGETS = 1 << 1;
        const USE_INSTANCING    = 1 << 2;
    }
}

/// A sphere enclosing the geometry in local space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl BoundingSphere {
    #[must_use]
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Sphere around the centroid of `points`.
    #[must_use]
    pub fn from_points(points: &[Vec3]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let sum: Vec3 = points.iter().copied().sum();
        let center = sum / points.len() as f32;
        let radius = points
            .iter()
            .map(|p| p.distance(center))
            .fold(0.0_f32, f32::max);
        Some(Self { center, radius })
    }
}

/// Index buffer binding for indexed draws.
#[derive(Debug, Clone)]
pub struct GeometryIndices {
    pub buffer: BufferHandle,
    pub format: wgpu::IndexFormat,
    pub count: u32,
}

/// A renderable geometry referencing pooled GPU buffers.
#[derive(Debug, Clone)]
pub struct Geometry {
    pub vertex_buffer: BufferHandle,
    pub vertex_count: u32,
    /// Sub-range of vertices (non-indexed) or indices (indexed) to draw.
    pub draw_range: Range<u32>,
    pub indices: Option<GeometryIndices>,
    pub topology: wgpu::PrimitiveTopology,
    /// Local-space bounds. Geometries without bounds are never frustum
    /// culled (conservative: potentially visible geometry is kept).
    pub bounding_sphere: Option<BoundingSphere>,
    pub features: GeometryFeatures,
    pub instance_count: u32,
}

impl Geometry {
    #[must_use]
    pub fn new(vertex_buffer: BufferHandle, vertex_count: u32) -> Self {
        Self {
            vertex_buffer,
            vertex_count,
            draw_range: 0..vertex_count,
            indices: None,
            topology: wgpu::PrimitiveTopology::TriangleList,
            bounding_sphere: None,
            features: GeometryFeatures::empty(),
            instance_count: 1,
        }
    }

    #[must_use]
    pub fn with_indices(mut self, indices: GeometryIndices) -> Self {
        self.draw_range = 0..indices.count;
        self.indices = Some(indices);
        self
    }

    #[must_use]
    pub fn with_bounding_sphere(mut self, sphere: BoundingSphere) -> Self {
        self.bounding_sphere = Some(sphere);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounding_sphere_encloses_points() {
        let points = [
            Vec3::new(-1.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 2.0, 0.0),
        ];
        let sphere = BoundingSphere::from_points(&points).unwrap();
        for p in &points {
            assert!(p.distance(sphere.center) <= sphere.radius + 1e-5);
        }
    }

    #[test]
    fn empty_points_have_no_bounds() {
        assert!(BoundingSphere::from_points(&[]).is_none());
    }
}
