//! Core resource definitions
//!
//! CPU-side descriptions of what gets drawn, independent of any live GPU:
//! - Material: typed, versioned property sets per shading family
//! - Geometry: pooled buffer handles, draw range, bounding volume
//! - ResourcePool: reference-counted GPU handle ownership
//! - ChangeTracker: resource version counters for dirty checking

pub mod geometry;
pub mod material;
pub mod pool;
pub mod version_tracker;

pub use geometry::{BoundingSphere, Geometry, GeometryFeatures, GeometryIndices};
pub use material::{
    Blending, Material, MaterialData, MaterialFeatures, MaterialKind, MaterialSettings,
    MeshBasicMaterial, MeshLambertMaterial, MeshPhongMaterial, MeshPhysicalMaterial, Side,
};
pub use pool::{BufferHandle, ResourcePool, TextureHandle};
pub use version_tracker::ChangeTracker;

use slotmap::SlotMap;

slotmap::new_key_type! {
    /// Handle to a material in [`Resources`].
    pub struct MaterialHandle;
    /// Handle to a geometry in [`Resources`].
    pub struct GeometryHandle;
}

/// Owner of all pipeline-visible resources.
///
/// Passed immutably into the frame loop; mutation (property writes,
/// registration, disposal) happens between frames through the handles.
#[derive(Default)]
pub struct Resources {
    pub materials: SlotMap<MaterialHandle, Material>,
    pub geometries: SlotMap<GeometryHandle, Geometry>,
    pub pool: ResourcePool,
}

impl Resources {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_material(&mut self, material: impl Into<Material>) -> MaterialHandle {
        self.materials.insert(material.into())
    }

    pub fn add_geometry(&mut self, geometry: Geometry) -> GeometryHandle {
        self.geometries.insert(geometry)
    }

    #[must_use]
    pub fn material(&self, handle: MaterialHandle) -> Option<&Material> {
        self.materials.get(handle)
    }

    pub fn material_mut(&mut self, handle: MaterialHandle) -> Option<&mut Material> {
        self.materials.get_mut(handle)
    }

    #[must_use]
    pub fn geometry(&self, handle: GeometryHandle) -> Option<&Geometry> {
        self.geometries.get(handle)
    }

    pub fn geometry_mut(&mut self, handle: GeometryHandle) -> Option<&mut Geometry> {
        self.geometries.get_mut(handle)
    }

    /// Removes a material. The caller must also release any program the
    /// renderer bound for it (see `Renderer::release_material`) so program
    /// usage counts stay sound.
    pub fn remove_material(&mut self, handle: MaterialHandle) -> Option<Material> {
        self.materials.remove(handle)
    }

    /// Removes a geometry. Pooled buffers it references are released by the
    /// caller through the pool; the executor tolerates stale handles by
    /// skipping the draw.
    pub fn remove_geometry(&mut self, handle: GeometryHandle) -> Option<Geometry> {
        self.geometries.remove(handle)
    }
}
