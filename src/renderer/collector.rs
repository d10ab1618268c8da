//! Scene Collector
//!
//! Once per frame: propagate dirty world matrices, then walk the scene
//! graph depth-first and produce the flat inputs of the render list
//! builder — visible drawables with world matrices and camera distances,
//! plus the capped per-kind active light set.
//!
//! # Culling policy
//!
//! Conservative, never dropping potentially visible geometry:
//! - a bounding sphere straddling a frustum plane is kept (no partial
//!   culling),
//! - a drawable without a bounding volume is never culled.
//!
//! An invisible node prunes its entire subtree.

use glam::{Mat4, Vec3};
use slotmap::Key;
use smallvec::SmallVec;

use crate::errors::Diagnostics;
use crate::resources::geometry::GeometryFeatures;
use crate::resources::{GeometryHandle, MaterialHandle, Resources};
use crate::scene::camera::Camera;
use crate::scene::light::LightKind;
use crate::scene::{MeshKey, NodeHandle, Scene, transform_system};
use crate::settings::RendererSettings;

/// A visible drawable, valid for the current frame only.
#[derive(Debug, Clone)]
pub struct CollectedItem {
    pub node: NodeHandle,
    pub mesh: MeshKey,
    pub geometry: GeometryHandle,
    pub material: MaterialHandle,
    pub world_matrix: Mat4,
    /// Squared distance camera → node origin, for depth sorting.
    pub distance_sq: f32,
    pub render_order: i32,
    pub geometry_features: GeometryFeatures,
}

/// A light accepted into the frame, flattened to world-space data.
#[derive(Debug, Clone)]
pub struct CollectedLight {
    pub position: Vec3,
    pub direction: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    pub range: f32,
    /// Cosine of the outer cone half-angle (spot lights only).
    pub cone_cos: f32,
    pub cast_shadows: bool,
}

/// Active lights, capped per kind.
#[derive(Debug, Default)]
pub struct CollectedLights {
    pub directional: SmallVec<[CollectedLight; 4]>,
    pub point: SmallVec<[CollectedLight; 4]>,
    pub spot: SmallVec<[CollectedLight; 4]>,
    /// Shadow-casting lights among the accepted set.
    pub shadow_casters: usize,
}

impl CollectedLights {
    fn clear(&mut self) {
        self.directional.clear();
        self.point.clear();
        self.spot.clear();
        self.shadow_casters = 0;
    }
}

/// Reusable per-frame collection output.
///
/// Holding the vectors across frames avoids per-frame allocation; `clear`
/// keeps capacity.
#[derive(Default)]
pub struct CollectedScene {
    pub items: Vec<CollectedItem>,
    pub lights: CollectedLights,
    /// Drawables rejected by the frustum test this frame.
    pub culled: u32,
}

impl CollectedScene {
    #[must_use]
    pub fn with_capacity(item_capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(item_capacity),
            lights: CollectedLights::default(),
            culled: 0,
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.lights.clear();
        self.culled = 0;
    }

    /// Runs the transform system, then one DFS collecting visible
    /// drawables and active lights.
    pub fn collect_into(
        &mut self,
        scene: &mut Scene,
        camera: &Camera,
        resources: &Resources,
        settings: &RendererSettings,
        diagnostics: &mut Diagnostics,
    ) {
        self.clear();

        transform_system::update_hierarchy(&mut scene.nodes, &scene.root_nodes);

        let frustum = *camera.frustum();
        let camera_pos = camera.position();
        let light_cap = settings.max_lights_per_kind;

        let mut stack: Vec<NodeHandle> = Vec::with_capacity(64);
        for &root in scene.root_nodes.iter().rev() {
            stack.push(root);
        }

        while let Some(handle) = stack.pop() {
            let Some(node) = scene.nodes.get(handle) else {
                continue;
            };

            // Invisible node: prune the whole subtree
            if !node.visible {
                continue;
            }

            for i in (0..node.children.len()).rev() {
                stack.push(node.children[i]);
            }

            if let Some(light_key) = node.light {
                if let Some(light) = scene.lights.get(light_key) {
                    let world = node.transform.world_matrix();
                    let position: Vec3 = world.translation.into();
                    let direction = world.transform_vector3(Vec3::NEG_Z).normalize_or_zero();

                    let (bucket, range, cone_cos) = match &light.kind {
                        LightKind::Directional(_) => (&mut self.lights.directional, 0.0, 0.0),
                        LightKind::Point(p) => (&mut self.lights.point, p.range, 0.0),
                        LightKind::Spot(s) => {
                            (&mut self.lights.spot, s.range, s.outer_cone.cos())
                        }
                    };

                    if bucket.len() < light_cap {
                        bucket.push(CollectedLight {
                            position,
                            direction,
                            color: light.color,
                            intensity: light.intensity,
                            range,
                            cone_cos,
                            cast_shadows: light.cast_shadows,
                        });
                        if light.cast_shadows {
                            self.lights.shadow_casters += 1;
                        }
                    } else {
                        diagnostics.warn_once(
                            "light-cap",
                            light_cap as u64,
                            &format!(
                                "Active light count exceeds the per-kind cap of {light_cap}; excess lights are ignored"
                            ),
                        );
                    }
                }
            }

            let Some(mesh_key) = node.mesh else {
                continue;
            };
            let Some(mesh) = scene.meshes.get(mesh_key) else {
                continue;
            };
            if !mesh.visible {
                continue;
            }

            let Some(geometry) = resources.geometry(mesh.geometry) else {
                diagnostics.warn_once(
                    "missing-geometry",
                    mesh.geometry.data().as_ffi(),
                    &format!("Mesh {mesh_key:?} refers to missing geometry {:?}", mesh.geometry),
                );
                continue;
            };
            if resources.material(mesh.material).is_none() {
                diagnostics.warn_once(
                    "missing-material",
                    mesh.material.data().as_ffi(),
                    &format!("Mesh {mesh_key:?} refers to missing material {:?}", mesh.material),
                );
                continue;
            }

            let node_world = node.transform.world_matrix();

            // Frustum cull against the world-space bounding sphere
            if let Some(bs) = &geometry.bounding_sphere {
                let scale = node_world
                    .matrix3
                    .x_axis
                    .length()
                    .max(node_world.matrix3.y_axis.length())
                    .max(node_world.matrix3.z_axis.length());
                let center = node_world.transform_point3(bs.center);
                if !frustum.intersects_sphere(center, bs.radius * scale) {
                    self.culled += 1;
                    continue;
                }
            }

            let distance_sq = camera_pos.distance_squared(node_world.translation.into());

            self.items.push(CollectedItem {
                node: handle,
                mesh: mesh_key,
                geometry: mesh.geometry,
                material: mesh.material,
                world_matrix: node.transform.world_matrix_as_mat4(),
                distance_sq,
                render_order: mesh.render_order,
                geometry_features: geometry.features,
            });
        }
    }

    #[inline]
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
