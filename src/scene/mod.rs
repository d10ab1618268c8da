//! Scene graph module
//!
//! Hierarchy and components consumed by the render pipeline:
//! - Node: scene node (parent/child links, transform, visibility)
//! - Transform: TRS component with cached matrices and dirty checking
//! - Scene: container for nodes and component pools
//! - Camera: projection + view caches + frustum
//! - Light: light components (directional/point/spot)
//! - TransformSystem: decoupled world-matrix propagation

pub mod camera;
pub mod light;
pub mod node;
pub mod scene;
pub mod transform;
pub mod transform_system;

pub use camera::{Camera, Frustum, ProjectionType};
pub use light::{Light, LightKind};
pub use node::Node;
pub use scene::{Mesh, Scene};
pub use transform::Transform;

use slotmap::new_key_type;

new_key_type! {
    pub struct NodeHandle;
    pub struct MeshKey;
    pub struct LightKey;
}
