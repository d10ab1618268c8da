use glam::Affine3A;

use crate::scene::transform::Transform;
use crate::scene::{LightKey, MeshKey, NodeHandle};

/// A minimal scene node containing only essential hot data.
///
/// # Design Principles
///
/// - Only keeps data that must be traversed every frame (hierarchy,
///   transform, visibility, component keys)
/// - Component payloads (Mesh, Light) live in the Scene's component maps
/// - Small nodes keep the per-frame walk cache friendly
///
/// # Visibility
///
/// An invisible node prunes its entire subtree from collection: children
/// of a hidden node are never visited, matching scene-graph semantics
/// rather than per-node filtering.
#[derive(Debug, Clone)]
pub struct Node {
    // === Core hierarchy ===
    /// Parent node handle (None for root nodes)
    pub(crate) parent: Option<NodeHandle>,
    /// Child node handles
    pub(crate) children: Vec<NodeHandle>,

    // === Core spatial data ===
    /// Transform component (hot data accessed every frame)
    pub transform: Transform,

    // === Core state ===
    /// Visibility flag for culling
    pub visible: bool,

    // === Components ===
    pub mesh: Option<MeshKey>,
    pub light: Option<LightKey>,
}

impl Node {
    /// Creates a new node with default transform and visibility.
    #[must_use]
    pub fn new() -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            transform: Transform::new(),
            visible: true,
            mesh: None,
            light: None,
        }
    }

    /// Returns the parent node handle, if any.
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<NodeHandle> {
        self.parent
    }

    /// Returns a read-only slice of child node handles.
    #[inline]
    #[must_use]
    pub fn children(&self) -> &[NodeHandle] {
        &self.children
    }

    /// Returns a reference to the world transformation matrix.
    ///
    /// Updated by the transform system at the start of each frame.
    #[inline]
    #[must_use]
    pub fn world_matrix(&self) -> &Affine3A {
        &self.transform.world_matrix
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::new()
    }
}
