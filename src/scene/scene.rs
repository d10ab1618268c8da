use slotmap::SlotMap;

use crate::resources::{GeometryHandle, MaterialHandle};
use crate::scene::light::Light;
use crate::scene::node::Node;
use crate::scene::{LightKey, MeshKey, NodeHandle};

/// Mesh component: the drawable unit pairing a geometry with a material.
///
/// The pipeline holds non-owning references to these for one frame at a
/// time; registering a mesh on a node is what "registers a drawable" at
/// the pipeline boundary.
#[derive(Debug, Clone)]
pub struct Mesh {
    pub geometry: GeometryHandle,
    pub material: MaterialHandle,
    /// Explicit draw-order group. Lower orders draw first; within a group
    /// the render list builder applies its material/depth sorting.
    pub render_order: i32,
    pub visible: bool,
}

impl Mesh {
    #[must_use]
    pub fn new(geometry: GeometryHandle, material: MaterialHandle) -> Self {
        Self {
            geometry,
            material,
            render_order: 0,
            visible: true,
        }
    }

    #[must_use]
    pub fn with_render_order(mut self, render_order: i32) -> Self {
        self.render_order = render_order;
        self
    }
}

/// Scene graph structure
///
/// Pure data layer: node hierarchy plus component maps. The renderer reads
/// it once per frame during collection and never mutates it (world-matrix
/// caches inside transforms are refreshed by the transform system, which
/// runs before collection).
#[derive(Default)]
pub struct Scene {
    pub nodes: SlotMap<NodeHandle, Node>,
    pub root_nodes: Vec<NodeHandle>,

    // ==== Component pools ====
    pub meshes: SlotMap<MeshKey, Mesh>,
    pub lights: SlotMap<LightKey, Light>,
}

impl Scene {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node to the scene as a root.
    pub fn add_node(&mut self, node: Node) -> NodeHandle {
        let handle = self.nodes.insert(node);
        self.root_nodes.push(handle);
        handle
    }

    /// Adds a node as a child of `parent`.
    pub fn add_child(&mut self, parent: NodeHandle, mut child: Node) -> NodeHandle {
        child.parent = Some(parent);
        let handle = self.nodes.insert(child);
        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.push(handle);
        }
        handle
    }

    /// Attaches a mesh component to a node, registering it as a drawable.
    pub fn attach_mesh(&mut self, node: NodeHandle, mesh: Mesh) -> MeshKey {
        let key = self.meshes.insert(mesh);
        if let Some(n) = self.nodes.get_mut(node) {
            n.mesh = Some(key);
        }
        key
    }

    /// Detaches and removes a mesh component (unregisters the drawable).
    pub fn detach_mesh(&mut self, node: NodeHandle) -> Option<Mesh> {
        let key = self.nodes.get_mut(node).and_then(|n| n.mesh.take())?;
        self.meshes.remove(key)
    }

    /// Attaches a light component to a node.
    pub fn attach_light(&mut self, node: NodeHandle, light: Light) -> LightKey {
        let key = self.lights.insert(light);
        if let Some(n) = self.nodes.get_mut(node) {
            n.light = Some(key);
        }
        key
    }

    /// Removes a node and its whole subtree, including attached components.
    pub fn remove_node(&mut self, handle: NodeHandle) {
        let Some(node) = self.nodes.get(handle) else {
            return;
        };
        let children = node.children.clone();
        for child in children {
            self.remove_node(child);
        }

        if let Some(node) = self.nodes.remove(handle) {
            if let Some(mesh) = node.mesh {
                self.meshes.remove(mesh);
            }
            if let Some(light) = node.light {
                self.lights.remove(light);
            }
            if let Some(parent) = node.parent {
                if let Some(p) = self.nodes.get_mut(parent) {
                    p.children.retain(|&c| c != handle);
                }
            }
        }
        self.root_nodes.retain(|&n| n != handle);
    }

    #[must_use]
    pub fn node(&self, handle: NodeHandle) -> Option<&Node> {
        self.nodes.get(handle)
    }

    pub fn node_mut(&mut self, handle: NodeHandle) -> Option<&mut Node> {
        self.nodes.get_mut(handle)
    }
}
