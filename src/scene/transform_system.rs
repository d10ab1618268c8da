//! Transform System
//!
//! Propagates world matrices through the node hierarchy, decoupled from
//! `Scene` to keep borrows narrow: it only needs the node map and the root
//! list.
//!
//! # Dirty propagation
//!
//! A node's world matrix recomputes only when its own local TRS changed
//! (shadow-state comparison inside [`Transform::update_local_matrix`]) or
//! when an ancestor's world matrix changed this pass. A static scene costs
//! comparisons, not matrix multiplies.

use glam::Affine3A;
use slotmap::SlotMap;

use crate::scene::NodeHandle;
use crate::scene::node::Node;
use crate::scene::transform::Transform;

/// Updates world matrices for every subtree rooted in `roots`.
///
/// Uses an explicit stack instead of recursion so deep hierarchies cannot
/// overflow the call stack. Returns the number of world matrices that were
/// actually recomputed (observable cost of the pass).
pub fn update_hierarchy(
    nodes: &mut SlotMap<NodeHandle, Node>,
    roots: &[NodeHandle],
) -> usize {
    // Work stack: (node handle, parent world matrix, parent changed)
    let mut stack: Vec<(NodeHandle, Affine3A, bool)> = Vec::with_capacity(64);
    let mut updated = 0;

    for &root in roots.iter().rev() {
        stack.push((root, Affine3A::IDENTITY, false));
    }

    while let Some((handle, parent_world, parent_changed)) = stack.pop() {
        let Some(node) = nodes.get_mut(handle) else {
            continue;
        };

        let local_changed = node.transform.update_local_matrix();
        let world_needs_update = local_changed || parent_changed;

        if world_needs_update {
            let new_world = parent_world * *node.transform.local_matrix();
            node.transform.set_world_matrix(new_world);
            updated += 1;
        }

        let current_world = node.transform.world_matrix;
        let child_count = node.children.len();

        // Push children in reverse to preserve traversal order
        for i in (0..child_count).rev() {
            if let Some(node) = nodes.get(handle) {
                if let Some(&child) = node.children.get(i) {
                    stack.push((child, current_world, world_needs_update));
                }
            }
        }
    }

    updated
}

/// Refreshes a single node's local matrix without touching the hierarchy.
#[inline]
pub fn update_single_node_local(transform: &mut Transform) -> bool {
    transform.update_local_matrix()
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn build_parent_child() -> (SlotMap<NodeHandle, Node>, NodeHandle, NodeHandle) {
        let mut nodes: SlotMap<NodeHandle, Node> = SlotMap::with_key();

        let mut parent = Node::new();
        parent.transform.position = Vec3::new(1.0, 0.0, 0.0);
        let parent_handle = nodes.insert(parent);

        let mut child = Node::new();
        child.transform.position = Vec3::new(0.0, 1.0, 0.0);
        child.parent = Some(parent_handle);
        let child_handle = nodes.insert(child);

        nodes
            .get_mut(parent_handle)
            .unwrap()
            .children
            .push(child_handle);

        (nodes, parent_handle, child_handle)
    }

    #[test]
    fn hierarchy_update_composes_world_positions() {
        let (mut nodes, parent, child) = build_parent_child();
        let roots = vec![parent];

        update_hierarchy(&mut nodes, &roots);

        let child_world = nodes.get(child).unwrap().transform.world_matrix.translation;
        assert!((child_world.x - 1.0).abs() < 1e-5);
        assert!((child_world.y - 1.0).abs() < 1e-5);
    }

    #[test]
    fn static_scene_recomputes_nothing() {
        let (mut nodes, parent, _child) = build_parent_child();
        let roots = vec![parent];

        assert_eq!(update_hierarchy(&mut nodes, &roots), 2);
        // No TRS change: second pass must not recompute any matrix
        assert_eq!(update_hierarchy(&mut nodes, &roots), 0);
    }

    #[test]
    fn parent_move_dirties_clean_children() {
        let (mut nodes, parent, child) = build_parent_child();
        let roots = vec![parent];
        update_hierarchy(&mut nodes, &roots);

        nodes.get_mut(parent).unwrap().transform.position = Vec3::new(5.0, 0.0, 0.0);
        assert_eq!(update_hierarchy(&mut nodes, &roots), 2);

        let child_world = nodes.get(child).unwrap().transform.world_matrix.translation;
        assert!((child_world.x - 5.0).abs() < 1e-5);
    }
}
