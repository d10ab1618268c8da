//! Render List Tests
//!
//! Tests for:
//! - Bucketing rules (transmission → transmissive, blending/transparency →
//!   transparent, default → opaque)
//! - Opaque ordering: render-order, then material grouping, then
//!   front-to-back (adjacent distances non-decreasing per material group)
//! - Transparent ordering: render-order, then back-to-front (adjacent
//!   distances non-increasing)

use glam::{Mat4, Vec4};

use sable::renderer::collector::{CollectedItem, CollectedScene};
use sable::renderer::render_list::RenderLists;
use sable::resources::geometry::GeometryFeatures;
use sable::resources::{Blending, MaterialHandle, Resources};

fn make_item(material: MaterialHandle, distance_sq: f32, render_order: i32) -> CollectedItem {
    CollectedItem {
        node: Default::default(),
        mesh: Default::default(),
        geometry: Default::default(),
        material,
        world_matrix: Mat4::IDENTITY,
        distance_sq,
        render_order,
        geometry_features: GeometryFeatures::empty(),
    }
}

fn collected_from(items: Vec<CollectedItem>) -> CollectedScene {
    let mut collected = CollectedScene::default();
    collected.items = items;
    collected
}

// ============================================================================
// Bucketing
// ============================================================================

#[test]
fn buckets_route_by_material_kind_and_settings() {
    let mut resources = Resources::new();

    let opaque = resources.add_material(sable::Material::new_basic(Vec4::ONE));

    let mut transparent_mat = sable::Material::new_basic(Vec4::ONE);
    transparent_mat.as_basic_mut().unwrap().set_transparent(true);
    let transparent = resources.add_material(transparent_mat);

    let mut additive_mat = sable::Material::new_basic(Vec4::ONE);
    additive_mat.as_basic_mut().unwrap().set_blending(Blending::Additive);
    let additive = resources.add_material(additive_mat);

    let mut glass_mat = sable::Material::new_physical(Vec4::ONE);
    glass_mat.as_physical_mut().unwrap().set_transmission(0.8);
    let glass = resources.add_material(glass_mat);

    let collected = collected_from(vec![
        make_item(opaque, 1.0, 0),
        make_item(transparent, 2.0, 0),
        make_item(additive, 3.0, 0),
        make_item(glass, 4.0, 0),
    ]);

    let mut lists = RenderLists::default();
    lists.build_into(&collected, &resources);

    assert_eq!(lists.opaque.len(), 1);
    assert_eq!(lists.transparent.len(), 2, "transparency flag and blending both route here");
    assert_eq!(lists.transmissive.len(), 1);
}

#[test]
fn zero_transmission_physical_material_is_opaque() {
    let mut resources = Resources::new();
    let physical = resources.add_material(sable::Material::new_physical(Vec4::ONE));

    let collected = collected_from(vec![make_item(physical, 1.0, 0)]);
    let mut lists = RenderLists::default();
    lists.build_into(&collected, &resources);

    assert_eq!(lists.opaque.len(), 1);
    assert!(lists.transmissive.is_empty());
}

// ============================================================================
// Sort orders
// ============================================================================

#[test]
fn opaque_sorts_front_to_back_within_a_material() {
    let mut resources = Resources::new();
    let material = resources.add_material(sable::Material::new_basic(Vec4::ONE));

    let distances = [25.0, 1.0, 9.0, 4.0, 16.0];
    let collected = collected_from(
        distances
            .iter()
            .map(|&d| make_item(material, d, 0))
            .collect(),
    );

    let mut lists = RenderLists::default();
    lists.build_into(&collected, &resources);

    for pair in lists.opaque.windows(2) {
        let a = collected.items[pair[0].item as usize].distance_sq;
        let b = collected.items[pair[1].item as usize].distance_sq;
        assert!(a <= b, "opaque must be front-to-back: {a} then {b}");
    }
}

#[test]
fn transparent_sorts_back_to_front() {
    let mut resources = Resources::new();
    let mut material = sable::Material::new_basic(Vec4::ONE);
    material.as_basic_mut().unwrap().set_transparent(true);
    let material = resources.add_material(material);

    let distances = [1.0, 25.0, 4.0, 16.0, 9.0];
    let collected = collected_from(
        distances
            .iter()
            .map(|&d| make_item(material, d, 0))
            .collect(),
    );

    let mut lists = RenderLists::default();
    lists.build_into(&collected, &resources);

    for pair in lists.transparent.windows(2) {
        let a = collected.items[pair[0].item as usize].distance_sq;
        let b = collected.items[pair[1].item as usize].distance_sq;
        assert!(a >= b, "transparent must be back-to-front: {a} then {b}");
    }
}

#[test]
fn opaque_groups_same_material_before_depth() {
    let mut resources = Resources::new();
    let mat_a = resources.add_material(sable::Material::new_basic(Vec4::ONE));
    let mat_b = resources.add_material(sable::Material::new_basic(Vec4::ONE));

    // Interleave materials so grouping has to reorder them
    let collected = collected_from(vec![
        make_item(mat_a, 9.0, 0),
        make_item(mat_b, 1.0, 0),
        make_item(mat_a, 4.0, 0),
        make_item(mat_b, 16.0, 0),
    ]);

    let mut lists = RenderLists::default();
    lists.build_into(&collected, &resources);

    let materials: Vec<MaterialHandle> = lists
        .opaque
        .iter()
        .map(|c| collected.items[c.item as usize].material)
        .collect();

    // Same-material draws must be adjacent
    let transitions = materials.windows(2).filter(|w| w[0] != w[1]).count();
    assert_eq!(transitions, 1, "materials must be grouped, got {materials:?}");

    // And within each group, front-to-back holds
    for pair in lists.opaque.windows(2) {
        let a = &collected.items[pair[0].item as usize];
        let b = &collected.items[pair[1].item as usize];
        if a.material == b.material {
            assert!(a.distance_sq <= b.distance_sq);
        }
    }
}

#[test]
fn render_order_dominates_all_other_keys() {
    let mut resources = Resources::new();
    let material = resources.add_material(sable::Material::new_basic(Vec4::ONE));
    let mut transparent_mat = sable::Material::new_basic(Vec4::ONE);
    transparent_mat.as_basic_mut().unwrap().set_transparent(true);
    let transparent = resources.add_material(transparent_mat);

    let collected = collected_from(vec![
        make_item(material, 1.0, 5),
        make_item(material, 100.0, -5),
        make_item(transparent, 100.0, 5),
        make_item(transparent, 1.0, -5),
    ]);

    let mut lists = RenderLists::default();
    lists.build_into(&collected, &resources);

    // Opaque: the render_order -5 item (far) draws before the order 5 item (near)
    assert_eq!(collected.items[lists.opaque[0].item as usize].render_order, -5);
    // Transparent: the order -5 item (near) still draws first
    assert_eq!(
        collected.items[lists.transparent[0].item as usize].render_order,
        -5
    );
}

#[test]
fn item_with_missing_material_is_dropped() {
    let mut resources = Resources::new();
    let material = resources.add_material(sable::Material::new_basic(Vec4::ONE));
    resources.remove_material(material);

    let collected = collected_from(vec![make_item(material, 1.0, 0)]);
    let mut lists = RenderLists::default();
    lists.build_into(&collected, &resources);

    assert!(lists.is_empty());
}
