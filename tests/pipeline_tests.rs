//! End-to-End Pipeline Tests
//!
//! Drives `Renderer::render_frame` against the recording backend and
//! asserts on the exact command stream:
//! - The three-cube scenario: opaque draw order by distance, bucket
//!   migration when a material turns transparent
//! - Uniform diffing across frames (unchanged values upload nothing)
//! - Redundant state elision across frames
//! - The transmissive sub-pass (capture before sampling)
//! - Broken programs degrade one drawable, not the frame
//! - Asynchronous compiles defer draws without blocking
//! - Program reference counting across key changes and disposal

use glam::{Vec3, Vec4};

use sable::renderer::backend::recording::GpuCall;
use sable::renderer::backend::BufferId;
use sable::resources::geometry::BoundingSphere;
use sable::resources::{Geometry, MaterialHandle, Resources};
use sable::scene::{Camera, Light, Mesh, Node, NodeHandle, Scene};
use sable::settings::RendererSettings;
use sable::{Material, RecordingBackend, Renderer, RenderTarget};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

struct Fixture {
    backend: RecordingBackend,
    renderer: Renderer,
    resources: Resources,
    scene: Scene,
    camera: Camera,
    target: RenderTarget,
}

impl Fixture {
    fn new() -> Self {
        init_logger();
        Self {
            backend: RecordingBackend::new(),
            renderer: Renderer::new(RendererSettings::default()),
            resources: Resources::new(),
            scene: Scene::new(),
            camera: Camera::new_perspective(60.0, 1.0, 0.1, 100.0),
            target: RenderTarget::surface(800, 600),
        }
    }

    /// Adds a unit cube at `position`; returns its node and vertex buffer id.
    fn add_cube(&mut self, position: Vec3, material: MaterialHandle) -> (NodeHandle, BufferId) {
        let vb = self
            .resources
            .pool
            .create_buffer(&mut self.backend, 36 * 32, "cube");
        let vb_id = self.resources.pool.buffer_id(vb).unwrap();
        let geometry = self.resources.add_geometry(
            Geometry::new(vb, 36).with_bounding_sphere(BoundingSphere::new(Vec3::ZERO, 1.0)),
        );

        let mut node = Node::new();
        node.transform.position = position;
        let handle = self.scene.add_node(node);
        self.scene.attach_mesh(handle, Mesh::new(geometry, material));
        (handle, vb_id)
    }

    fn render(&mut self) -> sable::FrameStats {
        self.renderer
            .render_frame(
                &mut self.scene,
                &self.camera,
                &self.resources,
                &self.target,
                &mut self.backend,
            )
            .expect("frame must complete")
    }

    fn drawn_buffers(&self) -> Vec<BufferId> {
        self.backend
            .calls
            .iter()
            .filter_map(|c| match c {
                GpuCall::Draw { vertex_buffer, .. } => Some(*vertex_buffer),
                GpuCall::DrawIndexed { vertex_buffer, .. } => Some(*vertex_buffer),
                _ => None,
            })
            .collect()
    }
}

// ============================================================================
// The three-cube scenario
// ============================================================================

#[test]
fn three_opaque_cubes_draw_front_to_back() {
    let mut fx = Fixture::new();
    let material = fx.resources.add_material(Material::new_basic(Vec4::ONE));

    let (_, near) = fx.add_cube(Vec3::new(0.0, 0.0, -1.0), material);
    let (_, far) = fx.add_cube(Vec3::new(0.0, 0.0, -5.0), material);
    let (_, mid) = fx.add_cube(Vec3::new(0.0, 0.0, -2.0), material);

    let stats = fx.render();
    assert_eq!(stats.draw_calls, 3);
    assert_eq!(
        fx.drawn_buffers(),
        vec![near, mid, far],
        "opaque bucket must draw front-to-back: z=-1, z=-2, z=-5"
    );
}

#[test]
fn transparent_material_migrates_its_cube_between_buckets() {
    let mut fx = Fixture::new();
    let opaque = fx.resources.add_material(Material::new_basic(Vec4::ONE));
    let mut glassy = Material::new_basic(Vec4::new(1.0, 1.0, 1.0, 0.5));
    glassy.as_basic_mut().unwrap().set_transparent(true);
    let transparent = fx.resources.add_material(glassy);

    let (_, near) = fx.add_cube(Vec3::new(0.0, 0.0, -1.0), opaque);
    let (_, moved) = fx.add_cube(Vec3::new(0.0, 0.0, -5.0), transparent);
    let (_, mid) = fx.add_cube(Vec3::new(0.0, 0.0, -2.0), opaque);

    let stats = fx.render();
    assert_eq!(stats.draw_calls, 3);
    assert_eq!(
        fx.drawn_buffers(),
        vec![near, mid, moved],
        "remaining opaque cubes stay front-to-back; the transparent one draws last"
    );
}

#[test]
fn transparent_cubes_draw_back_to_front_after_all_opaque() {
    let mut fx = Fixture::new();
    let opaque = fx.resources.add_material(Material::new_basic(Vec4::ONE));
    let mut glassy = Material::new_basic(Vec4::ONE);
    glassy.as_basic_mut().unwrap().set_transparent(true);
    let transparent = fx.resources.add_material(glassy);

    let (_, t_near) = fx.add_cube(Vec3::new(0.0, 0.0, -2.0), transparent);
    let (_, o_far) = fx.add_cube(Vec3::new(0.0, 0.0, -9.0), opaque);
    let (_, t_far) = fx.add_cube(Vec3::new(0.0, 0.0, -7.0), transparent);
    let (_, o_near) = fx.add_cube(Vec3::new(0.0, 0.0, -1.0), opaque);

    fx.render();
    assert_eq!(fx.drawn_buffers(), vec![o_near, o_far, t_far, t_near]);
}

// ============================================================================
// Uniform diffing
// ============================================================================

#[test]
fn unchanged_frame_uploads_no_uniforms() {
    let mut fx = Fixture::new();
    let material = fx.resources.add_material(Material::new_basic(Vec4::ONE));
    fx.add_cube(Vec3::new(0.0, 0.0, -3.0), material);

    let first = fx.render();
    assert!(first.uniform_uploads > 0);

    fx.backend.clear_calls();
    let second = fx.render();

    assert_eq!(second.draw_calls, 1);
    assert_eq!(
        second.uniform_uploads, 0,
        "nothing changed, nothing may be uploaded"
    );
    assert_eq!(
        fx.backend.count(|c| matches!(c, GpuCall::UploadUniform { .. })),
        0
    );
}

#[test]
fn writing_the_current_value_does_not_upload() {
    let mut fx = Fixture::new();
    let material = fx.resources.add_material(Material::new_basic(Vec4::ONE));
    fx.add_cube(Vec3::new(0.0, 0.0, -3.0), material);
    fx.render();

    // Same value: the setter compares and must not bump the version
    fx.resources
        .material_mut(material)
        .unwrap()
        .as_basic_mut()
        .unwrap()
        .set_color(Vec4::ONE);

    fx.backend.clear_calls();
    let stats = fx.render();
    assert_eq!(stats.uniform_uploads, 0);
}

#[test]
fn changing_a_value_uploads_exactly_that_uniform() {
    let mut fx = Fixture::new();
    let material = fx.resources.add_material(Material::new_basic(Vec4::ONE));
    fx.add_cube(Vec3::new(0.0, 0.0, -3.0), material);
    fx.render();

    fx.resources
        .material_mut(material)
        .unwrap()
        .as_basic_mut()
        .unwrap()
        .set_color(Vec4::new(1.0, 0.0, 0.0, 1.0));

    fx.backend.clear_calls();
    let stats = fx.render();
    assert_eq!(stats.uniform_uploads, 1, "only the color changed");
}

#[test]
fn camera_move_reuploads_only_the_frame_globals() {
    let mut fx = Fixture::new();
    let material = fx.resources.add_material(Material::new_basic(Vec4::ONE));
    fx.add_cube(Vec3::new(0.0, 0.0, -3.0), material);
    fx.render();

    fx.camera
        .update_view_projection(&glam::Affine3A::from_translation(Vec3::new(0.0, 1.0, 0.0)));

    fx.backend.clear_calls();
    fx.render();

    // view_matrix, view_projection and camera_position change; the object
    // matrices and material values do not
    let uploads = fx.backend.count(|c| matches!(c, GpuCall::UploadUniform { .. }));
    assert_eq!(uploads, 3);
}

// ============================================================================
// State elision across frames
// ============================================================================

#[test]
fn static_scene_issues_no_redundant_state_calls() {
    let mut fx = Fixture::new();
    let material = fx.resources.add_material(Material::new_basic(Vec4::ONE));
    fx.add_cube(Vec3::new(0.0, 0.0, -1.0), material);
    fx.add_cube(Vec3::new(0.0, 0.0, -2.0), material);

    fx.render();
    fx.backend.clear_calls();
    let stats = fx.render();

    assert_eq!(stats.state_changes, 0, "identical frame must reuse all mirrored state");
    assert_eq!(fx.backend.count(|c| matches!(c, GpuCall::BindProgram(_))), 0);
    assert_eq!(fx.backend.count(|c| matches!(c, GpuCall::SetBlend(_))), 0);
    assert_eq!(fx.backend.count(|c| matches!(c, GpuCall::SetDepth(_))), 0);
    assert_eq!(fx.backend.count(|c| matches!(c, GpuCall::SetCull(_))), 0);
    assert_eq!(stats.draw_calls, 2);
}

#[test]
fn reset_state_cache_reemits_on_next_frame() {
    let mut fx = Fixture::new();
    let material = fx.resources.add_material(Material::new_basic(Vec4::ONE));
    fx.add_cube(Vec3::new(0.0, 0.0, -1.0), material);

    fx.render();
    fx.renderer.reset_state_cache();
    fx.backend.clear_calls();
    let stats = fx.render();

    assert!(stats.state_changes > 0);
    assert_eq!(fx.backend.count(|c| matches!(c, GpuCall::BindProgram(_))), 1);
}

// ============================================================================
// Transmission sub-pass
// ============================================================================

#[test]
fn transmissive_pass_captures_scene_then_samples_it() {
    let mut fx = Fixture::new();
    let opaque = fx.resources.add_material(Material::new_basic(Vec4::ONE));
    let mut glass = Material::new_physical(Vec4::ONE);
    glass.as_physical_mut().unwrap().set_transmission(0.7);
    let glass = fx.resources.add_material(glass);

    let (_, wall) = fx.add_cube(Vec3::new(0.0, 0.0, -6.0), opaque);
    let (_, pane) = fx.add_cube(Vec3::new(0.0, 0.0, -2.0), glass);

    let stats = fx.render();
    assert!(stats.transmission_pass);
    assert_eq!(fx.drawn_buffers(), vec![wall, pane]);

    // The capture copy must sit between the opaque draw and the glass draw
    let copy_pos = fx
        .backend
        .calls
        .iter()
        .position(|c| matches!(c, GpuCall::CopyTarget { .. }))
        .expect("transmission pass must capture the scene");
    let wall_pos = fx
        .backend
        .calls
        .iter()
        .position(|c| matches!(c, GpuCall::Draw { vertex_buffer, .. } if *vertex_buffer == wall))
        .unwrap();
    let pane_pos = fx
        .backend
        .calls
        .iter()
        .position(|c| matches!(c, GpuCall::Draw { vertex_buffer, .. } if *vertex_buffer == pane))
        .unwrap();

    assert!(wall_pos < copy_pos && copy_pos < pane_pos);
}

#[test]
fn transmission_target_is_reused_across_frames() {
    let mut fx = Fixture::new();
    let mut glass = Material::new_physical(Vec4::ONE);
    glass.as_physical_mut().unwrap().set_transmission(0.7);
    let glass = fx.resources.add_material(glass);
    fx.add_cube(Vec3::new(0.0, 0.0, -2.0), glass);

    fx.render();
    fx.render();
    fx.render();

    assert_eq!(
        fx.backend.count(|c| matches!(c, GpuCall::CreateTarget(_))),
        1,
        "the offscreen target must come from the pool after frame one"
    );
}

#[test]
fn no_transmissive_items_means_no_capture() {
    let mut fx = Fixture::new();
    let material = fx.resources.add_material(Material::new_basic(Vec4::ONE));
    fx.add_cube(Vec3::new(0.0, 0.0, -2.0), material);

    let stats = fx.render();
    assert!(!stats.transmission_pass);
    assert_eq!(fx.backend.count(|c| matches!(c, GpuCall::CopyTarget { .. })), 0);
}

// ============================================================================
// Failure modes
// ============================================================================

#[test]
fn broken_program_degrades_one_drawable_not_the_frame() {
    let mut fx = Fixture::new();
    fx.backend.fail_label("mesh_physical");

    let good = fx.resources.add_material(Material::new_basic(Vec4::ONE));
    let bad = fx.resources.add_material(Material::new_physical(Vec4::ONE));

    let (_, good_vb) = fx.add_cube(Vec3::new(0.0, 0.0, -1.0), good);
    fx.add_cube(Vec3::new(0.0, 0.0, -2.0), bad);

    let stats = fx.render();
    assert_eq!(stats.draw_calls, 1);
    assert_eq!(stats.skipped_broken, 1);
    assert_eq!(fx.drawn_buffers(), vec![good_vb]);

    // Later frames must not retry the compile
    fx.render();
    fx.render();
    assert_eq!(
        fx.backend
            .count(|c| matches!(c, GpuCall::CreateProgram { label } if label.contains("mesh_physical"))),
        1
    );
}

#[test]
fn compiling_program_defers_draws_without_blocking() {
    let mut fx = Fixture::new();
    fx.backend.compile_delay(3);

    let material = fx.resources.add_material(Material::new_basic(Vec4::ONE));
    fx.add_cube(Vec3::new(0.0, 0.0, -1.0), material);

    let first = fx.render();
    assert_eq!(first.draw_calls, 0);
    assert_eq!(first.deferred_compiling, 1);

    let second = fx.render();
    assert_eq!(second.draw_calls, 0, "still compiling after one poll");

    let third = fx.render();
    assert_eq!(third.draw_calls, 1, "ready after the second poll");
}

#[test]
fn indexed_geometry_issues_an_indexed_draw() {
    use sable::resources::GeometryIndices;

    let mut fx = Fixture::new();
    let material = fx.resources.add_material(Material::new_basic(Vec4::ONE));

    let vb = fx.resources.pool.create_buffer(&mut fx.backend, 24 * 32, "verts");
    let ib = fx.resources.pool.create_buffer(&mut fx.backend, 36 * 2, "indices");
    let geometry = fx.resources.add_geometry(
        Geometry::new(vb, 24)
            .with_indices(GeometryIndices {
                buffer: ib,
                format: wgpu::IndexFormat::Uint16,
                count: 36,
            })
            .with_bounding_sphere(BoundingSphere::new(Vec3::ZERO, 1.0)),
    );
    let mut node = Node::new();
    node.transform.position = Vec3::new(0.0, 0.0, -2.0);
    let handle = fx.scene.add_node(node);
    fx.scene.attach_mesh(handle, Mesh::new(geometry, material));

    fx.render();

    let indexed = fx
        .backend
        .calls
        .iter()
        .find_map(|c| match c {
            GpuCall::DrawIndexed { indices, .. } => Some(indices.clone()),
            _ => None,
        })
        .expect("indexed geometry must draw indexed");
    assert_eq!(indexed, 0..36);
}

#[test]
fn render_order_overrides_depth_within_the_opaque_bucket() {
    let mut fx = Fixture::new();
    let material = fx.resources.add_material(Material::new_basic(Vec4::ONE));

    let (_, near) = fx.add_cube(Vec3::new(0.0, 0.0, -1.0), material);
    let (far_node, far) = fx.add_cube(Vec3::new(0.0, 0.0, -8.0), material);

    // Force the far cube into an earlier draw group
    let mesh_key = fx.scene.node(far_node).unwrap().mesh.unwrap();
    fx.scene.meshes.get_mut(mesh_key).unwrap().render_order = -1;

    fx.render();
    assert_eq!(fx.drawn_buffers(), vec![far, near]);
}

#[test]
fn material_families_never_share_programs() {
    let mut fx = Fixture::new();
    let basic = fx.resources.add_material(Material::new_basic(Vec4::ONE));
    let lambert = fx.resources.add_material(Material::new_lambert(Vec4::ONE));
    let phong = fx.resources.add_material(Material::new_phong(Vec4::ONE));
    let physical = fx.resources.add_material(Material::new_physical(Vec4::ONE));

    fx.add_cube(Vec3::new(0.0, 0.0, -1.0), basic);
    fx.add_cube(Vec3::new(0.0, 0.0, -2.0), lambert);
    fx.add_cube(Vec3::new(0.0, 0.0, -3.0), phong);
    fx.add_cube(Vec3::new(0.0, 0.0, -4.0), physical);

    let stats = fx.render();
    assert_eq!(stats.draw_calls, 4);
    assert_eq!(fx.renderer.executor().program_cache().entry_count(), 4);
}

#[test]
fn diagnostics_callback_fires_once_per_cause() {
    use std::cell::RefCell;
    use std::rc::Rc;

    let mut fx = Fixture::new();
    fx.backend.fail_label("mesh_physical");

    let received = Rc::new(RefCell::new(Vec::new()));
    let sink = received.clone();
    fx.renderer
        .set_diagnostic_callback(Box::new(move |msg| sink.borrow_mut().push(msg.to_string())));

    let bad = fx.resources.add_material(Material::new_physical(Vec4::ONE));
    fx.add_cube(Vec3::new(0.0, 0.0, -2.0), bad);

    fx.render();
    fx.render();
    fx.render();

    assert_eq!(received.borrow().len(), 1);
    assert!(received.borrow()[0].contains("failed to compile"));
}

#[test]
fn zero_extent_target_is_a_structural_error() {
    let mut fx = Fixture::new();
    fx.target = RenderTarget::surface(0, 0);
    let result = fx.renderer.render_frame(
        &mut fx.scene,
        &fx.camera,
        &fx.resources,
        &fx.target,
        &mut fx.backend,
    );
    assert!(result.is_err());
}

// ============================================================================
// Program lifecycle across frames
// ============================================================================

#[test]
fn materials_with_equal_keys_share_one_program() {
    let mut fx = Fixture::new();
    let a = fx.resources.add_material(Material::new_basic(Vec4::ONE));
    let b = fx
        .resources
        .add_material(Material::new_basic(Vec4::new(0.2, 0.4, 0.6, 1.0)));

    fx.add_cube(Vec3::new(0.0, 0.0, -1.0), a);
    fx.add_cube(Vec3::new(0.0, 0.0, -2.0), b);

    fx.render();

    let cache = fx.renderer.executor().program_cache();
    assert_eq!(cache.entry_count(), 1, "same flags, same key, one program");
    assert_eq!(cache.live_usage_total(), 2);
    assert_eq!(fx.backend.count(|c| matches!(c, GpuCall::CreateProgram { .. })), 1);
}

#[test]
fn adding_a_light_rekeys_and_releases_the_old_program() {
    let mut fx = Fixture::new();
    let material = fx.resources.add_material(Material::new_lambert(Vec4::ONE));
    fx.add_cube(Vec3::new(0.0, 0.0, -2.0), material);

    fx.render();
    assert_eq!(fx.renderer.executor().program_cache().entry_count(), 1);

    let node = fx.scene.add_node(Node::new());
    fx.scene
        .attach_light(node, Light::new_directional(Vec3::ONE, 1.0));
    fx.render();

    let cache = fx.renderer.executor().program_cache();
    assert_eq!(
        cache.entry_count(),
        1,
        "old entry released at zero usage, new entry acquired"
    );
    assert_eq!(cache.live_usage_total(), 1);
    assert_eq!(fx.backend.count(|c| matches!(c, GpuCall::CreateProgram { .. })), 2);
    assert_eq!(fx.backend.count(|c| matches!(c, GpuCall::DestroyProgram(_))), 1);
}

#[test]
fn release_material_returns_usage_to_zero() {
    let mut fx = Fixture::new();
    let material = fx.resources.add_material(Material::new_basic(Vec4::ONE));
    fx.add_cube(Vec3::new(0.0, 0.0, -2.0), material);

    fx.render();
    assert_eq!(fx.renderer.executor().program_cache().live_usage_total(), 1);

    fx.renderer.release_material(material, &mut fx.backend);
    let cache = fx.renderer.executor().program_cache();
    assert_eq!(cache.entry_count(), 0);
    assert_eq!(cache.live_usage_total(), 0);
    assert_eq!(fx.backend.count(|c| matches!(c, GpuCall::DestroyProgram(_))), 1);
}

#[test]
fn dispose_tears_down_all_gpu_objects() {
    let mut fx = Fixture::new();
    let material = fx.resources.add_material(Material::new_basic(Vec4::ONE));
    let mut glass = Material::new_physical(Vec4::ONE);
    glass.as_physical_mut().unwrap().set_transmission(0.5);
    let glass = fx.resources.add_material(glass);
    fx.add_cube(Vec3::new(0.0, 0.0, -1.0), material);
    fx.add_cube(Vec3::new(0.0, 0.0, -2.0), glass);

    fx.render();
    fx.renderer.dispose(&mut fx.backend);

    assert_eq!(fx.renderer.executor().program_cache().entry_count(), 0);
    assert_eq!(fx.backend.count(|c| matches!(c, GpuCall::DestroyProgram(_))), 2);
    assert_eq!(fx.backend.count(|c| matches!(c, GpuCall::DestroyTarget(_))), 1);
}
