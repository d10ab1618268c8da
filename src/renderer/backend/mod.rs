//! Render Backend Boundary
//!
//! The pipeline core never talks to a device directly; every GPU side
//! effect goes through the [`RenderBackend`] trait object injected into
//! [`crate::renderer::Renderer::render_frame`]. This is the seam that makes
//! multiple independent renderer instances and deterministic headless tests
//! possible — the [`recording`] backend records the exact command stream a
//! device backend would receive.
//!
//! # State mirrors
//!
//! `wgpu` descriptor types do not all implement `Hash` / `Eq`. The mirror
//! types here ([`BlendStateKey`], [`DepthStateKey`]) extract the fields
//! relevant for state identity and derive the correct trait impls, so the
//! GPU state cache can compare snapshots and the program key can hash them.

pub mod recording;

pub use recording::RecordingBackend;

use crate::renderer::uniforms::UniformValue;

// ─── Handles ─────────────────────────────────────────────────────────────────

/// Backend-issued handle to a compiled program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramId(pub u32);

/// Backend-issued handle to a GPU buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub u32);

/// Backend-issued handle to a GPU texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

/// Backend-issued handle to an offscreen render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetId(pub u32);

/// Uniform location within a linked program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub u16);

// ─── Hashable State Mirrors ──────────────────────────────────────────────────

/// Hashable mirror of `wgpu::BlendComponent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendComponentKey {
    pub src_factor: wgpu::BlendFactor,
    pub dst_factor: wgpu::BlendFactor,
    pub operation: wgpu::BlendOperation,
}

impl From<wgpu::BlendComponent> for BlendComponentKey {
    fn from(b: wgpu::BlendComponent) -> Self {
        Self {
            src_factor: b.src_factor,
            dst_factor: b.dst_factor,
            operation: b.operation,
        }
    }
}

/// Hashable mirror of `wgpu::BlendState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendStateKey {
    pub color: BlendComponentKey,
    pub alpha: BlendComponentKey,
}

impl From<wgpu::BlendState> for BlendStateKey {
    fn from(b: wgpu::BlendState) -> Self {
        Self {
            color: b.color.into(),
            alpha: b.alpha.into(),
        }
    }
}

/// Depth pipeline state relevant for identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthStateKey {
    pub test: bool,
    pub write: bool,
    pub compare: wgpu::CompareFunction,
}

impl DepthStateKey {
    /// Depth state for a material: disabled tests compare `Always`.
    #[must_use]
    pub fn new(test: bool, write: bool) -> Self {
        Self {
            test,
            write,
            compare: if test {
                wgpu::CompareFunction::Less
            } else {
                wgpu::CompareFunction::Always
            },
        }
    }
}

/// Face culling state: which face to cull (if any) plus winding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CullStateKey {
    pub cull_mode: Option<wgpu::Face>,
    pub front_face: wgpu::FrontFace,
}

/// Viewport rectangle in target pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Viewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

// ─── Resource Descriptors ────────────────────────────────────────────────────

/// Descriptor for a GPU texture owned through the resource pool.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextureDesc {
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
    pub label: &'static str,
}

/// Descriptor for an offscreen color target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetDesc {
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
}

/// Compile status of a program, polled non-blockingly.
///
/// Drivers may compile asynchronously; the program cache retains
/// `Compiling` entries and re-polls at frame begin instead of blocking
/// the frame loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgramStatus {
    Ready,
    Compiling,
    Failed(String),
}

/// Everything the backend needs to build a program.
///
/// Shader *source* is out of scope here: the descriptor carries the shader
/// family, the define list derived from the cache key, and the uniform
/// vocabulary the linked program is expected to expose. The backend owns
/// template expansion and compilation.
#[derive(Debug, Clone)]
pub struct ProgramDescriptor {
    /// Shader family template name plus key hash, e.g. `mesh_physical:3fa2…`.
    pub label: String,
    /// Sorted `(name, value)` define list (sorted so identical option sets
    /// produce identical descriptors).
    pub defines: Vec<(&'static str, String)>,
    /// Uniform names the program exposes after linking.
    pub uniform_names: Vec<&'static str>,
}

/// Device capability limits the executor clamps against.
#[derive(Debug, Clone, Copy)]
pub struct BackendLimits {
    pub max_texture_units: u32,
}

impl Default for BackendLimits {
    fn default() -> Self {
        Self {
            max_texture_units: 16,
        }
    }
}

// ─── The Backend Trait ───────────────────────────────────────────────────────

/// GPU command boundary.
///
/// Contract: every method with side effects issues exactly one device
/// command. Redundancy elision is *not* the backend's job — that is the GPU
/// state cache's contract — so call counts observed on a backend are exact.
pub trait RenderBackend {
    fn limits(&self) -> BackendLimits;

    // ── Pipeline state ──
    fn set_blend(&mut self, blend: Option<BlendStateKey>);
    fn set_depth(&mut self, depth: DepthStateKey);
    fn set_cull(&mut self, cull: CullStateKey);
    fn set_viewport(&mut self, viewport: Viewport);
    fn bind_program(&mut self, program: ProgramId);
    fn bind_texture(&mut self, unit: u32, texture: TextureId);
    /// `None` binds the default framebuffer.
    fn bind_target(&mut self, target: Option<TargetId>);

    // ── Frame operations ──
    fn clear(&mut self, color: [f64; 4], depth: f32);

    // ── Programs ──
    fn create_program(&mut self, desc: &ProgramDescriptor) -> ProgramId;
    fn program_status(&mut self, program: ProgramId) -> ProgramStatus;
    fn uniform_location(&mut self, program: ProgramId, name: &str) -> Option<UniformLocation>;
    fn upload_uniform(&mut self, program: ProgramId, location: UniformLocation, value: &UniformValue);
    fn destroy_program(&mut self, program: ProgramId);

    // ── Buffers & textures (resource pool backing) ──
    fn create_buffer(&mut self, byte_len: u64, label: &'static str) -> BufferId;
    fn destroy_buffer(&mut self, buffer: BufferId);
    fn create_texture(&mut self, desc: &TextureDesc) -> TextureId;
    fn destroy_texture(&mut self, texture: TextureId);

    // ── Offscreen targets ──
    fn create_target(&mut self, desc: &TargetDesc) -> TargetId;
    fn target_texture(&self, target: TargetId) -> TextureId;
    fn destroy_target(&mut self, target: TargetId);
    /// Copies the color content of `src` (`None` = default framebuffer)
    /// into `dst`. Used by the transmission capture pass.
    fn copy_target(&mut self, src: Option<TargetId>, dst: TargetId);

    // ── Draws ──
    fn draw(&mut self, vertex_buffer: BufferId, vertices: std::ops::Range<u32>, instances: u32);
    fn draw_indexed(
        &mut self,
        vertex_buffer: BufferId,
        index_buffer: BufferId,
        index_format: wgpu::IndexFormat,
        indices: std::ops::Range<u32>,
        instances: u32,
    );
}
