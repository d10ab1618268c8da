//! Recording Backend
//!
//! A headless [`RenderBackend`] implementation that records the exact
//! command stream a device backend would receive. Used by the integration
//! suites to assert state-elision and draw-ordering contracts, and usable
//! by hosts for command-stream capture and replay tooling.
//!
//! Programs "link" immediately by default; [`RecordingBackend::fail_label`]
//! makes matching programs fail, and [`RecordingBackend::compile_delay`]
//! keeps new programs in `Compiling` status for a number of polls to
//! exercise the non-blocking compile path.

use rustc_hash::FxHashMap;

use crate::renderer::backend::{
    BackendLimits, BlendStateKey, BufferId, CullStateKey, DepthStateKey, ProgramDescriptor,
    ProgramId, ProgramStatus, RenderBackend, TargetDesc, TargetId, TextureDesc, TextureId,
    UniformLocation, Viewport,
};
use crate::renderer::uniforms::UniformValue;

/// One recorded device command.
#[derive(Debug, Clone, PartialEq)]
pub enum GpuCall {
    SetBlend(Option<BlendStateKey>),
    SetDepth(DepthStateKey),
    SetCull(CullStateKey),
    SetViewport(Viewport),
    BindProgram(ProgramId),
    BindTexture { unit: u32, texture: TextureId },
    BindTarget(Option<TargetId>),
    Clear,
    CreateProgram { label: String },
    DestroyProgram(ProgramId),
    UploadUniform {
        program: ProgramId,
        location: UniformLocation,
        value: UniformValue,
    },
    CreateBuffer(BufferId),
    DestroyBuffer(BufferId),
    CreateTexture(TextureId),
    DestroyTexture(TextureId),
    CreateTarget(TargetId),
    DestroyTarget(TargetId),
    CopyTarget { src: Option<TargetId>, dst: TargetId },
    Draw {
        vertex_buffer: BufferId,
        vertices: std::ops::Range<u32>,
        instances: u32,
    },
    DrawIndexed {
        vertex_buffer: BufferId,
        index_buffer: BufferId,
        indices: std::ops::Range<u32>,
        instances: u32,
    },
}

struct RecordedProgram {
    status: ProgramStatus,
    /// Polls remaining before a `Compiling` program becomes `Ready`.
    polls_until_ready: u32,
    locations: FxHashMap<String, UniformLocation>,
}

/// Command-recording backend.
pub struct RecordingBackend {
    /// Every command issued, in order.
    pub calls: Vec<GpuCall>,
    limits: BackendLimits,
    next_id: u32,
    programs: FxHashMap<ProgramId, RecordedProgram>,
    target_textures: FxHashMap<TargetId, TextureId>,
    fail_label: Option<String>,
    compile_delay: u32,
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingBackend {
    #[must_use]
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            limits: BackendLimits::default(),
            next_id: 1,
            programs: FxHashMap::default(),
            target_textures: FxHashMap::default(),
            fail_label: None,
            compile_delay: 0,
        }
    }

    /// Programs whose label contains `needle` fail to link.
    pub fn fail_label(&mut self, needle: &str) {
        self.fail_label = Some(needle.to_string());
    }

    /// New programs stay `Compiling` for `polls` status queries.
    pub fn compile_delay(&mut self, polls: u32) {
        self.compile_delay = polls;
    }

    /// Overrides the reported device limits.
    pub fn set_limits(&mut self, limits: BackendLimits) {
        self.limits = limits;
    }

    /// Number of recorded calls matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&GpuCall) -> bool) -> usize {
        self.calls.iter().filter(|c| predicate(c)).count()
    }

    /// Number of draw commands (indexed or not).
    #[must_use]
    pub fn draw_count(&self) -> usize {
        self.count(|c| matches!(c, GpuCall::Draw { .. } | GpuCall::DrawIndexed { .. }))
    }

    /// Clears the recorded command list (counters and programs survive).
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    fn fresh_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl RenderBackend for RecordingBackend {
    fn limits(&self) -> BackendLimits {
        self.limits
    }

    fn set_blend(&mut self, blend: Option<BlendStateKey>) {
        self.calls.push(GpuCall::SetBlend(blend));
    }

    fn set_depth(&mut self, depth: DepthStateKey) {
        self.calls.push(GpuCall::SetDepth(depth));
    }

    fn set_cull(&mut self, cull: CullStateKey) {
        self.calls.push(GpuCall::SetCull(cull));
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.calls.push(GpuCall::SetViewport(viewport));
    }

    fn bind_program(&mut self, program: ProgramId) {
        self.calls.push(GpuCall::BindProgram(program));
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureId) {
        self.calls.push(GpuCall::BindTexture { unit, texture });
    }

    fn bind_target(&mut self, target: Option<TargetId>) {
        self.calls.push(GpuCall::BindTarget(target));
    }

    fn clear(&mut self, _color: [f64; 4], _depth: f32) {
        self.calls.push(GpuCall::Clear);
    }

    fn create_program(&mut self, desc: &ProgramDescriptor) -> ProgramId {
        let id = ProgramId(self.fresh_id());
        self.calls.push(GpuCall::CreateProgram {
            label: desc.label.clone(),
        });

        let failed = self
            .fail_label
            .as_ref()
            .is_some_and(|needle| desc.label.contains(needle));

        let status = if failed {
            ProgramStatus::Failed(format!("link failed: {}", desc.label))
        } else if self.compile_delay > 0 {
            ProgramStatus::Compiling
        } else {
            ProgramStatus::Ready
        };

        self.programs.insert(
            id,
            RecordedProgram {
                status,
                polls_until_ready: self.compile_delay,
                locations: FxHashMap::default(),
            },
        );
        id
    }

    fn program_status(&mut self, program: ProgramId) -> ProgramStatus {
        let Some(entry) = self.programs.get_mut(&program) else {
            return ProgramStatus::Failed("unknown program".to_string());
        };
        if entry.status == ProgramStatus::Compiling {
            entry.polls_until_ready = entry.polls_until_ready.saturating_sub(1);
            if entry.polls_until_ready == 0 {
                entry.status = ProgramStatus::Ready;
            }
        }
        entry.status.clone()
    }

    fn uniform_location(&mut self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        let entry = self.programs.get_mut(&program)?;
        if matches!(entry.status, ProgramStatus::Failed(_)) {
            return None;
        }
        let next = entry.locations.len() as u16;
        Some(
            *entry
                .locations
                .entry(name.to_string())
                .or_insert(UniformLocation(next)),
        )
    }

    fn upload_uniform(&mut self, program: ProgramId, location: UniformLocation, value: &UniformValue) {
        self.calls.push(GpuCall::UploadUniform {
            program,
            location,
            value: value.clone(),
        });
    }

    fn destroy_program(&mut self, program: ProgramId) {
        self.programs.remove(&program);
        self.calls.push(GpuCall::DestroyProgram(program));
    }

    fn create_buffer(&mut self, _byte_len: u64, _label: &'static str) -> BufferId {
        let id = BufferId(self.fresh_id());
        self.calls.push(GpuCall::CreateBuffer(id));
        id
    }

    fn destroy_buffer(&mut self, buffer: BufferId) {
        self.calls.push(GpuCall::DestroyBuffer(buffer));
    }

    fn create_texture(&mut self, _desc: &TextureDesc) -> TextureId {
        let id = TextureId(self.fresh_id());
        self.calls.push(GpuCall::CreateTexture(id));
        id
    }

    fn destroy_texture(&mut self, texture: TextureId) {
        self.calls.push(GpuCall::DestroyTexture(texture));
    }

    fn create_target(&mut self, _desc: &TargetDesc) -> TargetId {
        let target = TargetId(self.fresh_id());
        let texture = TextureId(self.fresh_id());
        self.target_textures.insert(target, texture);
        self.calls.push(GpuCall::CreateTarget(target));
        target
    }

    fn target_texture(&self, target: TargetId) -> TextureId {
        self.target_textures
            .get(&target)
            .copied()
            .unwrap_or(TextureId(0))
    }

    fn destroy_target(&mut self, target: TargetId) {
        self.target_textures.remove(&target);
        self.calls.push(GpuCall::DestroyTarget(target));
    }

    fn copy_target(&mut self, src: Option<TargetId>, dst: TargetId) {
        self.calls.push(GpuCall::CopyTarget { src, dst });
    }

    fn draw(&mut self, vertex_buffer: BufferId, vertices: std::ops::Range<u32>, instances: u32) {
        self.calls.push(GpuCall::Draw {
            vertex_buffer,
            vertices,
            instances,
        });
    }

    fn draw_indexed(
        &mut self,
        vertex_buffer: BufferId,
        index_buffer: BufferId,
        _index_format: wgpu::IndexFormat,
        indices: std::ops::Range<u32>,
        instances: u32,
    ) {
        self.calls.push(GpuCall::DrawIndexed {
            vertex_buffer,
            index_buffer,
            indices,
            instances,
        });
    }
}
