//! Draw Executor
//!
//! Walks the sorted render lists and turns each entry into the minimal GPU
//! command sequence: resolve (or re-acquire) the program, bind it through
//! the state cache, upload only the uniforms whose values changed, and
//! reconcile blend/depth/cull state before issuing the draw.
//!
//! Per frame the executor runs a fixed pass sequence:
//! `begin → opaque → (transmissive?) → transparent → end`, where the
//! transmissive sub-pass first captures the scene color into a pooled
//! offscreen target and binds it as the refraction source.
//!
//! # Failure modes
//!
//! - Broken program: the entry is skipped for the rest of the session
//!   (its diagnostic fired once at compile time).
//! - Program still compiling: the entry defers to a later frame; the
//!   frame loop is never blocked on a driver.
//! - Stale buffer/texture handles: the draw (or the bind) is skipped with
//!   a one-time diagnostic; a frame degrades, it never aborts.

use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::Key;
use smallvec::SmallVec;

use crate::errors::Diagnostics;
use crate::renderer::backend::{
    CullStateKey, DepthStateKey, RenderBackend, TargetDesc, TextureId, Viewport,
};
use crate::renderer::collector::CollectedScene;
use crate::renderer::program::{AcquireError, EntryStatus, FrameContext, ProgramCache, ProgramEntryKey, ProgramKey, fx_hash_key};
use crate::renderer::render_list::RenderCommand;
use crate::renderer::state::GpuStateCache;
use crate::renderer::target_pool::{TargetLease, TargetPool};
use crate::renderer::uniforms::{FrameUniforms, ObjectUniforms, UniformValue};
use crate::renderer::RenderTarget;
use crate::resources::material::Side;
use crate::resources::{MaterialHandle, Resources};
use crate::settings::RendererSettings;

/// Per-frame counters returned by `render_frame`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameStats {
    pub items_collected: u32,
    pub items_culled: u32,
    pub draw_calls: u32,
    pub uniform_uploads: u32,
    /// Backend state calls issued this frame.
    pub state_changes: u64,
    /// Setter calls elided by the state cache this frame.
    pub state_elided: u64,
    /// Programs compiled this frame (cache misses).
    pub programs_compiled: u64,
    /// Draws skipped because their program is permanently broken.
    pub skipped_broken: u32,
    /// Draws deferred because their program is still compiling.
    pub deferred_compiling: u32,
    pub transmission_pass: bool,
}

/// Program binding a material resolved to, remembered across frames.
///
/// `entry == None` records a broken key so the executor does not re-run
/// acquisition every frame for a material that can never draw.
#[derive(Debug, Clone, Copy)]
struct MaterialBinding {
    key_hash: u64,
    entry: Option<ProgramEntryKey>,
}

/// The draw executor: owns the GPU-facing caches and all per-draw state.
pub struct DrawExecutor {
    pub(crate) state: GpuStateCache,
    pub(crate) programs: ProgramCache,
    targets: TargetPool,

    bindings: FxHashMap<MaterialHandle, MaterialBinding>,
    /// Per-(program, uniform) last uploaded value; uniforms are program
    /// state on the device, so the cache persists across frames and binds.
    uniform_cache: FxHashMap<(ProgramEntryKey, &'static str), UniformValue>,
    /// Programs that already received frame globals this frame.
    frame_touched: FxHashSet<ProgramEntryKey>,
    /// Which material's uniforms a program currently holds, and at which
    /// version. Lets an unchanged material skip value collection entirely
    /// while staying correct when materials share a program.
    entry_material_state: FxHashMap<ProgramEntryKey, (MaterialHandle, u64)>,

    scratch_uniforms: Vec<(&'static str, UniformValue)>,
    frame_uniform_values: Vec<(&'static str, UniformValue)>,

    stats: FrameStats,
    state_emitted_mark: u64,
    state_elided_mark: u64,
    compiled_mark: u64,
}

impl Default for DrawExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl DrawExecutor {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: GpuStateCache::new(),
            programs: ProgramCache::new(),
            targets: TargetPool::new(),
            bindings: FxHashMap::default(),
            uniform_cache: FxHashMap::default(),
            frame_touched: FxHashSet::default(),
            entry_material_state: FxHashMap::default(),
            scratch_uniforms: Vec::with_capacity(16),
            frame_uniform_values: Vec::with_capacity(8),
            stats: FrameStats::default(),
            state_emitted_mark: 0,
            state_elided_mark: 0,
            compiled_mark: 0,
        }
    }

    // ── Frame boundaries ─────────────────────────────────────────────────

    /// `BEGIN`: polls pending compiles, binds and clears the target.
    pub fn begin_frame(
        &mut self,
        backend: &mut dyn RenderBackend,
        diagnostics: &mut Diagnostics,
        target: &RenderTarget,
        frame: &FrameUniforms,
        settings: &RendererSettings,
    ) {
        self.programs.poll_pending(backend, diagnostics);
        self.frame_touched.clear();

        self.stats = FrameStats::default();
        self.state_emitted_mark = self.state.emitted();
        self.state_elided_mark = self.state.elided();
        self.compiled_mark = self.programs.compiled_total();

        self.frame_uniform_values.clear();
        frame.collect(&mut self.frame_uniform_values);

        self.state.bind_target(backend, target.id);
        self.state.set_viewport(
            backend,
            Viewport {
                x: 0,
                y: 0,
                width: target.width,
                height: target.height,
            },
        );
        let c = settings.clear_color;
        backend.clear([f64::from(c.x), f64::from(c.y), f64::from(c.z), f64::from(c.w)], 1.0);
    }

    /// `END`: returns leased targets and finalizes the frame counters.
    pub fn end_frame(&mut self, collected: &CollectedScene) -> FrameStats {
        self.targets.reset();

        self.stats.items_collected = collected.items.len() as u32;
        self.stats.items_culled = collected.culled;
        self.stats.state_changes = self.state.emitted() - self.state_emitted_mark;
        self.stats.state_elided = self.state.elided() - self.state_elided_mark;
        self.stats.programs_compiled = self.programs.compiled_total() - self.compiled_mark;
        self.stats
    }

    /// Captures the current scene color into a pooled offscreen target for
    /// the transmissive sub-pass to sample.
    pub fn capture_scene(
        &mut self,
        backend: &mut dyn RenderBackend,
        target: &RenderTarget,
    ) -> TargetLease {
        self.stats.transmission_pass = true;
        let lease = self.targets.lease(
            backend,
            TargetDesc {
                width: target.width,
                height: target.height,
                format: target.format,
            },
        );
        backend.copy_target(target.id, lease.target);
        lease
    }

    // ── Bucket submission ────────────────────────────────────────────────

    /// Draws one sorted bucket in order. `transmission_source` is the
    /// captured scene color for the transmissive sub-pass.
    pub fn draw_bucket(
        &mut self,
        backend: &mut dyn RenderBackend,
        diagnostics: &mut Diagnostics,
        commands: &[RenderCommand],
        collected: &CollectedScene,
        resources: &Resources,
        ctx: &FrameContext,
        transmission_source: Option<TextureId>,
    ) {
        for command in commands {
            self.draw_command(
                backend,
                diagnostics,
                command,
                collected,
                resources,
                ctx,
                transmission_source,
            );
        }
    }

    #[allow(clippy::too_many_lines)]
    fn draw_command(
        &mut self,
        backend: &mut dyn RenderBackend,
        diagnostics: &mut Diagnostics,
        command: &RenderCommand,
        collected: &CollectedScene,
        resources: &Resources,
        ctx: &FrameContext,
        transmission_source: Option<TextureId>,
    ) {
        let item = &collected.items[command.item as usize];
        let Some(material) = resources.material(item.material) else {
            return;
        };

        // (1) Resolve the program entry; a changed key releases the old
        // entry and acquires the new one.
        let key = ProgramKey::derive(material, item.geometry_features, ctx);
        let key_hash = fx_hash_key(&key);

        let previous = self.bindings.get(&item.material).copied();
        let entry_key = match previous {
            Some(binding) if binding.key_hash == key_hash => binding.entry,
            _ => {
                if let Some(old_entry) = previous.and_then(|b| b.entry) {
                    self.release_entry(old_entry, backend);
                }
                let entry = match self.programs.acquire(&key, backend, diagnostics) {
                    Ok(entry) => Some(entry),
                    Err(AcquireError::Broken) => None,
                };
                self.bindings
                    .insert(item.material, MaterialBinding { key_hash, entry });
                entry
            }
        };

        let Some(entry_key) = entry_key else {
            self.stats.skipped_broken += 1;
            return;
        };

        let entry = self
            .programs
            .entry(entry_key)
            .expect("bound entry must be live");
        match entry.status {
            EntryStatus::Broken => {
                self.stats.skipped_broken += 1;
                return;
            }
            EntryStatus::Compiling => {
                self.stats.deferred_compiling += 1;
                return;
            }
            EntryStatus::Ready => {}
        }

        // (2) Bind the program (one state change at most)
        let program = entry.program;
        self.state.bind_program(backend, program);

        // (3) Uniforms: frame globals once per program per frame, material
        // values gated by version, object matrices per draw — all diffed
        // by value.
        if self.frame_touched.insert(entry_key) {
            let frame_values = std::mem::take(&mut self.frame_uniform_values);
            self.upload_uniforms(backend, entry_key, &frame_values);
            self.frame_uniform_values = frame_values;
        }

        let material_version = material.version();
        let material_state = (item.material, material_version);
        if self.entry_material_state.get(&entry_key) != Some(&material_state) {
            let mut values = std::mem::take(&mut self.scratch_uniforms);
            values.clear();
            material.data.collect_uniforms(&mut values);
            self.upload_uniforms(backend, entry_key, &values);
            self.scratch_uniforms = values;
            self.entry_material_state.insert(entry_key, material_state);
        }

        let object = ObjectUniforms::from_model(item.world_matrix);
        let mut values = std::mem::take(&mut self.scratch_uniforms);
        values.clear();
        object.collect(&mut values);
        self.upload_uniforms(backend, entry_key, &values);
        self.scratch_uniforms = values;

        // Texture units: material slots in declaration order, then the
        // transmission source, clamped to the device limit.
        let mut texture_slots: SmallVec<[(&'static str, TextureId); 8]> = SmallVec::new();
        {
            let mut handles: SmallVec<[(&'static str, crate::resources::TextureHandle); 8]> =
                SmallVec::new();
            material.data.texture_bindings(&mut handles);
            for (name, handle) in handles {
                if let Some(id) = resources.pool.texture_id(handle) {
                    texture_slots.push((name, id));
                } else {
                    diagnostics.warn_once(
                        "stale-texture",
                        handle.data().as_ffi(),
                        &format!("Material texture {handle:?} was released; bind skipped"),
                    );
                }
            }
        }
        if let Some(source) = transmission_source {
            texture_slots.push(("transmission_source", source));
        }

        let max_units = backend.limits().max_texture_units;
        let mut values = std::mem::take(&mut self.scratch_uniforms);
        values.clear();
        for (unit, (name, texture)) in texture_slots.into_iter().enumerate() {
            let unit = unit as u32;
            if unit >= max_units {
                diagnostics.warn_once(
                    "texture-units",
                    u64::from(max_units),
                    &format!(
                        "Material requires more than {max_units} texture units; extra textures are dropped"
                    ),
                );
                break;
            }
            values.push((name, UniformValue::TextureUnit(unit)));
            self.state.bind_texture(backend, unit, texture);
        }
        self.upload_uniforms(backend, entry_key, &values);
        self.scratch_uniforms = values;

        // (4) Fixed-function state through the state cache
        let settings = material.settings();
        let blend = if settings.needs_blending() {
            settings
                .blending
                .blend_state()
                .or_else(|| crate::resources::Blending::Alpha.blend_state())
        } else {
            None
        };
        self.state.set_blend(backend, blend);
        self.state
            .set_depth(backend, DepthStateKey::new(settings.depth_test, settings.depth_write));
        self.state.set_cull(
            backend,
            CullStateKey {
                cull_mode: match settings.side {
                    Side::Front => Some(wgpu::Face::Back),
                    Side::Back => Some(wgpu::Face::Front),
                    Side::Double => None,
                },
                front_face: wgpu::FrontFace::Ccw,
            },
        );

        // (5) Issue the draw
        let Some(geometry) = resources.geometry(item.geometry) else {
            diagnostics.warn_once(
                "missing-geometry",
                item.geometry.data().as_ffi(),
                &format!("Geometry {:?} vanished between collection and draw", item.geometry),
            );
            return;
        };
        let Some(vertex_buffer) = resources.pool.buffer_id(geometry.vertex_buffer) else {
            diagnostics.warn_once(
                "stale-buffer",
                geometry.vertex_buffer.data().as_ffi(),
                &format!("Vertex buffer {:?} was released; draw skipped", geometry.vertex_buffer),
            );
            return;
        };

        if let Some(indices) = &geometry.indices {
            let Some(index_buffer) = resources.pool.buffer_id(indices.buffer) else {
                diagnostics.warn_once(
                    "stale-buffer",
                    indices.buffer.data().as_ffi(),
                    &format!("Index buffer {:?} was released; draw skipped", indices.buffer),
                );
                return;
            };
            backend.draw_indexed(
                vertex_buffer,
                index_buffer,
                indices.format,
                geometry.draw_range.clone(),
                geometry.instance_count,
            );
        } else {
            backend.draw(vertex_buffer, geometry.draw_range.clone(), geometry.instance_count);
        }
        self.stats.draw_calls += 1;
    }

    // ── Uniform diffing ──────────────────────────────────────────────────

    /// Uploads the pairs whose cached value differs; uniforms the linked
    /// program does not expose are silently skipped (the driver would have
    /// optimized them out).
    fn upload_uniforms(
        &mut self,
        backend: &mut dyn RenderBackend,
        entry_key: ProgramEntryKey,
        values: &[(&'static str, UniformValue)],
    ) {
        let Some(entry) = self.programs.entry(entry_key) else {
            return;
        };
        for (name, value) in values {
            let Some(location) = entry.location(name) else {
                continue;
            };
            let cache_key = (entry_key, *name);
            if self.uniform_cache.get(&cache_key) == Some(value) {
                continue;
            }
            backend.upload_uniform(entry.program, location, value);
            self.uniform_cache.insert(cache_key, value.clone());
            self.stats.uniform_uploads += 1;
        }
    }

    // ── Cross-frame lifecycle ────────────────────────────────────────────

    /// Releases the program bound for a material; the cross-frame disposal
    /// path that keeps usage counts sound.
    pub fn release_material(&mut self, handle: MaterialHandle, backend: &mut dyn RenderBackend) {
        if let Some(binding) = self.bindings.remove(&handle) {
            if let Some(entry) = binding.entry {
                self.release_entry(entry, backend);
            }
        }
    }

    fn release_entry(&mut self, entry_key: ProgramEntryKey, backend: &mut dyn RenderBackend) {
        self.programs.release(entry_key, backend);
        if self.programs.entry(entry_key).is_none() {
            self.uniform_cache.retain(|(key, _), _| *key != entry_key);
            self.entry_material_state.remove(&entry_key);
            self.frame_touched.remove(&entry_key);
        }
    }

    /// Tears down every cache and GPU object regardless of usage counts.
    pub fn dispose(&mut self, backend: &mut dyn RenderBackend) {
        self.programs.dispose(backend);
        self.targets.dispose(backend);
        self.bindings.clear();
        self.uniform_cache.clear();
        self.entry_material_state.clear();
        self.frame_touched.clear();
        self.state.reset();
    }

    // ── Introspection ────────────────────────────────────────────────────

    #[must_use]
    pub fn program_cache(&self) -> &ProgramCache {
        &self.programs
    }

    #[must_use]
    pub fn state_cache(&self) -> &GpuStateCache {
        &self.state
    }

    /// Forgets mirrored GPU state (external-actor recovery path).
    pub fn reset_state_cache(&mut self) {
        self.state.reset();
    }
}
