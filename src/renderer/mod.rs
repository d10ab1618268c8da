//! Renderer
//!
//! The per-frame pipeline: collect the scene, build the render lists,
//! execute the buckets in their contractual order. All GPU side effects
//! flow through the injected [`RenderBackend`], all recoverable problems
//! through [`Diagnostics`].
//!
//! ```text
//! Scene ──collect──▶ CollectedScene ──build──▶ RenderLists ──execute──▶ backend
//! ```

pub mod backend;
pub mod collector;
pub mod executor;
pub mod program;
pub mod render_list;
pub mod state;
pub mod target_pool;
pub mod uniforms;

pub use backend::{RenderBackend, TargetId};
pub use executor::{DrawExecutor, FrameStats};
pub use state::GpuStateCache;

use crate::errors::{Diagnostics, Result, SableError};
use crate::renderer::collector::CollectedScene;
use crate::renderer::program::FrameContext;
use crate::renderer::render_list::RenderLists;
use crate::renderer::uniforms::FrameUniforms;
use crate::resources::{MaterialHandle, Resources};
use crate::scene::Scene;
use crate::scene::camera::Camera;
use crate::settings::RendererSettings;

/// Destination of a frame.
#[derive(Debug, Clone, Copy)]
pub struct RenderTarget {
    /// `None` renders to the default framebuffer.
    pub id: Option<TargetId>,
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
}

impl RenderTarget {
    /// The default framebuffer at the given size.
    #[must_use]
    pub fn surface(width: u32, height: u32) -> Self {
        Self {
            id: None,
            width,
            height,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
        }
    }
}

/// One rendering pipeline instance.
///
/// All state is owned here (no process-level globals), so multiple
/// independent renderers can coexist on one device context and unit tests
/// construct as many as they like.
pub struct Renderer {
    settings: RendererSettings,
    collected: CollectedScene,
    lists: RenderLists,
    executor: DrawExecutor,
    diagnostics: Diagnostics,
    frame_index: u64,
}

impl Renderer {
    #[must_use]
    pub fn new(settings: RendererSettings) -> Self {
        Self {
            settings,
            collected: CollectedScene::with_capacity(1024),
            lists: RenderLists::with_capacity(512),
            executor: DrawExecutor::new(),
            diagnostics: Diagnostics::new(),
            frame_index: 0,
        }
    }

    /// Renders one frame of `scene` seen through `camera` into `target`.
    ///
    /// A drawable that cannot render (broken program, stale handles)
    /// degrades that drawable only; the frame itself always completes.
    /// `Err` is reserved for structural misuse.
    pub fn render_frame(
        &mut self,
        scene: &mut Scene,
        camera: &Camera,
        resources: &Resources,
        target: &RenderTarget,
        backend: &mut dyn RenderBackend,
    ) -> Result<FrameStats> {
        if target.width == 0 || target.height == 0 {
            return Err(SableError::TargetUnavailable(
                "render target has zero extent".to_string(),
            ));
        }

        // Collect: dirty transforms, frustum cull, active lights
        self.collected.collect_into(
            scene,
            camera,
            resources,
            &self.settings,
            &mut self.diagnostics,
        );

        // Build: bucket and sort
        self.lists.build_into(&self.collected, resources);

        let ctx = FrameContext::new(
            self.collected.lights.directional.len(),
            self.collected.lights.point.len(),
            self.collected.lights.spot.len(),
            self.collected.lights.shadow_casters,
            &self.settings,
        );
        let frame = FrameUniforms::build(camera, &self.collected, &self.settings);

        // Execute: opaque → transmissive? → transparent
        self.executor
            .begin_frame(backend, &mut self.diagnostics, target, &frame, &self.settings);

        self.executor.draw_bucket(
            backend,
            &mut self.diagnostics,
            &self.lists.opaque,
            &self.collected,
            resources,
            &ctx,
            None,
        );

        if !self.lists.transmissive.is_empty() {
            let capture = self.executor.capture_scene(backend, target);
            self.executor.draw_bucket(
                backend,
                &mut self.diagnostics,
                &self.lists.transmissive,
                &self.collected,
                resources,
                &ctx,
                Some(capture.texture),
            );
        }

        self.executor.draw_bucket(
            backend,
            &mut self.diagnostics,
            &self.lists.transparent,
            &self.collected,
            resources,
            &ctx,
            None,
        );

        let stats = self.executor.end_frame(&self.collected);
        self.frame_index += 1;
        Ok(stats)
    }

    /// Cross-frame disposal hook: releases the program a material was
    /// bound to so usage counts stay sound. Call before (or after)
    /// removing the material from [`Resources`].
    pub fn release_material(&mut self, handle: MaterialHandle, backend: &mut dyn RenderBackend) {
        self.executor.release_material(handle, backend);
    }

    /// Forgets mirrored GPU state after an external actor touched the
    /// device directly; every subsequent state setter re-emits.
    pub fn reset_state_cache(&mut self) {
        self.executor.reset_state_cache();
    }

    /// Tears the instance down, force-releasing all GPU objects
    /// regardless of usage counts.
    pub fn dispose(&mut self, backend: &mut dyn RenderBackend) {
        self.executor.dispose(backend);
    }

    // ── Configuration & introspection ────────────────────────────────────

    #[must_use]
    pub fn settings(&self) -> &RendererSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut RendererSettings {
        &mut self.settings
    }

    /// Installs a host callback for one-time diagnostics.
    pub fn set_diagnostic_callback(&mut self, callback: Box<dyn FnMut(&str)>) {
        self.diagnostics.set_callback(callback);
    }

    #[must_use]
    pub fn executor(&self) -> &DrawExecutor {
        &self.executor
    }

    #[must_use]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }
}
