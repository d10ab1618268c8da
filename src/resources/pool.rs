//! Resource Pool
//!
//! Owns the GPU-side handles for buffers and textures and tracks how many
//! live consumers reference each one. Geometries and materials hold pool
//! handles, never raw backend ids; the executor resolves handles at draw
//! time, so a handle released mid-flight degrades to a skipped bind rather
//! than a dangling GPU id.
//!
//! Programs are reference-counted separately by the program cache, whose
//! acquire/release contract is richer (structural keys, broken tracking).

use slotmap::SlotMap;

use crate::renderer::backend::{BufferId, RenderBackend, TextureDesc, TextureId};

slotmap::new_key_type! {
    /// Pool handle for a GPU buffer.
    pub struct BufferHandle;
    /// Pool handle for a GPU texture.
    pub struct TextureHandle;
}

struct PooledBuffer {
    id: BufferId,
    refs: u32,
}

struct PooledTexture {
    id: TextureId,
    refs: u32,
}

/// Reference-counted owner of GPU buffer and texture handles.
#[derive(Default)]
pub struct ResourcePool {
    buffers: SlotMap<BufferHandle, PooledBuffer>,
    textures: SlotMap<TextureHandle, PooledTexture>,
}

impl ResourcePool {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ── Buffers ──────────────────────────────────────────────────────────

    /// Creates a GPU buffer and returns a handle with reference count 1.
    pub fn create_buffer(
        &mut self,
        backend: &mut dyn RenderBackend,
        byte_len: u64,
        label: &'static str,
    ) -> BufferHandle {
        let id = backend.create_buffer(byte_len, label);
        self.buffers.insert(PooledBuffer { id, refs: 1 })
    }

    /// Adds a reference to an existing buffer. No-op for stale handles.
    pub fn retain_buffer(&mut self, handle: BufferHandle) {
        if let Some(entry) = self.buffers.get_mut(handle) {
            entry.refs += 1;
        }
    }

    /// Drops a reference; destroys the GPU buffer when the count reaches 0.
    ///
    /// Returns `true` if the buffer was destroyed by this call.
    pub fn release_buffer(&mut self, handle: BufferHandle, backend: &mut dyn RenderBackend) -> bool {
        let Some(entry) = self.buffers.get_mut(handle) else {
            return false;
        };
        entry.refs -= 1;
        if entry.refs == 0 {
            let id = entry.id;
            self.buffers.remove(handle);
            backend.destroy_buffer(id);
            return true;
        }
        false
    }

    /// Resolves a handle to its backend id. `None` for released handles.
    #[must_use]
    pub fn buffer_id(&self, handle: BufferHandle) -> Option<BufferId> {
        self.buffers.get(handle).map(|b| b.id)
    }

    // ── Textures ─────────────────────────────────────────────────────────

    /// Creates a GPU texture and returns a handle with reference count 1.
    pub fn create_texture(
        &mut self,
        backend: &mut dyn RenderBackend,
        desc: &TextureDesc,
    ) -> TextureHandle {
        let id = backend.create_texture(desc);
        self.textures.insert(PooledTexture { id, refs: 1 })
    }

    /// Adds a reference to an existing texture. No-op for stale handles.
    pub fn retain_texture(&mut self, handle: TextureHandle) {
        if let Some(entry) = self.textures.get_mut(handle) {
            entry.refs += 1;
        }
    }

    /// Drops a reference; destroys the GPU texture when the count reaches 0.
    ///
    /// Returns `true` if the texture was destroyed by this call.
    pub fn release_texture(
        &mut self,
        handle: TextureHandle,
        backend: &mut dyn RenderBackend,
    ) -> bool {
        let Some(entry) = self.textures.get_mut(handle) else {
            return false;
        };
        entry.refs -= 1;
        if entry.refs == 0 {
            let id = entry.id;
            self.textures.remove(handle);
            backend.destroy_texture(id);
            return true;
        }
        false
    }

    /// Resolves a handle to its backend id. `None` for released handles.
    #[must_use]
    pub fn texture_id(&self, handle: TextureHandle) -> Option<TextureId> {
        self.textures.get(handle).map(|t| t.id)
    }

    // ── Auditing / teardown ──────────────────────────────────────────────

    #[must_use]
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    #[must_use]
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Force-destroys every pooled resource regardless of reference counts.
    /// Teardown path: outstanding handles become stale, not dangling.
    pub fn dispose(&mut self, backend: &mut dyn RenderBackend) {
        for (_, buffer) in self.buffers.drain() {
            backend.destroy_buffer(buffer.id);
        }
        for (_, texture) in self.textures.drain() {
            backend.destroy_texture(texture.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::backend::RecordingBackend;
    use crate::renderer::backend::recording::GpuCall;

    #[test]
    fn buffer_destroyed_only_at_zero_refs() {
        let mut backend = RecordingBackend::new();
        let mut pool = ResourcePool::new();

        let handle = pool.create_buffer(&mut backend, 256, "test");
        pool.retain_buffer(handle);

        assert!(!pool.release_buffer(handle, &mut backend));
        assert!(pool.buffer_id(handle).is_some());

        assert!(pool.release_buffer(handle, &mut backend));
        assert!(pool.buffer_id(handle).is_none());
        assert_eq!(backend.count(|c| matches!(c, GpuCall::DestroyBuffer(_))), 1);
    }

    #[test]
    fn stale_handle_release_is_a_noop() {
        let mut backend = RecordingBackend::new();
        let mut pool = ResourcePool::new();

        let handle = pool.create_buffer(&mut backend, 16, "test");
        assert!(pool.release_buffer(handle, &mut backend));
        assert!(!pool.release_buffer(handle, &mut backend));
    }

    #[test]
    fn dispose_destroys_everything() {
        let mut backend = RecordingBackend::new();
        let mut pool = ResourcePool::new();

        pool.create_buffer(&mut backend, 16, "a");
        let tex = pool.create_texture(
            &mut backend,
            &crate::renderer::backend::TextureDesc {
                width: 4,
                height: 4,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                label: "t",
            },
        );
        pool.retain_texture(tex); // extra ref must not survive dispose

        pool.dispose(&mut backend);
        assert_eq!(pool.buffer_count(), 0);
        assert_eq!(pool.texture_count(), 0);
        assert_eq!(backend.count(|c| matches!(c, GpuCall::DestroyTexture(_))), 1);
    }
}
