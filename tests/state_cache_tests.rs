//! GPU State Cache Tests
//!
//! Tests for:
//! - Idempotent state setting (same value twice → one backend call)
//! - Call count == distinct consecutive value changes
//! - reset() recovery path (forgets, re-emits, reads nothing back)
//! - Per-unit texture binding tracking
//! - Program binding elision

use sable::renderer::backend::recording::GpuCall;
use sable::renderer::backend::{BlendStateKey, CullStateKey, DepthStateKey, ProgramId, TextureId};
use sable::renderer::state::GpuStateCache;
use sable::RecordingBackend;

fn alpha_blend() -> Option<BlendStateKey> {
    Some(BlendStateKey::from(wgpu::BlendState::ALPHA_BLENDING))
}

#[test]
fn setting_same_blend_twice_emits_once() {
    let mut backend = RecordingBackend::new();
    let mut state = GpuStateCache::new();

    state.set_blend(&mut backend, alpha_blend());
    state.set_blend(&mut backend, alpha_blend());

    assert_eq!(backend.count(|c| matches!(c, GpuCall::SetBlend(_))), 1);
}

#[test]
fn every_setter_is_idempotent() {
    let mut backend = RecordingBackend::new();
    let mut state = GpuStateCache::new();

    let depth = DepthStateKey::new(true, true);
    let cull = CullStateKey {
        cull_mode: Some(wgpu::Face::Back),
        front_face: wgpu::FrontFace::Ccw,
    };

    for _ in 0..3 {
        state.set_depth(&mut backend, depth);
        state.set_cull(&mut backend, cull);
        state.bind_program(&mut backend, ProgramId(9));
        state.bind_texture(&mut backend, 0, TextureId(4));
        state.bind_target(&mut backend, None);
    }

    assert_eq!(backend.count(|c| matches!(c, GpuCall::SetDepth(_))), 1);
    assert_eq!(backend.count(|c| matches!(c, GpuCall::SetCull(_))), 1);
    assert_eq!(backend.count(|c| matches!(c, GpuCall::BindProgram(_))), 1);
    assert_eq!(backend.count(|c| matches!(c, GpuCall::BindTexture { .. })), 1);
    assert_eq!(backend.count(|c| matches!(c, GpuCall::BindTarget(_))), 1);
}

#[test]
fn call_count_equals_distinct_consecutive_changes() {
    let mut backend = RecordingBackend::new();
    let mut state = GpuStateCache::new();

    // none, alpha, alpha, none, none, alpha → 3 changes after the first set
    let sequence = [None, alpha_blend(), alpha_blend(), None, None, alpha_blend()];
    for value in sequence {
        state.set_blend(&mut backend, value);
    }

    assert_eq!(backend.count(|c| matches!(c, GpuCall::SetBlend(_))), 4);
}

#[test]
fn reset_forces_full_reemission() {
    let mut backend = RecordingBackend::new();
    let mut state = GpuStateCache::new();

    state.set_blend(&mut backend, None);
    state.bind_program(&mut backend, ProgramId(1));
    state.bind_texture(&mut backend, 2, TextureId(5));

    state.reset();
    backend.clear_calls();

    // Identical values after reset must all re-emit
    state.set_blend(&mut backend, None);
    state.bind_program(&mut backend, ProgramId(1));
    state.bind_texture(&mut backend, 2, TextureId(5));

    assert_eq!(backend.calls.len(), 3);
}

#[test]
fn texture_units_are_independent_slots() {
    let mut backend = RecordingBackend::new();
    let mut state = GpuStateCache::new();

    state.bind_texture(&mut backend, 0, TextureId(1));
    state.bind_texture(&mut backend, 1, TextureId(1));
    state.bind_texture(&mut backend, 0, TextureId(1)); // elided
    state.bind_texture(&mut backend, 1, TextureId(2)); // change on unit 1

    assert_eq!(backend.count(|c| matches!(c, GpuCall::BindTexture { .. })), 3);
}

#[test]
fn elided_counter_tracks_absorbed_calls() {
    let mut backend = RecordingBackend::new();
    let mut state = GpuStateCache::new();

    state.bind_program(&mut backend, ProgramId(3));
    state.bind_program(&mut backend, ProgramId(3));
    state.bind_program(&mut backend, ProgramId(3));

    assert_eq!(state.emitted(), 1);
    assert_eq!(state.elided(), 2);
}
