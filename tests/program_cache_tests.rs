//! Program Cache Tests
//!
//! Tests for:
//! - Cache-key equivalence (equal keys share one entry, O(1) on hit)
//! - Key splitting on light counts / feature flags / context modes
//! - Reference-count soundness over acquire/release sequences
//! - Broken programs: one compile, one diagnostic, no retry
//! - Asynchronous compiles: non-blocking promotion via polling
//! - Teardown force-release

use sable::errors::Diagnostics;
use sable::renderer::backend::recording::GpuCall;
use sable::renderer::program::{ProgramCache, ProgramKey};
use sable::resources::material::{MaterialFeatures, MaterialKind};
use sable::settings::{ColorSpace, ToneMapping};
use sable::RecordingBackend;

fn base_key() -> ProgramKey {
    ProgramKey {
        kind: MaterialKind::Physical,
        features: MaterialFeatures::empty(),
        directional_lights: 1,
        point_lights: 0,
        spot_lights: 0,
        shadow_casters: 0,
        clipping_planes: 0,
        color_space: ColorSpace::Srgb,
        tone_mapping: ToneMapping::None,
        use_skinning: false,
        use_morph_targets: false,
        use_instancing: false,
        double_sided: false,
    }
}

#[test]
fn equal_keys_share_one_entry() {
    let mut backend = RecordingBackend::new();
    let mut diag = Diagnostics::new();
    let mut cache = ProgramCache::new();

    let a = cache.acquire(&base_key(), &mut backend, &mut diag).unwrap();
    let b = cache.acquire(&base_key(), &mut backend, &mut diag).unwrap();

    assert_eq!(a, b, "identical keys must resolve to the same entry");
    assert_eq!(cache.entry_count(), 1);
    assert_eq!(cache.usage_count(a), Some(2));
    assert_eq!(
        backend.count(|c| matches!(c, GpuCall::CreateProgram { .. })),
        1,
        "a cache hit must not recompile"
    );
}

#[test]
fn light_count_splits_programs() {
    let mut backend = RecordingBackend::new();
    let mut diag = Diagnostics::new();
    let mut cache = ProgramCache::new();

    let one_light = base_key();
    let two_lights = ProgramKey {
        directional_lights: 2,
        ..base_key()
    };

    let a = cache.acquire(&one_light, &mut backend, &mut diag).unwrap();
    let b = cache.acquire(&two_lights, &mut backend, &mut diag).unwrap();

    assert_ne!(a, b);
    assert_eq!(cache.entry_count(), 2);
}

#[test]
fn feature_flags_and_modes_split_programs() {
    let mut backend = RecordingBackend::new();
    let mut diag = Diagnostics::new();
    let mut cache = ProgramCache::new();

    let plain = cache.acquire(&base_key(), &mut backend, &mut diag).unwrap();

    let mapped = ProgramKey {
        features: MaterialFeatures::USE_MAP,
        ..base_key()
    };
    let toned = ProgramKey {
        tone_mapping: ToneMapping::AcesFilmic,
        ..base_key()
    };
    let skinned = ProgramKey {
        use_skinning: true,
        ..base_key()
    };

    for key in [mapped, toned, skinned] {
        let entry = cache.acquire(&key, &mut backend, &mut diag).unwrap();
        assert_ne!(entry, plain);
    }
    assert_eq!(cache.entry_count(), 4);
}

#[test]
fn usage_count_reaches_zero_after_balanced_releases() {
    let mut backend = RecordingBackend::new();
    let mut diag = Diagnostics::new();
    let mut cache = ProgramCache::new();

    let key = base_key();
    let entry = cache.acquire(&key, &mut backend, &mut diag).unwrap();
    for _ in 0..4 {
        let again = cache.acquire(&key, &mut backend, &mut diag).unwrap();
        assert_eq!(again, entry);
    }
    assert_eq!(cache.usage_count(entry), Some(5));

    for remaining in (1..5).rev() {
        cache.release(entry, &mut backend);
        assert_eq!(cache.usage_count(entry), Some(remaining));
    }

    cache.release(entry, &mut backend);
    assert_eq!(cache.usage_count(entry), None);
    assert_eq!(cache.entry_count(), 0);
    assert_eq!(cache.live_usage_total(), 0);
    assert_eq!(backend.count(|c| matches!(c, GpuCall::DestroyProgram(_))), 1);
}

#[test]
fn reacquire_after_full_release_recompiles() {
    let mut backend = RecordingBackend::new();
    let mut diag = Diagnostics::new();
    let mut cache = ProgramCache::new();

    let key = base_key();
    let entry = cache.acquire(&key, &mut backend, &mut diag).unwrap();
    cache.release(entry, &mut backend);
    cache.acquire(&key, &mut backend, &mut diag).unwrap();

    assert_eq!(backend.count(|c| matches!(c, GpuCall::CreateProgram { .. })), 2);
}

#[test]
fn broken_key_compiles_once_and_never_retries() {
    let mut backend = RecordingBackend::new();
    backend.fail_label("mesh_physical");
    let mut diag = Diagnostics::new();
    let mut cache = ProgramCache::new();

    let key = base_key();
    for _ in 0..5 {
        assert!(cache.acquire(&key, &mut backend, &mut diag).is_err());
    }

    assert_eq!(
        backend.count(|c| matches!(c, GpuCall::CreateProgram { .. })),
        1,
        "a broken key must not trigger a retry storm"
    );
    assert_eq!(cache.broken_count(), 1);
    assert_eq!(cache.entry_count(), 0);
    assert_eq!(diag.distinct_count(), 1, "exactly one diagnostic per broken key");
}

#[test]
fn broken_key_does_not_poison_other_keys() {
    let mut backend = RecordingBackend::new();
    backend.fail_label("mesh_physical");
    let mut diag = Diagnostics::new();
    let mut cache = ProgramCache::new();

    assert!(cache.acquire(&base_key(), &mut backend, &mut diag).is_err());

    let basic = ProgramKey {
        kind: MaterialKind::Basic,
        ..base_key()
    };
    assert!(cache.acquire(&basic, &mut backend, &mut diag).is_ok());
}

#[test]
fn async_compile_promotes_through_polling() {
    use sable::renderer::program::EntryStatus;

    let mut backend = RecordingBackend::new();
    backend.compile_delay(3);
    let mut diag = Diagnostics::new();
    let mut cache = ProgramCache::new();

    let entry = cache.acquire(&base_key(), &mut backend, &mut diag).unwrap();
    assert_eq!(cache.entry(entry).unwrap().status, EntryStatus::Compiling);

    // First poll: still compiling; second poll: ready
    cache.poll_pending(&mut backend, &mut diag);
    assert_eq!(cache.entry(entry).unwrap().status, EntryStatus::Compiling);
    cache.poll_pending(&mut backend, &mut diag);
    assert_eq!(cache.entry(entry).unwrap().status, EntryStatus::Ready);

    // Promotion must have produced a uniform location table
    assert!(cache.entry(entry).unwrap().location("view_projection").is_some());
}

#[test]
fn dispose_force_releases_regardless_of_usage() {
    let mut backend = RecordingBackend::new();
    let mut diag = Diagnostics::new();
    let mut cache = ProgramCache::new();

    let key_a = base_key();
    let key_b = ProgramKey {
        kind: MaterialKind::Basic,
        ..base_key()
    };
    cache.acquire(&key_a, &mut backend, &mut diag).unwrap();
    cache.acquire(&key_a, &mut backend, &mut diag).unwrap();
    cache.acquire(&key_b, &mut backend, &mut diag).unwrap();

    cache.dispose(&mut backend);

    assert_eq!(cache.entry_count(), 0);
    assert_eq!(backend.count(|c| matches!(c, GpuCall::DestroyProgram(_))), 2);
}
