//! Program Cache
//!
//! Central owner of all compiled program objects. Entries are stored in a
//! slotmap and addressed through lightweight [`ProgramEntryKey`] handles;
//! the canonical lookup maps a structural key hash to its entry.
//!
//! # Contract
//!
//! - `acquire` on a hit is O(1): bump the usage count, return the entry.
//!   Two materials with equal keys share one entry (and one program).
//! - `acquire` on a miss builds a [`ProgramDescriptor`] from the key and
//!   hands it to the backend. Compilation may complete asynchronously;
//!   `Compiling` entries are retained and promoted by [`ProgramCache::poll_pending`]
//!   without ever blocking the frame loop.
//! - A key whose program fails to compile is recorded as broken: one
//!   diagnostic, no retry on later frames.
//! - `release` drops a usage count; at zero the entry is removed and the
//!   backend program destroyed. Usage counts never go below zero.

use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::SlotMap;

use crate::errors::Diagnostics;
use crate::renderer::backend::{
    ProgramDescriptor, ProgramId, ProgramStatus, RenderBackend, UniformLocation,
};
use crate::renderer::program::key::{ProgramKey, fx_hash_key};
use crate::resources::material::{MaterialFeatures, MaterialKind};

slotmap::new_key_type! {
    /// Handle to a cached program entry.
    pub struct ProgramEntryKey;
}

/// Lifecycle state of a cached entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    /// Linked and drawable.
    Ready,
    /// Driver still compiling; draws using this entry are deferred.
    Compiling,
    /// Compile/link failed after the entry was created; draws skip forever.
    Broken,
}

/// A compiled (or compiling) program plus its uniform location table.
pub struct ProgramEntry {
    pub key: ProgramKey,
    pub key_hash: u64,
    pub program: ProgramId,
    pub status: EntryStatus,
    pub uniforms: FxHashMap<&'static str, UniformLocation>,
    used: u32,
}

impl ProgramEntry {
    #[inline]
    #[must_use]
    pub fn location(&self, name: &str) -> Option<UniformLocation> {
        self.uniforms.get(name).copied()
    }
}

/// Failure modes of [`ProgramCache::acquire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireError {
    /// The key is permanently broken for this session.
    Broken,
}

/// Key-hash → entry cache with usage counting.
pub struct ProgramCache {
    entries: SlotMap<ProgramEntryKey, ProgramEntry>,
    lookup: FxHashMap<u64, ProgramEntryKey>,
    broken: FxHashSet<u64>,
    pending: Vec<ProgramEntryKey>,
    compiled_total: u64,
}

impl Default for ProgramCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgramCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: SlotMap::with_key(),
            lookup: FxHashMap::default(),
            broken: FxHashSet::default(),
            pending: Vec::new(),
            compiled_total: 0,
        }
    }

    // ── Acquire / release ────────────────────────────────────────────────

    /// Looks up or compiles the program for `key`.
    ///
    /// Every successful call must eventually be paired with one
    /// [`ProgramCache::release`]; the usage count is the number of live
    /// material bindings sharing the entry.
    pub fn acquire(
        &mut self,
        key: &ProgramKey,
        backend: &mut dyn RenderBackend,
        diagnostics: &mut Diagnostics,
    ) -> Result<ProgramEntryKey, AcquireError> {
        let hash = fx_hash_key(key);

        if self.broken.contains(&hash) {
            return Err(AcquireError::Broken);
        }

        if let Some(&entry_key) = self.lookup.get(&hash) {
            self.entries[entry_key].used += 1;
            return Ok(entry_key);
        }

        // Miss: compile through the backend
        let descriptor = descriptor_for(key, hash);
        let program = backend.create_program(&descriptor);
        self.compiled_total += 1;

        match backend.program_status(program) {
            ProgramStatus::Failed(message) => {
                self.broken.insert(hash);
                backend.destroy_program(program);
                diagnostics.error_once(
                    "program-compile",
                    hash,
                    &format!("Program '{}' failed to compile: {message}", descriptor.label),
                );
                Err(AcquireError::Broken)
            }
            status => {
                let ready = status == ProgramStatus::Ready;
                let uniforms = if ready {
                    build_uniform_table(backend, program, &descriptor.uniform_names)
                } else {
                    FxHashMap::default()
                };

                let entry_key = self.entries.insert(ProgramEntry {
                    key: *key,
                    key_hash: hash,
                    program,
                    status: if ready {
                        EntryStatus::Ready
                    } else {
                        EntryStatus::Compiling
                    },
                    uniforms,
                    used: 1,
                });
                self.lookup.insert(hash, entry_key);
                if !ready {
                    self.pending.push(entry_key);
                }
                Ok(entry_key)
            }
        }
    }

    /// Drops one usage. At zero the entry is removed and the program freed.
    pub fn release(&mut self, entry_key: ProgramEntryKey, backend: &mut dyn RenderBackend) {
        let Some(entry) = self.entries.get_mut(entry_key) else {
            log::warn!("release of unknown program entry {entry_key:?}");
            return;
        };
        entry.used -= 1;
        if entry.used == 0 {
            let entry = self.entries.remove(entry_key).expect("entry existed");
            self.lookup.remove(&entry.key_hash);
            self.pending.retain(|&k| k != entry_key);
            backend.destroy_program(entry.program);
        }
    }

    // ── Async compile polling ────────────────────────────────────────────

    /// Re-polls `Compiling` entries; call once per frame at begin.
    ///
    /// Promotion builds the uniform table; late failure marks the key
    /// broken (one diagnostic) while keeping the entry so outstanding
    /// references release normally.
    pub fn poll_pending(&mut self, backend: &mut dyn RenderBackend, diagnostics: &mut Diagnostics) {
        if self.pending.is_empty() {
            return;
        }

        let pending = std::mem::take(&mut self.pending);
        for entry_key in pending {
            let Some(entry) = self.entries.get_mut(entry_key) else {
                continue;
            };
            match backend.program_status(entry.program) {
                ProgramStatus::Ready => {
                    let names = uniform_names_for(&entry.key);
                    entry.uniforms = build_uniform_table(backend, entry.program, &names);
                    entry.status = EntryStatus::Ready;
                }
                ProgramStatus::Compiling => {
                    self.pending.push(entry_key);
                }
                ProgramStatus::Failed(message) => {
                    entry.status = EntryStatus::Broken;
                    self.broken.insert(entry.key_hash);
                    let label = format!("{}:{:016x}", entry.key.kind.template_name(), entry.key_hash);
                    diagnostics.error_once(
                        "program-compile",
                        entry.key_hash,
                        &format!("Program '{label}' failed to compile: {message}"),
                    );
                }
            }
        }
    }

    // ── Lookup ───────────────────────────────────────────────────────────

    #[inline]
    #[must_use]
    pub fn entry(&self, entry_key: ProgramEntryKey) -> Option<&ProgramEntry> {
        self.entries.get(entry_key)
    }

    // ── Auditing ─────────────────────────────────────────────────────────

    /// Number of live entries.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Usage count of one entry (`None` once fully released).
    #[must_use]
    pub fn usage_count(&self, entry_key: ProgramEntryKey) -> Option<u32> {
        self.entries.get(entry_key).map(|e| e.used)
    }

    /// Sum of all usage counts; a nonzero value after the host released
    /// everything it acquired indicates a leak.
    #[must_use]
    pub fn live_usage_total(&self) -> u64 {
        self.entries.values().map(|e| u64::from(e.used)).sum()
    }

    /// Keys marked permanently broken.
    #[must_use]
    pub fn broken_count(&self) -> usize {
        self.broken.len()
    }

    /// Programs compiled over the cache lifetime (misses, including failures).
    #[must_use]
    pub fn compiled_total(&self) -> u64 {
        self.compiled_total
    }

    // ── Teardown ─────────────────────────────────────────────────────────

    /// Force-releases every entry regardless of usage counts.
    pub fn dispose(&mut self, backend: &mut dyn RenderBackend) {
        for (_, entry) in self.entries.drain() {
            backend.destroy_program(entry.program);
        }
        self.lookup.clear();
        self.pending.clear();
    }
}

// ─── Descriptor synthesis ─────────────────────────────────────────────────────

fn build_uniform_table(
    backend: &mut dyn RenderBackend,
    program: ProgramId,
    names: &[&'static str],
) -> FxHashMap<&'static str, UniformLocation> {
    let mut table = FxHashMap::default();
    for &name in names {
        if let Some(location) = backend.uniform_location(program, name) {
            table.insert(name, location);
        }
    }
    table
}

/// Expands a key into the backend-facing descriptor: sorted define list
/// plus the uniform vocabulary the linked program exposes.
#[must_use]
pub fn descriptor_for(key: &ProgramKey, hash: u64) -> ProgramDescriptor {
    let mut defines: Vec<(&'static str, String)> = Vec::with_capacity(16);

    const FEATURE_DEFINES: &[(MaterialFeatures, &str)] = &[
        (MaterialFeatures::USE_MAP, "USE_MAP"),
        (MaterialFeatures::USE_NORMAL_MAP, "USE_NORMAL_MAP"),
        (MaterialFeatures::USE_ROUGHNESS_MAP, "USE_ROUGHNESS_MAP"),
        (MaterialFeatures::USE_METALNESS_MAP, "USE_METALNESS_MAP"),
        (MaterialFeatures::USE_EMISSIVE_MAP, "USE_EMISSIVE_MAP"),
        (MaterialFeatures::USE_AO_MAP, "USE_AO_MAP"),
        (MaterialFeatures::USE_ENV_MAP, "USE_ENV_MAP"),
        (MaterialFeatures::USE_ALPHA_TEST, "USE_ALPHA_TEST"),
        (MaterialFeatures::USE_TRANSMISSION, "USE_TRANSMISSION"),
    ];
    for &(flag, name) in FEATURE_DEFINES {
        if key.features.contains(flag) {
            defines.push((name, "1".to_string()));
        }
    }

    defines.push(("NUM_DIR_LIGHTS", key.directional_lights.to_string()));
    defines.push(("NUM_POINT_LIGHTS", key.point_lights.to_string()));
    defines.push(("NUM_SPOT_LIGHTS", key.spot_lights.to_string()));
    defines.push(("NUM_SHADOW_CASTERS", key.shadow_casters.to_string()));
    defines.push(("NUM_CLIPPING_PLANES", key.clipping_planes.to_string()));
    defines.push(("TONE_MAPPING", format!("{:?}", key.tone_mapping).to_uppercase()));
    defines.push(("COLOR_SPACE", format!("{:?}", key.color_space).to_uppercase()));

    if key.use_skinning {
        defines.push(("USE_SKINNING", "1".to_string()));
    }
    if key.use_morph_targets {
        defines.push(("USE_MORPH_TARGETS", "1".to_string()));
    }
    if key.use_instancing {
        defines.push(("USE_INSTANCING", "1".to_string()));
    }
    if key.double_sided {
        defines.push(("DOUBLE_SIDED", "1".to_string()));
    }

    // Sorted so identical option sets always produce identical descriptors
    defines.sort_unstable_by_key(|&(name, _)| name);

    ProgramDescriptor {
        label: format!("{}:{hash:016x}", key.kind.template_name()),
        defines,
        uniform_names: uniform_names_for(key),
    }
}

/// Uniform vocabulary of the linked program for `key`.
#[must_use]
pub fn uniform_names_for(key: &ProgramKey) -> Vec<&'static str> {
    let mut names: Vec<&'static str> = vec![
        "view_matrix",
        "view_projection",
        "camera_position",
        "model_matrix",
        "normal_matrix",
        "color",
    ];

    match key.kind {
        MaterialKind::Basic => {}
        MaterialKind::Lambert => names.push("emissive"),
        MaterialKind::Phong => {
            names.extend(["specular", "shininess", "emissive"]);
        }
        MaterialKind::Physical => {
            names.extend([
                "roughness",
                "metalness",
                "emissive",
                "emissive_intensity",
                "ior",
            ]);
        }
    }

    const FEATURE_SAMPLERS: &[(MaterialFeatures, &str)] = &[
        (MaterialFeatures::USE_MAP, "map"),
        (MaterialFeatures::USE_NORMAL_MAP, "normal_map"),
        (MaterialFeatures::USE_ROUGHNESS_MAP, "roughness_map"),
        (MaterialFeatures::USE_METALNESS_MAP, "metalness_map"),
        (MaterialFeatures::USE_EMISSIVE_MAP, "emissive_map"),
        (MaterialFeatures::USE_AO_MAP, "ao_map"),
        (MaterialFeatures::USE_ENV_MAP, "env_map"),
    ];
    for &(flag, name) in FEATURE_SAMPLERS {
        if key.features.contains(flag) {
            names.push(name);
        }
    }

    if key.features.contains(MaterialFeatures::USE_ALPHA_TEST) {
        names.push("alpha_test");
    }
    if key.features.contains(MaterialFeatures::USE_TRANSMISSION) {
        names.push("transmission");
        names.push("transmission_source");
    }

    if key.directional_lights > 0 {
        names.push("directional_lights");
    }
    if key.point_lights > 0 {
        names.push("point_lights");
    }
    if key.spot_lights > 0 {
        names.push("spot_lights");
    }
    if key.clipping_planes > 0 {
        names.push("clipping_planes");
    }

    names
}
