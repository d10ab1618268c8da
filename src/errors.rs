//! Error Types
//!
//! This module defines the error types used throughout the pipeline.
//!
//! # Overview
//!
//! The main error type [`SableError`] covers structural failure modes:
//! - Program compilation / linking failures
//! - Render target misuse
//! - Device limit violations
//!
//! Frame-local problems (a single broken material, an over-budget light
//! list) never surface as `Err` from the frame loop; they degrade the frame
//! and are reported through [`Diagnostics`] exactly once per cause.
//!
//! # Usage
//!
//! All public APIs return [`Result<T>`] which is an alias for
//! `std::result::Result<T, SableError>`.

use rustc_hash::FxHashSet;
use thiserror::Error;

/// The main error type for the Sable rendering pipeline.
#[derive(Error, Debug)]
pub enum SableError {
    // ========================================================================
    // GPU & Rendering Errors
    // ========================================================================
    /// A program failed to compile or link.
    #[error("Program compile error for '{label}': {message}")]
    ProgramCompile {
        /// Program label (shader family + key hash)
        label: String,
        /// Driver-reported compile/link log
        message: String,
    },

    /// The requested render target is not usable.
    #[error("Render target unavailable: {0}")]
    TargetUnavailable(String),

    /// A device limit would be exceeded.
    #[error("Device limit exceeded: {what} (requested {requested}, max {max})")]
    LimitExceeded {
        /// Description of the limited resource
        what: &'static str,
        /// Requested count
        requested: u32,
        /// Supported maximum
        max: u32,
    },
}

/// Alias for `Result<T, SableError>`.
pub type Result<T> = std::result::Result<T, SableError>;

// ============================================================================
// One-time diagnostics
// ============================================================================

/// Deduplicated diagnostic sink.
///
/// Recoverable per-frame degradations (compile failures, limit clamps,
/// stale handles) are reported here. Each distinct cause is logged once and
/// forwarded once to the optional host callback; repeats on later frames
/// are absorbed so a broken material cannot turn into a log storm.
#[derive(Default)]
pub struct Diagnostics {
    seen: FxHashSet<(&'static str, u64)>,
    callback: Option<Box<dyn FnMut(&str)>>,
}

impl Diagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a host callback receiving each first-occurrence message.
    pub fn set_callback(&mut self, callback: Box<dyn FnMut(&str)>) {
        self.callback = Some(callback);
    }

    /// Reports a warning once per `(category, discriminant)` pair.
    ///
    /// Returns `true` if this was the first occurrence.
    pub fn warn_once(&mut self, category: &'static str, discriminant: u64, message: &str) -> bool {
        if !self.seen.insert((category, discriminant)) {
            return false;
        }
        log::warn!("{message}");
        if let Some(cb) = &mut self.callback {
            cb(message);
        }
        true
    }

    /// Reports an error once per `(category, discriminant)` pair.
    ///
    /// Returns `true` if this was the first occurrence.
    pub fn error_once(&mut self, category: &'static str, discriminant: u64, message: &str) -> bool {
        if !self.seen.insert((category, discriminant)) {
            return false;
        }
        log::error!("{message}");
        if let Some(cb) = &mut self.callback {
            cb(message);
        }
        true
    }

    /// Number of distinct diagnostics reported so far.
    #[must_use]
    pub fn distinct_count(&self) -> usize {
        self.seen.len()
    }
}

impl std::fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Diagnostics")
            .field("distinct", &self.seen.len())
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}
