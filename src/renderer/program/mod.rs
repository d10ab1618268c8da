//! Program Cache
//!
//! Maps structural cache keys to compiled, reference-counted program
//! entries: compile on miss, share on hit, destroy at zero usage.

pub mod cache;
pub mod key;

pub use cache::{
    AcquireError, EntryStatus, ProgramCache, ProgramEntry, ProgramEntryKey, descriptor_for,
    uniform_names_for,
};
pub use key::{FrameContext, ProgramKey, fx_hash_key};
