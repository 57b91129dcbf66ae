//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Bounded concurrent fingerprinting ([`finder`])
//! - Collision aggregation and group management ([`groups`])

pub mod finder;
pub mod groups;

pub use finder::{
    format_duration, hash_files, AdmissionGate, DuplicateFinder, FinderConfig, FinderError,
    HashStats, Permit, ScanOutcome, ScanSummary, DEFAULT_CONCURRENCY,
};
pub use groups::{CollisionGroup, CollisionMap};
