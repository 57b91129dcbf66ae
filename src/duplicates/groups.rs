//! Collision map and collision groups.
//!
//! # Overview
//!
//! [`CollisionMap`] is the only state shared between hashing tasks. It maps
//! each fingerprint to the paths that produced it and keeps the processed
//! and errored counters. Recording a result (map insert, counter update and
//! progress publication) happens under one lock, so observers always see a
//! consistent snapshot. The counters are mirrored into atomics so progress
//! readers never wait on hashing threads.
//!
//! Once hashing has quiesced, [`CollisionMap::finalize`] keeps the entries
//! with two or more paths as [`CollisionGroup`]s.
//!
//! # Example
//!
//! ```
//! use duplicut::duplicates::CollisionMap;
//! use duplicut::scanner::Hasher;
//! use std::path::PathBuf;
//!
//! let hasher = Hasher::default();
//! let map = CollisionMap::new(3);
//! map.record_fingerprint(PathBuf::from("/a"), hasher.fingerprint_bytes(b"hello"), None);
//! map.record_fingerprint(PathBuf::from("/b"), hasher.fingerprint_bytes(b"hello"), None);
//! map.record_fingerprint(PathBuf::from("/c"), hasher.fingerprint_bytes(b"world"), None);
//!
//! let groups = map.finalize(false);
//! assert_eq!(groups.len(), 1);
//! assert_eq!(groups[0].len(), 2);
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use serde::Serialize;

use crate::progress::{ProgressCallback, ProgressSnapshot};
use crate::scanner::Fingerprint;

/// Files sharing one fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollisionGroup {
    /// Content fingerprint shared by every member
    pub fingerprint: Fingerprint,
    /// Member paths, sorted
    pub paths: Vec<PathBuf>,
}

impl CollisionGroup {
    /// Create a group, sorting its paths.
    #[must_use]
    pub fn new(fingerprint: Fingerprint, mut paths: Vec<PathBuf>) -> Self {
        paths.sort();
        Self { fingerprint, paths }
    }

    /// Number of files in this group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Check if this group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Copies beyond the first.
    #[must_use]
    pub fn duplicate_count(&self) -> usize {
        self.paths.len().saturating_sub(1)
    }

    /// Whether `path` is a member.
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.paths.iter().any(|p| p == path)
    }

    /// Drop `path` from the group, e.g. after the caller deleted it.
    /// Returns whether it was a member.
    pub fn remove(&mut self, path: &Path) -> bool {
        match self.paths.iter().position(|p| p == path) {
            Some(idx) => {
                self.paths.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Whether the group still holds at least two files.
    #[must_use]
    pub fn has_duplicates(&self) -> bool {
        self.paths.len() > 1
    }
}

#[derive(Debug, Default)]
struct Inner {
    map: HashMap<Fingerprint, Vec<PathBuf>>,
    processed: usize,
    errored: usize,
}

/// Fingerprint to paths map plus progress counters for one session.
#[derive(Debug)]
pub struct CollisionMap {
    inner: Mutex<Inner>,
    total: usize,
    processed: AtomicUsize,
    errored: AtomicUsize,
}

impl CollisionMap {
    /// Create an empty map for a scan of `total` files.
    #[must_use]
    pub fn new(total: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            total,
            processed: AtomicUsize::new(0),
            errored: AtomicUsize::new(0),
        }
    }

    /// Number of files the scan will attempt.
    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    /// Record a successfully fingerprinted file and publish progress.
    pub fn record_fingerprint(
        &self,
        path: PathBuf,
        fingerprint: Fingerprint,
        progress: Option<&dyn ProgressCallback>,
    ) -> ProgressSnapshot {
        let mut inner = self.lock();
        inner.map.entry(fingerprint).or_default().push(path);
        inner.processed += 1;
        self.publish(&inner, progress)
    }

    /// Record a file that failed to open or read and publish progress.
    pub fn record_error(&self, progress: Option<&dyn ProgressCallback>) -> ProgressSnapshot {
        let mut inner = self.lock();
        inner.errored += 1;
        self.publish(&inner, progress)
    }

    /// Current counters, read without taking the lock.
    #[must_use]
    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            processed: self.processed.load(Ordering::Acquire),
            errored: self.errored.load(Ordering::Acquire),
            total: self.total,
        }
    }

    /// Derive the collision groups. Must only be called once hashing has
    /// quiesced.
    ///
    /// A cancelled scan yields no groups. Otherwise every entry with two or
    /// more paths becomes a group; groups are ordered by their first path.
    #[must_use]
    pub fn finalize(&self, cancelled: bool) -> Vec<CollisionGroup> {
        let map = std::mem::take(&mut self.lock().map);
        if cancelled {
            return Vec::new();
        }

        let mut groups: Vec<CollisionGroup> = map
            .into_iter()
            .filter(|(_, paths)| paths.len() > 1)
            .map(|(fingerprint, paths)| CollisionGroup::new(fingerprint, paths))
            .collect();
        groups.sort_by(|a, b| a.paths.first().cmp(&b.paths.first()));
        groups
    }

    fn publish(
        &self,
        inner: &Inner,
        progress: Option<&dyn ProgressCallback>,
    ) -> ProgressSnapshot {
        self.processed.store(inner.processed, Ordering::Release);
        self.errored.store(inner.errored, Ordering::Release);
        let snapshot = ProgressSnapshot {
            processed: inner.processed,
            errored: inner.errored,
            total: self.total,
        };
        if let Some(callback) = progress {
            callback.on_progress(&snapshot);
        }
        snapshot
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A panicking hashing task cannot leave the map half-updated: every
        // mutation is a single push plus counter bump.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
