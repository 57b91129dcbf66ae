//! Root set validation.
//!
//! A [`RootSet`] holds the directories a scan will cover. No root may be an
//! ancestor or descendant of another, otherwise files under the nested root
//! would be enumerated twice.
//!
//! The overlap test is purely lexical: both paths are split on the platform
//! directory separator and the shorter component list is compared against
//! the prefix of the longer one. Nothing is normalized, so `.`/`..`,
//! symlinks, trailing separators and letter case are taken literally.
//!
//! # Example
//!
//! ```
//! use duplicut::roots::{Relation, RootError, RootSet};
//!
//! let mut roots = RootSet::new();
//! roots.add("/data/sub").unwrap();
//!
//! match roots.add("/data") {
//!     Err(RootError::Overlap { relation, .. }) => assert_eq!(relation, Relation::Contains),
//!     other => panic!("unexpected: {:?}", other),
//! }
//!
//! roots.add("/other").unwrap();
//! assert_eq!(roots.len(), 2);
//! ```

use std::fmt;
use std::path::{is_separator, Path, PathBuf};
use std::sync::Arc;

/// How a rejected candidate relates to the root it collides with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// The candidate is the existing root or lies inside it.
    Within,
    /// The candidate is an ancestor of the existing root.
    Contains,
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Within => f.write_str("is, or is a subdirectory of, an already added folder"),
            Self::Contains => f.write_str("is a parent folder of an already added folder"),
        }
    }
}

/// Errors raised when adding a root.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RootError {
    /// The candidate path was empty.
    #[error("root path must not be empty")]
    Empty,

    /// The candidate overlaps an existing root.
    #[error("{} {relation}: {}", .candidate.display(), .existing.display())]
    Overlap {
        /// Path that was rejected
        candidate: PathBuf,
        /// Root already in the set
        existing: PathBuf,
        /// Relation of `candidate` to `existing`
        relation: Relation,
    },
}

/// Ordered set of non-overlapping scan roots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RootSet {
    roots: Vec<PathBuf>,
}

impl RootSet {
    /// Create an empty root set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a root set by adding each path in order.
    ///
    /// # Errors
    ///
    /// Returns the first [`RootError`] encountered.
    pub fn from_paths<I, P>(paths: I) -> Result<Self, RootError>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut set = Self::new();
        for path in paths {
            set.add(path)?;
        }
        Ok(set)
    }

    /// Add a root after checking it against every existing root.
    ///
    /// # Errors
    ///
    /// - [`RootError::Empty`] if `candidate` is empty
    /// - [`RootError::Overlap`] if `candidate` is an ancestor or descendant
    ///   of (or equal to) an existing root
    pub fn add(&mut self, candidate: impl Into<PathBuf>) -> Result<(), RootError> {
        let candidate = candidate.into();
        if candidate.as_os_str().is_empty() {
            return Err(RootError::Empty);
        }

        for existing in &self.roots {
            if let Some(relation) = overlap(existing, &candidate) {
                log::debug!(
                    "Rejected root {} ({:?} {})",
                    candidate.display(),
                    relation,
                    existing.display()
                );
                return Err(RootError::Overlap {
                    candidate,
                    existing: existing.clone(),
                    relation,
                });
            }
        }

        log::debug!("Added root {}", candidate.display());
        self.roots.push(candidate);
        Ok(())
    }

    /// Remove `path` if present. Returns whether a root was removed.
    pub fn remove(&mut self, path: &Path) -> bool {
        match self.roots.iter().position(|r| r == path) {
            Some(idx) => {
                self.roots.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Whether `path` is one of the roots (exact match).
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.roots.iter().any(|r| r == path)
    }

    /// Iterate over the roots in addition order.
    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.roots.iter().map(PathBuf::as_path)
    }

    /// Number of roots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Immutable copy of the current roots for a scan session.
    #[must_use]
    pub fn snapshot(&self) -> Arc<[PathBuf]> {
        Arc::from(self.roots.as_slice())
    }
}

/// Lexical overlap test between an existing root and a candidate.
///
/// Returns the relation of `candidate` to `existing`, or `None` when the
/// paths are disjoint.
#[must_use]
pub fn overlap(existing: &Path, candidate: &Path) -> Option<Relation> {
    let existing_parts = split_components(existing);
    let candidate_parts = split_components(candidate);

    let (shorter, longer, relation) = if existing_parts.len() > candidate_parts.len() {
        (&candidate_parts, &existing_parts, Relation::Contains)
    } else {
        (&existing_parts, &candidate_parts, Relation::Within)
    };

    shorter
        .iter()
        .zip(longer.iter())
        .all(|(a, b)| a == b)
        .then_some(relation)
}

/// Split on separator bytes without decoding, so non-UTF-8 names stay distinct.
fn split_components(path: &Path) -> Vec<&[u8]> {
    path.as_os_str()
        .as_encoded_bytes()
        .split(|&b| b.is_ascii() && is_separator(char::from(b)))
        .collect()
}
