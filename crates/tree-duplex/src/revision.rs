//! Process-wide revision counter.
//!
//! A [`Revision`] only orders changes ("has this changed since I last
//! looked"). It is never used as an identity.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_REVISION: AtomicU64 = AtomicU64::new(1);

/// A monotonically increasing stamp, unique across the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Revision(u64);

impl Revision {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// Allocates a revision greater than every revision allocated before it.
pub fn next_revision() -> Revision {
    Revision(NEXT_REVISION.fetch_add(1, Ordering::Relaxed))
}

/// Anything that can report and change its revision.
///
/// Values that do not carry a revision (scalars) report `None`.
pub trait Revisioned {
    fn revision(&self) -> Option<Revision>;

    /// Overwrites the revision. Returns `false` if the value is not revisioned.
    fn set_revision(&self, revision: Revision) -> bool;

    /// Stamps a freshly allocated revision.
    fn bump_revision(&self) -> Option<Revision> {
        let revision = next_revision();
        self.set_revision(revision).then_some(revision)
    }
}

/// Interior-mutable revision slot.
///
/// Starts at a fresh revision; cloning allocates another one, so a copy is
/// always newer than its source.
#[derive(Debug)]
pub struct RevisionCell(AtomicU64);

impl RevisionCell {
    pub fn new() -> Self {
        Self(AtomicU64::new(next_revision().0))
    }

    pub fn with(revision: Revision) -> Self {
        Self(AtomicU64::new(revision.0))
    }

    pub fn get(&self) -> Revision {
        Revision(self.0.load(Ordering::Relaxed))
    }

    pub fn set(&self, revision: Revision) {
        self.0.store(revision.0, Ordering::Relaxed);
    }

    pub fn bump(&self) -> Revision {
        let revision = next_revision();
        self.set(revision);
        revision
    }
}

impl Default for RevisionCell {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for RevisionCell {
    fn clone(&self) -> Self {
        Self::new()
    }
}
