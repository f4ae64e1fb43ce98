//! The shared comparison-tree model.
//!
//! A fingerprint computation produces a tree of [`hash_level::HashLevel`]
//! nodes, one per visited point in the value's structure. Nodes live in an
//! arena ([`hash_level::HashTree`]) and reference each other by [`LevelId`];
//! cyclic values therefore never translate into ownership cycles, and
//! copying or branching a chain is plain index bookkeeping.

pub mod hash_level;
pub mod level;
pub mod relationship;

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a level inside a [`hash_level::HashTree`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct LevelId(u32);

impl LevelId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index as u32)
    }

    /// Position of this level in its arena.
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for LevelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Per-node processing outcome. Everything except `Ok` is a normal,
/// reportable condition, never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    /// Hashed normally.
    Ok,
    /// Matched an exclusion rule; contributes nothing to any hash.
    Skipped,
    /// Could not be classified; contributes an empty string but keeps its
    /// position among siblings.
    Unprocessed,
    /// A sibling branch whose child duplicates an earlier sibling's child.
    /// Only assigned when repetition is ignored.
    Repetition,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Ok => write!(f, "Ok"),
            Status::Skipped => write!(f, "Skipped"),
            Status::Unprocessed => write!(f, "Unprocessed"),
            Status::Repetition => write!(f, "Repetition"),
        }
    }
}

/// How strictly a path string is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathMode {
    /// Only literal-round-trippable fragments render; any unrepresentable
    /// fragment makes the whole path unavailable.
    Strict,
    /// Unrepresentable fragments are replaced by an `(unrepresentable)`
    /// marker so a path always renders.
    Readable,
    /// Like `Readable`, but non-subscriptable sequences pretend to be
    /// subscriptable for readability.
    Relaxed,
}

impl PathMode {
    pub(crate) fn slot(self) -> usize {
        match self {
            PathMode::Strict => 0,
            PathMode::Readable => 1,
            PathMode::Relaxed => 2,
        }
    }
}
