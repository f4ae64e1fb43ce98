//! # deep-fingerprint
//!
//! Deterministic structural fingerprinting of nested, possibly cyclic value
//! graphs.
//!
//! The engine answers one question:
//!
//! > Do two values have the same structure and content, regardless of how
//! > their containers were populated, even when they reference themselves?
//!
//! ## Core Contract
//!
//! 1. Classify a value graph into scalars, mappings, sequences, sets and
//!    records, and walk it into a navigable tree of comparison levels
//! 2. Compute a canonical aggregate digest bottom-up: order-stable,
//!    cycle-safe, numerically tolerant, repetition-aware
//! 3. Expose the finished tree directly (tree view) and as a flat
//!    identity → text-encoding mapping (flat view)
//!
//! ## Architecture
//!
//! ```text
//! ValueGraph → classify → DeepHash engine → HashTree (levels + branches)
//!                  ↓                             ↓
//!             Ancestry (cycle cuts)      tree view / FlatView
//! ```
//!
//! ## Determinism Guarantees
//!
//! - Same value content + same config → identical digest, across processes
//! - Mapping/set insertion order never reaches the hash (canonical child
//!   ordering)
//! - Cycles terminate: a back-edge ends its branch and contributes nothing
//! - All memoization is write-once per node and mode
//!
//! This is a structural identity, not a cryptographic commitment, and it
//! performs no I/O of any kind.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ancestry;
pub mod classify;
pub mod config;
pub mod digest;
pub mod engine;
pub mod model;
pub mod value;
pub mod view;

// Re-exports
pub use ancestry::Ancestry;
pub use classify::{classify, Class, ContainerKind};
pub use config::{ConfigError, HashConfig, HashConfigBuilder, DEFAULT_ROOT_NAME};
pub use digest::{default_hasher, sha256_hasher, sha256_hex, xxh64_hex, Digest, DigestFn};
pub use engine::DeepHash;
pub use model::hash_level::{HashLevel, HashTree};
pub use model::relationship::{ChildRelationship, ParamHash, RelParam, UNREPRESENTABLE};
pub use model::{LevelId, PathMode, Status};
pub use value::{GraphError, Scalar, Value, ValueGraph, ValueId};
pub use view::FlatView;

/// Version of the fingerprint algorithm.
/// Increment on any change that alters produced digests.
pub const FINGERPRINT_ALGORITHM_VERSION: &str = "1.0.0";
