//! Digest functions for the fingerprint engine.
//!
//! The engine treats the hash function as an opaque `bytes -> hex string`
//! mapping so callers can plug in their own. The default is xxh64 rendered
//! as fixed-width hex; a SHA-256 variant is provided for callers who want a
//! longer digest. Neither is a cryptographic commitment: the fingerprint is
//! a structural identity, not a security primitive.

use std::sync::Arc;

use sha2::{Digest as _, Sha256};
use xxhash_rust::xxh64::xxh64;

/// A computed digest, always lowercase hex.
pub type Digest = String;

/// Pluggable digest function: bytes in, hex string out.
pub type DigestFn = Arc<dyn Fn(&[u8]) -> Digest + Send + Sync>;

/// Compute the default xxh64 digest of a byte slice.
pub fn xxh64_hex(bytes: &[u8]) -> Digest {
    format!("{:016x}", xxh64(bytes, 0))
}

/// Compute a SHA-256 digest of a byte slice.
pub fn sha256_hex(bytes: &[u8]) -> Digest {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// The default digest function.
pub fn default_hasher() -> DigestFn {
    Arc::new(xxh64_hex)
}

/// The SHA-256 digest function, boxed for use in a config.
pub fn sha256_hasher() -> DigestFn {
    Arc::new(sha256_hex)
}
