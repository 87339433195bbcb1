//! Stable hashes for seeds and request fingerprints.

use sha2::{Digest, Sha256};

/// Hex fingerprint of a JSON value: the first 16 bytes of its SHA-256.
#[must_use]
pub fn fingerprint(value: &serde_json::Value) -> String {
    let json = serde_json::to_string(value).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    let result = hasher.finalize();
    hex::encode(&result[..16])
}

/// A 64-bit seed derived from the given components.
///
/// Same components, same seed, on every platform.
#[must_use]
pub fn stable_seed(components: &[&str]) -> u64 {
    let combined = components.join(":");
    let mut hasher = Sha256::new();
    hasher.update(combined.as_bytes());
    let result = hasher.finalize();
    let mut bytes = [0_u8; 8];
    bytes.copy_from_slice(&result[..8]);
    u64::from_be_bytes(bytes)
}
