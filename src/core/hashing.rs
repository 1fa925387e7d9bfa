//! SHA-256 helpers shared by the audit trail and the threshold router

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Prefix carried by every stored digest
pub const HASH_PREFIX: &str = "sha256:";

/// SHA-256 helper
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Lowercase hex
pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// `sha256:<hex>` of the JSON serialization of `value`
pub fn prefixed_json_hash<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    let bytes = serde_json::to_vec(value)?;
    Ok(format!("{}{}", HASH_PREFIX, to_hex(&sha256(&bytes))))
}

/// Deterministic bucket in `0..buckets` for `"<a>:<b>"`.
///
/// First 8 hex chars of the digest read as a u32, then reduced. Same inputs
/// give the same bucket in every process.
///
/// Buckets are SHA-256 based and do not match md5-based routers. Services
/// sharing an experiment must all route through this function, and switching
/// the digest reshuffles every running experiment.
pub fn sticky_bucket(a: &str, b: &str, buckets: u32) -> u32 {
    let digest = sha256(format!("{}:{}", a, b).as_bytes());
    let head = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
    head % buckets.max(1)
}
