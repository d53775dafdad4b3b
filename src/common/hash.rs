//! Hashing utilities for minireg
//!
//! - SHA-256 for content addressing (two equal payloads resolve to the
//!   same content record, cluster-wide)
//! - BLAKE3 for routing message keys to journal partitions
//! - CRC32 for segment frame checksums

use sha2::{Digest, Sha256};

/// Compute SHA-256 of content bytes, return lowercase hex string.
///
/// This is the identity of a content record: a pure function of the
/// bytes, stable across nodes and restarts.
pub fn content_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Compute the journal partition for a partition key.
///
/// Equal partition keys always map to the same partition, which is what
/// gives the journal its per-entity ordering guarantee.
pub fn partition_for_key(partition_key: &str, num_partitions: u32) -> u32 {
    let hash = blake3::hash(partition_key.as_bytes());
    let hash_u64 = u64::from_le_bytes(hash.as_bytes()[0..8].try_into().unwrap());
    (hash_u64 % num_partitions as u64) as u32
}

/// CRC32 checksum for journal segment frames.
pub fn crc32(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}
