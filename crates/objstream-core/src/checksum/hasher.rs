//! Pluggable hashing for the segmenter.

use super::Crc32cValue;

/// Produces length-known checksums over byte ranges.
///
/// Implementations that disable hashing return `None` from both methods; the
/// segmenter then leaves every segment without a checksum.
pub trait Hasher: Send + Sync {
    /// Checksum of exactly `data`.
    fn hash(&self, data: &[u8]) -> Option<Crc32cValue>;

    /// Checksum of `first ‖ second` where `second` directly follows `first`.
    fn combine(&self, first: &Crc32cValue, second: &Crc32cValue) -> Option<Crc32cValue>;
}

/// CRC32C hasher.
#[derive(Debug, Clone, Copy, Default)]
pub struct Crc32cHasher;

impl Hasher for Crc32cHasher {
    fn hash(&self, data: &[u8]) -> Option<Crc32cValue> {
        Some(Crc32cValue::of(data))
    }

    fn combine(&self, first: &Crc32cValue, second: &Crc32cValue) -> Option<Crc32cValue> {
        Some(first.concat(second))
    }
}

/// Hasher that never computes anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHasher;

impl Hasher for NoopHasher {
    fn hash(&self, _data: &[u8]) -> Option<Crc32cValue> {
        None
    }

    fn combine(&self, _first: &Crc32cValue, _second: &Crc32cValue) -> Option<Crc32cValue> {
        None
    }
}
