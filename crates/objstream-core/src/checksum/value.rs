//! Length-known CRC32C value.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;

/// CRC32C over a byte range of known length.
///
/// Values are immutable; [`Crc32cValue::concat`] always returns a new value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Crc32cValue {
    value: u32,
    length: u64,
}

impl Crc32cValue {
    /// Checksum of the empty range.
    pub const EMPTY: Crc32cValue = Crc32cValue { value: 0, length: 0 };

    /// Wrap an already computed CRC32C covering `length` bytes.
    pub fn new(value: u32, length: u64) -> Self {
        Self { value, length }
    }

    /// Compute the CRC32C of `data`.
    pub fn of(data: &[u8]) -> Self {
        Self {
            value: crc32c::crc32c(data),
            length: data.len() as u64,
        }
    }

    /// Raw 32-bit checksum.
    pub fn value(&self) -> u32 {
        self.value
    }

    /// Number of bytes covered.
    pub fn length(&self) -> u64 {
        self.length
    }

    /// Extend this checksum with more bytes that directly follow the covered range.
    pub fn append(&self, data: &[u8]) -> Self {
        Self {
            value: crc32c::crc32c_append(self.value, data),
            length: self.length + data.len() as u64,
        }
    }

    /// Checksum of `self ‖ other`, where `other` covers the bytes immediately
    /// following the range of `self`. Neither range is re-read.
    pub fn concat(&self, other: &Crc32cValue) -> Self {
        if other.length == 0 {
            return *self;
        }
        if self.length == 0 {
            return *other;
        }
        Self {
            value: crc32c::crc32c_combine(self.value, other.value, other.length as usize),
            length: self.length + other.length,
        }
    }

    /// Base64 of the big-endian value, as carried in object metadata and
    /// `x-goog-hash` headers.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.value.to_be_bytes())
    }

    /// Lowercase hex of the big-endian value.
    pub fn to_hex(&self) -> String {
        hex::encode(self.value.to_be_bytes())
    }
}

impl fmt::Display for Crc32cValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "crc32c={} ({} bytes)", self.to_base64(), self.length)
    }
}
