//! Per-request options: preconditions, billing project, encryption key.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha2::{Digest, Sha256};
use std::fmt;

/// Options applied to every (re)open of a read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadOptions {
    pub if_generation_match: Option<i64>,
    pub if_generation_not_match: Option<i64>,
    pub if_metageneration_match: Option<i64>,
    pub if_metageneration_not_match: Option<i64>,
    /// Project billed for the request (requester-pays buckets).
    pub user_project: Option<String>,
    /// Customer-supplied AES-256 key.
    pub encryption_key: Option<EncryptionKey>,
}

/// Base64-encoded customer-supplied AES-256 key. `Debug` never prints the key.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptionKey(String);

impl EncryptionKey {
    pub fn from_base64(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_base64(&self) -> &str {
        &self.0
    }

    /// Base64 SHA-256 of the raw key bytes, sent alongside the key so the
    /// service can check it arrived intact.
    pub fn sha256_base64(&self) -> Result<String, base64::DecodeError> {
        let raw = STANDARD.decode(&self.0)?;
        Ok(STANDARD.encode(Sha256::digest(&raw)))
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EncryptionKey(<redacted>)")
    }
}
