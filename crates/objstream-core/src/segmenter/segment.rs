//! A single bounded-size, checksummed segment.

use crate::checksum::{Crc32cValue, Hasher};
use bytes::{Bytes, BytesMut};

/// One wire unit cut from a chunk.
///
/// The bytes are kept as reference-counted slices of the caller's buffers, so
/// building a segment that spans several input buffers never copies payload.
/// [`ChunkSegment::to_bytes`] produces the contiguous form when needed.
#[derive(Debug, Clone)]
pub struct ChunkSegment {
    parts: Vec<Bytes>,
    len: usize,
    crc32c: Option<Crc32cValue>,
    aligned_to_block: bool,
}

impl ChunkSegment {
    pub(super) fn new(slice: Bytes, crc32c: Option<Crc32cValue>, block_size: usize) -> Self {
        let len = slice.len();
        Self {
            parts: vec![slice],
            len,
            crc32c,
            aligned_to_block: len % block_size == 0,
        }
    }

    /// Segment holding `self` followed by `other`. The checksum is the combine
    /// of both checksums; it is absent unless both halves carry one.
    pub(super) fn concat(mut self, other: ChunkSegment, hasher: &dyn Hasher, block_size: usize) -> Self {
        self.crc32c = match (&self.crc32c, &other.crc32c) {
            (Some(a), Some(b)) => hasher.combine(a, b),
            _ => None,
        };
        self.parts.extend(other.parts);
        self.len += other.len;
        self.aligned_to_block = self.len % block_size == 0;
        self
    }

    /// Number of payload bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// CRC32C over exactly this segment's bytes, if hashing was enabled.
    pub fn crc32c(&self) -> Option<Crc32cValue> {
        self.crc32c
    }

    /// True when the length is a whole number of blocks.
    pub fn is_aligned_to_block(&self) -> bool {
        self.aligned_to_block
    }

    /// The input slices backing this segment, in byte order.
    pub fn parts(&self) -> &[Bytes] {
        &self.parts
    }

    /// Contiguous payload. Zero-copy when the segment came from a single input slice.
    pub fn to_bytes(&self) -> Bytes {
        if let [only] = self.parts.as_slice() {
            return only.clone();
        }
        let mut out = BytesMut::with_capacity(self.len);
        for part in &self.parts {
            out.extend_from_slice(part);
        }
        out.freeze()
    }
}
