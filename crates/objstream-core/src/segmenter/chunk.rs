//! Segment planning over a list of input buffers.

use super::ChunkSegment;
use crate::checksum::Hasher;
use bytes::Bytes;
use std::sync::Arc;

/// Default block size used for the alignment flag (256 KiB).
pub const DEFAULT_BLOCK_SIZE: usize = 256 * 1024;

/// Where the most recent segment stands while a chunk is being consumed.
enum Tail {
    /// Nothing emitted yet, the next slice starts a segment.
    NoneOpen,
    /// The last segment has `room` bytes left before it is full.
    Open { room: usize },
    /// The last segment is full and final; the next slice starts a new one.
    Full,
}

/// Cuts chunks into segments of at most `max_segment_size` bytes.
///
/// Holds only configuration, so one instance can serve many calls (including
/// concurrent ones).
#[derive(Clone)]
pub struct ChunkSegmenter {
    hasher: Arc<dyn Hasher>,
    max_segment_size: usize,
    block_size: usize,
}

impl std::fmt::Debug for ChunkSegmenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkSegmenter")
            .field("max_segment_size", &self.max_segment_size)
            .field("block_size", &self.block_size)
            .finish_non_exhaustive()
    }
}

impl ChunkSegmenter {
    /// Segmenter with the default 256 KiB block size.
    ///
    /// # Panics
    ///
    /// Panics if `max_segment_size` is zero.
    pub fn new(hasher: Arc<dyn Hasher>, max_segment_size: usize) -> Self {
        Self::with_block_size(hasher, max_segment_size, DEFAULT_BLOCK_SIZE)
    }

    /// # Panics
    ///
    /// Panics if `max_segment_size` or `block_size` is zero.
    pub fn with_block_size(hasher: Arc<dyn Hasher>, max_segment_size: usize, block_size: usize) -> Self {
        assert!(max_segment_size > 0, "max_segment_size must be positive");
        assert!(block_size > 0, "block_size must be positive");
        Self {
            hasher,
            max_segment_size,
            block_size,
        }
    }

    pub fn hasher(&self) -> &dyn Hasher {
        self.hasher.as_ref()
    }

    pub fn max_segment_size(&self) -> usize {
        self.max_segment_size
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Segment every buffer in `buffers`. See [`ChunkSegmenter::segment_buffers_range`].
    pub fn segment_buffers(&self, buffers: &mut [Bytes]) -> Vec<ChunkSegment> {
        let len = buffers.len();
        self.segment_buffers_range(buffers, 0, len)
    }

    /// Segment `buffers[offset..offset + length]`.
    ///
    /// Consumed bytes are split off the front of each buffer, so on return every
    /// buffer in the range is empty. The payload itself is never copied or
    /// mutated, and every byte is hashed exactly once.
    ///
    /// # Panics
    ///
    /// Panics if `offset + length` exceeds `buffers.len()`.
    pub fn segment_buffers_range(
        &self,
        buffers: &mut [Bytes],
        offset: usize,
        length: usize,
    ) -> Vec<ChunkSegment> {
        let mut segments: Vec<ChunkSegment> = Vec::new();

        for buffer in &mut buffers[offset..offset + length] {
            while !buffer.is_empty() {
                match self.tail(&segments) {
                    Tail::NoneOpen | Tail::Full => {
                        let limit = buffer.len().min(self.max_segment_size);
                        segments.push(self.new_segment(buffer, limit));
                    }
                    Tail::Open { room } => {
                        let limit = buffer.len().min(room);
                        let datum = self.new_segment(buffer, limit);
                        // The open segment is moved out and back so its parts are extended in place.
                        if let Some(open) = segments.pop() {
                            segments.push(open.concat(datum, self.hasher.as_ref(), self.block_size));
                        }
                    }
                }
            }
        }

        tracing::trace!(
            segments = segments.len(),
            max_segment_size = self.max_segment_size,
            "segmented chunk"
        );
        segments
    }

    fn tail(&self, segments: &[ChunkSegment]) -> Tail {
        match segments.last() {
            None => Tail::NoneOpen,
            Some(s) if s.len() >= self.max_segment_size => Tail::Full,
            Some(s) => Tail::Open {
                room: self.max_segment_size - s.len(),
            },
        }
    }

    /// Split `limit` bytes off the front of `buffer` and hash just those bytes.
    fn new_segment(&self, buffer: &mut Bytes, limit: usize) -> ChunkSegment {
        let slice = buffer.split_to(limit);
        let crc32c = self.hasher.hash(&slice);
        ChunkSegment::new(slice, crc32c, self.block_size)
    }
}
