//! Chunk segmentation for uploads.
//!
//! A logical chunk (an ordered list of buffers) is cut into segments of at most
//! `max_segment_size` bytes. Each segment becomes one wire message and carries
//! the CRC32C of exactly its own bytes, built incrementally: a segment that
//! spans two input buffers combines the checksums of both halves instead of
//! hashing the first half again.
//!
//! ```text
//!    A: 3 MiB                       B: 6.6 MiB
//! |-----------------------------|-----------------------------------------------------------------|
//!   S1: 2 MiB            S2: 2 MiB           S3: 2 MiB           S4: 2 MiB           S5: 1.6 MiB
//! |-------------------|-------------------|-------------------|-------------------|---------------|
//! ```

mod chunk;
mod segment;

pub use chunk::{ChunkSegmenter, DEFAULT_BLOCK_SIZE};
pub use segment::ChunkSegment;

#[cfg(test)]
mod tests;
