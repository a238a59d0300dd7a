//! `objstream segment <path>`: show how a file would be cut into upload segments.

use anyhow::{Context, Result};
use bytes::Bytes;
use objstream_core::checksum::{Crc32cHasher, Hasher, NoopHasher};
use objstream_core::config::ObjstreamConfig;
use objstream_core::segmenter::{ChunkSegment, ChunkSegmenter};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct SegmentArgs {
    pub path: PathBuf,
    pub max_segment_size: Option<usize>,
    pub buffer_size: usize,
    pub crc32c: bool,
}

pub async fn run_segment(cfg: &ObjstreamConfig, args: SegmentArgs) -> Result<()> {
    let cfg = cfg.clone();
    let segments = tokio::task::spawn_blocking(move || segment_file(&cfg, &args))
        .await
        .context("segment task join")??;
    print_segments(&segments);
    Ok(())
}

/// Read `path` into buffers of `buffer_size` bytes.
fn read_buffers(path: &Path, buffer_size: usize) -> Result<Vec<Bytes>> {
    let mut file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut buffers = Vec::new();
    loop {
        let mut chunk = Vec::with_capacity(buffer_size);
        let n = (&mut file)
            .take(buffer_size as u64)
            .read_to_end(&mut chunk)
            .with_context(|| format!("failed to read {}", path.display()))?;
        if n == 0 {
            break;
        }
        buffers.push(Bytes::from(chunk));
    }
    Ok(buffers)
}

fn segment_file(cfg: &ObjstreamConfig, args: &SegmentArgs) -> Result<Vec<ChunkSegment>> {
    if args.buffer_size == 0 {
        anyhow::bail!("--buffer-size must be greater than zero");
    }
    let max_segment_size = args.max_segment_size.unwrap_or(cfg.max_segment_size);
    if max_segment_size == 0 {
        anyhow::bail!("--max-segment-size must be greater than zero");
    }
    let hasher: Arc<dyn Hasher> = if args.crc32c && cfg.crc32c {
        Arc::new(Crc32cHasher)
    } else {
        Arc::new(NoopHasher)
    };
    let segmenter = ChunkSegmenter::with_block_size(hasher, max_segment_size, cfg.block_size);

    let mut buffers = read_buffers(&args.path, args.buffer_size)?;
    let segments = segmenter.segment_buffers(&mut buffers);
    tracing::debug!(
        path = %args.path.display(),
        buffers = buffers.len(),
        segments = segments.len(),
        "segmented file"
    );
    Ok(segments)
}

fn print_segments(segments: &[ChunkSegment]) {
    println!(
        "  {:>6}  {:>12}  {:>12}  {:>8}",
        "Index", "Offset", "Length", "CRC32C"
    );
    let mut offset = 0u64;
    for (i, s) in segments.iter().enumerate() {
        let crc = s.crc32c().map_or_else(|| "-".to_string(), |c| c.to_base64());
        let aligned = if s.is_aligned_to_block() { "" } else { "  (unaligned)" };
        println!("  {:>6}  {:>12}  {:>12}  {:>8}{}", i, offset, s.len(), crc, aligned);
        offset += s.len() as u64;
    }
    println!("{} segments, {} bytes", segments.len(), offset);
}
