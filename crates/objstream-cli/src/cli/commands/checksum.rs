//! Checksum command: CRC32C of a file.

use anyhow::{Context, Result};
use objstream_core::checksum;
use std::path::Path;

/// Compute and print the CRC32C of the given file (base64 as the service reports it, then hex).
pub async fn run_checksum(path: &Path) -> Result<()> {
    let owned = path.to_path_buf();
    let value = tokio::task::spawn_blocking(move || checksum::crc32c_path(&owned))
        .await
        .context("checksum task join")??;
    println!(
        "{}  {}  {}  {}",
        value.to_base64(),
        value.to_hex(),
        value.length(),
        path.display()
    );
    Ok(())
}
