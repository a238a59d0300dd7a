//! Streaming CRC32C of a file on disk.

use super::Crc32cValue;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;

const BUF_SIZE: usize = 64 * 1024;

/// Compute the CRC32C of a file, reading in bounded chunks.
pub fn crc32c_path(path: &Path) -> Result<Crc32cValue> {
    let mut f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut crc = Crc32cValue::EMPTY;
    let mut buf = vec![0u8; BUF_SIZE];
    loop {
        let n = f
            .read(&mut buf)
            .with_context(|| format!("read {}", path.display()))?;
        if n == 0 {
            break;
        }
        crc = crc.append(&buf[..n]);
    }
    Ok(crc)
}
