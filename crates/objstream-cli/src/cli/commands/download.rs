//! `objstream download <bucket> <object>`: resumable object download to a file.

use anyhow::{Context, Result};
use objstream_core::checksum::{self, Crc32cValue};
use objstream_core::config::ObjstreamConfig;
use objstream_core::reader::{ReadProgress, ResumableReadChannel};
use objstream_core::request::{ByteRangeSpec, EncryptionKey, ObjectRef, ReadOptions, ReadRequest};
use objstream_core::retry::RetryPolicy;
use objstream_core::storage::{PartFile, ResumeMarker};
use objstream_core::transport::HttpObjectOpener;
use std::io::{IoSliceMut, Write};
use std::path::{Path, PathBuf};

const READ_BUFFER_BYTES: usize = 256 * 1024;

#[derive(Debug, Clone)]
pub struct DownloadArgs {
    pub bucket: String,
    pub object: String,
    pub output: Option<PathBuf>,
    pub generation: Option<i64>,
    pub user_project: Option<String>,
    pub encryption_key: Option<String>,
    pub resume: bool,
}

struct DownloadSummary {
    path: PathBuf,
    generation: Option<i64>,
    resumed_from: u64,
    crc32c: Crc32cValue,
}

pub async fn run_download(cfg: &ObjstreamConfig, args: DownloadArgs) -> Result<()> {
    let cfg = cfg.clone();
    let summary = tokio::task::spawn_blocking(move || download(&cfg, &args))
        .await
        .context("download task join")??;

    if summary.resumed_from > 0 {
        println!("Resumed at byte {}", summary.resumed_from);
    }
    let generation = summary
        .generation
        .map_or_else(|| "-".to_string(), |g| g.to_string());
    println!(
        "{}  {} bytes  generation {}  crc32c {}",
        summary.path.display(),
        summary.crc32c.length(),
        generation,
        summary.crc32c.to_base64()
    );
    Ok(())
}

/// Default destination: the last `/`-separated component of the object name.
pub(super) fn default_output(object: &str) -> Result<PathBuf> {
    match object.rsplit('/').next() {
        Some(name) if !name.is_empty() && name != "." && name != ".." => Ok(PathBuf::from(name)),
        _ => anyhow::bail!("cannot derive a file name from object {:?}; pass --output", object),
    }
}

/// Open the part file and settle which generation a resumed read must stay on.
fn prepare_part(final_path: &Path, object: &mut ObjectRef, resume: bool) -> Result<PartFile> {
    if !resume {
        return PartFile::create(final_path);
    }
    match ResumeMarker::load(final_path)? {
        Some(marker) if marker.matches(object) => {
            if object.generation.is_none() {
                object.generation = marker.object.generation;
            }
            PartFile::resume(final_path)
        }
        Some(marker) => anyhow::bail!(
            "{} holds a partial download of {}, not {}",
            final_path.display(),
            marker.object,
            object
        ),
        None => {
            tracing::warn!(
                path = %final_path.display(),
                "no resume marker, starting over"
            );
            PartFile::create(final_path)
        }
    }
}

fn download(cfg: &ObjstreamConfig, args: &DownloadArgs) -> Result<DownloadSummary> {
    let final_path = match &args.output {
        Some(p) => p.clone(),
        None => default_output(&args.object)?,
    };
    let mut object = ObjectRef::new(&args.bucket, &args.object);
    if let Some(g) = args.generation {
        object = object.with_generation(g);
    }

    let mut part = prepare_part(&final_path, &mut object, args.resume)?;
    let resumed_from = part.len();

    let options = ReadOptions {
        user_project: args.user_project.clone(),
        encryption_key: args.encryption_key.clone().map(EncryptionKey::from_base64),
        ..ReadOptions::default()
    };
    let request = ReadRequest::new(object, options, ByteRangeSpec::from_offset(resumed_from));
    tracing::info!(%request, path = %final_path.display(), "starting download");

    let opener = HttpObjectOpener::from_config(cfg)?;
    let policy = RetryPolicy::from(&cfg.retry_or_default());
    let mut channel = ResumableReadChannel::new(request, opener, policy);

    let mut buf = vec![0u8; READ_BUFFER_BYTES];
    loop {
        let outcome = channel
            .read(&mut [IoSliceMut::new(&mut buf)])
            .with_context(|| format!("download {}", channel.request().object()))?;
        if let Some(resolved) = &outcome.resolved {
            ResumeMarker::new(resolved.clone()).save(&final_path)?;
        }
        match outcome.progress {
            ReadProgress::Read(n) => part
                .write_all(&buf[..n])
                .with_context(|| format!("write {}", part.temp_path().display()))?,
            ReadProgress::EndOfStream => break,
        }
    }

    part.sync()?;
    part.finalize(&final_path)?;
    let crc32c = checksum::crc32c_path(&final_path)?;
    tracing::info!(
        path = %final_path.display(),
        bytes = crc32c.length(),
        generation = ?channel.resolved_generation(),
        "download complete"
    );

    Ok(DownloadSummary {
        path: final_path,
        generation: channel.resolved_generation(),
        resumed_from,
        crc32c,
    })
}
