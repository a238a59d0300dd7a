//! CLI for objstream.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use objstream_core::config;
use std::path::PathBuf;

use commands::{run_checksum, run_download, run_segment, DownloadArgs, SegmentArgs};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "objstream")]
#[command(about = "objstream: resumable object downloads and CRC32C chunk segmentation", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download one object, resuming across transport failures.
    Download {
        bucket: String,
        /// Object name (may contain `/`).
        object: String,

        /// Destination file (default: last path component of the object name).
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Read exactly this generation instead of the live one.
        #[arg(long, value_name = "G")]
        generation: Option<i64>,

        /// Project to bill for requester-pays buckets.
        #[arg(long, value_name = "P")]
        user_project: Option<String>,

        /// Base64 customer-supplied AES-256 key.
        #[arg(long, value_name = "K")]
        encryption_key: Option<String>,

        /// Continue an interrupted download from its `.part` file.
        #[arg(long)]
        resume: bool,
    },

    /// Split a file into checksummed upload segments and print them.
    Segment {
        path: PathBuf,

        /// Upper bound on one segment's payload (default from config).
        #[arg(long, value_name = "N")]
        max_segment_size: Option<usize>,

        /// Size of the buffers the file is read into.
        #[arg(long, value_name = "N", default_value = "65536")]
        buffer_size: usize,

        /// Skip CRC32C computation.
        #[arg(long)]
        no_crc32c: bool,
    },

    /// Compute the CRC32C of a file.
    Checksum {
        /// Path to the file.
        path: PathBuf,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Download {
                bucket,
                object,
                output,
                generation,
                user_project,
                encryption_key,
                resume,
            } => {
                let args = DownloadArgs {
                    bucket,
                    object,
                    output,
                    generation,
                    user_project,
                    encryption_key,
                    resume,
                };
                run_download(&cfg, args).await?;
            }
            CliCommand::Segment {
                path,
                max_segment_size,
                buffer_size,
                no_crc32c,
            } => {
                let args = SegmentArgs {
                    path,
                    max_segment_size,
                    buffer_size,
                    crc32c: !no_crc32c,
                };
                run_segment(&cfg, args).await?;
            }
            CliCommand::Checksum { path } => run_checksum(&path).await?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
