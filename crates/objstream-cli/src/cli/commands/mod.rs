//! CLI command handlers, one file per command.

mod checksum;
mod download;
mod segment;

pub use checksum::run_checksum;
pub use download::{run_download, DownloadArgs};
pub use segment::{run_segment, SegmentArgs};
