//! Download destination lifecycle.
//!
//! Bytes land in a `.part` file next to the destination and are renamed into
//! place once the read completes. A JSON marker beside the part file records
//! which object generation the partial bytes came from, so a resumed download
//! continues the same generation or not at all.

mod marker;
mod part;

pub use marker::ResumeMarker;
pub use part::PartFile;

use std::path::{Path, PathBuf};

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Suffix of the resume marker, appended to the final path.
pub const MARKER_SUFFIX: &str = ".part.json";

fn with_suffix(final_path: &Path, suffix: &str) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(suffix);
    PathBuf::from(o)
}

/// Path for the temp file: appends `.part` to the final path (e.g. `file.iso` → `file.iso.part`).
pub fn temp_path(final_path: &Path) -> PathBuf {
    with_suffix(final_path, TEMP_SUFFIX)
}

/// Path for the resume marker (e.g. `file.iso` → `file.iso.part.json`).
pub fn marker_path(final_path: &Path) -> PathBuf {
    with_suffix(final_path, MARKER_SUFFIX)
}
