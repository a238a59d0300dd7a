//! Resume marker: which object generation a `.part` file belongs to.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

use super::marker_path;
use crate::request::ObjectRef;

/// Stored next to a part file once the read has resolved its generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeMarker {
    pub object: ObjectRef,
}

impl ResumeMarker {
    pub fn new(object: ObjectRef) -> Self {
        Self { object }
    }

    /// Write the marker for `final_path`, replacing any existing one.
    pub fn save(&self, final_path: &Path) -> Result<()> {
        let path = marker_path(final_path);
        let json = serde_json::to_string_pretty(self).context("serialize resume marker")?;
        fs::write(&path, json).with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    /// Load the marker for `final_path`; `None` when there is none.
    pub fn load(final_path: &Path) -> Result<Option<Self>> {
        let path = marker_path(final_path);
        let data = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).with_context(|| format!("read {}", path.display())),
        };
        let marker =
            serde_json::from_str(&data).with_context(|| format!("parse {}", path.display()))?;
        Ok(Some(marker))
    }

    /// Whether this marker can seed a resumed read of `object`: same bucket and
    /// name, and no conflicting generation.
    pub fn matches(&self, object: &ObjectRef) -> bool {
        self.object.bucket == object.bucket
            && self.object.name == object.name
            && match (self.object.generation, object.generation) {
                (Some(a), Some(b)) => a == b,
                _ => true,
            }
    }
}
