//! Read request descriptor: which object, which options, which bytes.
//!
//! Descriptors are immutable. Resuming a read derives a new descriptor with a
//! later begin offset via [`ReadRequest::with_new_begin_offset`].

mod object;
mod options;
mod range;

pub use object::ObjectRef;
pub use options::{EncryptionKey, ReadOptions};
pub use range::ByteRangeSpec;

use std::borrow::Cow;
use std::fmt;

/// One logical download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadRequest {
    object: ObjectRef,
    options: ReadOptions,
    range: ByteRangeSpec,
}

impl ReadRequest {
    pub fn new(object: ObjectRef, options: ReadOptions, range: ByteRangeSpec) -> Self {
        Self {
            object,
            options,
            range,
        }
    }

    /// Whole-object read with default options.
    pub fn for_object(object: ObjectRef) -> Self {
        Self::new(object, ReadOptions::default(), ByteRangeSpec::all())
    }

    pub fn object(&self) -> &ObjectRef {
        &self.object
    }

    pub fn options(&self) -> &ReadOptions {
        &self.options
    }

    pub fn range(&self) -> &ByteRangeSpec {
        &self.range
    }

    /// Descriptor reading from `begin_offset` onward. Borrows `self` when the
    /// offset is unchanged.
    pub fn with_new_begin_offset(&self, begin_offset: u64) -> Cow<'_, ReadRequest> {
        if begin_offset == self.range.begin_offset() {
            Cow::Borrowed(self)
        } else {
            Cow::Owned(Self {
                object: self.object.clone(),
                options: self.options.clone(),
                range: self.range.with_new_begin_offset(begin_offset),
            })
        }
    }

    /// JSON form of the target object. Computed on every call.
    pub fn object_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.object)
    }
}

impl fmt::Display for ReadRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.object, self.range)
    }
}
