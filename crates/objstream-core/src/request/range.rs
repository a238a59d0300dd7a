//! Byte range of a read and its HTTP `Range` form.

use std::fmt;

/// Half-open byte range `[begin_offset, end_offset)`; an absent end reads to
/// the end of the object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ByteRangeSpec {
    begin_offset: u64,
    end_offset: Option<u64>,
}

impl ByteRangeSpec {
    /// The whole object.
    pub fn all() -> Self {
        Self::default()
    }

    /// From `begin_offset` to the end of the object.
    pub fn from_offset(begin_offset: u64) -> Self {
        Self {
            begin_offset,
            end_offset: None,
        }
    }

    /// `[begin_offset, end_offset)`. An end before the begin is clamped to an empty range.
    pub fn bounded(begin_offset: u64, end_offset: u64) -> Self {
        Self {
            begin_offset,
            end_offset: Some(end_offset.max(begin_offset)),
        }
    }

    pub fn begin_offset(&self) -> u64 {
        self.begin_offset
    }

    /// Exclusive end, if bounded.
    pub fn end_offset(&self) -> Option<u64> {
        self.end_offset
    }

    /// True when a bounded range has no bytes left.
    pub fn is_empty(&self) -> bool {
        matches!(self.end_offset, Some(end) if end <= self.begin_offset)
    }

    /// Same end, new begin. A begin past a bounded end leaves an empty range.
    pub fn with_new_begin_offset(&self, begin_offset: u64) -> Self {
        match self.end_offset {
            Some(end) => Self::bounded(begin_offset.min(end), end),
            None => Self::from_offset(begin_offset),
        }
    }

    /// HTTP `Range` header value (inclusive end): `bytes=N-` or `bytes=N-M`.
    ///
    /// `None` for a whole-object read, where no header is sent. Empty ranges
    /// have no header form either; they never reach a transport.
    pub fn http_range_header(&self) -> Option<String> {
        match self.end_offset {
            None if self.begin_offset == 0 => None,
            None => Some(format!("bytes={}-", self.begin_offset)),
            Some(_) if self.is_empty() => None,
            Some(end) => Some(format!("bytes={}-{}", self.begin_offset, end - 1)),
        }
    }
}

impl fmt::Display for ByteRangeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end_offset {
            None => write!(f, "bytes={}-", self.begin_offset),
            Some(end) => write!(f, "bytes={}-{}", self.begin_offset, end),
        }
    }
}
