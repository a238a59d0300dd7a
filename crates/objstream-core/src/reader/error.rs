//! Failure vocabulary of the read path.

use crate::request::ObjectRef;
use crate::retry::ErrorKind;
use std::fmt;
use std::io;

/// Failure reported by a transport collaborator, before any interpretation.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Socket or stream error while opening or reading.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// The service answered with a non-success status.
    #[error("HTTP {code}: {message}")]
    Status { code: u32, message: String },
    /// libcurl failed the transfer.
    #[error(transparent)]
    Curl(#[from] curl::Error),
    /// Not a protocol failure (bad request construction, internal fault).
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// True for network/protocol failures, the ones eligible for translation.
    pub fn is_protocol(&self) -> bool {
        !matches!(self, TransportError::Other(_))
    }

    pub fn status(&self) -> Option<u32> {
        match self {
            TransportError::Status { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// Why a reopen could not continue the same object version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumptionReason {
    /// The pinned generation no longer exists.
    NotFound,
    /// The service served a different generation than the pinned one.
    GenerationChanged { observed: i64 },
}

impl fmt::Display for ResumptionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResumptionReason::NotFound => write!(f, "generation not found"),
            ResumptionReason::GenerationChanged { observed } => {
                write!(f, "service returned generation {}", observed)
            }
        }
    }
}

/// Failure surfaced by [`ResumableReadChannel`](super::ResumableReadChannel).
///
/// Exhausted retries and a policy that declined at once look the same: both
/// are `Transport` carrying the last underlying cause.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("transport failure ({kind:?}): {source}")]
    Transport {
        kind: ErrorKind,
        #[source]
        source: TransportError,
    },
    /// The object changed or vanished mid-read. Never retried.
    #[error("failure while trying to resume download of {object}: {reason}")]
    Resumption {
        object: ObjectRef,
        reason: ResumptionReason,
    },
    #[error("read failed: {source}")]
    Other {
        #[source]
        source: TransportError,
    },
}

impl ReadError {
    /// Retry classification; only transport failures can be transient.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReadError::Transport { kind, .. } => *kind,
            ReadError::Resumption { .. } | ReadError::Other { .. } => ErrorKind::Other,
        }
    }

    pub fn is_resumption(&self) -> bool {
        matches!(self, ReadError::Resumption { .. })
    }
}
