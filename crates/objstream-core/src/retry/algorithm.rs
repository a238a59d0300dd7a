//! The retry-eligibility seam consumed by the read channel.

use super::classify::classify;
use super::policy::{RetryDecision, RetryPolicy};
use crate::reader::{ReadError, TransportError};

/// A failure offered to a [`RetryAlgorithm`].
///
/// Transport-protocol failures are offered twice: first as returned by the
/// transport, then, if declined, after translation into a [`ReadError`].
#[derive(Debug, Clone, Copy)]
pub enum RetryCandidate<'a> {
    Raw(&'a TransportError),
    Translated(&'a ReadError),
}

/// Decides whether a failed open or read should be attempted again.
///
/// `attempt` counts consecutive failures since the last successful read,
/// starting at 1. The channel itself never gives up on a retryable failure, so
/// any bound on attempts or elapsed time belongs here.
pub trait RetryAlgorithm {
    fn should_retry(&self, attempt: u32, candidate: RetryCandidate<'_>) -> RetryDecision;
}

impl<T: RetryAlgorithm + ?Sized> RetryAlgorithm for &T {
    fn should_retry(&self, attempt: u32, candidate: RetryCandidate<'_>) -> RetryDecision {
        (**self).should_retry(attempt, candidate)
    }
}

impl<T: RetryAlgorithm + ?Sized> RetryAlgorithm for Box<T> {
    fn should_retry(&self, attempt: u32, candidate: RetryCandidate<'_>) -> RetryDecision {
        (**self).should_retry(attempt, candidate)
    }
}

impl RetryAlgorithm for RetryPolicy {
    fn should_retry(&self, attempt: u32, candidate: RetryCandidate<'_>) -> RetryDecision {
        let kind = match candidate {
            RetryCandidate::Raw(e) => classify(e),
            RetryCandidate::Translated(e) => e.kind(),
        };
        self.decide(attempt, kind)
    }
}
