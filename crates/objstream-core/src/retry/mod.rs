//! Retry eligibility and backoff.
//!
//! The read channel does not decide on its own whether a failure is worth
//! another attempt; it asks a [`RetryAlgorithm`]. [`RetryPolicy`] is the
//! default: it classifies failures (timeouts, throttling, connection drops,
//! 5xx) and applies capped exponential backoff.

mod algorithm;
mod classify;
mod policy;

pub use algorithm::{RetryAlgorithm, RetryCandidate};
pub use classify::{classify, classify_curl_error, classify_http_status, classify_io_error, translate};
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
