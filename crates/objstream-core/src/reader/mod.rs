//! Resumable streaming reads.
//!
//! [`ResumableReadChannel`] turns a series of ranged reads into one logical
//! byte stream. When the transport fails mid-body the broken stream is
//! dropped and a new one is opened at the next unread offset, pinned to the
//! generation seen on the first response, for as long as the injected
//! [`RetryAlgorithm`] allows.

mod error;
mod opener;

pub use error::{ReadError, ResumptionReason, TransportError};
pub use opener::{ObjectOpener, OpenedObject};

use crate::request::{ObjectRef, ReadRequest};
use crate::retry::{self, RetryAlgorithm, RetryCandidate, RetryDecision};
use std::io::{self, IoSliceMut, Read};
use std::time::Duration;

/// How far one [`ResumableReadChannel::read`] got.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadProgress {
    /// Bytes written into the destination buffers.
    Read(usize),
    /// The object has been fully read; the channel is now closed.
    EndOfStream,
}

/// Result of one read call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOutcome {
    pub progress: ReadProgress,
    /// Set exactly once per channel: the object pinned to the generation
    /// resolved from the first successful response.
    pub resolved: Option<ObjectRef>,
}

impl ReadOutcome {
    /// Bytes read, or `None` at end of stream.
    pub fn bytes_read(&self) -> Option<usize> {
        match self.progress {
            ReadProgress::Read(n) => Some(n),
            ReadProgress::EndOfStream => None,
        }
    }

    pub fn is_end_of_stream(&self) -> bool {
        self.progress == ReadProgress::EndOfStream
    }
}

/// Why one open-or-read attempt failed.
enum Attempt {
    Transport(TransportError),
    Resumption(ResumptionReason),
}

/// A single logical read of one object generation, surviving transport failures.
///
/// Not thread-safe; one caller drives it. Reads block for network I/O and for
/// any backoff the retry algorithm asks for.
pub struct ResumableReadChannel<O: ObjectOpener, R> {
    request: ReadRequest,
    opener: O,
    retry: R,
    position: u64,
    stream: Option<O::Stream>,
    open: bool,
    resolved_generation: Option<i64>,
    unreported: Option<ObjectRef>,
    resumption_failure: Option<ResumptionReason>,
    failures: u32,
}

impl<O, R> ResumableReadChannel<O, R>
where
    O: ObjectOpener,
    R: RetryAlgorithm,
{
    /// Channel starting at the request's begin offset. Nothing is opened until
    /// the first read.
    pub fn new(request: ReadRequest, opener: O, retry: R) -> Self {
        let position = request.range().begin_offset();
        Self {
            request,
            opener,
            retry,
            position,
            stream: None,
            open: true,
            resolved_generation: None,
            unreported: None,
            resumption_failure: None,
            failures: 0,
        }
    }

    /// Read into `dsts`, reopening the underlying stream as needed.
    ///
    /// A failed call leaves the channel open with no active stream; calling
    /// `read` again starts a fresh attempt at the same position. After a
    /// resumption failure every later call fails the same way.
    pub fn read(&mut self, dsts: &mut [IoSliceMut<'_>]) -> Result<ReadOutcome, ReadError> {
        let progress = self.read_progress(dsts)?;
        Ok(ReadOutcome {
            progress,
            resolved: self.unreported.take(),
        })
    }

    /// Close the channel and drop the active stream. Idempotent.
    pub fn close(&mut self) {
        self.open = false;
        self.stream = None;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Offset of the next byte to be read.
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn resolved_generation(&self) -> Option<i64> {
        self.resolved_generation
    }

    pub fn request(&self) -> &ReadRequest {
        &self.request
    }

    /// Claim the resolution event when driving the channel through [`Read`].
    pub fn take_resolved(&mut self) -> Option<ObjectRef> {
        self.unreported.take()
    }

    fn read_progress(&mut self, dsts: &mut [IoSliceMut<'_>]) -> Result<ReadProgress, ReadError> {
        if let Some(reason) = self.resumption_failure {
            return Err(self.resumption_error(reason));
        }
        if !self.open {
            return Ok(ReadProgress::EndOfStream);
        }
        if self.range_exhausted() {
            tracing::debug!(position = self.position, "requested range fully read");
            self.close();
            return Ok(ReadProgress::EndOfStream);
        }
        if dsts.iter().all(|d| d.is_empty()) {
            return Ok(ReadProgress::Read(0));
        }

        loop {
            match self.attempt(dsts) {
                Ok(0) => {
                    self.close();
                    return Ok(ReadProgress::EndOfStream);
                }
                Ok(n) => {
                    self.position += n as u64;
                    self.failures = 0;
                    return Ok(ReadProgress::Read(n));
                }
                Err(Attempt::Resumption(reason)) => {
                    self.stream = None;
                    self.resumption_failure = Some(reason);
                    tracing::warn!(
                        object = %self.request.object(),
                        position = self.position,
                        %reason,
                        "cannot resume read"
                    );
                    return Err(self.resumption_error(reason));
                }
                Err(Attempt::Transport(e)) => self.recover(e)?,
            }
        }
    }

    /// One open-if-needed plus one read from the active stream.
    fn attempt(&mut self, dsts: &mut [IoSliceMut<'_>]) -> Result<usize, Attempt> {
        let mut stream = match self.stream.take() {
            Some(s) => s,
            None => self.open_stream()?,
        };
        let result = loop {
            match stream.read_vectored(dsts) {
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                other => break other,
            }
        };
        match result {
            Ok(n) => {
                self.stream = Some(stream);
                Ok(n)
            }
            Err(e) => Err(Attempt::Transport(TransportError::Io(e))),
        }
    }

    fn open_stream(&mut self) -> Result<O::Stream, Attempt> {
        tracing::debug!(
            object = %self.request.object(),
            position = self.position,
            generation = ?self.resolved_generation,
            "opening object stream"
        );
        let opened = {
            let request = self.request.with_new_begin_offset(self.position);
            self.opener.open(&request, self.resolved_generation)
        };
        let opened = match opened {
            Ok(opened) => opened,
            Err(e) if self.resolved_generation.is_some() && e.is_not_found() => {
                return Err(Attempt::Resumption(ResumptionReason::NotFound));
            }
            Err(e) => return Err(Attempt::Transport(e)),
        };

        match (self.resolved_generation, opened.generation) {
            (None, Some(generation)) => {
                self.resolved_generation = Some(generation);
                let object = self.request.object().clone().with_generation(generation);
                tracing::info!(%object, "resolved object generation");
                self.unreported = Some(object);
            }
            (Some(pinned), Some(observed)) if pinned != observed => {
                return Err(Attempt::Resumption(ResumptionReason::GenerationChanged {
                    observed,
                }));
            }
            _ => {}
        }
        Ok(opened.stream)
    }

    /// Decide whether to go around again after a failed attempt. `Ok(())`
    /// means retry; the broken stream has already been dropped.
    fn recover(&mut self, error: TransportError) -> Result<(), ReadError> {
        self.stream = None;
        self.failures = self.failures.saturating_add(1);
        let attempt = self.failures;

        if let RetryDecision::RetryAfter(delay) =
            self.retry.should_retry(attempt, RetryCandidate::Raw(&error))
        {
            self.log_retry(attempt, &error, delay);
            backoff(delay);
            return Ok(());
        }

        let translated = retry::translate(error);
        if !matches!(translated, ReadError::Transport { .. }) {
            return Err(translated);
        }
        match self
            .retry
            .should_retry(attempt, RetryCandidate::Translated(&translated))
        {
            RetryDecision::RetryAfter(delay) => {
                self.log_retry(attempt, &translated, delay);
                backoff(delay);
                Ok(())
            }
            RetryDecision::NoRetry => Err(translated),
        }
    }

    fn log_retry(&self, attempt: u32, error: &dyn std::error::Error, delay: Duration) {
        tracing::warn!(
            object = %self.request.object(),
            position = self.position,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "read failed, reopening"
        );
    }

    fn range_exhausted(&self) -> bool {
        matches!(self.request.range().end_offset(), Some(end) if self.position >= end)
    }

    fn resumption_error(&self, reason: ResumptionReason) -> ReadError {
        let mut object = self.request.object().clone();
        if let Some(generation) = self.resolved_generation {
            object.generation = Some(generation);
        }
        ReadError::Resumption { object, reason }
    }
}

fn backoff(delay: Duration) {
    if !delay.is_zero() {
        std::thread::sleep(delay);
    }
}

/// Byte-stream view for `std::io` consumers. End of stream reads as `Ok(0)`
/// and failures arrive as `io::Error` wrapping the [`ReadError`]; the
/// resolution event stays available through
/// [`ResumableReadChannel::take_resolved`].
impl<O, R> Read for ResumableReadChannel<O, R>
where
    O: ObjectOpener,
    R: RetryAlgorithm,
{
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Read::read_vectored(self, &mut [IoSliceMut::new(buf)])
    }

    fn read_vectored(&mut self, bufs: &mut [IoSliceMut<'_>]) -> io::Result<usize> {
        match self.read_progress(bufs) {
            Ok(ReadProgress::Read(n)) => Ok(n),
            Ok(ReadProgress::EndOfStream) => Ok(0),
            Err(e) => Err(io::Error::other(e)),
        }
    }
}
