//! Pull-style body stream over a push-style curl transfer.
//!
//! libcurl delivers the body through a write callback. The transfer runs on a
//! helper thread and forwards the response as [`Frame`]s over a bounded
//! channel; [`HttpBodyStream`] turns them back into [`Read`]. Dropping the
//! stream closes the channel and raises a cancel flag. The next write callback
//! aborts on the closed channel, and the progress callback aborts on the flag
//! even while the server is sending nothing.

use std::cell::{Cell, RefCell};
use std::io::{self, Read};
use std::str;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::Arc;

/// One step of a transfer, in order: `Head`, any number of `Body`, `Done`.
pub(crate) enum Frame {
    Head { status: u32, headers: Vec<String> },
    Body(Vec<u8>),
    Done(Result<(), curl::Error>),
}

/// Raises the shared cancel flag when dropped.
#[derive(Debug)]
pub(crate) struct CancelOnDrop(Arc<AtomicBool>);

impl CancelOnDrop {
    pub(crate) fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    /// Flag handed to the transfer thread.
    pub(crate) fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.0)
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

/// Run a configured transfer to completion, forwarding frames to `tx`.
/// Aborts once `cancel` is set.
pub(crate) fn run_transfer(mut easy: curl::easy::Easy, tx: SyncSender<Frame>, cancel: Arc<AtomicBool>) {
    let status = Cell::new(0u32);
    let headers = RefCell::new(Vec::new());
    let head_sent = Cell::new(false);

    let send_head = || {
        head_sent.set(true);
        tx.send(Frame::Head {
            status: status.get(),
            headers: headers.take(),
        })
        .is_ok()
    };

    let result = {
        let mut transfer = easy.transfer();
        let setup = transfer
            // libcurl calls this about once a second even when no data arrives.
            .progress_function(|_, _, _, _| !cancel.load(Ordering::Relaxed))
            .and_then(|()| transfer.header_function(|line| {
                if let Ok(line) = str::from_utf8(line) {
                    let line = line.trim_end();
                    if let Some(code) = parse_status_line(line) {
                        // A new response block (after a redirect) replaces the previous one.
                        status.set(code);
                        headers.borrow_mut().clear();
                    } else if !line.is_empty() {
                        headers.borrow_mut().push(line.to_string());
                    }
                }
                true
            }))
            .and_then(|()| {
                transfer.write_function(|data| {
                    if !head_sent.get() && !send_head() {
                        return Ok(0);
                    }
                    match tx.send(Frame::Body(data.to_vec())) {
                        Ok(()) => Ok(data.len()),
                        // Reader gone: returning short aborts the transfer.
                        Err(_) => Ok(0),
                    }
                })
            });
        match setup {
            Ok(()) => transfer.perform(),
            Err(e) => Err(e),
        }
    };

    if !head_sent.get() {
        if let Ok(code) = easy.response_code() {
            if code != 0 {
                status.set(code);
            }
        }
        if result.is_ok() && !send_head() {
            return;
        }
    }
    let _ = tx.send(Frame::Done(result));
}

/// `HTTP/1.1 206 Partial Content` -> `206`.
pub(crate) fn parse_status_line(line: &str) -> Option<u32> {
    if !line.starts_with("HTTP/") {
        return None;
    }
    line.split_whitespace().nth(1)?.parse().ok()
}

/// Value of the `x-goog-generation` response header.
pub(crate) fn parse_generation(headers: &[String]) -> Option<i64> {
    headers.iter().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        if name.trim().eq_ignore_ascii_case("x-goog-generation") {
            value.trim().parse().ok()
        } else {
            None
        }
    })
}

/// `Content-Range` response header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ContentRange {
    /// `bytes start-end/total`, inclusive `end`; the total may be `*`.
    Bytes { start: u64, end: u64 },
    /// `bytes */total`, sent with `416`.
    Unsatisfied { total: u64 },
}

/// Value of the `Content-Range` response header.
pub(crate) fn parse_content_range(headers: &[String]) -> Option<ContentRange> {
    let value = headers.iter().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        name.trim()
            .eq_ignore_ascii_case("content-range")
            .then(|| value.trim())
    })?;
    let (span, total) = value.strip_prefix("bytes ")?.trim().split_once('/')?;
    if span == "*" {
        return Some(ContentRange::Unsatisfied {
            total: total.parse().ok()?,
        });
    }
    if total != "*" {
        total.parse::<u64>().ok()?;
    }
    let (start, end) = span.split_once('-')?;
    Some(ContentRange::Bytes {
        start: start.parse().ok()?,
        end: end.parse().ok()?,
    })
}

/// Map a curl failure onto the I/O error kind a reader would expect.
pub(crate) fn curl_to_io(e: curl::Error) -> io::Error {
    let kind = if e.is_operation_timedout() {
        io::ErrorKind::TimedOut
    } else if e.is_partial_file() {
        io::ErrorKind::UnexpectedEof
    } else if e.is_recv_error() || e.is_send_error() || e.is_got_nothing() || e.is_read_error() {
        io::ErrorKind::ConnectionReset
    } else if e.is_couldnt_connect() {
        io::ErrorKind::ConnectionRefused
    } else {
        io::ErrorKind::Other
    };
    io::Error::new(kind, e)
}

/// Response body of one open.
pub struct HttpBodyStream {
    rx: Receiver<Frame>,
    chunk: Vec<u8>,
    offset: usize,
    finished: bool,
    _cancel: CancelOnDrop,
}

impl HttpBodyStream {
    pub(crate) fn new(rx: Receiver<Frame>, cancel: CancelOnDrop) -> Self {
        Self {
            rx,
            chunk: Vec::new(),
            offset: 0,
            finished: false,
            _cancel: cancel,
        }
    }

    /// A body with no bytes that reads as a clean end of stream.
    pub(crate) fn empty(cancel: CancelOnDrop) -> Self {
        let (_, rx) = sync_channel(1);
        Self {
            finished: true,
            ..Self::new(rx, cancel)
        }
    }
}

impl Read for HttpBodyStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            if self.offset < self.chunk.len() {
                let n = buf.len().min(self.chunk.len() - self.offset);
                buf[..n].copy_from_slice(&self.chunk[self.offset..self.offset + n]);
                self.offset += n;
                return Ok(n);
            }
            if self.finished {
                return Ok(0);
            }
            match self.rx.recv() {
                Ok(Frame::Body(data)) => {
                    self.chunk = data;
                    self.offset = 0;
                }
                Ok(Frame::Head { .. }) => {}
                Ok(Frame::Done(result)) => {
                    self.finished = true;
                    result.map_err(curl_to_io)?;
                }
                Err(_) => {
                    self.finished = true;
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "transfer ended without completing",
                    ));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_lines() {
        assert_eq!(parse_status_line("HTTP/1.1 206 Partial Content"), Some(206));
        assert_eq!(parse_status_line("HTTP/2 404"), Some(404));
        assert_eq!(parse_status_line("Content-Length: 10"), None);
    }

    #[test]
    fn generation_header() {
        let headers = vec![
            "Content-Length: 10".to_string(),
            "X-Goog-Generation: 1700000000000001".to_string(),
        ];
        assert_eq!(parse_generation(&headers), Some(1_700_000_000_000_001));
        assert_eq!(parse_generation(&headers[..1]), None);
    }

    #[test]
    fn content_range_forms() {
        let h = |v: &str| vec!["Content-Length: 5".to_string(), format!("content-range: {}", v)];
        assert_eq!(
            parse_content_range(&h("bytes 5000-65535/65536")),
            Some(ContentRange::Bytes { start: 5000, end: 65535 })
        );
        assert_eq!(
            parse_content_range(&h("bytes 0-9/*")),
            Some(ContentRange::Bytes { start: 0, end: 9 })
        );
        assert_eq!(
            parse_content_range(&h("bytes */10")),
            Some(ContentRange::Unsatisfied { total: 10 })
        );
        assert_eq!(parse_content_range(&h("items 0-9/10")), None);
        assert_eq!(parse_content_range(&h("bytes 0-x/10")), None);
        assert_eq!(parse_content_range(&h("bytes 0-9/ten")), None);
        assert_eq!(parse_content_range(&["Content-Length: 5".to_string()]), None);
    }

    #[test]
    fn curl_errors_map_to_io_kinds() {
        assert_eq!(curl_to_io(curl::Error::new(28)).kind(), io::ErrorKind::TimedOut);
        assert_eq!(curl_to_io(curl::Error::new(18)).kind(), io::ErrorKind::UnexpectedEof);
        assert_eq!(curl_to_io(curl::Error::new(56)).kind(), io::ErrorKind::ConnectionReset);
        assert_eq!(curl_to_io(curl::Error::new(7)).kind(), io::ErrorKind::ConnectionRefused);
        assert_eq!(curl_to_io(curl::Error::new(3)).kind(), io::ErrorKind::Other);
    }

    #[test]
    fn body_frames_read_in_order() {
        let (tx, rx) = sync_channel(4);
        tx.send(Frame::Body(b"hello ".to_vec())).unwrap();
        tx.send(Frame::Body(b"world".to_vec())).unwrap();
        tx.send(Frame::Done(Ok(()))).unwrap();
        let mut stream = HttpBodyStream::new(rx, CancelOnDrop::new());
        let mut out = String::new();
        stream.read_to_string(&mut out).unwrap();
        assert_eq!(out, "hello world");
        assert_eq!(stream.read(&mut [0u8; 4]).unwrap(), 0);
    }

    #[test]
    fn failed_transfer_surfaces_after_delivered_bytes() {
        let (tx, rx) = sync_channel(4);
        tx.send(Frame::Body(vec![1, 2, 3])).unwrap();
        tx.send(Frame::Done(Err(curl::Error::new(18)))).unwrap();
        let mut stream = HttpBodyStream::new(rx, CancelOnDrop::new());
        let mut buf = [0u8; 8];
        assert_eq!(stream.read(&mut buf).unwrap(), 3);
        let err = stream.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn vanished_sender_is_unexpected_eof() {
        let (tx, rx) = sync_channel::<Frame>(1);
        drop(tx);
        let mut stream = HttpBodyStream::new(rx, CancelOnDrop::new());
        let err = stream.read(&mut [0u8; 4]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn empty_stream_is_clean_eof() {
        let mut stream = HttpBodyStream::empty(CancelOnDrop::new());
        assert_eq!(stream.read(&mut [0u8; 4]).unwrap(), 0);
        assert_eq!(stream.read(&mut [0u8; 4]).unwrap(), 0);
    }

    #[test]
    fn dropping_stream_cancels_transfer() {
        let (_tx, rx) = sync_channel::<Frame>(1);
        let cancel = CancelOnDrop::new();
        let flag = cancel.flag();
        let stream = HttpBodyStream::new(rx, cancel);
        assert!(!flag.load(Ordering::Relaxed));
        drop(stream);
        assert!(flag.load(Ordering::Relaxed));
    }
}
