//! Classification of transport failures and their translation into [`ReadError`].

use super::policy::ErrorKind;
use crate::reader::{ReadError, TransportError};
use std::io;

/// Classify an HTTP status code.
pub fn classify_http_status(code: u32) -> ErrorKind {
    match code {
        408 => ErrorKind::Timeout,
        429 | 503 => ErrorKind::Throttled,
        500..=599 => ErrorKind::Http5xx(code as u16),
        _ => ErrorKind::Other,
    }
}

/// Classify a curl error.
pub fn classify_curl_error(e: &curl::Error) -> ErrorKind {
    if e.is_operation_timedout() {
        return ErrorKind::Timeout;
    }
    if e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_read_error()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_got_nothing()
        || e.is_partial_file()
    {
        return ErrorKind::Connection;
    }
    ErrorKind::Other
}

/// Classify an I/O error by its kind alone.
pub fn classify_io_error(e: &io::Error) -> ErrorKind {
    match e.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => ErrorKind::Timeout,
        io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::ConnectionRefused
        | io::ErrorKind::NotConnected
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::UnexpectedEof => ErrorKind::Connection,
        _ => ErrorKind::Other,
    }
}

/// Strict classification of a raw transport failure.
pub fn classify(e: &TransportError) -> ErrorKind {
    match e {
        TransportError::Io(io) => classify_io_error(io),
        TransportError::Status { code, .. } => classify_http_status(*code),
        TransportError::Curl(c) => classify_curl_error(c),
        TransportError::Other(_) => ErrorKind::Other,
    }
}

/// Messages that mark a dropped connection even when the I/O kind is generic.
const CONNECTION_HINTS: &[&str] = &[
    "connection reset",
    "connection closed",
    "closed prematurely",
    "broken pipe",
    "unexpected eof",
    "unexpected end of file",
];

/// Translate a raw transport failure into the channel's failure vocabulary.
///
/// Protocol-level failures become [`ReadError::Transport`]. Generic I/O errors
/// whose message reveals a dropped connection or a timeout are reclassified,
/// which is what gives the second policy check its wider coverage. Anything
/// else becomes [`ReadError::Other`].
pub fn translate(e: TransportError) -> ReadError {
    if !e.is_protocol() {
        return ReadError::Other { source: e };
    }
    let mut kind = classify(&e);
    if kind == ErrorKind::Other {
        if let TransportError::Io(io) = &e {
            let message = io.to_string().to_ascii_lowercase();
            if CONNECTION_HINTS.iter().any(|hint| message.contains(hint)) {
                kind = ErrorKind::Connection;
            } else if message.contains("timed out") {
                kind = ErrorKind::Timeout;
            }
        }
    }
    ReadError::Transport { kind, source: e }
}
