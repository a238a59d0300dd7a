//! Minimal HTTP/1.1 object server for integration tests.
//!
//! Serves a single body as `GET /storage/v1/b/{bucket}/o/{object}?alt=media`
//! with Range support and an `x-goog-generation` header. It can cut the first
//! response short or stall it, switch generations after the first request, and
//! ignore `Range`. Every request it sees is recorded.

use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use url::Url;

#[derive(Debug, Clone, Copy)]
pub struct ObjectServerOptions {
    /// Generation served on the first request.
    pub generation: i64,
    /// Close the first response after this many body bytes (Content-Length still
    /// announces the full slice).
    pub fail_first_after: Option<usize>,
    /// Generation served from the second request on.
    pub replace_generation_after_first: Option<i64>,
    /// If false, a `generation=` query parameter is ignored instead of
    /// producing 404 on mismatch.
    pub honor_generation: bool,
    /// Answer every request with `200` and the whole body, as a server or
    /// proxy without range support would.
    pub ignore_range: bool,
    /// Send this many body bytes of the first response, then go silent
    /// until the client hangs up.
    pub stall_first_after: Option<usize>,
}

impl Default for ObjectServerOptions {
    fn default() -> Self {
        Self {
            generation: 42,
            fail_first_after: None,
            replace_generation_after_first: None,
            honor_generation: true,
            ignore_range: false,
            stall_first_after: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// Path plus query, as sent.
    pub target: String,
    /// Header (lowercased name, value) pairs.
    pub headers: Vec<(String, String)>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn query(&self, name: &str) -> Option<String> {
        let url = Url::parse(&format!("http://localhost{}", self.target)).ok()?;
        url.query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }
}

pub struct ObjectServer {
    /// Endpoint base URL (e.g. "http://127.0.0.1:12345/").
    pub endpoint: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    hangups: Arc<AtomicUsize>,
}

impl ObjectServer {
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Stalled responses whose client has since closed the connection.
    pub fn hangups(&self) -> usize {
        self.hangups.load(Ordering::SeqCst)
    }
}

/// Starts a server in a background thread serving `body`. The server runs
/// until the process exits.
pub fn start(body: Vec<u8>) -> ObjectServer {
    start_with_options(body, ObjectServerOptions::default())
}

pub fn start_with_options(body: Vec<u8>, opts: ObjectServerOptions) -> ObjectServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let body = Arc::new(body);
    let requests = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&requests);
    let hangups = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&hangups);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let body = Arc::clone(&body);
            let recorded = Arc::clone(&recorded);
            let seen = Arc::clone(&seen);
            thread::spawn(move || handle(stream, &body, opts, &recorded, &seen));
        }
    });
    ObjectServer {
        endpoint: format!("http://127.0.0.1:{}/", port),
        requests,
        hangups,
    }
}

fn handle(
    mut stream: TcpStream,
    body: &[u8],
    opts: ObjectServerOptions,
    recorded: &Mutex<Vec<RecordedRequest>>,
    hangups: &AtomicUsize,
) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let Some(head) = read_head(&mut stream) else {
        return;
    };
    let Some(request) = parse_request(&head) else {
        let _ = stream.write_all(b"HTTP/1.1 400 Bad Request\r\nContent-Length: 0\r\n\r\n");
        return;
    };

    let index = {
        let mut all = recorded.lock().unwrap();
        all.push(request.clone());
        all.len() - 1
    };
    let generation = if index == 0 {
        opts.generation
    } else {
        opts.replace_generation_after_first.unwrap_or(opts.generation)
    };

    if opts.honor_generation {
        if let Some(requested) = request.query("generation") {
            if requested != generation.to_string() {
                let msg = b"No such object";
                let response = format!(
                    "HTTP/1.1 404 Not Found\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    msg.len()
                );
                let _ = stream.write_all(response.as_bytes());
                let _ = stream.write_all(msg);
                return;
            }
        }
    }

    let total = body.len() as u64;
    let range = if opts.ignore_range {
        None
    } else {
        request.header("range").and_then(parse_range)
    };
    let (status, content_range, slice) = match range {
        Some((start, end_incl)) => {
            let end_incl = end_incl.min(total.saturating_sub(1));
            if start >= total || start > end_incl {
                let response = format!(
                    "HTTP/1.1 416 Range Not Satisfiable\r\nContent-Range: bytes */{}\r\nContent-Length: 0\r\nx-goog-generation: {}\r\nConnection: close\r\n\r\n",
                    total, generation
                );
                let _ = stream.write_all(response.as_bytes());
                return;
            }
            (
                "206 Partial Content",
                format!("Content-Range: bytes {}-{}/{}\r\n", start, end_incl, total),
                &body[start as usize..=end_incl as usize],
            )
        }
        None => ("200 OK", String::new(), body),
    };

    let response = format!(
        "HTTP/1.1 {}\r\n{}Content-Length: {}\r\nx-goog-generation: {}\r\nConnection: close\r\n\r\n",
        status,
        content_range,
        slice.len(),
        generation
    );
    let _ = stream.write_all(response.as_bytes());
    if let Some(n) = opts.stall_first_after {
        if index == 0 && n < slice.len() {
            let _ = stream.write_all(&slice[..n]);
            let _ = stream.flush();
            if wait_for_hangup(&mut stream, Duration::from_secs(120)) {
                hangups.fetch_add(1, Ordering::SeqCst);
            }
            return;
        }
    }
    match opts.fail_first_after {
        Some(n) if index == 0 && n < slice.len() => {
            let _ = stream.write_all(&slice[..n]);
            let _ = stream.flush();
            let _ = stream.shutdown(Shutdown::Both);
        }
        _ => {
            let _ = stream.write_all(slice);
        }
    }
}

/// Block until the peer closes the connection or `limit` passes. True on close.
fn wait_for_hangup(stream: &mut TcpStream, limit: Duration) -> bool {
    let _ = stream.set_read_timeout(Some(Duration::from_millis(100)));
    let deadline = Instant::now() + limit;
    let mut buf = [0u8; 256];
    while Instant::now() < deadline {
        match stream.read(&mut buf) {
            Ok(0) => return true,
            Ok(_) => {}
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
            Err(_) => return true,
        }
    }
    false
}

/// Read until the blank line that ends the request head.
fn read_head(stream: &mut TcpStream) -> Option<String> {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];
    while !data.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            return None;
        }
        data.extend_from_slice(&buf[..n]);
        if data.len() > 64 * 1024 {
            return None;
        }
    }
    String::from_utf8(data).ok()
}

fn parse_request(head: &str) -> Option<RecordedRequest> {
    let mut lines = head.lines();
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?;
    if !method.eq_ignore_ascii_case("GET") {
        return None;
    }
    let target = request_line.next()?.to_string();
    let mut headers = Vec::new();
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.push((name.trim().to_ascii_lowercase(), value.trim().to_string()));
        }
    }
    Some(RecordedRequest { target, headers })
}

/// `bytes=X-Y` / `bytes=X-` -> (start, end_inclusive).
fn parse_range(value: &str) -> Option<(u64, u64)> {
    let spec = value.trim().strip_prefix("bytes=")?;
    let (a, b) = spec.split_once('-')?;
    let start = a.trim().parse().ok()?;
    let end = match b.trim() {
        "" => u64::MAX,
        e => e.parse().ok()?,
    };
    Some((start, end))
}
