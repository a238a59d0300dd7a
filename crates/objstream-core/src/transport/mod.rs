//! HTTP media download transport.
//!
//! Uses the curl crate (libcurl) to open ranged `alt=media` reads against the
//! JSON API and reports the object generation from `x-goog-generation`.

mod media;
mod stream;

pub use stream::HttpBodyStream;

use crate::config::ObjstreamConfig;
use crate::reader::{ObjectOpener, OpenedObject, TransportError};
use crate::request::ReadRequest;
use anyhow::Context;
use std::sync::mpsc::{sync_channel, Receiver};
use media::ResponseBody;
use std::time::Duration;
use stream::{CancelOnDrop, Frame};
use url::Url;

/// Largest error body kept for a non-success status message.
const MAX_ERROR_BODY: usize = 4096;

/// Connection tuning for [`HttpObjectOpener`].
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub connect_timeout: Duration,
    /// Abort if throughput stays below `low_speed_limit` bytes/s for `low_speed_time`.
    /// A dropped [`HttpBodyStream`] aborts its transfer within about a second
    /// regardless of these.
    pub low_speed_limit: u32,
    pub low_speed_time: Duration,
    /// Body chunks buffered between the transfer thread and the reader.
    pub channel_capacity: usize,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            low_speed_limit: 1024,
            low_speed_time: Duration::from_secs(60),
            channel_capacity: 16,
        }
    }
}

impl From<&ObjstreamConfig> for HttpSettings {
    fn from(cfg: &ObjstreamConfig) -> Self {
        Self {
            connect_timeout: Duration::from_secs(cfg.connect_timeout_secs),
            low_speed_time: Duration::from_secs(cfg.low_speed_time_secs),
            ..Self::default()
        }
    }
}

/// [`ObjectOpener`] speaking the storage JSON API over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpObjectOpener {
    endpoint: Url,
    settings: HttpSettings,
}

impl HttpObjectOpener {
    pub fn new(endpoint: Url, settings: HttpSettings) -> Self {
        Self { endpoint, settings }
    }

    pub fn from_config(cfg: &ObjstreamConfig) -> anyhow::Result<Self> {
        let endpoint = Url::parse(&cfg.endpoint)
            .with_context(|| format!("invalid endpoint {:?}", cfg.endpoint))?;
        Ok(Self::new(endpoint, HttpSettings::from(cfg)))
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn configure(&self, url: &Url, request: &ReadRequest) -> Result<curl::easy::Easy, TransportError> {
        let mut easy = curl::easy::Easy::new();
        easy.url(url.as_str())?;
        easy.follow_location(true)?;
        easy.connect_timeout(self.settings.connect_timeout)?;
        easy.low_speed_limit(self.settings.low_speed_limit)?;
        easy.low_speed_time(self.settings.low_speed_time)?;
        easy.progress(true)?;

        let headers = media::request_headers(request)?;
        if !headers.is_empty() {
            let mut list = curl::easy::List::new();
            for (name, value) in &headers {
                list.append(&format!("{}: {}", name, value))?;
            }
            easy.http_headers(list)?;
        }
        Ok(easy)
    }
}

impl ObjectOpener for HttpObjectOpener {
    type Stream = HttpBodyStream;

    fn open(
        &self,
        request: &ReadRequest,
        pinned_generation: Option<i64>,
    ) -> Result<OpenedObject<HttpBodyStream>, TransportError> {
        let url = media::object_media_url(&self.endpoint, request, pinned_generation)?;
        let easy = self.configure(&url, request)?;
        tracing::debug!(%url, range = %request.range(), "GET object media");

        // Every early return below drops `cancel` and so aborts the transfer.
        let cancel = CancelOnDrop::new();
        let flag = cancel.flag();
        let (tx, rx) = sync_channel(self.settings.channel_capacity.max(1));
        std::thread::Builder::new()
            .name("objstream-transfer".to_string())
            .spawn(move || stream::run_transfer(easy, tx, flag))?;

        match rx.recv() {
            Ok(Frame::Head { status, headers }) => {
                match media::check_response(request.range(), status, &headers) {
                    ResponseBody::Content => Ok(OpenedObject {
                        generation: stream::parse_generation(&headers),
                        stream: HttpBodyStream::new(rx, cancel),
                    }),
                    ResponseBody::PastEnd => {
                        tracing::debug!(range = %request.range(), "read starts at end of object");
                        Ok(OpenedObject {
                            generation: stream::parse_generation(&headers),
                            stream: HttpBodyStream::empty(cancel),
                        })
                    }
                    ResponseBody::Misplaced(message) => {
                        tracing::warn!(status, %message, "response does not match requested range");
                        Err(TransportError::Status { code: status, message })
                    }
                    ResponseBody::Failed => Err(TransportError::Status {
                        code: status,
                        message: error_body(&rx),
                    }),
                }
            }
            Ok(Frame::Done(Err(e))) => Err(TransportError::Curl(e)),
            Ok(Frame::Body(_)) | Ok(Frame::Done(Ok(()))) => Err(TransportError::Other(
                "transfer produced no response head".to_string(),
            )),
            Err(_) => Err(TransportError::Other(
                "transfer thread exited before responding".to_string(),
            )),
        }
    }
}

/// Collect a (bounded) error body; stops early and aborts the transfer on overflow.
fn error_body(rx: &Receiver<Frame>) -> String {
    let mut body = Vec::new();
    while let Ok(frame) = rx.recv() {
        match frame {
            Frame::Body(data) => {
                body.extend_from_slice(&data);
                if body.len() >= MAX_ERROR_BODY {
                    body.truncate(MAX_ERROR_BODY);
                    break;
                }
            }
            Frame::Done(_) => break,
            Frame::Head { .. } => {}
        }
    }
    String::from_utf8_lossy(&body).trim().to_string()
}
