//! Media download URL and header construction, and the check that a
//! response actually starts where the request asked.

use super::stream::{parse_content_range, ContentRange};
use crate::reader::TransportError;
use crate::request::{ByteRangeSpec, ReadRequest};
use url::Url;

/// Build `{endpoint}/storage/v1/b/{bucket}/o/{object}?alt=media&...`.
///
/// The object name is encoded as a single path segment (`/` becomes `%2F`).
/// A generation named by the object itself wins over `pinned_generation`.
pub(crate) fn object_media_url(
    endpoint: &Url,
    request: &ReadRequest,
    pinned_generation: Option<i64>,
) -> Result<Url, TransportError> {
    let object = request.object();
    let options = request.options();
    let mut url = endpoint.clone();
    url.path_segments_mut()
        .map_err(|_| TransportError::Other(format!("endpoint {} cannot be a base URL", endpoint)))?
        .pop_if_empty()
        .extend([
            "storage",
            "v1",
            "b",
            object.bucket.as_str(),
            "o",
            object.name.as_str(),
        ]);

    {
        let mut query = url.query_pairs_mut();
        query.append_pair("alt", "media");
        if let Some(generation) = object.generation.or(pinned_generation) {
            query.append_pair("generation", &generation.to_string());
        }
        let preconditions = [
            ("ifGenerationMatch", options.if_generation_match),
            ("ifGenerationNotMatch", options.if_generation_not_match),
            ("ifMetagenerationMatch", options.if_metageneration_match),
            ("ifMetagenerationNotMatch", options.if_metageneration_not_match),
        ];
        for (name, value) in preconditions {
            if let Some(v) = value {
                query.append_pair(name, &v.to_string());
            }
        }
        if let Some(project) = &options.user_project {
            query.append_pair("userProject", project);
        }
    }
    Ok(url)
}

/// Request headers for one open: `Range` plus customer-supplied key headers.
pub(crate) fn request_headers(
    request: &ReadRequest,
) -> Result<Vec<(&'static str, String)>, TransportError> {
    let mut headers = Vec::new();
    if let Some(range) = request.range().http_range_header() {
        headers.push(("Range", range));
    }
    if let Some(key) = &request.options().encryption_key {
        let digest = key
            .sha256_base64()
            .map_err(|e| TransportError::Other(format!("invalid encryption key: {}", e)))?;
        headers.push(("x-goog-encryption-algorithm", "AES256".to_string()));
        headers.push(("x-goog-encryption-key", key.as_base64().to_string()));
        headers.push(("x-goog-encryption-key-sha256", digest));
    }
    Ok(headers)
}

/// What the response head says about the body that follows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ResponseBody {
    /// The body holds the requested bytes, starting at the requested offset.
    Content,
    /// The read starts exactly at the end of the object; there is nothing to read.
    PastEnd,
    /// Non-success status; the body is an error message.
    Failed,
    /// Success status whose body does not start at the requested offset.
    Misplaced(String),
}

/// Judge a response head against the range it answers.
///
/// Once a `Range` header is sent only `206` with a `Content-Range` starting at
/// `begin_offset`, and ending inside a bounded range, is accepted: a `200`
/// means the range was ignored and the body starts at offset 0. A `416` for an open-ended read whose
/// `begin_offset` equals the object size is the end of the object.
pub(crate) fn check_response(range: &ByteRangeSpec, status: u32, headers: &[String]) -> ResponseBody {
    let ranged = range.http_range_header().is_some();
    let begin = range.begin_offset();
    match status {
        206 if ranged => match parse_content_range(headers) {
            Some(ContentRange::Bytes { start, end })
                if start == begin && range.end_offset().map_or(true, |limit| end < limit) =>
            {
                ResponseBody::Content
            }
            Some(ContentRange::Bytes { start, end }) => ResponseBody::Misplaced(format!(
                "Content-Range bytes {}-{} does not fit {}",
                start, end, range
            )),
            _ => ResponseBody::Misplaced(format!("206 without a usable Content-Range for {}", range)),
        },
        200..=299 if ranged => {
            ResponseBody::Misplaced(format!("range {} not honored (HTTP {})", range, status))
        }
        200..=299 => ResponseBody::Content,
        416 if range.end_offset().is_none() => match parse_content_range(headers) {
            Some(ContentRange::Unsatisfied { total }) if total == begin => ResponseBody::PastEnd,
            _ => ResponseBody::Failed,
        },
        _ => ResponseBody::Failed,
    }
}
