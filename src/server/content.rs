//! File body serving with range and conditional request support.
//!
//! # Request Headers
//!
//! - `Range: bytes=a-b`, `bytes=a-`, `bytes=-n`: a single range yields
//!   `206 Partial Content`. Multi-range and malformed values are ignored and
//!   the full body is sent.
//! - `If-Modified-Since`: `304 Not Modified` when the file is not newer
//!   (compared at second precision).
//!
//! # Response Headers
//!
//! - `Content-Type`: extension lookup, falling back to content sniffing
//! - `Content-Length`, `Accept-Ranges: bytes`, `Last-Modified`
//! - `Content-Range` on 206 and 416
//! - `Content-Disposition: attachment` when a download was requested

use std::io::SeekFrom;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::body::Body;
use axum::response::Response;
use http::{header, HeaderMap, HeaderValue, StatusCode};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;
use tracing::debug;

use crate::listing::mime;
use crate::vfs::{Metadata, VfsFile};

use super::handlers::ServeError;

/// Outcome of interpreting a `Range` header against a body of known size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteRange {
    /// Serve the whole body
    Full,
    /// Serve the inclusive byte range `start..=end`
    Partial { start: u64, end: u64 },
    /// The range starts past the end of the body or ends before it starts
    Unsatisfiable,
}

/// Interpret a `Range` header.
///
/// Only a single `bytes` range is honored. A missing header, another unit,
/// multiple ranges or unparseable bounds all fall back to [`ByteRange::Full`].
/// Ends past the body are clamped to the last byte.
pub fn parse_range(value: Option<&HeaderValue>, size: u64) -> ByteRange {
    let Some(ranges) = value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().strip_prefix("bytes="))
    else {
        return ByteRange::Full;
    };
    if ranges.contains(',') {
        return ByteRange::Full;
    }
    let Some((start_part, end_part)) = ranges.trim().split_once('-') else {
        return ByteRange::Full;
    };

    if start_part.is_empty() {
        // suffix range: the last n bytes
        let Ok(suffix) = end_part.parse::<u64>() else {
            return ByteRange::Full;
        };
        if suffix == 0 || size == 0 {
            return ByteRange::Unsatisfiable;
        }
        return ByteRange::Partial {
            start: size.saturating_sub(suffix),
            end: size - 1,
        };
    }

    let Ok(start) = start_part.parse::<u64>() else {
        return ByteRange::Full;
    };
    let end = if end_part.is_empty() {
        None
    } else {
        match end_part.parse::<u64>() {
            Ok(end) if end >= start => Some(end),
            Ok(_) => return ByteRange::Unsatisfiable,
            Err(_) => return ByteRange::Full,
        }
    };

    if start >= size {
        return ByteRange::Unsatisfiable;
    }
    let last = size - 1;
    ByteRange::Partial {
        start,
        end: end.map_or(last, |end| end.min(last)),
    }
}

/// Whether an `If-Modified-Since` header allows answering 304.
fn not_modified(headers: &HeaderMap, modified: Option<SystemTime>) -> bool {
    let Some(modified) = modified else {
        return false;
    };
    let Some(since) = headers
        .get(header::IF_MODIFIED_SINCE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| httpdate::parse_http_date(v).ok())
    else {
        return false;
    };
    match (
        modified.duration_since(UNIX_EPOCH),
        since.duration_since(UNIX_EPOCH),
    ) {
        (Ok(modified), Ok(since)) => modified.as_secs() > 0 && modified.as_secs() <= since.as_secs(),
        _ => false,
    }
}

/// `attachment` disposition for `name`; `"` is replaced so the quoted string
/// stays well-formed.
pub fn attachment_disposition(name: &str) -> String {
    format!("attachment; filename=\"{}\"", name.replace('"', "'"))
}

/// Serve an open regular file.
///
/// The file is rewound after content sniffing, so the body always starts at
/// the requested offset.
pub async fn serve_file<F>(
    mut file: F,
    meta: &Metadata,
    request_headers: &HeaderMap,
    attachment: bool,
) -> Result<Response, ServeError>
where
    F: VfsFile + 'static,
{
    let content_type = mime::resolve(&meta.name, &mut file)
        .await
        .ok_or_else(|| ServeError::internal(format!("{}: cannot sniff content", meta.name)))?;
    let last_modified = meta.modified.map(httpdate::fmt_http_date);

    let mut builder = Response::builder().header(header::ACCEPT_RANGES, "bytes");
    if let Some(date) = &last_modified {
        builder = builder.header(header::LAST_MODIFIED, date);
    }

    if not_modified(request_headers, meta.modified) {
        debug!(name = %meta.name, "Not modified");
        return Ok(builder
            .status(StatusCode::NOT_MODIFIED)
            .body(Body::empty())?);
    }

    builder = builder.header(header::CONTENT_TYPE, content_type);
    if attachment {
        builder = builder.header(header::CONTENT_DISPOSITION, attachment_disposition(&meta.name));
    }

    let size = meta.len;
    match parse_range(request_headers.get(header::RANGE), size) {
        ByteRange::Full => {
            let body = Body::from_stream(ReaderStream::new(file.take(size)));
            Ok(builder
                .status(StatusCode::OK)
                .header(header::CONTENT_LENGTH, size)
                .body(body)?)
        }
        ByteRange::Partial { start, end } => {
            let length = end - start + 1;
            debug!(name = %meta.name, start, end, length, "Serving byte range");
            file.seek(SeekFrom::Start(start))
                .await
                .map_err(|e| ServeError::internal(format!("{}: seek failed: {}", meta.name, e)))?;
            let body = Body::from_stream(ReaderStream::new(file.take(length)));
            Ok(builder
                .status(StatusCode::PARTIAL_CONTENT)
                .header(
                    header::CONTENT_RANGE,
                    format!("bytes {}-{}/{}", start, end, size),
                )
                .header(header::CONTENT_LENGTH, length)
                .body(body)?)
        }
        ByteRange::Unsatisfiable => Err(ServeError::RangeNotSatisfiable { size }),
    }
}
