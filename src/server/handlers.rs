//! HTTP request handler for the file server.
//!
//! Every path goes through [`serve_handler`], which walks this decision table:
//!
//! ```text
//!   path ends in /_static/styles.css ──► embedded stylesheet
//!   open fails ────────────────────────► 404 text/plain
//!   stat fails ────────────────────────► 500
//!   file,  trailing "/" ───────────────► 301 to path without "/"
//!   file,  no trailing "/" ────────────► 200 content (+ attachment on ?download)
//!   dir,   no trailing "/" ────────────► 301 to path with "/"
//!   dir,   trailing "/", ?download ────► 200 application/zip
//!   dir,   trailing "/", ?q=<s> ───────► 200 html search results
//!   dir,   trailing "/" ───────────────► 200 html listing
//! ```
//!
//! Redirects preserve the raw query string and never carry `Content-Type`.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri},
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use url::form_urlencoded;

use crate::archive::{archive_dir, archive_file_name, ZIP_CONTENT_TYPE};
use crate::error::{ArchiveError, VfsError};
use crate::listing::{
    escape_path, list_files, search_files, DirectoryListing, HtmlRenderer, ListingRenderer,
};
use crate::vfs::{canonicalize, Vfs, VfsFile, ROOT};

use super::assets::{STYLES_CSS, STYLES_CSS_CONTENT_TYPE, STYLES_CSS_SUFFIX};
use super::content::{attachment_disposition, serve_file};

// =============================================================================
// Application State
// =============================================================================

/// Shared application state: the filesystem being served and the listing
/// renderer.
///
/// Both are built once before the server starts and never change afterwards.
pub struct AppState<V: Vfs> {
    /// The filesystem being served
    pub vfs: Arc<V>,

    /// Renders directory listings and search results
    pub renderer: Arc<dyn ListingRenderer>,
}

impl<V: Vfs> AppState<V> {
    /// Create state serving `vfs` with the built-in HTML renderer.
    pub fn new(vfs: V) -> Self {
        Self {
            vfs: Arc::new(vfs),
            renderer: Arc::new(HtmlRenderer),
        }
    }

    /// Replace the listing renderer.
    pub fn with_renderer(mut self, renderer: impl ListingRenderer + 'static) -> Self {
        self.renderer = Arc::new(renderer);
        self
    }
}

impl<V: Vfs> Clone for AppState<V> {
    fn clone(&self) -> Self {
        Self {
            vfs: Arc::clone(&self.vfs),
            renderer: Arc::clone(&self.renderer),
        }
    }
}

// =============================================================================
// Request Parameters
// =============================================================================

/// Query flags understood by the handler.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RequestQuery {
    /// `download` was present (any value, including none)
    pub download: bool,

    /// First `q` value; empty means no search
    pub search: String,
}

impl RequestQuery {
    pub fn parse(raw: Option<&str>) -> Self {
        let mut query = RequestQuery::default();
        let mut seen_search = false;
        for (key, value) in form_urlencoded::parse(raw.unwrap_or_default().as_bytes()) {
            match key.as_ref() {
                "download" => query.download = true,
                "q" if !seen_search => {
                    query.search = value.into_owned();
                    seen_search = true;
                }
                _ => {}
            }
        }
        query
    }
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Errors surfaced to HTTP clients.
///
/// Messages are for the logs only; response bodies are fixed strings so no
/// storage detail reaches the client.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("range not satisfiable for {size} byte body")]
    RangeNotSatisfiable { size: u64 },
}

impl ServeError {
    pub fn not_found(message: impl Into<String>) -> Self {
        ServeError::NotFound(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ServeError::Internal(message.into())
    }
}

impl From<VfsError> for ServeError {
    fn from(err: VfsError) -> Self {
        match err {
            VfsError::InvalidPath { .. } | VfsError::NotFound { .. } => {
                ServeError::NotFound(err.to_string())
            }
            _ => ServeError::Internal(err.to_string()),
        }
    }
}

impl From<ArchiveError> for ServeError {
    fn from(err: ArchiveError) -> Self {
        ServeError::NotFound(format!("archive: {}", err))
    }
}

impl From<http::Error> for ServeError {
    fn from(err: http::Error) -> Self {
        ServeError::Internal(format!("response build failed: {}", err))
    }
}

const NOT_FOUND_BODY: &str = "404 page not found\n";
const INTERNAL_ERROR_BODY: &str = "Internal Server Error\n";
const RANGE_NOT_SATISFIABLE_BODY: &str = "invalid range: failed to overlap\n";
const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Plain-text error page.
fn plain_error(status: StatusCode, body: &'static str) -> Response {
    (
        status,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN)),
            (
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            ),
        ],
        body,
    )
        .into_response()
}

/// Convert ServeError to HTTP response.
///
/// 5xx errors are logged at ERROR level, 404s at DEBUG, the rest at WARN.
impl IntoResponse for ServeError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            ServeError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ServeError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
            ServeError::RangeNotSatisfiable { .. } => {
                (StatusCode::RANGE_NOT_SATISFIABLE, "range_not_satisfiable")
            }
        };

        if status.is_server_error() {
            error!(
                error_type = error_type,
                status = status.as_u16(),
                "Server error: {}",
                self
            );
        } else if status == StatusCode::NOT_FOUND {
            debug!(
                error_type = error_type,
                status = status.as_u16(),
                "Resource not found: {}",
                self
            );
        } else {
            warn!(
                error_type = error_type,
                status = status.as_u16(),
                "Client error: {}",
                self
            );
        }

        match self {
            ServeError::NotFound(_) => plain_error(status, NOT_FOUND_BODY),
            ServeError::Internal(_) => plain_error(status, INTERNAL_ERROR_BODY),
            ServeError::RangeNotSatisfiable { size } => {
                let mut response = plain_error(status, RANGE_NOT_SATISFIABLE_BODY);
                if let Ok(value) = HeaderValue::from_str(&format!("bytes */{}", size)) {
                    response.headers_mut().insert(header::CONTENT_RANGE, value);
                }
                response
            }
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Serve any path under the filesystem root.
///
/// # Query Parameters
///
/// - `download`: attachment disposition for files, zip archive for directories
/// - `q`: substring to search for below a directory
///
/// # Response
///
/// - `200 OK`: file content, listing, search results or archive
/// - `206 Partial Content` / `304 Not Modified` / `416`: file range and
///   conditional requests
/// - `301 Moved Permanently`: trailing-slash canonicalization
/// - `404 Not Found`: missing path, unreadable directory or failed archive
/// - `500 Internal Server Error`: metadata unavailable
pub async fn serve_handler<V: Vfs>(
    State(state): State<AppState<V>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Response, ServeError> {
    info!(method = %method, uri = %uri, "Request");

    // The router only sees the raw path; `%3F` must name a file called `?...`
    let url_path = urlencoding::decode(uri.path())
        .map_err(|e| ServeError::not_found(format!("undecodable path {}: {}", uri.path(), e)))?
        .into_owned();

    if url_path.ends_with(STYLES_CSS_SUFFIX) {
        return Ok(([(header::CONTENT_TYPE, STYLES_CSS_CONTENT_TYPE)], STYLES_CSS).into_response());
    }

    let name = canonicalize(&url_path);
    let trailing_slash = url_path.ends_with('/');

    let file = state
        .vfs
        .open(&name)
        .await
        .map_err(|e| ServeError::not_found(e.to_string()))?;
    let meta = file
        .stat()
        .await
        .map_err(|e| ServeError::internal(e.to_string()))?;

    let query = RequestQuery::parse(uri.query());

    if !meta.is_dir() {
        if trailing_slash {
            return redirect(&format!("/{}", escape_path(&name)), uri.query());
        }
        return serve_file(file, &meta, &headers, query.download).await;
    }

    if !trailing_slash {
        let location = if name == ROOT {
            "/".to_string()
        } else {
            format!("/{}/", escape_path(&name))
        };
        return redirect(&location, uri.query());
    }
    // Directory listings never read from the handle itself
    drop(file);

    if query.download {
        return serve_archive(&state, &name, &meta.name).await;
    }

    let views = if query.search.is_empty() {
        list_files(&state.vfs, &name).await
    } else {
        search_files(&state.vfs, &name, &query.search).await
    }
    .map_err(|e| ServeError::not_found(e.to_string()))?;

    let listing = DirectoryListing::build(name, query.search, &url_path, &views).await;
    Ok(Html(state.renderer.render(&listing)).into_response())
}

/// Build the whole archive first so a traversal failure can still become a
/// clean 404.
async fn serve_archive<V: Vfs>(
    state: &AppState<V>,
    dir: &str,
    display_name: &str,
) -> Result<Response, ServeError> {
    let data = archive_dir(state.vfs.as_ref(), dir).await?;
    info!(dir, bytes = data.len(), "Serving archive");

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, ZIP_CONTENT_TYPE)
        .header(
            header::CONTENT_DISPOSITION,
            attachment_disposition(&archive_file_name(display_name)),
        )
        .header(header::CONTENT_LENGTH, data.len())
        .body(axum::body::Body::from(data))?;
    Ok(response)
}

/// 301 with only a `Location` header.
fn redirect(path: &str, raw_query: Option<&str>) -> Result<Response, ServeError> {
    let location = match raw_query {
        Some(q) if !q.is_empty() => format!("{}?{}", path, q),
        _ => path.to_string(),
    };
    let location = HeaderValue::from_str(&location)
        .map_err(|e| ServeError::internal(format!("bad redirect target {}: {}", location, e)))?;
    Ok((StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, location)]).into_response())
}

// =============================================================================
// Tests
// =============================================================================
