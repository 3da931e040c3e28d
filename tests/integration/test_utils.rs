//! Test utilities: filesystem fixtures, filesystem doubles and request helpers.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tempfile::TempDir;
use tokio::io::{AsyncRead, AsyncSeek, ReadBuf};
use tower::ServiceExt;

use fileserver::{
    create_router, DirEntry, DiskFs, MemoryFs, Metadata, RouterConfig, Vfs, VfsError, VfsFile,
};
use fileserver::vfs::MemoryFile;

// =============================================================================
// Fixtures
// =============================================================================

/// Files of the reference tree, as `(path, contents)`.
pub const FIXTURE_FILES: &[(&str, &str)] = &[
    ("a", "a"),
    ("b/c", "b/c"),
    ("text.txt", "Hello world"),
    ("unknown", "<!DOCTYPE html>"),
    ("not-vid.mp4", "I am not actually a video"),
    ("empty", ""),
    ("?thing", ""),
    ("#thing", ""),
];

/// Empty directories of the reference tree.
pub const FIXTURE_DIRS: &[&str] = &["d"];

/// The reference tree held in memory.
pub fn fixture_fs() -> MemoryFs {
    let fs = FIXTURE_FILES
        .iter()
        .fold(MemoryFs::new(), |fs, (path, data)| fs.with_file(path, *data));
    FIXTURE_DIRS.iter().fold(fs, |fs, dir| fs.with_dir(dir))
}

/// The reference tree written to a temporary directory.
///
/// Keep the returned [`TempDir`] alive for as long as the filesystem is used.
pub fn disk_fixture() -> (TempDir, DiskFs) {
    let dir = TempDir::new().unwrap();
    for (path, data) in FIXTURE_FILES {
        let full = dir.path().join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(full, data).unwrap();
    }
    for path in FIXTURE_DIRS {
        std::fs::create_dir_all(dir.path().join(path)).unwrap();
    }
    let fs = DiskFs::read_only(dir.path());
    (dir, fs)
}

/// Router over `vfs` with request tracing off.
pub fn router<V: Vfs>(vfs: V) -> Router {
    create_router(vfs, RouterConfig::new().with_tracing(false))
}

// =============================================================================
// Filesystem Doubles
// =============================================================================

/// Opens like the wrapped filesystem, but every handle fails to stat.
pub struct FailingStatFs(pub MemoryFs);

pub struct FailingStatFile(MemoryFile);

#[async_trait]
impl VfsFile for FailingStatFile {
    async fn stat(&self) -> Result<Metadata, VfsError> {
        Err(VfsError::Internal {
            path: "/var/secret/location".to_string(),
            message: "permission denied".to_string(),
        })
    }
}

impl AsyncRead for FailingStatFile {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.0).poll_read(cx, buf)
    }
}

impl AsyncSeek for FailingStatFile {
    fn start_seek(mut self: Pin<&mut Self>, position: io::SeekFrom) -> io::Result<()> {
        Pin::new(&mut self.0).start_seek(position)
    }

    fn poll_complete(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<u64>> {
        Pin::new(&mut self.0).poll_complete(cx)
    }
}

#[async_trait]
impl Vfs for FailingStatFs {
    type File = FailingStatFile;

    async fn open(&self, path: &str) -> Result<Self::File, VfsError> {
        self.0.open(path).await.map(FailingStatFile)
    }

    async fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>, VfsError> {
        self.0.read_dir(path).await
    }
}

// =============================================================================
// Request Helpers
// =============================================================================

/// Send a GET for `uri`.
pub async fn get(router: Router, uri: &str) -> Response<Body> {
    send(router, Request::get(uri).body(Body::empty()).unwrap()).await
}

/// Send a GET for `uri` with one extra request header.
pub async fn get_with_header(
    router: Router,
    uri: &str,
    name: &str,
    value: &str,
) -> Response<Body> {
    let request = Request::get(uri)
        .header(name, value)
        .body(Body::empty())
        .unwrap();
    send(router, request).await
}

pub async fn send(router: Router, request: Request<Body>) -> Response<Body> {
    router.oneshot(request).await.unwrap()
}

/// Collect a response body.
pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_string(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}

/// Value of header `name`, or `None` when absent.
pub fn header<'a>(response: &'a Response<Body>, name: &str) -> Option<&'a str> {
    response
        .headers()
        .get(name)
        .map(|value| value.to_str().unwrap())
}
