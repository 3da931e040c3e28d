//! Virtual filesystem layer.
//!
//! Every request goes through the [`Vfs`] trait rather than touching the host
//! filesystem directly. Paths handed to a `Vfs` are root-relative and must
//! satisfy [`is_valid_path`]; violations are rejected before storage is
//! consulted.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            Request handlers             │
//! └────────────────────┬────────────────────┘
//!                      │ canonicalize()
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │               Vfs Trait                 │
//! │  open / read_dir                        │
//! │  mkdir / remove / rename / write_file   │
//! └────────────────────┬────────────────────┘
//!                      │
//!          ┌───────────┴───────────┐
//!          ▼                       ▼
//! ┌─────────────────┐    ┌─────────────────────┐
//! │     DiskFs      │    │      MemoryFs       │
//! │  (host disk)    │    │  (tests, fixtures)  │
//! └─────────────────┘    └─────────────────────┘
//! ```
//!
//! Mutation is capability-gated: the four mutators have default
//! implementations that fail with [`VfsError::NoWritableRoot`], so a read-only
//! backend only has to implement `open` and `read_dir`.

mod disk;
mod memory;
mod path;

use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncSeek};

use crate::error::VfsError;

pub use disk::{DiskFile, DiskFs};
pub use memory::{MemoryFile, MemoryFs, DEFAULT_MODIFIED_SECS};
pub use path::{base_name, canonicalize, is_valid_path, join, parent, ROOT};

/// Default permission bits for directories created through the VFS.
pub const DEFAULT_DIR_MODE: u32 = 0o755;

/// Default permission bits for files created through the VFS.
pub const DEFAULT_FILE_MODE: u32 = 0o644;

// =============================================================================
// Metadata
// =============================================================================

/// Kind of a filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    File,
    Directory,
    /// Symlinks, devices, sockets and anything else that is not a plain file
    /// or directory
    Other,
}

/// Result of a stat call on an open handle or a directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    /// Final path segment (`.` for the root)
    pub name: String,
    pub kind: FileKind,
    /// Size in bytes (meaningless for directories)
    pub len: u64,
    pub modified: Option<SystemTime>,
}

impl Metadata {
    pub fn is_dir(&self) -> bool {
        self.kind == FileKind::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind == FileKind::File
    }
}

/// One child returned by [`Vfs::read_dir`].
///
/// `metadata` is `None` when the entry could be listed but not stat'ed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub kind: FileKind,
    pub metadata: Option<Metadata>,
}

impl DirEntry {
    pub fn is_dir(&self) -> bool {
        self.kind == FileKind::Directory
    }
}

// =============================================================================
// Traits
// =============================================================================

/// An open file or directory.
///
/// Handles are released when dropped. Reading a directory handle is an error.
#[async_trait]
pub trait VfsFile: AsyncRead + AsyncSeek + Send + Sync + Unpin {
    /// Fetch metadata for the opened entry.
    async fn stat(&self) -> Result<Metadata, VfsError>;
}

/// Capability set over a rooted tree of files.
#[async_trait]
pub trait Vfs: Send + Sync + 'static {
    /// The type of handle returned by [`Vfs::open`].
    type File: VfsFile + 'static;

    /// Open the entry at `path` for reading.
    ///
    /// Fails with `InvalidPath` for paths rejected by [`is_valid_path`] and
    /// `NotFound` when nothing exists there.
    async fn open(&self, path: &str) -> Result<Self::File, VfsError>;

    /// List the immediate children of the directory at `path`, sorted by name.
    async fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>, VfsError>;

    /// Create `path` and any missing parents. An existing directory is
    /// success.
    async fn mkdir(&self, _path: &str, _perm: u32) -> Result<(), VfsError> {
        Err(VfsError::NoWritableRoot)
    }

    /// Remove `path` recursively. A missing path is success. The root itself
    /// is refused with `InvalidPath`.
    async fn remove(&self, _path: &str) -> Result<(), VfsError> {
        Err(VfsError::NoWritableRoot)
    }

    /// Move `old_path` to `new_path`, failing with `AlreadyExists` rather than
    /// replacing an existing destination.
    async fn rename(&self, _old_path: &str, _new_path: &str) -> Result<(), VfsError> {
        Err(VfsError::NoWritableRoot)
    }

    /// Create a new file holding exactly `data`, failing with `AlreadyExists`
    /// if anything is already at `path`.
    async fn write_file(&self, _path: &str, _data: &[u8], _perm: u32) -> Result<(), VfsError> {
        Err(VfsError::NoWritableRoot)
    }
}

// =============================================================================
// Deferred Opener
// =============================================================================

/// A capability to open one path, invoked only when someone needs the bytes.
pub struct DeferredOpener<V: Vfs> {
    vfs: Arc<V>,
    path: String,
}

impl<V: Vfs> DeferredOpener<V> {
    pub fn new(vfs: Arc<V>, path: impl Into<String>) -> Self {
        Self {
            vfs,
            path: path.into(),
        }
    }

    /// The root-relative path this opener is bound to.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub async fn open(&self) -> Result<V::File, VfsError> {
        self.vfs.open(&self.path).await
    }
}

impl<V: Vfs> Clone for DeferredOpener<V> {
    fn clone(&self) -> Self {
        Self {
            vfs: Arc::clone(&self.vfs),
            path: self.path.clone(),
        }
    }
}

/// Validate `path` for `op`, returning the `InvalidPath` error on failure.
pub(crate) fn check_path(op: &'static str, path: &str) -> Result<(), VfsError> {
    if is_valid_path(path) {
        Ok(())
    } else {
        Err(VfsError::invalid(op, path))
    }
}
