//! Host-filesystem implementation of [`Vfs`].

use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use tokio::fs::{self, File};
use tokio::io::{AsyncRead, AsyncSeek, AsyncWriteExt, ReadBuf};
use tracing::debug;

use crate::error::VfsError;

use super::path::{base_name, ROOT};
use super::{check_path, DirEntry, FileKind, Metadata, Vfs, VfsFile};

/// A [`Vfs`] rooted at a directory on the host filesystem.
///
/// Reads resolve against `root`, following symlinks only while their target
/// stays inside it. Mutations resolve against the writable root,
/// which is absent for read-only instances; every mutation then fails with
/// [`VfsError::NoWritableRoot`].
#[derive(Debug, Clone)]
pub struct DiskFs {
    root: PathBuf,
    write_root: Option<PathBuf>,
}

impl DiskFs {
    /// Serve and allow mutation under `root`.
    ///
    /// An empty `root` leaves the filesystem without a writable root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let write_root = if root.as_os_str().is_empty() {
            None
        } else {
            Some(root.clone())
        };
        Self { root, write_root }
    }

    /// Serve `root` without any mutation capability.
    pub fn read_only(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_root: None,
        }
    }

    /// Get the directory being served.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether mutation operations can succeed.
    pub fn is_writable(&self) -> bool {
        self.write_root.is_some()
    }

    fn resolve(&self, op: &'static str, path: &str) -> Result<PathBuf, VfsError> {
        check_path(op, path)?;
        Ok(join_root(&self.root, path))
    }

    /// Resolve `path` through any symlinks and refuse targets outside the
    /// root, reporting them as missing.
    async fn resolve_confined(&self, op: &'static str, path: &str) -> Result<PathBuf, VfsError> {
        let full = self.resolve(op, path)?;
        let root = fs::canonicalize(&self.root)
            .await
            .map_err(|e| VfsError::from_io(path, e))?;
        let resolved = fs::canonicalize(&full)
            .await
            .map_err(|e| VfsError::from_io(path, e))?;
        if !resolved.starts_with(&root) {
            debug!(path, "Path resolves outside the root");
            return Err(VfsError::not_found(path));
        }
        Ok(resolved)
    }

    fn resolve_writable(&self, op: &'static str, path: &str) -> Result<PathBuf, VfsError> {
        let root = self.write_root.as_ref().ok_or(VfsError::NoWritableRoot)?;
        check_path(op, path)?;
        Ok(join_root(root, path))
    }
}

fn join_root(root: &Path, path: &str) -> PathBuf {
    if path == ROOT {
        root.to_path_buf()
    } else {
        root.join(path)
    }
}

fn kind_of(file_type: std::fs::FileType) -> FileKind {
    if file_type.is_dir() {
        FileKind::Directory
    } else if file_type.is_file() {
        FileKind::File
    } else {
        FileKind::Other
    }
}

fn metadata_from_std(name: &str, meta: &std::fs::Metadata) -> Metadata {
    Metadata {
        name: name.to_string(),
        kind: kind_of(meta.file_type()),
        len: meta.len(),
        modified: meta.modified().ok(),
    }
}

#[async_trait]
impl Vfs for DiskFs {
    type File = DiskFile;

    async fn open(&self, path: &str) -> Result<Self::File, VfsError> {
        let full = self.resolve_confined("open", path).await?;
        let file = File::open(&full)
            .await
            .map_err(|e| VfsError::from_io(path, e))?;
        Ok(DiskFile {
            name: base_name(path).to_string(),
            path: path.to_string(),
            file,
        })
    }

    async fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>, VfsError> {
        let full = self.resolve_confined("readdir", path).await?;
        let mut dir = fs::read_dir(&full)
            .await
            .map_err(|e| VfsError::from_io(path, e))?;

        let mut entries = Vec::new();
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| VfsError::from_io(path, e))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            let kind = match entry.file_type().await {
                Ok(file_type) => kind_of(file_type),
                Err(_) => FileKind::Other,
            };
            // Entry metadata does not follow symlinks, so a link reports as Other
            let metadata = entry
                .metadata()
                .await
                .ok()
                .map(|meta| metadata_from_std(&name, &meta));
            entries.push(DirEntry {
                name,
                kind,
                metadata,
            });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn mkdir(&self, path: &str, perm: u32) -> Result<(), VfsError> {
        let full = self.resolve_writable("mkdir", path)?;
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(perm);
        #[cfg(not(unix))]
        let _ = perm;

        builder
            .create(&full)
            .await
            .map_err(|e| VfsError::from_io(path, e))
    }

    async fn remove(&self, path: &str) -> Result<(), VfsError> {
        let full = self.resolve_writable("remove", path)?;
        if path == ROOT {
            return Err(VfsError::invalid("remove", path));
        }

        let meta = match fs::symlink_metadata(&full).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(VfsError::from_io(path, e)),
        };

        let result = if meta.is_dir() {
            fs::remove_dir_all(&full).await
        } else {
            fs::remove_file(&full).await
        };
        match result {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(VfsError::from_io(path, e)),
        }
    }

    async fn rename(&self, old_path: &str, new_path: &str) -> Result<(), VfsError> {
        let old_full = self.resolve_writable("rename", old_path)?;
        let new_full = self.resolve_writable("rename", new_path)?;
        if old_path == ROOT || new_path == ROOT {
            return Err(VfsError::invalid("rename", ROOT));
        }

        match fs::symlink_metadata(&new_full).await {
            Ok(_) => return Err(VfsError::already_exists(new_path)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(VfsError::from_io(new_path, e)),
        }

        debug!(from = old_path, to = new_path, "Renaming");
        fs::rename(&old_full, &new_full)
            .await
            .map_err(|e| VfsError::from_io(old_path, e))
    }

    async fn write_file(&self, path: &str, data: &[u8], perm: u32) -> Result<(), VfsError> {
        let full = self.resolve_writable("writefile", path)?;
        if path == ROOT {
            return Err(VfsError::already_exists(path));
        }

        let mut options = fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        options.mode(perm);
        #[cfg(not(unix))]
        let _ = perm;

        let mut file = options
            .open(&full)
            .await
            .map_err(|e| VfsError::from_io(path, e))?;
        file.write_all(data)
            .await
            .map_err(|e| VfsError::from_io(path, e))?;
        file.flush().await.map_err(|e| VfsError::from_io(path, e))
    }
}

// =============================================================================
// DiskFile
// =============================================================================

/// Open handle to a file or directory under a [`DiskFs`] root.
#[derive(Debug)]
pub struct DiskFile {
    name: String,
    path: String,
    file: File,
}

#[async_trait]
impl VfsFile for DiskFile {
    async fn stat(&self) -> Result<Metadata, VfsError> {
        let meta = self
            .file
            .metadata()
            .await
            .map_err(|e| VfsError::from_io(&self.path, e))?;
        Ok(metadata_from_std(&self.name, &meta))
    }
}

impl AsyncRead for DiskFile {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.file).poll_read(cx, buf)
    }
}

impl AsyncSeek for DiskFile {
    fn start_seek(mut self: Pin<&mut Self>, position: io::SeekFrom) -> io::Result<()> {
        Pin::new(&mut self.file).start_seek(position)
    }

    fn poll_complete(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<u64>> {
        Pin::new(&mut self.file).poll_complete(cx)
    }
}
