//! In-memory implementation of [`Vfs`] for tests and fixtures.

use std::collections::BTreeMap;
use std::io::{self, Cursor};
use std::pin::Pin;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::task::{Context, Poll};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncSeek, ReadBuf};

use crate::error::VfsError;

use super::path::{base_name, join, parent, ROOT};
use super::{check_path, DirEntry, FileKind, Metadata, Vfs, VfsFile};

/// Modification time given to entries created without an explicit one
/// (2023-11-14 22:13:20 UTC), so fixtures render deterministically.
pub const DEFAULT_MODIFIED_SECS: u64 = 1_700_000_000;

#[derive(Debug, Clone)]
enum Node {
    File { data: Bytes, modified: SystemTime },
    Dir { modified: SystemTime },
    Symlink { target: String },
}

impl Node {
    fn kind(&self) -> FileKind {
        match self {
            Node::File { .. } => FileKind::File,
            Node::Dir { .. } => FileKind::Directory,
            Node::Symlink { .. } => FileKind::Other,
        }
    }

    fn metadata(&self, name: &str) -> Metadata {
        match self {
            Node::File { data, modified } => Metadata {
                name: name.to_string(),
                kind: FileKind::File,
                len: data.len() as u64,
                modified: Some(*modified),
            },
            Node::Dir { modified } => Metadata {
                name: name.to_string(),
                kind: FileKind::Directory,
                len: 0,
                modified: Some(*modified),
            },
            Node::Symlink { target } => Metadata {
                name: name.to_string(),
                kind: FileKind::Other,
                len: target.len() as u64,
                modified: None,
            },
        }
    }
}

/// A [`Vfs`] whose tree lives in a map keyed by root-relative path.
///
/// Parent directories are created implicitly by the builder methods, so a
/// fixture only needs to name its leaves.
///
/// # Example
///
/// ```
/// use fileserver::vfs::MemoryFs;
///
/// let fs = MemoryFs::new()
///     .with_file("a", "a")
///     .with_file("b/c", "b/c")
///     .with_dir("d");
/// ```
#[derive(Debug)]
pub struct MemoryFs {
    nodes: RwLock<BTreeMap<String, Node>>,
    writable: bool,
}

impl Default for MemoryFs {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryFs {
    /// Create an empty, writable tree.
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(
            ROOT.to_string(),
            Node::Dir {
                modified: default_modified(),
            },
        );
        Self {
            nodes: RwLock::new(nodes),
            writable: true,
        }
    }

    /// Disable mutation through the [`Vfs`] trait. Builder methods still work.
    pub fn read_only(mut self) -> Self {
        self.writable = false;
        self
    }

    /// Add a file, creating parent directories as needed.
    pub fn with_file(self, path: &str, data: impl Into<Bytes>) -> Self {
        self.with_file_modified(path, data, default_modified())
    }

    /// Add a file with an explicit modification time.
    pub fn with_file_modified(
        mut self,
        path: &str,
        data: impl Into<Bytes>,
        modified: SystemTime,
    ) -> Self {
        let nodes = self.nodes_mut();
        insert_parents(nodes, path);
        nodes.insert(
            path.to_string(),
            Node::File {
                data: data.into(),
                modified,
            },
        );
        self
    }

    /// Add an (empty) directory, creating parents as needed.
    pub fn with_dir(mut self, path: &str) -> Self {
        let nodes = self.nodes_mut();
        insert_parents(nodes, path);
        nodes.entry(path.to_string()).or_insert(Node::Dir {
            modified: default_modified(),
        });
        self
    }

    /// Add a symbolic link pointing at another root-relative path.
    pub fn with_symlink(mut self, path: &str, target: &str) -> Self {
        let nodes = self.nodes_mut();
        insert_parents(nodes, path);
        nodes.insert(
            path.to_string(),
            Node::Symlink {
                target: target.to_string(),
            },
        );
        self
    }

    fn nodes_mut(&mut self) -> &mut BTreeMap<String, Node> {
        self.nodes.get_mut().unwrap_or_else(PoisonError::into_inner)
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, Node>> {
        self.nodes.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<String, Node>>, VfsError> {
        if !self.writable {
            return Err(VfsError::NoWritableRoot);
        }
        Ok(self.nodes.write().unwrap_or_else(PoisonError::into_inner))
    }
}

fn default_modified() -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(DEFAULT_MODIFIED_SECS)
}

fn insert_parents(nodes: &mut BTreeMap<String, Node>, path: &str) {
    let mut dir = parent(path);
    while dir != ROOT {
        nodes.entry(dir.to_string()).or_insert(Node::Dir {
            modified: default_modified(),
        });
        dir = parent(dir);
    }
}

fn is_descendant(path: &str, ancestor: &str) -> bool {
    ancestor == ROOT || path.strip_prefix(ancestor).is_some_and(|rest| rest.starts_with('/'))
}

/// Symlinks followed per path segment before giving up.
const MAX_LINK_HOPS: usize = 8;

/// Rewrite `path` so that no segment of it is a symlink, the way the host
/// filesystem resolves a path on open.
fn resolve_links(nodes: &BTreeMap<String, Node>, path: &str) -> Result<String, VfsError> {
    if path == ROOT {
        return Ok(ROOT.to_string());
    }

    let mut resolved = ROOT.to_string();
    for segment in path.split('/') {
        let mut next = join(&resolved, segment);
        let mut hops = 0;
        while let Some(Node::Symlink { target }) = nodes.get(&next) {
            hops += 1;
            if hops > MAX_LINK_HOPS {
                return Err(VfsError::Internal {
                    path: path.to_string(),
                    message: "too many levels of symbolic links".to_string(),
                });
            }
            next = target.clone();
        }
        resolved = next;
    }
    Ok(resolved)
}

fn require_dir(nodes: &BTreeMap<String, Node>, path: &str) -> Result<(), VfsError> {
    match nodes.get(path) {
        Some(Node::Dir { .. }) => Ok(()),
        Some(_) => Err(VfsError::Internal {
            path: path.to_string(),
            message: "not a directory".to_string(),
        }),
        None => Err(VfsError::not_found(path)),
    }
}

#[async_trait]
impl Vfs for MemoryFs {
    type File = MemoryFile;

    async fn open(&self, path: &str) -> Result<Self::File, VfsError> {
        check_path("open", path)?;
        let nodes = self.read();

        let resolved = resolve_links(&nodes, path)?;
        let node = nodes
            .get(&resolved)
            .ok_or_else(|| VfsError::not_found(path))?;

        let data = match node {
            Node::File { data, .. } => data.clone(),
            _ => Bytes::new(),
        };
        Ok(MemoryFile {
            meta: node.metadata(base_name(path)),
            cursor: Cursor::new(data),
        })
    }

    async fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>, VfsError> {
        check_path("readdir", path)?;
        let nodes = self.read();
        let resolved = resolve_links(&nodes, path)?;
        match nodes.get(&resolved) {
            Some(Node::Dir { .. }) => {}
            Some(_) => {
                return Err(VfsError::Internal {
                    path: path.to_string(),
                    message: "not a directory".to_string(),
                })
            }
            None => return Err(VfsError::not_found(path)),
        }

        Ok(nodes
            .iter()
            .filter(|(key, _)| key.as_str() != ROOT && parent(key) == resolved)
            .map(|(key, node)| {
                let name = base_name(key);
                DirEntry {
                    name: name.to_string(),
                    kind: node.kind(),
                    metadata: Some(node.metadata(name)),
                }
            })
            .collect())
    }

    async fn mkdir(&self, path: &str, _perm: u32) -> Result<(), VfsError> {
        let mut nodes = self.write()?;
        check_path("mkdir", path)?;

        let mut missing = Vec::new();
        let mut dir = path;
        while dir != ROOT {
            match nodes.get(dir) {
                Some(Node::Dir { .. }) => break,
                Some(_) => {
                    return Err(VfsError::Internal {
                        path: dir.to_string(),
                        message: "not a directory".to_string(),
                    })
                }
                None => missing.push(dir.to_string()),
            }
            dir = parent(dir);
        }

        for dir in missing {
            nodes.insert(
                dir,
                Node::Dir {
                    modified: SystemTime::now(),
                },
            );
        }
        Ok(())
    }

    async fn remove(&self, path: &str) -> Result<(), VfsError> {
        let mut nodes = self.write()?;
        check_path("remove", path)?;
        if path == ROOT {
            return Err(VfsError::invalid("remove", path));
        }

        nodes.retain(|key, _| key != path && !is_descendant(key, path));
        Ok(())
    }

    async fn rename(&self, old_path: &str, new_path: &str) -> Result<(), VfsError> {
        let mut nodes = self.write()?;
        check_path("rename", old_path)?;
        check_path("rename", new_path)?;
        if old_path == ROOT || new_path == ROOT || is_descendant(new_path, old_path) {
            return Err(VfsError::invalid("rename", new_path));
        }

        if nodes.contains_key(new_path) {
            return Err(VfsError::already_exists(new_path));
        }
        if !nodes.contains_key(old_path) {
            return Err(VfsError::not_found(old_path));
        }
        require_dir(&nodes, parent(new_path))?;

        let moved: Vec<String> = nodes
            .keys()
            .filter(|key| key.as_str() == old_path || is_descendant(key, old_path))
            .cloned()
            .collect();
        for key in moved {
            if let Some(node) = nodes.remove(&key) {
                let renamed = format!("{}{}", new_path, &key[old_path.len()..]);
                nodes.insert(renamed, node);
            }
        }
        Ok(())
    }

    async fn write_file(&self, path: &str, data: &[u8], _perm: u32) -> Result<(), VfsError> {
        let mut nodes = self.write()?;
        check_path("writefile", path)?;

        if nodes.contains_key(path) {
            return Err(VfsError::already_exists(path));
        }
        require_dir(&nodes, parent(path))?;

        nodes.insert(
            path.to_string(),
            Node::File {
                data: Bytes::copy_from_slice(data),
                modified: SystemTime::now(),
            },
        );
        Ok(())
    }
}

// =============================================================================
// MemoryFile
// =============================================================================

/// Open handle into a [`MemoryFs`]. Holds its own snapshot of the bytes.
#[derive(Debug)]
pub struct MemoryFile {
    meta: Metadata,
    cursor: Cursor<Bytes>,
}

#[async_trait]
impl VfsFile for MemoryFile {
    async fn stat(&self) -> Result<Metadata, VfsError> {
        Ok(self.meta.clone())
    }
}

impl AsyncRead for MemoryFile {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.cursor).poll_read(cx, buf)
    }
}

impl AsyncSeek for MemoryFile {
    fn start_seek(mut self: Pin<&mut Self>, position: io::SeekFrom) -> io::Result<()> {
        Pin::new(&mut self.cursor).start_seek(position)
    }

    fn poll_complete(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<u64>> {
        Pin::new(&mut self.cursor).poll_complete(cx)
    }
}
