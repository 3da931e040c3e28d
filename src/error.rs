use std::io;

use thiserror::Error;

/// Errors returned by [`Vfs`](crate::vfs::Vfs) operations.
///
/// None of these carry host paths: every `path` is the root-relative path the
/// caller passed in.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VfsError {
    /// Path failed the valid-path predicate and never reached storage
    #[error("{op} {path}: invalid path")]
    InvalidPath { op: &'static str, path: String },

    /// Nothing exists at the path
    #[error("{path}: not found")]
    NotFound { path: String },

    /// Destination of a non-clobbering create or rename already exists
    #[error("{path}: already exists")]
    AlreadyExists { path: String },

    /// Mutation attempted on a filesystem without a writable root
    #[error("filesystem has no writable root")]
    NoWritableRoot,

    /// Storage failure (permission denied, metadata unavailable, ...)
    #[error("{path}: {message}")]
    Internal { path: String, message: String },
}

impl VfsError {
    /// Classify an I/O error from the underlying storage.
    pub fn from_io(path: &str, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => VfsError::NotFound {
                path: path.to_string(),
            },
            io::ErrorKind::AlreadyExists => VfsError::AlreadyExists {
                path: path.to_string(),
            },
            _ => VfsError::Internal {
                path: path.to_string(),
                message: err.to_string(),
            },
        }
    }

    pub fn invalid(op: &'static str, path: &str) -> Self {
        VfsError::InvalidPath {
            op,
            path: path.to_string(),
        }
    }

    pub fn not_found(path: &str) -> Self {
        VfsError::NotFound {
            path: path.to_string(),
        }
    }

    pub fn already_exists(path: &str) -> Self {
        VfsError::AlreadyExists {
            path: path.to_string(),
        }
    }
}

/// Errors that can occur while building a zip archive of a subtree.
#[derive(Debug, Clone, Error)]
pub enum ArchiveError {
    /// Traversal or read failure in the filesystem
    #[error("filesystem error: {0}")]
    Vfs(#[from] VfsError),

    /// Entry that is neither a regular file nor a directory (e.g. a symlink)
    #[error("{path}: unsupported entry type")]
    UnsupportedEntry { path: String },

    /// Zip writer failure
    #[error("zip error: {message}")]
    Zip { message: String },
}

impl From<zip::result::ZipError> for ArchiveError {
    fn from(err: zip::result::ZipError) -> Self {
        ArchiveError::Zip {
            message: err.to_string(),
        }
    }
}

impl From<io::Error> for ArchiveError {
    fn from(err: io::Error) -> Self {
        ArchiveError::Zip {
            message: err.to_string(),
        }
    }
}
