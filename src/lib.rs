//! # fileserver
//!
//! Exposes a directory tree over HTTP: browse listings, download single files
//! (with range and conditional requests), download whole folders as zip
//! archives and search file names.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`vfs`] - Path canonicalization and the capability-gated filesystem
//!   abstraction, with host-disk and in-memory backends
//! - [`listing`] - Per-entry display formatting, MIME detection, listing and
//!   recursive search, listing page data and rendering
//! - [`archive`] - Zip archives of a subtree
//! - [`server`] - Axum router and the request dispatch state machine
//! - [`config`] - CLI and environment configuration
//!
//! ## Example
//!
//! ```rust,no_run
//! use fileserver::{create_router, DiskFs, RouterConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let router = create_router(DiskFs::read_only("./content"), RouterConfig::new());
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await.unwrap();
//!     axum::serve(listener, router).await.unwrap();
//! }
//! ```

pub mod archive;
pub mod config;
pub mod error;
pub mod listing;
pub mod server;
pub mod vfs;

// Re-export commonly used types
pub use archive::{archive_dir, archive_file_name};
pub use config::Config;
pub use error::{ArchiveError, VfsError};
pub use listing::{
    format_size, list_files, make_breadcrumbs, search_files, Breadcrumb, DirectoryListing,
    FileRow, FileView, HtmlRenderer, ListingRenderer,
};
pub use server::{create_router, create_router_with_renderer, AppState, RouterConfig, ServeError};
pub use vfs::{
    canonicalize, is_valid_path, DeferredOpener, DirEntry, DiskFs, FileKind, MemoryFs, Metadata,
    Vfs, VfsFile,
};
