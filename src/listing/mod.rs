//! Directory listing layer.
//!
//! Turns VFS entries into display-ready rows and pages.
//!
//! # Components
//!
//! - [`FileView`]: One entry with lazy display fields (name, href, modified,
//!   MIME type, size)
//! - [`list_files`] / [`search_files`]: Immediate children or a recursive
//!   substring search
//! - [`DirectoryListing`]: The page data handed to a [`ListingRenderer`]
//! - [`mod@mime`]: Extension lookup and content sniffing

pub mod mime;

mod enumerate;
mod page;
mod view;

pub use enumerate::{list_files, search_files, walk_dir};
pub use page::{make_breadcrumbs, Breadcrumb, DirectoryListing, HtmlRenderer, ListingRenderer};
pub use view::{
    escape_href, escape_path, format_datetime, format_modified, format_size, FileRow, FileView,
    DIRECTORY_MIME,
};
