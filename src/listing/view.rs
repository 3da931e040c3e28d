//! Per-entry formatting for directory listings.

use std::time::SystemTime;

use chrono::{DateTime, Local, TimeZone};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Serialize;
use tokio::sync::OnceCell;

use crate::vfs::{DeferredOpener, DirEntry, Vfs};

use super::mime;

/// MIME type reported for directories.
pub const DIRECTORY_MIME: &str = "directory";

/// Characters left alone when escaping a path for use in an href: letters,
/// digits, the unreserved marks and the sub-delimiters that are legal in a
/// path. Everything else, notably `?`, `#`, `%` and space, is escaped.
const PATH_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b',')
    .remove(b'/')
    .remove(b':')
    .remove(b';')
    .remove(b'=')
    .remove(b'@');

/// Listing format for modification times, e.g. `1/2/2006 3:04 PM`.
const DATE_FORMAT: &str = "%-m/%-d/%Y %-I:%M %p";

// =============================================================================
// FileView
// =============================================================================

/// A directory entry with lazily computed display fields.
///
/// Directories always render with a trailing `/` in both name and href; files
/// never do. Search results override the displayed path so entries at
/// different depths stay distinguishable.
pub struct FileView<V: Vfs> {
    entry: DirEntry,
    opener: DeferredOpener<V>,
    display_path: Option<String>,
    mime_type: OnceCell<String>,
}

impl<V: Vfs> FileView<V> {
    pub fn new(entry: DirEntry, opener: DeferredOpener<V>) -> Self {
        Self {
            entry,
            opener,
            display_path: None,
            mime_type: OnceCell::new(),
        }
    }

    /// Show `path` instead of the entry's own name in `name()` and `href()`.
    pub fn with_display_path(mut self, path: impl Into<String>) -> Self {
        self.display_path = Some(path.into());
        self
    }

    pub fn entry(&self) -> &DirEntry {
        &self.entry
    }

    pub fn is_dir(&self) -> bool {
        self.entry.is_dir()
    }

    fn base(&self) -> &str {
        self.display_path.as_deref().unwrap_or(&self.entry.name)
    }

    /// Display name: a trailing `/` marks directories.
    pub fn name(&self) -> String {
        if self.is_dir() {
            format!("{}/", self.base())
        } else {
            self.base().to_string()
        }
    }

    /// Relative href with URL-significant characters escaped.
    pub fn href(&self) -> String {
        escape_href(&self.name())
    }

    /// Modification time as `M/D/YYYY h:mm AM`, or `""` when unknown.
    pub fn date_modified(&self) -> String {
        self.entry
            .metadata
            .as_ref()
            .and_then(|meta| meta.modified)
            .map(format_modified)
            .unwrap_or_default()
    }

    /// Human-readable size; `""` for directories or when unknown.
    pub fn size(&self) -> String {
        if self.is_dir() {
            return String::new();
        }
        self.entry
            .metadata
            .as_ref()
            .map(|meta| format_size(meta.len))
            .unwrap_or_default()
    }

    /// MIME type by extension, falling back to content sniffing.
    ///
    /// The file is only opened when the extension is not recognized. The
    /// result is cached for the lifetime of this view; failures to open or
    /// rewind yield `""`.
    pub async fn mime_type(&self) -> String {
        if self.is_dir() {
            return DIRECTORY_MIME.to_string();
        }
        self.mime_type
            .get_or_init(|| async {
                if let Some(ctype) = mime::type_by_extension(mime::extension(&self.entry.name)) {
                    return ctype;
                }
                match self.opener.open().await {
                    Ok(mut file) => mime::resolve(&self.entry.name, &mut file)
                        .await
                        .unwrap_or_default(),
                    Err(_) => String::new(),
                }
            })
            .await
            .clone()
    }

    /// Resolve every display field into the row handed to the renderer.
    pub async fn summarize(&self) -> FileRow {
        FileRow {
            name: self.name(),
            href: self.href(),
            is_directory: self.is_dir(),
            date_modified: self.date_modified(),
            mime_type: self.mime_type().await,
            size: self.size(),
        }
    }
}

/// Fully resolved display fields for one listing row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRow {
    pub name: String,
    pub href: String,
    pub is_directory: bool,
    pub date_modified: String,
    pub mime_type: String,
    pub size: String,
}

// =============================================================================
// Formatting Helpers
// =============================================================================

/// Format a byte count with decimal units, truncating at each step.
///
/// `999` is `"999 B"`, `1000` is `"1 KB"`, `1_500_000` is `"1 MB"`. Anything
/// from 1000 GB upward stays in GB.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 3] = ["B", "KB", "MB"];

    let mut size = bytes;
    for unit in UNITS {
        if size < 1000 {
            return format!("{} {}", size, unit);
        }
        size /= 1000;
    }
    format!("{} GB", size)
}

/// Format a modification time in the local timezone.
pub fn format_modified(time: SystemTime) -> String {
    format_datetime(&DateTime::<Local>::from(time))
}

/// Format a timestamp as `M/D/YYYY h:mm AM` (no leading zeros on month, day
/// or hour).
pub fn format_datetime<Tz>(time: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    time.format(DATE_FORMAT).to_string()
}

/// Percent-encode a path, leaving `/` and the path-safe marks alone.
pub fn escape_path(path: &str) -> String {
    utf8_percent_encode(path, PATH_ESCAPE).to_string()
}

/// Escape a relative path so it can be used as an href.
///
/// A leading segment containing `:` is prefixed with `./` so it cannot be
/// mistaken for a URL scheme.
pub fn escape_href(path: &str) -> String {
    let escaped = escape_path(path);
    let first_segment = escaped.split('/').next().unwrap_or_default();
    if first_segment.contains(':') {
        format!("./{}", escaped)
    } else {
        escaped
    }
}
