//! Zip archives of VFS subtrees.
//!
//! The compressed archive is assembled in memory and only handed to the
//! response once it is complete, so a traversal failure can still become a
//! clean error response instead of a truncated download.

use std::io::{Cursor, Write};
use std::time::SystemTime;

use bytes::Bytes;
use chrono::{DateTime, Datelike, Local, Timelike};
use tokio::io::AsyncReadExt;
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{ArchiveError, VfsError};
use crate::listing::walk_dir;
use crate::vfs::{FileKind, Vfs, DEFAULT_DIR_MODE, DEFAULT_FILE_MODE, ROOT};

/// MIME type of the produced archive.
pub const ZIP_CONTENT_TYPE: &str = "application/zip";

/// Size of the buffer used to copy file contents into the archive.
const COPY_CHUNK_SIZE: usize = 64 * 1024;

/// Zip every entry below `dir`, keyed by its path relative to `dir`.
///
/// Subdirectories become `name/` entries so empty folders survive. Entries
/// that are neither files nor directories (symlinks, devices) abort the
/// archive with [`ArchiveError::UnsupportedEntry`]. File contents are copied
/// into the compressor chunk by chunk, so only the compressed archive is held
/// in memory.
pub async fn archive_dir<V: Vfs + ?Sized>(vfs: &V, dir: &str) -> Result<Bytes, ArchiveError> {
    let mut walked = Vec::new();
    walk_dir(vfs, dir, |full_path, relative, entry| {
        walked.push((full_path, relative, entry));
    })
    .await?;

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let mut chunk = vec![0u8; COPY_CHUNK_SIZE];

    for (full_path, relative, entry) in walked {
        let options = entry_options(entry.metadata.as_ref().and_then(|meta| meta.modified));
        match entry.kind {
            FileKind::Directory => {
                zip.add_directory(
                    format!("{}/", relative),
                    options.unix_permissions(DEFAULT_DIR_MODE),
                )?;
            }
            FileKind::File => {
                let mut file = vfs.open(&full_path).await?;
                zip.start_file(relative, options.unix_permissions(DEFAULT_FILE_MODE))?;
                loop {
                    let n = file
                        .read(&mut chunk)
                        .await
                        .map_err(|e| VfsError::from_io(&full_path, e))?;
                    if n == 0 {
                        break;
                    }
                    zip.write_all(&chunk[..n])?;
                }
            }
            FileKind::Other => {
                return Err(ArchiveError::UnsupportedEntry { path: relative });
            }
        }
    }

    let buffer = zip.finish()?.into_inner();
    debug!(dir, bytes = buffer.len(), "Built archive");
    Ok(Bytes::from(buffer))
}

fn entry_options(modified: Option<SystemTime>) -> SimpleFileOptions {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    match modified.and_then(zip_time) {
        Some(time) => options.last_modified_time(time),
        None => options,
    }
}

/// Download filename for an archive of the directory called `name`.
///
/// The root directory has no name of its own and is called `root.zip`.
pub fn archive_file_name(name: &str) -> String {
    if name.is_empty() || name == ROOT {
        return "root.zip".to_string();
    }
    format!("{}.zip", name)
}

/// Convert a modification time to a zip (MS-DOS) timestamp in local time.
///
/// Returns `None` for times the format cannot represent (before 1980).
fn zip_time(time: SystemTime) -> Option<zip::DateTime> {
    let local = DateTime::<Local>::from(time);
    let year = u16::try_from(local.year()).ok()?;
    zip::DateTime::from_date_and_time(
        year,
        local.month() as u8,
        local.day() as u8,
        local.hour() as u8,
        local.minute() as u8,
        local.second() as u8,
    )
    .ok()
}
