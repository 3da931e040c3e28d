//! MIME type resolution.
//!
//! Resolution happens in two steps, matching what browsers expect from a
//! file server:
//!
//! 1. Look the file extension up in the extension table. `text/*` types get
//!    an explicit `charset=utf-8`.
//! 2. If the extension is unknown, read at most [`SNIFF_LEN`] bytes and run
//!    the content sniffer over them.
//!
//! The sniffer follows the WHATWG MIME sniffing signatures: HTML and XML
//! markers (after leading whitespace), document, image, audio/video, font and
//! archive magic bytes, then a binary-byte scan that decides between
//! `text/plain; charset=utf-8` and `application/octet-stream`.

use std::io::SeekFrom;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt};

/// Number of leading bytes the content sniffer considers.
pub const SNIFF_LEN: usize = 512;

/// MIME type used when nothing more specific is known.
pub const OCTET_STREAM: &str = "application/octet-stream";

const TEXT_PLAIN_UTF8: &str = "text/plain; charset=utf-8";

/// Extension of a file name including the dot, or `""`.
///
/// `"archive.tar.gz"` gives `".gz"`, `"README"` gives `""`, and `".profile"`
/// gives `".profile"`.
pub fn extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) => &name[idx..],
        None => "",
    }
}

/// Look up a MIME type by file extension (with or without the leading dot).
///
/// Returns `None` for unknown or empty extensions.
pub fn type_by_extension(ext: &str) -> Option<String> {
    let ext = ext.strip_prefix('.').unwrap_or(ext);
    if ext.is_empty() {
        return None;
    }
    let mime = mime_guess::from_ext(ext).first()?;
    if mime.type_() == mime_guess::mime::TEXT && mime.get_param("charset").is_none() {
        Some(format!("{}; charset=utf-8", mime.essence_str()))
    } else {
        Some(mime.to_string())
    }
}

/// Resolve the MIME type of `name`, sniffing `reader` when the extension does
/// not decide it.
///
/// After sniffing the reader is rewound to offset 0 so the caller can still
/// stream the whole content. Any read or seek failure yields `None`.
pub async fn resolve<R>(name: &str, reader: &mut R) -> Option<String>
where
    R: AsyncRead + AsyncSeek + Unpin + ?Sized,
{
    if let Some(ctype) = type_by_extension(extension(name)) {
        return Some(ctype);
    }

    let mut buf = [0u8; SNIFF_LEN];
    let n = read_prefix(reader, &mut buf).await.ok()?;
    let ctype = detect_content_type(&buf[..n]);
    reader.seek(SeekFrom::Start(0)).await.ok()?;
    Some(ctype.to_string())
}

async fn read_prefix<R>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

// =============================================================================
// Content Sniffing
// =============================================================================

/// Tags that mark a document as HTML when followed by a space or `>`.
const HTML_TAGS: &[&[u8]] = &[
    b"<!DOCTYPE HTML",
    b"<HTML",
    b"<HEAD",
    b"<SCRIPT",
    b"<IFRAME",
    b"<H1",
    b"<DIV",
    b"<FONT",
    b"<TABLE",
    b"<A",
    b"<STYLE",
    b"<TITLE",
    b"<B",
    b"<BODY",
    b"<BR",
    b"<P",
    b"<!--",
];

/// Exact-prefix signatures, checked in order.
const PREFIX_SIGNATURES: &[(&[u8], &str)] = &[
    (b"%PDF-", "application/pdf"),
    (b"%!PS-Adobe-", "application/postscript"),
    (b"\xFE\xFF", "text/plain; charset=utf-16be"),
    (b"\xFF\xFE", "text/plain; charset=utf-16le"),
    (b"\xEF\xBB\xBF", TEXT_PLAIN_UTF8),
    (b"\x00\x00\x01\x00", "image/x-icon"),
    (b"\x00\x00\x02\x00", "image/x-icon"),
    (b"BM", "image/bmp"),
    (b"GIF87a", "image/gif"),
    (b"GIF89a", "image/gif"),
    (b"\x89PNG\x0D\x0A\x1A\x0A", "image/png"),
    (b"\xFF\xD8\xFF", "image/jpeg"),
    (b"FORM", "audio/aiff"),
    (b"ID3", "audio/mpeg"),
    (b"OggS\x00", "application/ogg"),
    (b"MThd\x00\x00\x00\x06", "audio/midi"),
    (b"\x1A\x45\xDF\xA3", "video/webm"),
    (b"Rar!\x1A\x07\x00", "application/x-rar-compressed"),
    (b"Rar!\x1A\x07\x01\x00", "application/x-rar-compressed"),
    (b"\x00\x61\x73\x6D", "application/wasm"),
    (b"\x1F\x8B\x08", "application/x-gzip"),
    (b"PK\x03\x04", "application/zip"),
    (b"OTTO", "font/otf"),
    (b"ttcf", "font/collection"),
    (b"wOFF", "font/woff"),
    (b"wOF2", "font/woff2"),
    (b"\x00\x01\x00\x00", "font/ttf"),
];

/// `RIFF....<fourcc>` container signatures.
const RIFF_SIGNATURES: &[(&[u8], &str)] = &[
    (b"WEBPVP", "image/webp"),
    (b"WAVE", "audio/wave"),
    (b"AVI ", "video/avi"),
];

/// Sniff the MIME type of `data` (only the first [`SNIFF_LEN`] bytes are
/// considered). Always returns a type; the fallback is
/// `application/octet-stream`.
pub fn detect_content_type(data: &[u8]) -> &'static str {
    let data = &data[..data.len().min(SNIFF_LEN)];

    let trimmed = skip_whitespace(data);
    if HTML_TAGS.iter().any(|tag| matches_html_tag(trimmed, tag)) {
        return "text/html; charset=utf-8";
    }
    if trimmed.starts_with(b"<?xml") {
        return "text/xml; charset=utf-8";
    }

    for (magic, ctype) in PREFIX_SIGNATURES {
        if data.starts_with(magic) {
            // FORM is only AIFF with the right chunk id
            if *magic == b"FORM" && data.get(8..12) != Some(&b"AIFF"[..]) {
                continue;
            }
            return *ctype;
        }
    }

    if data.starts_with(b"RIFF") {
        if let Some(rest) = data.get(8..) {
            for (fourcc, ctype) in RIFF_SIGNATURES {
                if rest.starts_with(fourcc) {
                    return *ctype;
                }
            }
        }
    }

    if is_mp4(data) {
        return "video/mp4";
    }

    if data.iter().any(|&b| is_binary_byte(b)) {
        OCTET_STREAM
    } else {
        TEXT_PLAIN_UTF8
    }
}

fn skip_whitespace(data: &[u8]) -> &[u8] {
    let start = data
        .iter()
        .position(|b| !matches!(b, b'\t' | b'\n' | b'\x0C' | b'\r' | b' '))
        .unwrap_or(data.len());
    &data[start..]
}

/// Case-insensitive tag match followed by a tag-terminating byte.
fn matches_html_tag(data: &[u8], tag: &[u8]) -> bool {
    if data.len() <= tag.len() {
        return false;
    }
    let prefix_matches = data
        .iter()
        .zip(tag)
        .all(|(d, t)| d.to_ascii_uppercase() == *t);
    prefix_matches && matches!(data[tag.len()], b' ' | b'>')
}

/// ISO base media file: a big-endian box size then `ftyp` with an `mp4`
/// major or compatible brand.
fn is_mp4(data: &[u8]) -> bool {
    if data.len() < 12 {
        return false;
    }
    let box_size = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
    if box_size % 4 != 0 || box_size < 12 || data.len() < box_size {
        return false;
    }
    if &data[4..8] != b"ftyp" {
        return false;
    }
    (8..box_size).step_by(4).any(|st| {
        // bytes 12..16 hold the minor version, not a brand
        st != 12 && data.get(st..st + 3) == Some(&b"mp4"[..])
    })
}

fn is_binary_byte(b: u8) -> bool {
    matches!(b, 0x00..=0x08 | 0x0B | 0x0E..=0x1A | 0x1C..=0x1F)
}
