//! Listing page data and its default HTML rendering.
//!
//! [`DirectoryListing`] is plain data: it is all a renderer ever sees. The
//! server holds one [`ListingRenderer`] for its whole lifetime.

use serde::Serialize;

use crate::vfs::{canonicalize, Vfs, ROOT};

use super::view::{FileRow, FileView};

/// One link in the root-to-current-directory navigation chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Breadcrumb {
    pub name: String,
    pub href: String,
}

/// Everything needed to render a directory listing or search result page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryListing {
    pub title: String,
    pub search_query: String,
    pub breadcrumbs: Vec<Breadcrumb>,
    pub files: Vec<FileRow>,
}

impl DirectoryListing {
    /// Resolve `views` into rows and assemble the page for `url_path`.
    pub async fn build<V: Vfs>(
        title: impl Into<String>,
        search_query: impl Into<String>,
        url_path: &str,
        views: &[FileView<V>],
    ) -> Self {
        let mut files = Vec::with_capacity(views.len());
        for view in views {
            files.push(view.summarize().await);
        }
        Self {
            title: title.into(),
            search_query: search_query.into(),
            breadcrumbs: make_breadcrumbs(url_path),
            files,
        }
    }
}

/// Build breadcrumbs for a decoded URL path.
///
/// Hrefs are relative (`.`, `./..`, `./../..`, ...) so the page works at any
/// depth. The root alone yields a single `/` crumb.
pub fn make_breadcrumbs(url_path: &str) -> Vec<Breadcrumb> {
    let cleaned = canonicalize(url_path);
    if cleaned == ROOT {
        return vec![Breadcrumb {
            name: "/".to_string(),
            href: ".".to_string(),
        }];
    }

    let parts: Vec<&str> = std::iter::once("").chain(cleaned.split('/')).collect();
    let mut crumbs = Vec::with_capacity(parts.len());
    let mut href = String::from(".");
    for part in parts.iter().rev() {
        crumbs.push(Breadcrumb {
            name: format!("{}/", part),
            href: href.clone(),
        });
        href.push_str("/..");
    }
    crumbs.reverse();
    crumbs
}

// =============================================================================
// Rendering
// =============================================================================

/// Turns a [`DirectoryListing`] into a response body.
pub trait ListingRenderer: Send + Sync {
    fn render(&self, listing: &DirectoryListing) -> String;
}

/// Built-in HTML page for listings.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlRenderer;

/// Escape HTML special characters.
fn html_escape(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(c),
        }
    }
    result
}

impl ListingRenderer for HtmlRenderer {
    fn render(&self, listing: &DirectoryListing) -> String {
        let title = if listing.title == ROOT {
            "/".to_string()
        } else {
            format!("/{}/", listing.title)
        };

        let breadcrumbs: String = listing
            .breadcrumbs
            .iter()
            .map(|crumb| {
                format!(
                    r#"<a href="{}">{}</a>"#,
                    html_escape(&crumb.href),
                    html_escape(&crumb.name)
                )
            })
            .collect();

        let rows: String = listing
            .files
            .iter()
            .map(|file| {
                let class = if file.is_directory { "dir" } else { "file" };
                format!(
                    r#"
            <tr class="{class}">
                <td class="name"><a href="{href}">{name}</a></td>
                <td class="modified">{modified}</td>
                <td class="type">{mime}</td>
                <td class="size">{size}</td>
                <td class="download"><a href="{href}?download" download>download</a></td>
            </tr>"#,
                    class = class,
                    href = html_escape(&file.href),
                    name = html_escape(&file.name),
                    modified = html_escape(&file.date_modified),
                    mime = html_escape(&file.mime_type),
                    size = html_escape(&file.size),
                )
            })
            .collect();

        let summary = if listing.search_query.is_empty() {
            String::new()
        } else {
            format!(
                r#"<p class="summary">{} result(s) for <mark>{}</mark> &middot; <a href=".">clear</a></p>"#,
                listing.files.len(),
                html_escape(&listing.search_query)
            )
        };

        let empty = if listing.files.is_empty() {
            r#"<p class="empty">Nothing here.</p>"#
        } else {
            ""
        };

        format!(
            r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <link rel="stylesheet" href="_static/styles.css">
</head>
<body>
    <header>
        <nav class="breadcrumbs">{breadcrumbs}</nav>
        <form class="search" method="get" action=".">
            <input type="search" name="q" value="{search}" placeholder="Search this folder">
        </form>
        <a class="zip" href=".?download" download>download folder</a>
    </header>
    <main>
        {summary}
        <table>
            <thead>
                <tr><th>Name</th><th>Modified</th><th>Type</th><th>Size</th><th></th></tr>
            </thead>
            <tbody>{rows}
            </tbody>
        </table>
        {empty}
    </main>
</body>
</html>
"##,
            title = html_escape(&title),
            breadcrumbs = breadcrumbs,
            search = html_escape(&listing.search_query),
            summary = summary,
            rows = rows,
            empty = empty,
        )
    }
}
