//! Listing integration tests: directory pages, breadcrumbs, search and the
//! custom renderer hook.

use std::sync::{Arc, Mutex};

use axum::http::StatusCode;

use fileserver::{
    create_router_with_renderer, DirectoryListing, ListingRenderer, MemoryFs, RouterConfig,
};

use super::test_utils::{body_string, fixture_fs, get, header, router};

/// Records every listing it is asked to render and renders nothing.
#[derive(Clone, Default)]
struct RecordingRenderer {
    pages: Arc<Mutex<Vec<DirectoryListing>>>,
}

impl RecordingRenderer {
    fn last(&self) -> DirectoryListing {
        self.pages.lock().unwrap().last().cloned().unwrap()
    }
}

impl ListingRenderer for RecordingRenderer {
    fn render(&self, listing: &DirectoryListing) -> String {
        self.pages.lock().unwrap().push(listing.clone());
        String::new()
    }
}

async fn render(fs: MemoryFs, uri: &str) -> DirectoryListing {
    let renderer = RecordingRenderer::default();
    let router = create_router_with_renderer(
        fs,
        renderer.clone(),
        RouterConfig::new().with_tracing(false),
    );
    let response = get(router, uri).await;
    assert_eq!(response.status(), StatusCode::OK, "{}", uri);
    renderer.last()
}

fn file_names(listing: &DirectoryListing) -> Vec<&str> {
    listing.files.iter().map(|f| f.name.as_str()).collect()
}

// =============================================================================
// Listing Data
// =============================================================================

#[tokio::test]
async fn test_root_listing() {
    let listing = render(fixture_fs(), "/").await;
    assert_eq!(listing.title, ".");
    assert_eq!(listing.search_query, "");
    assert_eq!(listing.breadcrumbs.len(), 1);
    assert_eq!(listing.breadcrumbs[0].name, "/");
    assert_eq!(listing.breadcrumbs[0].href, ".");

    assert_eq!(
        file_names(&listing),
        vec![
            "#thing",
            "?thing",
            "a",
            "b/",
            "d/",
            "empty",
            "not-vid.mp4",
            "text.txt",
            "unknown",
        ]
    );

    let b = listing.files.iter().find(|f| f.name == "b/").unwrap();
    assert!(b.is_directory);
    assert_eq!(b.href, "b/");
    assert_eq!(b.mime_type, "directory");
    assert_eq!(b.size, "");

    let text = listing.files.iter().find(|f| f.name == "text.txt").unwrap();
    assert!(!text.is_directory);
    assert_eq!(text.size, "11 B");
    assert_eq!(text.mime_type, "text/plain; charset=utf-8");
    assert!(!text.date_modified.is_empty());

    let odd = listing.files.iter().find(|f| f.name == "?thing").unwrap();
    assert_eq!(odd.href, "%3Fthing");
    let odd = listing.files.iter().find(|f| f.name == "#thing").unwrap();
    assert_eq!(odd.href, "%23thing");
}

#[tokio::test]
async fn test_nested_listing_breadcrumbs() {
    let listing = render(fixture_fs(), "/b/").await;
    assert_eq!(listing.title, "b");
    assert_eq!(file_names(&listing), vec!["c"]);

    let crumbs: Vec<_> = listing
        .breadcrumbs
        .iter()
        .map(|c| (c.name.as_str(), c.href.as_str()))
        .collect();
    assert_eq!(crumbs, vec![("/", "./.."), ("b/", ".")]);
}

#[tokio::test]
async fn test_empty_directory_listing() {
    let listing = render(fixture_fs(), "/d/").await;
    assert!(listing.files.is_empty());
}

// =============================================================================
// Search
// =============================================================================

#[tokio::test]
async fn test_search_from_root() {
    let listing = render(fixture_fs(), "/?q=c").await;
    assert_eq!(listing.search_query, "c");
    assert_eq!(file_names(&listing), vec!["b/c"]);
    assert_eq!(listing.files[0].href, "b/c");
}

#[tokio::test]
async fn test_search_paths_relative_to_directory() {
    let fs = MemoryFs::new()
        .with_file("docs/guide/intro.md", "# intro")
        .with_file("docs/guide/setup.md", "# setup")
        .with_file("docs/notes.txt", "notes")
        .with_dir("docs/guide/empty");

    let listing = render(fs, "/docs/?q=guide").await;
    assert_eq!(
        file_names(&listing),
        vec![
            "guide/",
            "guide/empty/",
            "guide/intro.md",
            "guide/setup.md"
        ]
    );

    let fs = MemoryFs::new().with_file("docs/guide/intro.md", "# intro");
    let listing = render(fs, "/docs/?q=docs").await;
    assert!(listing.files.is_empty());
}

#[tokio::test]
async fn test_search_query_is_decoded_and_case_sensitive() {
    let fs = MemoryFs::new()
        .with_file("My Photos/beach.jpg", "")
        .with_file("my photos/dog.jpg", "");

    let listing = render(fs, "/?q=My%20Photos").await;
    assert_eq!(file_names(&listing), vec!["My Photos/", "My Photos/beach.jpg"]);
    assert_eq!(listing.files[0].href, "My%20Photos/");
}

#[tokio::test]
async fn test_empty_query_lists_directory() {
    let listing = render(fixture_fs(), "/b/?q=").await;
    assert_eq!(listing.search_query, "");
    assert_eq!(file_names(&listing), vec!["c"]);
}

// =============================================================================
// HTML Page
// =============================================================================

#[tokio::test]
async fn test_html_page() {
    let response = get(router(fixture_fs()), "/b/").await;
    assert_eq!(
        header(&response, "content-type"),
        Some("text/html; charset=utf-8")
    );

    let html = body_string(response).await;
    assert!(html.contains("<title>/b/</title>"));
    assert!(html.contains(r#"href="_static/styles.css""#));
    assert!(html.contains(r#"<a href="./..">/</a>"#));
    assert!(html.contains(r#"<a href="c">c</a>"#));
    assert!(html.contains(r#"href="c?download""#));
    assert!(html.contains(r#"name="q""#));
}

#[tokio::test]
async fn test_html_search_page() {
    let response = get(router(fixture_fs()), "/?q=c").await;
    let html = body_string(response).await;
    assert!(html.contains(r#"<a href="b/c">b/c</a>"#));
    assert!(!html.contains("text.txt"));
    assert!(html.contains(r#"value="c""#));
}

#[tokio::test]
async fn test_html_escapes_file_names() {
    let fs = MemoryFs::new().with_file("<b>bold.txt", "x");
    let html = body_string(get(router(fs), "/").await).await;
    assert!(html.contains(">&lt;b&gt;bold.txt<"));
    assert!(html.contains(r#"href="%3Cb%3Ebold.txt""#));
    assert!(!html.contains("<b>bold"));
}

// =============================================================================
// Static Assets
// =============================================================================

#[tokio::test]
async fn test_stylesheet_served_at_any_depth() {
    for uri in ["/_static/styles.css", "/b/_static/styles.css", "/no/such/dir/_static/styles.css"] {
        let response = get(router(fixture_fs()), uri).await;
        assert_eq!(response.status(), StatusCode::OK, "{}", uri);
        assert_eq!(
            header(&response, "content-type"),
            Some("text/css; charset=utf-8")
        );
        assert!(body_string(response).await.contains("table"));
    }
}
