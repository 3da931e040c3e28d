//! Routing integration tests: status codes, redirects and content types.
//!
//! Tests verify:
//! - Files and directories with and without a trailing slash
//! - Redirects keep the query string and never carry a Content-Type
//! - Percent-encoded `?` and `#` name files instead of splitting the URL
//! - 404 and 500 responses are plain text and leak no storage detail

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};

use fileserver::MemoryFs;

use super::test_utils::{body_string, fixture_fs, get, header, router, send, FailingStatFs};

const HTML: &str = "text/html; charset=utf-8";
const TEXT: &str = "text/plain; charset=utf-8";

// =============================================================================
// Routing Table
// =============================================================================

#[tokio::test]
async fn test_routing_table() {
    let cases: &[(&str, StatusCode, Option<&str>)] = &[
        ("/", StatusCode::OK, Some(HTML)),
        ("/a", StatusCode::OK, Some(TEXT)),
        ("/a/", StatusCode::MOVED_PERMANENTLY, None),
        ("/b", StatusCode::MOVED_PERMANENTLY, None),
        ("/b/", StatusCode::OK, Some(HTML)),
        ("/b/c", StatusCode::OK, Some(TEXT)),
        ("/b/c/", StatusCode::MOVED_PERMANENTLY, None),
        ("/d", StatusCode::MOVED_PERMANENTLY, None),
        ("/d/", StatusCode::OK, Some(HTML)),
        ("/text.txt", StatusCode::OK, Some(TEXT)),
        ("/unknown", StatusCode::OK, Some(HTML)),
        ("/not-vid.mp4", StatusCode::OK, Some("video/mp4")),
        ("/empty", StatusCode::OK, Some(TEXT)),
        ("/?thing", StatusCode::OK, Some(HTML)),
        ("/%3Fthing", StatusCode::OK, Some(TEXT)),
        ("/%23thing", StatusCode::OK, Some(TEXT)),
    ];

    for (uri, status, content_type) in cases {
        let response = get(router(fixture_fs()), uri).await;
        assert_eq!(response.status(), *status, "status for {}", uri);
        assert_eq!(
            header(&response, "content-type"),
            *content_type,
            "content type for {}",
            uri
        );
    }
}

#[tokio::test]
async fn test_file_content() {
    let response = get(router(fixture_fs()), "/text.txt").await;
    assert_eq!(header(&response, "content-length"), Some("11"));
    assert_eq!(header(&response, "accept-ranges"), Some("bytes"));
    assert!(header(&response, "last-modified").is_some());
    assert!(header(&response, "content-disposition").is_none());
    assert_eq!(body_string(response).await, "Hello world");

    // sniffed content is streamed from the start
    let response = get(router(fixture_fs()), "/unknown").await;
    assert_eq!(body_string(response).await, "<!DOCTYPE html>");

    let response = get(router(fixture_fs()), "/not-vid.mp4").await;
    assert_eq!(body_string(response).await, "I am not actually a video");
}

// =============================================================================
// Redirects
// =============================================================================

#[tokio::test]
async fn test_redirect_locations() {
    let cases = [
        ("/a/", "/a"),
        ("/b", "/b/"),
        ("/b/c/", "/b/c"),
        ("/d", "/d/"),
        ("/b?q=c", "/b/?q=c"),
        ("/a/?download", "/a?download"),
        ("/%3Fthing/", "/%3Fthing"),
    ];

    for (uri, location) in cases {
        let response = get(router(fixture_fs()), uri).await;
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY, "{}", uri);
        assert_eq!(header(&response, "location"), Some(location), "{}", uri);
        assert!(
            header(&response, "content-type").is_none(),
            "redirect for {} must not carry a content type",
            uri
        );
        assert!(body_string(response).await.is_empty());
    }
}

#[tokio::test]
async fn test_redirect_location_keeps_colon_names_absolute() {
    let fs = || MemoryFs::new().with_dir("a:b").with_file("x:y", "x");

    let response = get(router(fs()), "/a:b").await;
    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(header(&response, "location"), Some("/a:b/"));

    let response = get(router(fs()), "/x:y/").await;
    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(header(&response, "location"), Some("/x:y"));
}

#[tokio::test]
async fn test_traversal_stays_inside_root() {
    let response = get(router(fixture_fs()), "/../../a").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "a");

    let response = get(router(fixture_fs()), "/b/../text.txt").await;
    assert_eq!(body_string(response).await, "Hello world");
}

// =============================================================================
// Errors
// =============================================================================

#[tokio::test]
async fn test_not_found() {
    for uri in ["/missing", "/b/missing", "/missing/", "/a/b"] {
        let response = get(router(fixture_fs()), uri).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", uri);
        assert_eq!(header(&response, "content-type"), Some(TEXT));
        assert_eq!(header(&response, "x-content-type-options"), Some("nosniff"));
        assert_eq!(body_string(response).await, "404 page not found\n");
    }
}

#[tokio::test]
async fn test_stat_failure_is_internal_error() {
    let fs = FailingStatFs(fixture_fs());
    let response = get(router(fs), "/a").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(header(&response, "content-type"), Some(TEXT));

    let body = body_string(response).await;
    assert_eq!(body, "Internal Server Error\n");
    assert!(!body.contains("/var/secret"));
}

// =============================================================================
// Methods
// =============================================================================

#[tokio::test]
async fn test_head_omits_body() {
    let request = Request::builder()
        .method(Method::HEAD)
        .uri("/text.txt")
        .body(Body::empty())
        .unwrap();
    let response = send(router(fixture_fs()), request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "content-type"), Some(TEXT));
    assert_eq!(header(&response, "content-length"), Some("11"));
    assert!(body_string(response).await.is_empty());
}

#[tokio::test]
async fn test_other_methods_rejected() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/a")
        .body(Body::empty())
        .unwrap();
    let response = send(router(fixture_fs()), request).await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
