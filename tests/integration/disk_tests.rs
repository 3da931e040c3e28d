//! The routing behavior against a real directory on disk.

use std::io::Cursor;

use axum::http::StatusCode;

use super::test_utils::{body_bytes, body_string, disk_fixture, fixture_fs, get, header, router};

#[tokio::test]
async fn test_disk_routing() {
    let (_dir, fs) = disk_fixture();

    let cases: &[(&str, StatusCode)] = &[
        ("/", StatusCode::OK),
        ("/a", StatusCode::OK),
        ("/a/", StatusCode::MOVED_PERMANENTLY),
        ("/b", StatusCode::MOVED_PERMANENTLY),
        ("/b/", StatusCode::OK),
        ("/b/c/", StatusCode::MOVED_PERMANENTLY),
        ("/d/", StatusCode::OK),
        ("/%3Fthing", StatusCode::OK),
        ("/%23thing", StatusCode::OK),
        ("/missing", StatusCode::NOT_FOUND),
        ("/a/b", StatusCode::NOT_FOUND),
    ];
    for (uri, status) in cases {
        let response = get(router(fs.clone()), uri).await;
        assert_eq!(response.status(), *status, "{}", uri);
    }
}

#[tokio::test]
async fn test_disk_file_content_and_type() {
    let (_dir, fs) = disk_fixture();

    let response = get(router(fs.clone()), "/b/c").await;
    assert_eq!(
        header(&response, "content-type"),
        Some("text/plain; charset=utf-8")
    );
    assert_eq!(body_string(response).await, "b/c");

    let response = get(router(fs.clone()), "/unknown").await;
    assert_eq!(
        header(&response, "content-type"),
        Some("text/html; charset=utf-8")
    );
    assert_eq!(body_string(response).await, "<!DOCTYPE html>");

    let response = get(router(fs), "/not-vid.mp4").await;
    assert_eq!(header(&response, "content-type"), Some("video/mp4"));
}

#[tokio::test]
async fn test_disk_listing_and_search() {
    let (_dir, fs) = disk_fixture();

    let html = body_string(get(router(fs.clone()), "/").await).await;
    assert!(html.contains(r#"<a href="b/">b/</a>"#));
    assert!(html.contains(r#"<a href="%3Fthing">?thing</a>"#));
    assert!(html.contains("11 B"));

    let html = body_string(get(router(fs), "/?q=c").await).await;
    assert!(html.contains(r#"<a href="b/c">b/c</a>"#));
    assert!(!html.contains("text.txt"));
}

#[tokio::test]
async fn test_disk_archive() {
    let (_dir, fs) = disk_fixture();

    let response = get(router(fs), "/b/?download").await;
    assert_eq!(response.status(), StatusCode::OK);
    let archive = zip::ZipArchive::new(Cursor::new(body_bytes(response).await)).unwrap();
    assert_eq!(archive.file_names().collect::<Vec<_>>(), vec!["c"]);
}

#[cfg(unix)]
#[tokio::test]
async fn test_disk_archive_with_symlink_is_not_found() {
    let (dir, fs) = disk_fixture();
    std::os::unix::fs::symlink(dir.path().join("a"), dir.path().join("b/link")).unwrap();

    let response = get(router(fs), "/b/?download").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[cfg(unix)]
#[tokio::test]
async fn test_symlink_out_of_root_is_not_found() {
    let (dir, fs) = disk_fixture();
    let outside = tempfile::tempdir().unwrap();
    std::fs::write(outside.path().join("secret"), "TOPSECRET").unwrap();
    std::os::unix::fs::symlink(outside.path().join("secret"), dir.path().join("leak")).unwrap();
    std::os::unix::fs::symlink(outside.path(), dir.path().join("away")).unwrap();

    for uri in ["/leak", "/away/", "/away/secret"] {
        let response = get(router(fs.clone()), uri).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", uri);
        assert_eq!(body_string(response).await, "404 page not found\n");
    }
}

#[cfg(unix)]
#[tokio::test]
async fn test_directory_symlink_behaves_like_memory_backend() {
    let (dir, disk) = disk_fixture();
    std::os::unix::fs::symlink(dir.path().join("b"), dir.path().join("link")).unwrap();
    let memory = || fixture_fs().with_symlink("link", "b");

    let cases = [
        ("/link", StatusCode::MOVED_PERMANENTLY),
        ("/link/", StatusCode::OK),
        ("/link/c", StatusCode::OK),
        ("/link/?q=c", StatusCode::OK),
        ("/link/?download", StatusCode::OK),
    ];
    for (uri, status) in cases {
        let from_disk = get(router(disk.clone()), uri).await;
        let from_memory = get(router(memory()), uri).await;
        assert_eq!(from_disk.status(), status, "disk {}", uri);
        assert_eq!(from_memory.status(), status, "memory {}", uri);
        assert_eq!(
            header(&from_disk, "content-type"),
            header(&from_memory, "content-type"),
            "{}",
            uri
        );
        assert_eq!(
            header(&from_disk, "location"),
            header(&from_memory, "location"),
            "{}",
            uri
        );
    }

    let from_disk = body_string(get(router(disk.clone()), "/link/c").await).await;
    let from_memory = body_string(get(router(memory()), "/link/c").await).await;
    assert_eq!(from_disk, "b/c");
    assert_eq!(from_memory, from_disk);

    let html = body_string(get(router(disk), "/link/").await).await;
    assert!(html.contains(r#"<a href="c">c</a>"#));
    let html = body_string(get(router(memory()), "/link/").await).await;
    assert!(html.contains(r#"<a href="c">c</a>"#));
}
