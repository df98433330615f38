//! Fetch tests against a local HTTP server.

mod common;

use common::archive_server::{self, Behavior};
use scf_common::config::Config;
use scf_common::error::ScfError;
use scf_common::model::Checksum;
use scf_net::{fetch_archive, sha256_file, verify_checksum};
use tempfile::tempdir;

fn local_config(prefix: &std::path::Path) -> Config {
    let mut config = Config::with_prefix(prefix);
    config.allow_http = true;
    config
}

#[tokio::test]
async fn fetch_writes_the_served_bytes() {
    let body: Vec<u8> = (0u8..=255).cycle().take(40 * 1024).collect();
    let server = archive_server::start(body.clone(), Behavior::Ok);
    let dir = tempdir().unwrap();
    let config = local_config(dir.path());

    let fetched = fetch_archive(
        "spacecleaner",
        &server.url_for("v0.1.0.tar.gz"),
        &dir.path().join("staging"),
        "v0.1.0.tar.gz",
        &config,
    )
    .await
    .expect("fetch");

    assert_eq!(fetched.size_bytes, body.len() as u64);
    assert_eq!(std::fs::read(&fetched.path).unwrap(), body);
    assert!(!dir.path().join("staging/.v0.1.0.tar.gz.download").exists());

    let digest = sha256_file(&fetched.path).unwrap();
    let expected = Checksum::parse(&digest).unwrap();
    assert!(verify_checksum(&fetched.path, &expected).is_ok());
}

#[tokio::test]
async fn not_found_is_a_fetch_error() {
    let server = archive_server::start(Vec::new(), Behavior::Status(404));
    let dir = tempdir().unwrap();
    let err = fetch_archive(
        "spacecleaner",
        &server.url_for("v0.1.0.tar.gz"),
        dir.path(),
        "v0.1.0.tar.gz",
        &local_config(dir.path()),
    )
    .await
    .unwrap_err();

    match err {
        ScfError::FetchError { reason, .. } => assert!(reason.contains("404")),
        other => panic!("expected FetchError, got {other:?}"),
    }
    assert!(!dir.path().join("v0.1.0.tar.gz").exists());
}

#[tokio::test]
async fn truncated_transfer_is_a_fetch_error_and_leaves_nothing_behind() {
    let body = vec![7u8; 8192];
    let server = archive_server::start(body, Behavior::TruncateAfter(100));
    let dir = tempdir().unwrap();
    let err = fetch_archive(
        "spacecleaner",
        &server.url_for("v0.1.0.tar.gz"),
        dir.path(),
        "v0.1.0.tar.gz",
        &local_config(dir.path()),
    )
    .await
    .unwrap_err();

    assert_eq!(err.category(), "FetchError");
    assert!(!dir.path().join("v0.1.0.tar.gz").exists());
    assert!(!dir.path().join(".v0.1.0.tar.gz.download").exists());
}

#[tokio::test]
async fn unreachable_host_is_a_fetch_error() {
    // Bind then drop to get a port nothing listens on.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let dir = tempdir().unwrap();
    let err = fetch_archive(
        "spacecleaner",
        &format!("http://127.0.0.1:{port}/v0.1.0.tar.gz"),
        dir.path(),
        "v0.1.0.tar.gz",
        &local_config(dir.path()),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ScfError::FetchError { .. }));
}

#[tokio::test]
async fn plain_http_is_refused_by_default() {
    let server = archive_server::start(vec![1, 2, 3], Behavior::Ok);
    let dir = tempdir().unwrap();
    let err = fetch_archive(
        "spacecleaner",
        &server.url_for("v0.1.0.tar.gz"),
        dir.path(),
        "v0.1.0.tar.gz",
        &Config::with_prefix(dir.path()),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ScfError::ValidationError(_)));
    assert_eq!(server.hits(), 0);
}
