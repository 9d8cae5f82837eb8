//! Drives the resolver with stand-in yt-dlp scripts.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::time::Duration;

use tempfile::TempDir;
use ytmpresolve::YtDlpResolver;
use ytmpsource::{SourceError, UrlResolver};

fn fake_ytdlp(dir: &TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("yt-dlp");
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[tokio::test]
async fn resolves_url_from_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let bin = fake_ytdlp(&dir, "echo 'https://upstream.example/audio?expire=123'");

    let resolver = YtDlpResolver::new(bin.to_str().unwrap(), Duration::from_secs(5));
    let url = resolver.resolve("dQw4w9WgXcQ").await.unwrap();

    assert_eq!(url, "https://upstream.example/audio?expire=123");
}

#[tokio::test]
async fn nonzero_exit_is_temporary() {
    let dir = tempfile::tempdir().unwrap();
    let bin = fake_ytdlp(&dir, "echo 'ERROR: connection reset' >&2; exit 1");

    let resolver = YtDlpResolver::new(bin.to_str().unwrap(), Duration::from_secs(5));
    let err = resolver.resolve("dQw4w9WgXcQ").await.unwrap_err();

    assert!(err.is_transient(), "expected transient, got {err:?}");
}

#[tokio::test]
async fn unavailable_video_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let bin = fake_ytdlp(&dir, "echo 'ERROR: Video unavailable' >&2; exit 1");

    let resolver = YtDlpResolver::new(bin.to_str().unwrap(), Duration::from_secs(5));
    let err = resolver.resolve("dQw4w9WgXcQ").await.unwrap_err();

    assert!(matches!(err, SourceError::NotFound(_)), "got {err:?}");
}

#[tokio::test]
async fn slow_resolution_times_out() {
    let dir = tempfile::tempdir().unwrap();
    let bin = fake_ytdlp(&dir, "sleep 5; echo never");

    let resolver = YtDlpResolver::new(bin.to_str().unwrap(), Duration::from_millis(200));
    let err = resolver.resolve("dQw4w9WgXcQ").await.unwrap_err();

    assert!(matches!(err, SourceError::Timeout), "got {err:?}");
}

#[tokio::test]
async fn empty_output_is_temporary() {
    let dir = tempfile::tempdir().unwrap();
    let bin = fake_ytdlp(&dir, "exit 0");

    let resolver = YtDlpResolver::new(bin.to_str().unwrap(), Duration::from_secs(5));
    let err = resolver.resolve("dQw4w9WgXcQ").await.unwrap_err();

    assert!(err.is_transient(), "expected transient, got {err:?}");
}

#[tokio::test]
async fn missing_binary_is_temporary() {
    let resolver = YtDlpResolver::new("/nonexistent/yt-dlp", Duration::from_secs(5));
    let err = resolver.resolve("dQw4w9WgXcQ").await.unwrap_err();

    assert!(err.is_transient(), "expected transient, got {err:?}");
}
