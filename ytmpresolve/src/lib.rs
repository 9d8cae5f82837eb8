//! # YTMPResolve
//!
//! Turns video ids into playable audio URLs by shelling out to `yt-dlp`.
//!
//! One subprocess per resolution, bounded by a per-call deadline. The URLs
//! returned carry upstream-signed expiry parameters and go stale after a few
//! hours; callers own re-resolution.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};
use ytmpsource::{async_trait, Result, SourceError, UrlResolver};

/// Watch URL template the resolver hands to yt-dlp.
const WATCH_URL: &str = "https://music.youtube.com/watch?v=";

/// Resolver backed by the `yt-dlp` binary.
#[derive(Debug, Clone)]
pub struct YtDlpResolver {
    bin: String,
    call_timeout: Duration,
}

impl YtDlpResolver {
    /// `bin` is the yt-dlp executable (a bare name is looked up on PATH);
    /// `call_timeout` bounds one resolution end to end.
    pub fn new(bin: impl Into<String>, call_timeout: Duration) -> Self {
        Self {
            bin: bin.into(),
            call_timeout,
        }
    }

    async fn run(&self, video_id: &str) -> Result<String> {
        let url = format!("{WATCH_URL}{video_id}");

        let child = Command::new(&self.bin)
            .arg("--no-playlist")
            .arg("--format")
            .arg("bestaudio")
            .arg("--get-url")
            .arg(&url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SourceError::temporary(format!("cannot spawn {}: {e}", self.bin)))?;

        let output = match timeout(self.call_timeout, child.wait_with_output()).await {
            Ok(result) => {
                result.map_err(|e| SourceError::temporary(format!("yt-dlp wait failed: {e}")))?
            }
            Err(_elapsed) => {
                warn!(video_id, timeout = ?self.call_timeout, "Resolver call timed out");
                return Err(SourceError::Timeout);
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = stderr.trim();
            // Removed or region-locked videos never resolve; everything else
            // is worth a later retry.
            if stderr.contains("Video unavailable") || stderr.contains("Private video") {
                return Err(SourceError::not_found(format!("{video_id}: {stderr}")));
            }
            return Err(SourceError::temporary(format!(
                "yt-dlp exited with {}: {stderr}",
                output.status
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let resolved = stdout
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .ok_or_else(|| SourceError::temporary(format!("yt-dlp printed no URL for {video_id}")))?;

        debug!(video_id, "Resolved stream URL");
        Ok(resolved.to_string())
    }
}

#[async_trait]
impl UrlResolver for YtDlpResolver {
    async fn resolve(&self, video_id: &str) -> Result<String> {
        self.run(video_id).await
    }
}
