//! Unix command socket
//!
//! Line-oriented: one UTF-8 command per connection, one JSON object plus
//! newline back. The protocol is exactly four commands (`sync`, `status`,
//! `list`, `quit`); anything else gets a JSON error reply.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::daemon::Daemon;

pub(crate) struct CommandServer {
    listener: UnixListener,
    path: PathBuf,
}

impl CommandServer {
    /// Binds the socket, unlinking a stale file first, and restricts it to
    /// the owning user.
    pub(crate) fn bind(path: &Path) -> Result<Self> {
        if path.exists() {
            warn!(path = %path.display(), "Stale command socket, unlinking");
            let _ = fs::remove_file(path);
        }

        let listener = UnixListener::bind(path)
            .with_context(|| format!("binding command socket {}", path.display()))?;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .with_context(|| format!("restricting {}", path.display()))?;

        info!(path = %path.display(), "Command socket ready");
        Ok(Self {
            listener,
            path: path.to_path_buf(),
        })
    }

    /// Accept loop; returns (and unlinks the socket) once `shutdown` fires.
    pub(crate) async fn run(self, daemon: Daemon, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, _addr)) => {
                            let daemon = daemon.clone();
                            tokio::spawn(handle_connection(stream, daemon));
                        }
                        Err(e) => {
                            warn!(error = %e, "Command socket accept failed");
                        }
                    }
                }
            }
        }

        let _ = fs::remove_file(&self.path);
        debug!("Command socket closed");
    }
}

async fn handle_connection(stream: UnixStream, daemon: Daemon) {
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    let line = match lines.next_line().await {
        Ok(Some(line)) => line,
        Ok(None) => return,
        Err(e) => {
            debug!(error = %e, "Command read failed");
            return;
        }
    };

    let reply = dispatch(&daemon, line.trim()).await;

    let mut out = reply.to_string();
    out.push('\n');
    if let Err(e) = write_half.write_all(out.as_bytes()).await {
        debug!(error = %e, "Command reply write failed");
    }
}

async fn dispatch(daemon: &Daemon, command: &str) -> serde_json::Value {
    debug!(command, "Command received");

    match command {
        "sync" => {
            // Reply immediately; the sync itself runs in the background.
            if daemon.try_sync() {
                json!({ "success": true, "message": "sync started" })
            } else {
                json!({ "success": false, "message": "sync already in progress" })
            }
        }
        "status" => {
            let status = daemon.status();
            json!({ "success": true, "status": status })
        }
        "list" => match daemon.list_playlists().await {
            Ok(playlists) => json!({ "success": true, "playlists": playlists }),
            Err(e) => json!({ "success": false, "message": e.to_string() }),
        },
        "quit" => {
            info!("Shutdown requested over command socket");
            daemon.begin_shutdown();
            json!({ "success": true, "message": "shutting down" })
        }
        other => json!({
            "success": false,
            "message": format!("unknown command '{other}'"),
        }),
    }
}
