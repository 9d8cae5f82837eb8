//! # YTMPMPD
//!
//! Stored-playlist operations against a local MPD instance, over its Unix
//! socket. This is the write side of the sync engine: playlists are always
//! replaced wholesale, never merged, so MPD mirrors the catalog's current
//! state.
//!
//! A fresh connection is opened per operation. The sync cadence is minutes,
//! MPD is local, and a persistent connection would only add reconnect
//! handling for no measurable gain.

use std::path::{Path, PathBuf};

use mpd_client::{commands, Client, CommandError};
use tokio::net::UnixStream;
use tracing::{debug, warn};
use ytmpsource::{async_trait, MpdWire, Result, SourceError};

/// MPD error code for "no such object" (`ACK_ERROR_NO_EXIST`).
const MPD_ERROR_NO_EXIST: u64 = 50;

/// Stored-playlist client for one MPD instance.
#[derive(Debug, Clone)]
pub struct MpdPlaylists {
    socket_path: PathBuf,
}

impl MpdPlaylists {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    async fn connect(&self) -> Result<Client> {
        let stream = UnixStream::connect(&self.socket_path).await.map_err(|e| {
            SourceError::mpd(format!(
                "cannot reach mpd at {}: {e}",
                self.socket_path.display()
            ))
        })?;

        let (client, _state_changes) = Client::connect(stream)
            .await
            .map_err(|e| SourceError::mpd(format!("mpd handshake failed: {e}")))?;

        Ok(client)
    }
}

/// Whether a command failed because the target playlist does not exist.
fn is_no_exist(err: &CommandError) -> bool {
    matches!(err, CommandError::ErrorResponse { error, .. } if error.code == MPD_ERROR_NO_EXIST)
}

fn command_error(context: &str, err: CommandError) -> SourceError {
    SourceError::mpd(format!("{context}: {err}"))
}

#[async_trait]
impl MpdWire for MpdPlaylists {
    async fn list_playlists(&self) -> Result<Vec<String>> {
        let client = self.connect().await?;

        let playlists = client
            .command(commands::GetPlaylists)
            .await
            .map_err(|e| command_error("listplaylists", e))?;

        Ok(playlists.into_iter().map(|p| p.name).collect())
    }

    async fn replace_playlist(&self, name: &str, urls: &[String]) -> Result<()> {
        let client = self.connect().await?;

        // Drop the old contents first; a missing playlist is fine.
        match client.command(commands::DeletePlaylist(name.to_string())).await {
            Ok(_) => debug!(playlist = name, "Removed previous stored playlist"),
            Err(e) if is_no_exist(&e) => {}
            Err(e) => return Err(command_error("rm", e)),
        }

        // playlistadd creates the playlist on first entry and appends in
        // order, which preserves the caller's ordering.
        for url in urls {
            client
                .command(commands::AddToPlaylist::new(
                    name.to_string(),
                    url.to_string(),
                ))
                .await
                .map_err(|e| command_error("playlistadd", e))?;
        }

        debug!(playlist = name, entries = urls.len(), "Stored playlist replaced");
        Ok(())
    }

    async fn delete_playlist(&self, name: &str) -> Result<()> {
        let client = self.connect().await?;

        match client.command(commands::DeletePlaylist(name.to_string())).await {
            Ok(_) => Ok(()),
            Err(e) if is_no_exist(&e) => {
                warn!(playlist = name, "Delete of unknown playlist ignored");
                Ok(())
            }
            Err(e) => Err(command_error("rm", e)),
        }
    }
}
