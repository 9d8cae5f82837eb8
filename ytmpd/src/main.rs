use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{info, warn};
use ytmpcatalog::YtMusicClient;
use ytmpconfig::Config;
use ytmpdaemon::Daemon;
use ytmpmpd::MpdPlaylists;
use ytmpresolve::YtDlpResolver;
use ytmpsource::{CatalogClient, Playlist, Rating, SourceError, Track};

#[tokio::main]
async fn main() -> Result<()> {
    setup_tracing();

    // ========== PHASE 1 : Configuration ==========
    let config = Config::load("")?;
    info!("📂 Config dir: {}", config.config_dir().display());

    // ========== PHASE 2 : External collaborators ==========
    let catalog: Arc<dyn CatalogClient> =
        match YtMusicClient::from_headers_file(&config.catalog_auth_path) {
            Ok(client) => {
                info!("🎵 Catalog client ready");
                Arc::new(client)
            }
            Err(e) => {
                // The daemon stays up so status reports the problem and a
                // fixed headers file plus restartable sync can recover it.
                warn!(
                    "⚠️ Catalog auth not usable ({e}); export your request headers to {}",
                    config.catalog_auth_path.display()
                );
                Arc::new(UnconfiguredCatalog)
            }
        };

    let resolver = Arc::new(YtDlpResolver::new(
        config.ytdlp_path.clone(),
        config.resolver_timeout(),
    ));
    let mpd = Arc::new(MpdPlaylists::new(config.mpd_socket_path.clone()));
    info!("📡 MPD socket: {}", config.mpd_socket_path.display());

    // ========== PHASE 3 : Daemon ==========
    let daemon = Daemon::new(config, catalog, resolver, mpd)?;

    info!("✅ ytmpd starting");
    daemon.run().await
}

fn setup_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Stand-in catalog used when the headers file cannot be loaded. Every call
/// surfaces the auth problem so `status` and sync results show it.
struct UnconfiguredCatalog;

#[async_trait]
impl CatalogClient for UnconfiguredCatalog {
    async fn list_playlists(&self) -> ytmpsource::Result<Vec<Playlist>> {
        Err(SourceError::unauthorized("catalog headers not configured"))
    }

    async fn playlist_tracks(&self, _playlist_id: &str) -> ytmpsource::Result<Vec<Track>> {
        Err(SourceError::unauthorized("catalog headers not configured"))
    }

    async fn rating(&self, _video_id: &str) -> ytmpsource::Result<Rating> {
        Err(SourceError::unauthorized("catalog headers not configured"))
    }

    async fn set_rating(&self, _video_id: &str, _rating: Rating) -> ytmpsource::Result<()> {
        Err(SourceError::unauthorized("catalog headers not configured"))
    }
}
