//! The reconciliation engine

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};
use ytmpsource::{CatalogClient, MpdWire, Playlist, Result, UrlResolver};
use ytmpstore::TrackStore;

use crate::result::SyncResult;

/// Per-pass knobs.
///
/// Passed into every [`SyncEngine::sync_all`] call so a configuration reload
/// between passes takes effect without rebuilding the engine.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Prefix for MPD playlist names; empty is allowed.
    pub playlist_prefix: String,
    /// Proxy base URL, e.g. `http://localhost:8080`, no trailing slash.
    pub proxy_base_url: String,
    /// When false, playlist entries carry the raw upstream URLs.
    pub proxy_enabled: bool,
    /// Parallelism of URL resolution within one playlist.
    pub resolve_concurrency: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            playlist_prefix: String::new(),
            proxy_base_url: "http://localhost:8080".to_string(),
            proxy_enabled: true,
            resolve_concurrency: 10,
        }
    }
}

/// Read-only dry-run summary.
#[derive(Debug, Clone)]
pub struct SyncPreview {
    pub playlist_names: Vec<String>,
    pub total_tracks: usize,
    pub existing_mpd_playlists: Vec<String>,
}

/// Reconciles the catalog into MPD stored playlists.
pub struct SyncEngine {
    catalog: Arc<dyn CatalogClient>,
    resolver: Arc<dyn UrlResolver>,
    store: Arc<TrackStore>,
    mpd: Arc<dyn MpdWire>,
}

impl SyncEngine {
    pub fn new(
        catalog: Arc<dyn CatalogClient>,
        resolver: Arc<dyn UrlResolver>,
        store: Arc<TrackStore>,
        mpd: Arc<dyn MpdWire>,
    ) -> Self {
        Self {
            catalog,
            resolver,
            store,
            mpd,
        }
    }

    /// Runs one full pass. Never fails: every problem lands in the returned
    /// result instead.
    pub async fn sync_all(&self, options: &SyncOptions) -> SyncResult {
        let started = Instant::now();
        let mut result = SyncResult::new();

        info!("Starting catalog sync");

        let playlists = match self.catalog.list_playlists().await {
            Ok(playlists) => playlists,
            Err(e) => {
                warn!(error = %e, "Cannot list catalog playlists, aborting sync");
                result.record_error(format!("listing playlists: {e}"));
                return result.finish(started);
            }
        };

        for playlist in &playlists {
            if playlist.track_count == 0 {
                warn!(playlist = %playlist.name, "Skipping empty playlist");
                result.playlists_synced += 1;
                continue;
            }

            self.sync_playlist(playlist, options, &mut result).await;
        }

        let result = result.finish(started);
        info!(
            synced = result.playlists_synced,
            failed = result.playlists_failed,
            tracks = result.tracks_added,
            dropped = result.tracks_failed,
            "Catalog sync finished"
        );
        result
    }

    /// Same read path as [`sync_all`](Self::sync_all), zero writes.
    pub async fn preview(&self) -> Result<SyncPreview> {
        let playlists = self.catalog.list_playlists().await?;
        let existing = self.mpd.list_playlists().await?;

        Ok(SyncPreview {
            total_tracks: playlists.iter().map(|p| p.track_count).sum(),
            playlist_names: playlists.into_iter().map(|p| p.name).collect(),
            existing_mpd_playlists: existing,
        })
    }

    /// Syncs one playlist; all failures are recorded in `result`.
    async fn sync_playlist(
        &self,
        playlist: &Playlist,
        options: &SyncOptions,
        result: &mut SyncResult,
    ) {
        let tracks = match self.catalog.playlist_tracks(&playlist.id).await {
            Ok(tracks) => tracks,
            Err(e) => {
                warn!(playlist = %playlist.name, error = %e, "Track fetch failed");
                result.record_error(format!("playlist '{}': {e}", playlist.name));
                result.playlists_failed += 1;
                return;
            }
        };

        // The catalog client already drops idless rows; guard anyway so a
        // lax implementation cannot feed empty keys into the store.
        let tracks: Vec<_> = tracks
            .into_iter()
            .filter(|t| !t.video_id.is_empty())
            .collect();

        let ids: Vec<String> = tracks.iter().map(|t| t.video_id.clone()).collect();
        let resolved = self.resolve_batch(&ids, options.resolve_concurrency).await;

        // Emission re-walks the catalog order: resolution completes out of
        // order, skipped tracks leave no hole.
        let mut urls = Vec::with_capacity(tracks.len());
        for track in &tracks {
            let Some(upstream_url) = resolved.get(&track.video_id).and_then(Option::as_deref)
            else {
                result.tracks_failed += 1;
                continue;
            };

            let artist = track.artist.as_deref().unwrap_or("");
            if let Err(e) = self
                .store
                .upsert(&track.video_id, upstream_url, &track.title, artist)
            {
                warn!(video_id = %track.video_id, error = %e, "Store upsert failed, dropping track");
                result.tracks_failed += 1;
                continue;
            }

            let entry = if options.proxy_enabled {
                format!("{}/proxy/{}", options.proxy_base_url, track.video_id)
            } else {
                upstream_url.to_string()
            };
            urls.push(entry);
            result.tracks_added += 1;
        }

        if urls.is_empty() {
            warn!(playlist = %playlist.name, "No track resolved, not writing an empty playlist");
            result.record_error(format!("playlist '{}': no tracks resolved", playlist.name));
            result.playlists_failed += 1;
            return;
        }

        let mpd_name = format!("{}{}", options.playlist_prefix, playlist.name);
        match self.mpd.replace_playlist(&mpd_name, &urls).await {
            Ok(()) => {
                debug!(playlist = %mpd_name, entries = urls.len(), "Playlist written");
                result.playlists_synced += 1;
            }
            Err(e) => {
                warn!(playlist = %mpd_name, error = %e, "MPD write failed");
                result.record_error(format!("playlist '{}': {e}", playlist.name));
                result.playlists_failed += 1;
            }
        }
    }

    /// Resolves `ids` with bounded parallelism. Failures map to `None`; the
    /// result keys are exactly `ids`.
    async fn resolve_batch(
        &self,
        ids: &[String],
        concurrency: usize,
    ) -> HashMap<String, Option<String>> {
        stream::iter(ids.to_vec())
            .map(|id| {
                let resolver = self.resolver.clone();
                async move {
                    match resolver.resolve(&id).await {
                        Ok(url) => (id, Some(url)),
                        Err(e) => {
                            warn!(video_id = %id, error = %e, "URL resolution failed");
                            (id, None)
                        }
                    }
                }
            })
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await
    }
}
