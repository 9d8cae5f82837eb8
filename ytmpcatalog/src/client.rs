//! High-level catalog client

use std::path::Path;

use tracing::{debug, warn};
use ytmpsource::{async_trait, CatalogClient, Playlist, Rating, Track};

use crate::api::{RateEndpoint, YtMusicApi};
use crate::auth::CatalogAuth;
use crate::parse;
use crate::Result;

/// Browse id of the library playlists page.
const LIBRARY_PLAYLISTS_BROWSE_ID: &str = "FEmusic_liked_playlists";

/// Upper bound on continuation pages per playlist. 100 tracks per page makes
/// this a 2000-track ceiling.
const MAX_PLAYLIST_PAGES: usize = 20;

/// YouTube Music implementation of [`CatalogClient`].
pub struct YtMusicClient {
    api: YtMusicApi,
}

impl YtMusicClient {
    pub fn new(api: YtMusicApi) -> Self {
        Self { api }
    }

    /// Builds a client from an exported request-headers file.
    pub fn from_headers_file(path: &Path) -> Result<Self> {
        let auth = CatalogAuth::from_file(path)?;
        Ok(Self::new(YtMusicApi::new(auth)?))
    }

    async fn fetch_tracks(&self, playlist_id: &str) -> Result<Vec<Track>> {
        let browse_id = if playlist_id.starts_with("VL") {
            playlist_id.to_string()
        } else {
            format!("VL{playlist_id}")
        };

        let response = self.api.browse(&browse_id).await?;
        let (mut tracks, mut continuation) = parse::parse_playlist_page(&response);

        let mut pages = 1;
        while let Some(token) = continuation.take() {
            if pages >= MAX_PLAYLIST_PAGES {
                warn!(playlist_id, pages, "Stopping at continuation page limit");
                break;
            }

            let response = self.api.browse_continuation(&token).await?;
            let (more, next) = parse::parse_playlist_page(&response);
            if more.is_empty() {
                // A page that adds nothing would never terminate the loop.
                break;
            }

            tracks.extend(more);
            continuation = next;
            pages += 1;
        }

        debug!(playlist_id, tracks = tracks.len(), pages, "Fetched playlist");
        Ok(tracks)
    }
}

#[async_trait]
impl CatalogClient for YtMusicClient {
    async fn list_playlists(&self) -> ytmpsource::Result<Vec<Playlist>> {
        let response = self.api.browse(LIBRARY_PLAYLISTS_BROWSE_ID).await?;
        Ok(parse::parse_library_playlists(&response))
    }

    async fn playlist_tracks(&self, playlist_id: &str) -> ytmpsource::Result<Vec<Track>> {
        Ok(self.fetch_tracks(playlist_id).await?)
    }

    async fn rating(&self, video_id: &str) -> ytmpsource::Result<Rating> {
        let response = self.api.next(video_id).await?;
        Ok(parse::parse_like_status(&response))
    }

    async fn set_rating(&self, video_id: &str, rating: Rating) -> ytmpsource::Result<()> {
        let endpoint = match rating {
            Rating::Liked => RateEndpoint::Like,
            Rating::Disliked => RateEndpoint::Dislike,
            Rating::Neutral => RateEndpoint::RemoveLike,
        };
        self.api.rate(endpoint, video_id).await?;
        Ok(())
    }
}
