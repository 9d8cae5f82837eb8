//! # YTMPSource
//!
//! Common traits and types shared by the ytmpd components.
//!
//! This crate defines the seams between the daemon and its external
//! collaborators: the remote music catalog, the stream URL resolver and the
//! MPD stored-playlist client. Concrete implementations live in
//! `ytmpcatalog`, `ytmpresolve` and `ytmpmpd`; the sync engine, the proxy and
//! the daemon only ever see these traits.

pub mod error;
pub mod models;
pub mod rating;
pub mod video_id;

pub use async_trait::async_trait;
pub use error::{Result, SourceError};
pub use models::{Playlist, Track};
pub use rating::{Rating, RatingAction, RatingTransition};
pub use video_id::is_valid_video_id;

/// Remote music catalog: per-user playlists and track ratings.
///
/// The catalog is the source of truth for playlist contents and ordering.
/// Implementations must drop catalog rows without a video id before
/// returning them from [`playlist_tracks`](CatalogClient::playlist_tracks).
///
/// Rating reads carry a known ambiguity: the upstream API reports `Liked`
/// faithfully but returns `Neutral` for both truly-neutral and disliked
/// tracks. Callers that toggle ratings must treat a `Neutral` read as the
/// neutral state (see [`Rating::apply`]).
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// List all playlists in the user's library.
    async fn list_playlists(&self) -> Result<Vec<Playlist>>;

    /// Fetch the ordered tracks of one playlist.
    async fn playlist_tracks(&self, playlist_id: &str) -> Result<Vec<Track>>;

    /// Current rating of a track, as far as the catalog exposes it.
    async fn rating(&self, video_id: &str) -> Result<Rating>;

    /// Set the rating of a track upstream.
    async fn set_rating(&self, video_id: &str, rating: Rating) -> Result<()>;
}

/// Turns a video id into a playable (but ephemeral) audio URL.
///
/// Upstream URLs expire after a few hours; callers are expected to re-resolve
/// when a stored URL goes stale rather than cache the result forever.
#[async_trait]
pub trait UrlResolver: Send + Sync {
    async fn resolve(&self, video_id: &str) -> Result<String>;
}

/// Stored-playlist operations on a local MPD instance.
#[async_trait]
pub trait MpdWire: Send + Sync {
    /// Names of the stored playlists MPD currently knows about.
    async fn list_playlists(&self) -> Result<Vec<String>>;

    /// Replace the stored playlist `name` with exactly `urls`, creating it if
    /// missing. Replace, not merge: entries absent from `urls` are gone
    /// afterwards.
    async fn replace_playlist(&self, name: &str, urls: &[String]) -> Result<()>;

    /// Delete a stored playlist. Deleting a missing playlist is not an error.
    async fn delete_playlist(&self, name: &str) -> Result<()>;
}
