//! Catalog-facing data model

use serde::{Deserialize, Serialize};

/// A playlist as reported by the remote catalog.
///
/// The id is opaque; only the catalog itself can interpret it. `track_count`
/// is the catalog's own count and may disagree with the number of playable
/// tracks (rows without a video id are dropped during fetch).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    pub track_count: usize,
}

/// One catalog track, identified by its 11-character video id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub video_id: String,
    pub title: String,
    /// Display artist; `None` when the catalog does not know one.
    pub artist: Option<String>,
    /// Duration in seconds, when the catalog reports it.
    pub duration: Option<u32>,
}

impl Track {
    /// The "Artist - Title" string ICY clients display, or the bare title
    /// when no artist is known.
    pub fn display_name(&self) -> String {
        match self.artist.as_deref() {
            Some(artist) if !artist.is_empty() => format!("{} - {}", artist, self.title),
            _ => self.title.clone(),
        }
    }
}
