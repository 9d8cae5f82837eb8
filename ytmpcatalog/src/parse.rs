//! Navigation helpers for the browse JSON
//!
//! The browse API nests everything a dozen renderers deep. The pointers here
//! are the stable spine of those payloads; anything optional is handled with
//! `Option` so one malformed row never sinks a whole page.

use serde_json::Value;
use tracing::warn;
use ytmpsource::{Playlist, Rating, Track};

const LIBRARY_GRID_ITEMS: &str = "/contents/singleColumnBrowseResultsRenderer/tabs/0/tabRenderer\
     /content/sectionListRenderer/contents/0/gridRenderer/items";

const PLAYLIST_SHELF: &str = "/contents/singleColumnBrowseResultsRenderer/tabs/0/tabRenderer\
     /content/sectionListRenderer/contents/0/musicPlaylistShelfRenderer";

const SHELF_CONTINUATION: &str = "/continuationContents/musicPlaylistShelfContinuation";

const LIKE_STATUS: &str = "/contents/singleColumnMusicWatchNextResultsRenderer/tabbedRenderer\
     /watchNextTabbedResultsRenderer/tabs/0/tabRenderer/content/musicQueueRenderer\
     /content/playlistPanelRenderer/contents/0/playlistPanelVideoRenderer\
     /likeButton/likeButtonRenderer/likeStatus";

/// First text run under `pointer`.
fn runs_text(value: &Value, pointer: &str) -> Option<String> {
    value
        .pointer(pointer)?
        .pointer("/runs/0/text")?
        .as_str()
        .map(str::to_string)
}

/// Playlists from a `FEmusic_liked_playlists` browse response.
///
/// Grid entries without a browse id (the "New playlist" tile) are skipped.
pub fn parse_library_playlists(response: &Value) -> Vec<Playlist> {
    let Some(items) = response.pointer(LIBRARY_GRID_ITEMS).and_then(Value::as_array) else {
        warn!("Library response has no playlist grid");
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            let renderer = item.get("musicTwoRowItemRenderer")?;
            let browse_id = renderer
                .pointer("/navigationEndpoint/browseEndpoint/browseId")?
                .as_str()?;
            let name = runs_text(renderer, "/title")?;

            // Subtitle is "<owner> • 23 songs" or similar; the count is the
            // last run that parses.
            let track_count = renderer
                .pointer("/subtitle/runs")
                .and_then(Value::as_array)
                .map(|runs| {
                    runs.iter()
                        .filter_map(|run| run.get("text").and_then(Value::as_str))
                        .filter_map(parse_track_count)
                        .next_back()
                        .unwrap_or(0)
                })
                .unwrap_or(0);

            Some(Playlist {
                id: browse_id.strip_prefix("VL").unwrap_or(browse_id).to_string(),
                name,
                track_count,
            })
        })
        .collect()
}

/// Tracks plus continuation token from one playlist browse page (initial or
/// continuation response).
pub fn parse_playlist_page(response: &Value) -> (Vec<Track>, Option<String>) {
    let shelf = response
        .pointer(PLAYLIST_SHELF)
        .or_else(|| response.pointer(SHELF_CONTINUATION));

    let Some(shelf) = shelf else {
        // Empty playlists have no shelf at all.
        return (Vec::new(), None);
    };

    let tracks = shelf
        .pointer("/contents")
        .and_then(Value::as_array)
        .map(|rows| rows.iter().filter_map(parse_track_row).collect())
        .unwrap_or_default();

    let continuation = shelf
        .pointer("/continuations/0/nextContinuationData/continuation")
        .and_then(Value::as_str)
        .map(str::to_string);

    (tracks, continuation)
}

/// One `musicResponsiveListItemRenderer` row. Rows without a video id are
/// unplayable (deleted or region-locked) and are dropped here.
fn parse_track_row(row: &Value) -> Option<Track> {
    let renderer = row.get("musicResponsiveListItemRenderer")?;

    let video_id = renderer
        .pointer("/playlistItemData/videoId")?
        .as_str()?
        .to_string();

    let title = runs_text(
        renderer,
        "/flexColumns/0/musicResponsiveListItemFlexColumnRenderer/text",
    )
    .unwrap_or_else(|| video_id.clone());

    let artist = runs_text(
        renderer,
        "/flexColumns/1/musicResponsiveListItemFlexColumnRenderer/text",
    )
    .filter(|s| !s.is_empty());

    let duration = runs_text(
        renderer,
        "/fixedColumns/0/musicResponsiveListItemFixedColumnRenderer/text",
    )
    .as_deref()
    .and_then(parse_duration_text);

    Some(Track {
        video_id,
        title,
        artist,
        duration,
    })
}

/// Like status from a `next` response.
///
/// Only `LIKE` is reliable here: tracks the user disliked come back
/// `INDIFFERENT`, same as untouched ones, so both map to `Neutral`.
pub fn parse_like_status(response: &Value) -> Rating {
    match response.pointer(LIKE_STATUS).and_then(Value::as_str) {
        Some("LIKE") => Rating::Liked,
        _ => Rating::Neutral,
    }
}

/// "23 songs" → 23
fn parse_track_count(text: &str) -> Option<usize> {
    let (count, rest) = text.trim().split_once(' ')?;
    if rest.trim_start().starts_with("song") {
        count.replace(',', "").parse().ok()
    } else {
        None
    }
}

/// "3:25" or "1:02:45" → seconds
fn parse_duration_text(text: &str) -> Option<u32> {
    let mut seconds: u32 = 0;
    for part in text.trim().split(':') {
        seconds = seconds.checked_mul(60)?.checked_add(part.parse().ok()?)?;
    }
    Some(seconds)
}
