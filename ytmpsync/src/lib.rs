//! # YTMPSync
//!
//! One-shot reconciliation of the remote catalog into MPD stored playlists.
//!
//! A sync pass lists the user's playlists, fetches each playlist's tracks,
//! resolves stream URLs in a bounded parallel batch, records every resolved
//! track in the track store, and rewrites the matching MPD stored playlist
//! with proxy URLs. Failures are isolated per playlist: one broken playlist
//! never stops the others, and only a failure to list the catalog at all
//! aborts the pass.

mod engine;
mod result;

pub use engine::{SyncEngine, SyncOptions, SyncPreview};
pub use result::SyncResult;
