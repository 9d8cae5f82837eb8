//! # YTMPDaemon
//!
//! The supervising process of ytmpd. Owns the track store, the sync engine,
//! the ICY proxy and the Unix command socket; schedules periodic syncs with
//! an at-most-one gate; persists the last sync outcome across restarts; and
//! shuts everything down in order on SIGTERM/SIGINT.

mod command;
mod daemon;
mod state;

pub use daemon::{Daemon, StatusSnapshot};
pub use state::DaemonState;
