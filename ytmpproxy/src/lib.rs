//! # YTMPProxy
//!
//! Local HTTP server MPD plays through. `GET /proxy/{video_id}` looks the
//! track up in the store, re-resolves the upstream URL when it has gone
//! stale, and relays the audio bytes while advertising `icy-name` /
//! `icy-metaint` headers so MPD clients display "Artist - Title" instead of
//! a raw URL.
//!
//! The proxy never transcodes and never buffers more than the in-flight
//! chunk; it is a relay with a concurrency cap and a retry policy for the
//! first upstream byte.

mod limit;
mod server;
mod upstream;

pub use limit::{StreamGuard, StreamLimiter};
pub use server::{IcyProxy, ProxySettings, ProxyState};
