//! # YTMPCatalog
//!
//! Client for the YouTube Music internal browse API.
//!
//! Authentication piggybacks on a browser session: the user exports their
//! `music.youtube.com` request headers (cookie included) to a file, and every
//! request re-signs the SAPISID cookie into an `Authorization` header the way
//! the web client does.
//!
//! The crate implements [`ytmpsource::CatalogClient`]; nothing outside of it
//! needs to know what the browse JSON looks like.

pub mod api;
pub mod auth;
pub mod client;
pub mod error;
mod parse;

pub use auth::CatalogAuth;
pub use client::YtMusicClient;
pub use error::{CatalogError, Result};
