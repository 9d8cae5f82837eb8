//! Low-level access to the `youtubei/v1` endpoints
//!
//! Thin request layer: builds the innertube context, signs the request with
//! the session cookies, and returns raw `serde_json::Value` payloads for the
//! parser to pick apart.

use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::auth::{CatalogAuth, ORIGIN};
use crate::error::{CatalogError, Result};

/// Production API base. Tests point this at a local mock.
const API_BASE_URL: &str = "https://music.youtube.com/youtubei/v1";

/// Client identity the web player reports.
const CLIENT_NAME: &str = "WEB_REMIX";
const CLIENT_VERSION: &str = "1.20250310.01.00";

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Rating write endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateEndpoint {
    Like,
    Dislike,
    RemoveLike,
}

impl RateEndpoint {
    pub fn path(self) -> &'static str {
        match self {
            Self::Like => "like/like",
            Self::Dislike => "like/dislike",
            Self::RemoveLike => "like/removelike",
        }
    }
}

/// Low-level API client
pub struct YtMusicApi {
    client: Client,
    auth: CatalogAuth,
    base_url: String,
}

impl YtMusicApi {
    pub fn new(auth: CatalogAuth) -> Result<Self> {
        Self::with_base_url(auth, API_BASE_URL)
    }

    /// Like [`new`](Self::new) with a custom endpoint base (tests).
    pub fn with_base_url(auth: CatalogAuth, base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client,
            auth,
            base_url: base_url.into(),
        })
    }

    /// Innertube context object included in every request body.
    fn context() -> Value {
        json!({
            "client": {
                "clientName": CLIENT_NAME,
                "clientVersion": CLIENT_VERSION,
                "hl": "en",
            },
            "user": {},
        })
    }

    /// POSTs `body` (plus context) to an endpoint and returns the JSON reply.
    async fn post(&self, endpoint: &str, mut body: Value) -> Result<Value> {
        body["context"] = Self::context();

        let url = format!("{}/{}", self.base_url, endpoint);
        debug!(endpoint, "Catalog request");

        let response = self
            .client
            .post(&url)
            .header("Cookie", self.auth.cookie())
            .header("Authorization", self.auth.authorization()?)
            .header("Origin", ORIGIN)
            .header("X-Origin", ORIGIN)
            .header(
                "User-Agent",
                self.auth.user_agent().unwrap_or(DEFAULT_USER_AGENT),
            )
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(CatalogError::Unauthorized(format!(
                "{endpoint} returned {status}; refresh the exported headers"
            )));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CatalogError::Api {
                status: status.as_u16(),
                message: truncate(&message, 200),
            });
        }

        Ok(response.json().await?)
    }

    /// One `browse` call for a browse id (library page, playlist, ...).
    pub async fn browse(&self, browse_id: &str) -> Result<Value> {
        self.post("browse", json!({ "browseId": browse_id })).await
    }

    /// Follows a continuation token from an earlier browse.
    pub async fn browse_continuation(&self, ctoken: &str) -> Result<Value> {
        let endpoint = format!("browse?ctoken={ctoken}&continuation={ctoken}");
        self.post(&endpoint, json!({})).await
    }

    /// `next` payload for a single video; carries its current like status.
    pub async fn next(&self, video_id: &str) -> Result<Value> {
        self.post("next", json!({ "videoId": video_id })).await
    }

    /// Writes a rating.
    pub async fn rate(&self, endpoint: RateEndpoint, video_id: &str) -> Result<()> {
        self.post(
            endpoint.path(),
            json!({ "target": { "videoId": video_id } }),
        )
        .await?;
        Ok(())
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let mut end = max;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &s[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_endpoint_paths() {
        assert_eq!(RateEndpoint::Like.path(), "like/like");
        assert_eq!(RateEndpoint::Dislike.path(), "like/dislike");
        assert_eq!(RateEndpoint::RemoveLike.path(), "like/removelike");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 200), "short");
        let long = "é".repeat(150);
        let cut = truncate(&long, 101);
        assert!(cut.ends_with("..."));
        assert!(cut.len() <= 104);
    }
}
