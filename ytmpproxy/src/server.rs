//! The proxy HTTP server

use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::{Arc, RwLock};
use std::task::{Context, Poll};
use std::time::Duration;

use axum::{
    body::Body,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use bytes::Bytes;
use futures::stream::{BoxStream, Stream, StreamExt};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use ytmpsource::{is_valid_video_id, UrlResolver};
use ytmpstore::{TrackRecord, TrackStore};

use crate::limit::{StreamGuard, StreamLimiter};
use crate::upstream::{fetch_stream, FetchError, FetchPolicy};

/// Advisory metadata interval advertised to ICY clients.
const ICY_METAINT: &str = "16000";

/// Tunables that may change on a configuration reload.
#[derive(Debug, Clone, Copy)]
pub struct ProxySettings {
    /// Age after which a stored URL is re-resolved before use.
    pub url_expiry: Duration,
    /// Deadline for the first upstream byte, per attempt.
    pub first_byte_timeout: Duration,
    /// Upstream attempts in total.
    pub max_attempts: u32,
    /// Base of the exponential retry backoff.
    pub backoff_base: Duration,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            url_expiry: Duration::from_secs(5 * 3600),
            first_byte_timeout: Duration::from_secs(10),
            max_attempts: 3,
            backoff_base: Duration::from_secs(1),
        }
    }
}

/// Shared state of all proxy routes.
#[derive(Clone)]
pub struct ProxyState {
    store: Arc<TrackStore>,
    resolver: Arc<dyn UrlResolver>,
    http: reqwest::Client,
    limiter: Arc<StreamLimiter>,
    settings: Arc<RwLock<ProxySettings>>,
}

impl ProxyState {
    pub fn new(
        store: Arc<TrackStore>,
        resolver: Arc<dyn UrlResolver>,
        max_streams: usize,
        settings: ProxySettings,
    ) -> Self {
        // No overall request timeout on the client: streams run for as long
        // as a song plays. The first-byte deadline is enforced per attempt
        // around send().
        let http = reqwest::Client::new();

        Self {
            store,
            resolver,
            http,
            limiter: StreamLimiter::new(max_streams),
            settings: Arc::new(RwLock::new(settings)),
        }
    }

    /// Streams currently being relayed.
    pub fn active_streams(&self) -> usize {
        self.limiter.active()
    }

    /// Applies reloaded settings; in-flight requests keep the old values.
    pub fn update_settings(&self, settings: ProxySettings) {
        *self.settings.write().unwrap() = settings;
    }

    fn settings(&self) -> ProxySettings {
        *self.settings.read().unwrap()
    }
}

/// Builds the proxy router.
pub fn router(state: ProxyState) -> Router {
    Router::new()
        .route("/proxy/{video_id}", get(proxy_stream))
        .route("/health", get(health))
        .with_state(state)
}

/// The proxy server with its bound listener.
pub struct IcyProxy {
    listener: TcpListener,
    state: ProxyState,
}

impl IcyProxy {
    /// Binds the listener. Failing to bind is fatal by design: a proxy that
    /// cannot listen serves nobody.
    pub async fn bind(host: &str, port: u16, state: ProxyState) -> std::io::Result<Self> {
        let listener = TcpListener::bind(format!("{host}:{port}")).await?;
        info!(addr = %listener.local_addr()?, "Proxy listening");
        Ok(Self { listener, state })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serves until `shutdown` fires, then drains in-flight connections.
    /// The caller bounds the drain with its own grace timeout.
    pub async fn serve(self, shutdown: CancellationToken) -> std::io::Result<()> {
        let app = router(self.state);
        axum::serve(self.listener, app)
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await
    }
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn proxy_stream(
    State(state): State<ProxyState>,
    Path(video_id): Path<String>,
) -> Response {
    if !is_valid_video_id(&video_id) {
        return (StatusCode::BAD_REQUEST, "malformed video id").into_response();
    }

    // Claim a stream slot before any I/O so a flood of requests cannot pile
    // up on the store or the upstream host.
    let Some(guard) = state.limiter.try_acquire() else {
        warn!(%video_id, "Rejecting stream, concurrency cap reached");
        return (StatusCode::SERVICE_UNAVAILABLE, "too many concurrent streams").into_response();
    };

    let record = match state.store.get(&video_id) {
        Ok(Some(record)) => record,
        Ok(None) => return (StatusCode::NOT_FOUND, "unknown video id").into_response(),
        Err(e) => {
            // A store hiccup reads as a cache miss
            warn!(%video_id, error = %e, "Store lookup failed");
            return (StatusCode::NOT_FOUND, "unknown video id").into_response();
        }
    };

    let settings = state.settings();
    let stream_url = refresh_if_stale(&state, &record, settings.url_expiry).await;

    let policy = FetchPolicy {
        max_attempts: settings.max_attempts,
        backoff_base: settings.backoff_base,
        first_byte_timeout: settings.first_byte_timeout,
    };

    let upstream = match fetch_stream(&state.http, &stream_url, policy).await {
        Ok(response) => response,
        Err(FetchError::Timeout) => {
            return (StatusCode::GATEWAY_TIMEOUT, "upstream timed out").into_response();
        }
        Err(FetchError::Permanent(status)) => {
            warn!(%video_id, %status, "Upstream refused the stream");
            return (StatusCode::BAD_GATEWAY, "upstream refused the stream").into_response();
        }
        Err(FetchError::Exhausted(reason)) => {
            warn!(%video_id, %reason, "Upstream unreachable");
            return (StatusCode::BAD_GATEWAY, "upstream unreachable").into_response();
        }
    };

    info!(%video_id, name = %icy_name(&record), "Relaying stream");

    // Headers go out before the first body byte; the guard rides inside the
    // body stream so the slot frees exactly when the relay ends.
    let stream = GuardedStream {
        inner: upstream.bytes_stream().boxed(),
        _guard: guard,
    };

    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "audio/mpeg")
        .header("icy-name", icy_name(&record))
        .header("icy-metaint", ICY_METAINT)
        .body(Body::from_stream(stream))
        .unwrap()
}

/// Re-resolves a stale URL before use. Refresh failures degrade to the
/// stored URL, which may still work.
async fn refresh_if_stale(state: &ProxyState, record: &TrackRecord, expiry: Duration) -> String {
    if !record.is_stale(expiry) {
        return record.stream_url.clone();
    }

    match state.resolver.resolve(&record.video_id).await {
        Ok(fresh) => {
            if let Err(e) = state.store.update_stream_url(&record.video_id, &fresh) {
                warn!(video_id = %record.video_id, error = %e, "Could not persist refreshed URL");
            }
            fresh
        }
        Err(e) => {
            warn!(
                video_id = %record.video_id,
                error = %e,
                "URL refresh failed, trying the stored URL"
            );
            record.stream_url.clone()
        }
    }
}

/// "Artist - Title", or the bare title for unknown artists, with header-value
/// control characters stripped.
fn icy_name(record: &TrackRecord) -> String {
    let name = if record.artist.is_empty() {
        record.title.clone()
    } else {
        format!("{} - {}", record.artist, record.title)
    };
    name.chars().filter(|c| !c.is_control()).collect()
}

/// Relay body: the upstream byte stream plus the concurrency slot.
struct GuardedStream {
    inner: BoxStream<'static, reqwest::Result<Bytes>>,
    _guard: StreamGuard,
}

impl Stream for GuardedStream {
    type Item = reqwest::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(artist: &str, title: &str) -> TrackRecord {
        TrackRecord {
            video_id: "aaaaaaaaaaa".to_string(),
            stream_url: "https://upstream/1".to_string(),
            title: title.to_string(),
            artist: artist.to_string(),
            updated_at: 0,
        }
    }

    #[test]
    fn icy_name_formats() {
        assert_eq!(icy_name(&record("Miles", "So What")), "Miles - So What");
        assert_eq!(icy_name(&record("", "So What")), "So What");
    }

    #[test]
    fn icy_name_strips_control_characters() {
        assert_eq!(icy_name(&record("Mi\nles", "So\rWhat")), "Miles - SoWhat");
    }
}
