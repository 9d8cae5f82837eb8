//! Upstream fetch with first-byte retry policy
//!
//! Retries happen only before the first body byte reaches the client; once
//! streaming has begun a reconnect would splice two unrelated byte offsets
//! into one audio stream, so mid-stream errors just end the response.

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

/// Retry/timeout knobs for one fetch.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FetchPolicy {
    /// Attempts in total, first try included.
    pub max_attempts: u32,
    /// Delay before retry `n` is `backoff_base * 2^(n-1)`.
    pub backoff_base: Duration,
    /// Deadline for headers (the first byte) of one attempt.
    pub first_byte_timeout: Duration,
}

/// Why a fetch gave up.
#[derive(Debug)]
pub(crate) enum FetchError {
    /// Every attempt ran into the first-byte deadline
    Timeout,
    /// Upstream said this URL will never work (403/404/410 and other
    /// non-retryable statuses)
    Permanent(StatusCode),
    /// Transient failures exhausted the attempt budget
    Exhausted(String),
}

/// Statuses that retrying cannot fix.
fn is_permanent_status(status: StatusCode) -> bool {
    matches!(status.as_u16(), 403 | 404 | 410 | 501 | 505) || status.is_client_error()
}

/// Opens a streaming GET against `url`, retrying transient failures.
///
/// Success means headers arrived with a 2xx status; the body has not been
/// consumed yet.
pub(crate) async fn fetch_stream(
    client: &Client,
    url: &str,
    policy: FetchPolicy,
) -> Result<Response, FetchError> {
    let mut last_error = FetchError::Exhausted("no attempt made".to_string());

    for attempt in 1..=policy.max_attempts.max(1) {
        if attempt > 1 {
            let delay = policy.backoff_base * 2u32.pow(attempt - 2);
            debug!(attempt, ?delay, "Backing off before upstream retry");
            sleep(delay).await;
        }

        match timeout(policy.first_byte_timeout, client.get(url).send()).await {
            Err(_elapsed) => {
                warn!(attempt, "Upstream first byte timed out");
                last_error = FetchError::Timeout;
            }
            Ok(Err(e)) => {
                warn!(attempt, error = %e, "Upstream connection failed");
                last_error = FetchError::Exhausted(e.to_string());
            }
            Ok(Ok(response)) => {
                let status = response.status();
                if status.is_success() {
                    return Ok(response);
                }
                if is_permanent_status(status) {
                    return Err(FetchError::Permanent(status));
                }
                warn!(attempt, %status, "Upstream error status");
                last_error = FetchError::Exhausted(format!("upstream status {status}"));
            }
        }
    }

    Err(last_error)
}
