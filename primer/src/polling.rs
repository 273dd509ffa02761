//! Status polling for asynchronous payment methods.
//!
//! Redirect, QR code and one-time-code methods finish out of band. The
//! client token returned with the pending payment carries a status URL,
//! which is polled until it reports `COMPLETE`; the id of the completed
//! status resource is the resume token for the payment.
//!
//! Polling is bounded by [`PollingConfig`]: an interval between requests,
//! an optional attempt budget and an optional overall timeout. Transient
//! network failures retry the same request.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_with::{DurationMilliSeconds, DurationSeconds, serde_as};
use url::Url;

use crate::api::PrimerApi;
use crate::error::PrimerError;
use crate::proto::{PollingResponse, PollingStatus};
use crate::token::DecodedClientToken;

#[cfg(feature = "telemetry")]
use tracing::instrument;

/// Default delay between two status requests.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default overall polling timeout.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(300);

/// Bounds applied to a polling loop.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Delay between two status requests. Zero polls again immediately.
    #[serde(rename = "interval_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub interval: Duration,
    /// Maximum number of status requests, unbounded when `None`.
    pub max_attempts: Option<u32>,
    /// Overall time budget, unbounded when `None`.
    #[serde(rename = "timeout_secs")]
    #[serde_as(as = "Option<DurationSeconds<u64>>", no_default)]
    pub timeout: Option<Duration>,
    /// Whether `5xx` answers are retried like timeouts.
    pub retry_server_errors: bool,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: None,
            timeout: Some(DEFAULT_POLL_TIMEOUT),
            retry_server_errors: true,
        }
    }
}

impl PollingConfig {
    /// Sets the delay between status requests.
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Limits the number of status requests.
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Sets or clears the overall timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Polls `status_url` until it reports `COMPLETE`.
///
/// # Errors
///
/// - [`PrimerError::PollingFailed`] when the status is `FAILED` or unknown.
/// - [`PrimerError::PollingExhausted`] when `max_attempts` requests were sent.
/// - [`PrimerError::PollingTimedOut`] when the overall timeout elapsed.
/// - [`PrimerError::Network`] for a non-transient network failure.
#[cfg_attr(
    feature = "telemetry",
    instrument(name = "primer.poll", skip_all, fields(url = %status_url), err)
)]
pub async fn poll_until_complete(
    api: &dyn PrimerApi,
    client_token: &DecodedClientToken,
    status_url: &Url,
    config: &PollingConfig,
) -> Result<PollingResponse, PrimerError> {
    let polling = poll_loop(api, client_token, status_url, config);
    match config.timeout {
        Some(limit) => tokio::time::timeout(limit, polling)
            .await
            .map_err(|_| PrimerError::PollingTimedOut(limit))?,
        None => polling.await,
    }
}

async fn poll_loop(
    api: &dyn PrimerApi,
    client_token: &DecodedClientToken,
    status_url: &Url,
    config: &PollingConfig,
) -> Result<PollingResponse, PrimerError> {
    let mut attempts: u32 = 0;
    loop {
        if config.max_attempts.is_some_and(|max| attempts >= max) {
            return Err(PrimerError::PollingExhausted { attempts });
        }
        attempts += 1;

        match api.poll(client_token, status_url).await {
            Ok(response) => match response.status {
                PollingStatus::Complete => {
                    #[cfg(feature = "telemetry")]
                    tracing::info!(attempts, id = %response.id, "Polling complete");
                    return Ok(response);
                }
                PollingStatus::Pending => {
                    #[cfg(feature = "telemetry")]
                    tracing::debug!(attempts, "Status pending");
                }
                status @ (PollingStatus::Failed | PollingStatus::Unknown) => {
                    return Err(PrimerError::PollingFailed { status });
                }
            },
            Err(err) if err.is_transient(config.retry_server_errors) => {
                #[cfg(feature = "telemetry")]
                tracing::warn!(attempts, error = %err, "Transient polling failure, retrying");
            }
            Err(err) => return Err(err.into()),
        }

        if !config.interval.is_zero() {
            tokio::time::sleep(config.interval).await;
        }
    }
}
