//! Status resource returned by polling URLs.

use serde::{Deserialize, Serialize};

/// Status of an asynchronous step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PollingStatus {
    /// Still in progress.
    Pending,
    /// Finished; the response id is the resume token.
    Complete,
    /// Finished unsuccessfully.
    Failed,
    /// Any other status.
    #[serde(other)]
    Unknown,
}

/// Body returned by a status URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollingResponse {
    /// Status.
    pub status: PollingStatus,
    /// Resume token once complete.
    pub id: String,
    /// Source that completed the step.
    #[serde(default)]
    pub source: Option<String>,
}

impl PollingResponse {
    /// A pending response.
    pub fn pending(id: impl Into<String>) -> Self {
        Self {
            status: PollingStatus::Pending,
            id: id.into(),
            source: None,
        }
    }

    /// A complete response.
    pub fn complete(id: impl Into<String>) -> Self {
        Self {
            status: PollingStatus::Complete,
            id: id.into(),
            source: None,
        }
    }
}
