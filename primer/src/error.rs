//! Error types for the checkout SDK.
//!
//! [`PrimerError`] is the single error surfaced to merchants. Transport
//! failures are carried as [`NetworkError`] so the core stays independent of
//! the HTTP client in use.

use std::time::Duration;

use crate::proto::PollingStatus;
use crate::session::Intent;

/// Boxed error source used by transport implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised by the checkout pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PrimerError {
    /// The client token is missing, malformed, expired, or lacks a required URL.
    #[error("client token is missing, malformed or expired")]
    InvalidClientToken,

    /// The remote checkout configuration has not been fetched.
    #[error("checkout configuration is missing")]
    MissingConfiguration,

    /// A merchant setting required by the flow is absent or invalid.
    #[error("invalid setting `{name}`: {value:?}")]
    InvalidSetting {
        /// Name of the setting (e.g. `"currency"`).
        name: String,
        /// Offending value, if any.
        value: Option<String>,
    },

    /// A value returned by the backend or entered by the user is invalid.
    #[error("invalid value for `{key}`: {value:?}")]
    InvalidValue {
        /// Dotted path of the value (e.g. `"configuration.id"`).
        key: String,
        /// Offending value, if any.
        value: Option<String>,
    },

    /// The configured URL scheme cannot be used as a redirect target.
    #[error("invalid url scheme: {0:?}")]
    InvalidUrlScheme(Option<String>),

    /// The user dismissed the payment method UI.
    #[error("{payment_method_type} was cancelled by the user")]
    Cancelled {
        /// Payment method type of the cancelled attempt.
        payment_method_type: String,
    },

    /// The payment method cannot be used with the session intent.
    #[error("{payment_method_type} does not support the {intent} intent")]
    UnsupportedIntent {
        /// Payment method type.
        payment_method_type: String,
        /// Session intent.
        intent: Intent,
    },

    /// No flow is known for the payment method type.
    #[error("unsupported payment method type `{0}`")]
    UnsupportedPaymentMethod(String),

    /// A merchant hook aborted payment creation.
    #[error("payment creation aborted: {reason}: {message}")]
    MerchantAborted {
        /// Machine-readable reason.
        reason: String,
        /// Human-readable message.
        message: String,
    },

    /// An external flow (web view, wallet, redirect) reported a failure.
    #[error("{payment_method_type} flow failed: {message}")]
    FlowFailed {
        /// Payment method type.
        payment_method_type: String,
        /// Description of the failure.
        message: String,
    },

    /// The payment needs an action the payment method cannot perform, such
    /// as a 3DS challenge for a card.
    #[error("{payment_method_type} cannot handle required action `{action}`")]
    UnsupportedRequiredAction {
        /// Payment method type.
        payment_method_type: String,
        /// Intent of the required action's client token.
        action: String,
    },

    /// The backend reported the payment as failed.
    #[error("payment {payment_id} failed: {reason}")]
    PaymentFailed {
        /// Payment id.
        payment_id: String,
        /// Decline or failure reason reported by the backend.
        reason: String,
    },

    /// The status endpoint reported a terminal status other than complete.
    #[error("polling ended with status {status:?}")]
    PollingFailed {
        /// Terminal status.
        status: PollingStatus,
    },

    /// Polling exceeded the configured attempt budget.
    #[error("polling gave up after {attempts} attempts")]
    PollingExhausted {
        /// Number of status requests sent.
        attempts: u32,
    },

    /// Polling exceeded the configured overall timeout.
    #[error("polling timed out after {0:?}")]
    PollingTimedOut(Duration),

    /// A network call failed.
    #[error(transparent)]
    Network(#[from] NetworkError),

    /// The presenter could not show the requested UI.
    #[error("presentation failed: {0}")]
    Presentation(String),
}

impl PrimerError {
    /// Shorthand for [`PrimerError::InvalidSetting`] with no value.
    pub fn missing_setting(name: impl Into<String>) -> Self {
        Self::InvalidSetting {
            name: name.into(),
            value: None,
        }
    }

    /// Shorthand for [`PrimerError::InvalidValue`] with no value.
    pub fn missing_value(key: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            value: None,
        }
    }

    /// Shorthand for [`PrimerError::InvalidValue`] carrying the rejected value.
    pub fn invalid_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            value: Some(value.into()),
        }
    }

    /// Shorthand for [`PrimerError::Cancelled`].
    pub fn cancelled(payment_method_type: impl Into<String>) -> Self {
        Self::Cancelled {
            payment_method_type: payment_method_type.into(),
        }
    }

    /// Returns `true` if the error represents a user cancellation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Transport-level failures reported by a [`PrimerApi`](crate::api::PrimerApi) implementation.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    /// The request did not complete within its timeout.
    #[error("request timed out: {context}")]
    Timeout {
        /// Request identifier (e.g. `"POST /payment-instruments"`).
        context: &'static str,
    },

    /// Connection or protocol failure.
    #[error("transport error: {context}: {source}")]
    Transport {
        /// Request identifier.
        context: &'static str,
        /// Underlying error.
        #[source]
        source: BoxError,
    },

    /// The server answered with a non-success status.
    #[error("unexpected HTTP status {status}: {context}: {body}")]
    HttpStatus {
        /// Request identifier.
        context: &'static str,
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// The response body could not be decoded.
    #[error("failed to decode response: {context}: {source}")]
    Decode {
        /// Request identifier.
        context: &'static str,
        /// Underlying error.
        #[source]
        source: BoxError,
    },

    /// An endpoint URL could not be built.
    #[error("invalid URL: {context}: {source}")]
    InvalidUrl {
        /// Which URL was being built.
        context: &'static str,
        /// Underlying parse error.
        #[source]
        source: url::ParseError,
    },
}

impl NetworkError {
    /// Returns `true` if retrying the same request may succeed.
    ///
    /// Timeouts and connection failures are always transient. Server errors
    /// (`5xx`) count only when `retry_server_errors` is set.
    #[must_use]
    pub const fn is_transient(&self, retry_server_errors: bool) -> bool {
        match self {
            Self::Timeout { .. } | Self::Transport { .. } => true,
            Self::HttpStatus { status, .. } => retry_server_errors && *status >= 500,
            Self::Decode { .. } | Self::InvalidUrl { .. } => false,
        }
    }

    /// HTTP status code, if the error carries one.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}
