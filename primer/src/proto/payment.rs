//! Payment creation and resumption.

use serde::{Deserialize, Serialize};

/// `POST /payments`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    /// Token from the tokenization step.
    pub payment_method_token: String,
}

/// `POST /payments/{id}/resume`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumePaymentRequest {
    /// Resume token obtained from polling or a challenge.
    pub resume_token: String,
}

/// Payment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    /// Awaiting a required action.
    Pending,
    /// Authorized.
    Authorized,
    /// Captured.
    Settled,
    /// Being captured.
    Settling,
    /// Succeeded.
    Success,
    /// Declined.
    Declined,
    /// Failed.
    Failed,
    /// Any other status.
    #[serde(other)]
    Unknown,
}

impl PaymentStatus {
    /// Returns `true` for statuses the checkout reports as a failure.
    #[must_use]
    pub const fn is_failure(self) -> bool {
        matches!(self, Self::Failed | Self::Declined)
    }
}

/// Action the client must complete before the payment can be resumed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequiredAction {
    /// Action name (e.g. `"USE_PRIMER_SDK"`, `"3DS_AUTHENTICATION"`).
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Client token carrying the URLs needed to complete the action.
    pub client_token: String,
}

/// Reason attached to a declined or failed payment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReason {
    /// Reason type.
    #[serde(rename = "type", default)]
    pub reason_type: Option<String>,
    /// Decline type.
    #[serde(default)]
    pub decline_type: Option<String>,
    /// Processor code.
    #[serde(default)]
    pub code: Option<String>,
    /// Message.
    #[serde(default)]
    pub message: Option<String>,
}

/// Payment resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    /// Payment id.
    pub id: String,
    /// Merchant order id.
    #[serde(default)]
    pub order_id: Option<String>,
    /// Status.
    pub status: PaymentStatus,
    /// Pending action, if any.
    #[serde(default)]
    pub required_action: Option<RequiredAction>,
    /// Failure reason, if any.
    #[serde(default)]
    pub status_reason: Option<StatusReason>,
    /// Amount in minor units.
    #[serde(default)]
    pub amount: Option<i64>,
    /// Currency code.
    #[serde(default)]
    pub currency_code: Option<String>,
}

impl Payment {
    /// Best available description of why the payment failed.
    #[must_use]
    pub fn failure_reason(&self) -> String {
        self.status_reason
            .as_ref()
            .and_then(|r| r.message.clone().or_else(|| r.decline_type.clone()))
            .unwrap_or_else(|| format!("{:?}", self.status))
    }
}
