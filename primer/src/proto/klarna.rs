//! Klarna payment session endpoints.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of Klarna session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KlarnaSessionType {
    /// One-off payment shown on a hosted page.
    HostedPaymentPage,
    /// Stored method for future payments.
    RecurringPayment,
}

/// Locale sent to Klarna.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KlarnaLocaleData {
    /// Language code.
    pub language_code: String,
    /// Combined locale code.
    pub locale_code: String,
    /// Region code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region_code: Option<String>,
}

/// Order item sent with hosted payment page sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KlarnaOrderItem {
    /// Item name.
    pub name: String,
    /// Unit amount in minor units.
    pub unit_amount: i64,
    /// Quantity.
    pub quantity: u32,
    /// Discount in minor units.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_amount: Option<i64>,
}

/// `POST /klarna/payment-sessions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentSessionRequest {
    /// Klarna configuration id.
    pub payment_method_config_id: String,
    /// Session kind.
    pub session_type: KlarnaSessionType,
    /// Locale.
    pub locale_data: KlarnaLocaleData,
    /// Description shown for recurring payments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Merchant app URL scheme.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    /// Total in minor units; hosted payment page only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<i64>,
    /// Order items; hosted payment page only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_items: Option<Vec<KlarnaOrderItem>>,
}

/// Response of [`CreatePaymentSessionRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentSessionResponse {
    /// Token for the Klarna view.
    pub client_token: String,
    /// Session id.
    pub session_id: String,
    /// Payment categories offered by Klarna.
    #[serde(default)]
    pub categories: Vec<Value>,
    /// Hosted page session id.
    #[serde(default)]
    pub hpp_session_id: Option<String>,
    /// Hosted page URL.
    #[serde(default)]
    pub hpp_redirect_url: Option<String>,
}

/// `POST /klarna/customer-tokens`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCustomerTokenRequest {
    /// Klarna configuration id.
    pub payment_method_config_id: String,
    /// Session id.
    pub session_id: String,
    /// Authorization token returned by the Klarna view.
    pub authorization_token: String,
    /// Description shown for recurring payments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Locale.
    pub locale_data: KlarnaLocaleData,
}

/// `POST /klarna/payment-sessions/finalize`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizePaymentSessionRequest {
    /// Klarna configuration id.
    pub payment_method_config_id: String,
    /// Session id.
    pub session_id: String,
}

/// Customer token returned by the customer-token and finalize endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerTokenResponse {
    /// Customer token id.
    #[serde(default)]
    pub customer_token_id: Option<String>,
    /// Session data to forward with the instrument.
    #[serde(default)]
    pub session_data: Option<Value>,
}
