//! Result of a successful tokenization.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Whether a token can be used once or reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenType {
    /// Single payment.
    SingleUse,
    /// Vaulted, reusable.
    MultiUse,
    /// Any type this SDK does not know about.
    #[serde(other)]
    Unknown,
}

/// Token and metadata returned by the tokenization endpoint.
///
/// Handed to the merchant unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethodTokenData {
    /// Payment method id; present for vaulted methods.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Opaque payment method token.
    pub token: String,
    /// Token type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<TokenType>,
    /// Analytics id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analytics_id: Option<String>,
    /// Instrument type (e.g. `"PAYMENT_CARD"`, `"OFF_SESSION_PAYMENT"`).
    pub payment_instrument_type: String,
    /// Payment method type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method_type: Option<String>,
    /// Masked instrument details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_instrument_data: Option<PaymentInstrumentData>,
    /// 3DS authentication result.
    #[serde(
        default,
        rename = "threeDSecureAuthentication",
        skip_serializing_if = "Option::is_none"
    )]
    pub three_d_secure_authentication: Option<Value>,
    /// Vault details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vault_data: Option<VaultData>,
    /// Whether the method was vaulted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_vaulted: Option<bool>,
}

/// Masked instrument details.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInstrumentData {
    /// Last four card digits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last4_digits: Option<String>,
    /// First six card digits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first6_digits: Option<String>,
    /// Card expiry month.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_month: Option<String>,
    /// Card expiry year.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_year: Option<String>,
    /// Cardholder name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cardholder_name: Option<String>,
    /// Card network.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    /// Any other method-specific field.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Vault details.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultData {
    /// Customer the method is vaulted for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
}

/// `GET /payment-instruments` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaultedPaymentMethods {
    /// Vaulted methods.
    pub data: Vec<PaymentMethodTokenData>,
}
