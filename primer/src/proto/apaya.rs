//! Apaya carrier billing session endpoint.

use serde::{Deserialize, Serialize};

/// `POST /session-token`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApayaSessionRequest {
    /// Apaya merchant account id.
    pub merchant_account_id: String,
    /// Two-letter language code.
    pub language: String,
    /// Currency code.
    pub currency_code: String,
    /// Customer phone number, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

/// Response of [`ApayaSessionRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApayaSessionResponse {
    /// Page to open in the web view.
    pub url: String,
    /// Session token.
    #[serde(default)]
    pub token: Option<String>,
    /// Opaque value echoed back by Apaya.
    #[serde(default)]
    pub passthrough_variable: Option<String>,
}
