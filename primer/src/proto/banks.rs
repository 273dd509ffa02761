//! Bank list endpoint used by bank selector methods.

use serde::{Deserialize, Serialize};

/// `POST /adyen/checkout`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankListRequest {
    /// Configuration id of the bank selector method.
    pub payment_method_config_id: String,
    /// Query parameters.
    pub parameters: BankListParameters,
}

/// Parameters of a [`BankListRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankListParameters {
    /// Processor payment method (`"ideal"`, `"dotpay"`).
    pub payment_method: String,
}

/// Wrapper returned by the bank list endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankListResponse {
    /// Banks.
    pub result: Vec<Bank>,
}

/// A selectable bank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bank {
    /// Issuer id sent back with the tokenization request.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Logo URL.
    #[serde(default)]
    pub icon_url: Option<String>,
    /// Whether the bank is currently unavailable.
    #[serde(default)]
    pub disabled: bool,
}
