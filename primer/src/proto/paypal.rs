//! PayPal order and billing agreement endpoints.

use serde::{Deserialize, Serialize};

/// `POST /paypal/orders/create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    /// PayPal configuration id.
    pub payment_method_config_id: String,
    /// Amount in minor units.
    pub amount: i64,
    /// Currency code.
    pub currency_code: String,
    /// Where PayPal sends the user after approval.
    pub return_url: String,
    /// Where PayPal sends the user after cancelling.
    pub cancel_url: String,
}

/// Response of [`CreateOrderRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    /// Order id.
    pub order_id: String,
    /// Page where the user approves the order.
    pub approval_url: String,
}

/// `POST /paypal/billing-agreements/create-agreement`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBillingAgreementRequest {
    /// PayPal configuration id.
    pub payment_method_config_id: String,
    /// Where PayPal sends the user after approval.
    pub return_url: String,
    /// Where PayPal sends the user after cancelling.
    pub cancel_url: String,
}

/// Response of [`CreateBillingAgreementRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBillingAgreementResponse {
    /// Agreement token, confirmed once approved.
    pub token_id: String,
    /// Page where the user approves the agreement.
    pub approval_url: String,
}

/// `POST /paypal/billing-agreements/confirm-agreement`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmBillingAgreementRequest {
    /// PayPal configuration id.
    pub payment_method_config_id: String,
    /// Agreement token from [`CreateBillingAgreementResponse`].
    pub token_id: String,
}

/// Response of [`ConfirmBillingAgreementRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmBillingAgreementResponse {
    /// Confirmed agreement id.
    pub billing_agreement_id: String,
    /// Payer details.
    pub external_payer_info: PayerInfo,
    /// Shipping address, if shared by the payer.
    #[serde(default)]
    pub shipping_address: Option<ShippingAddress>,
}

/// `POST /paypal/orders`: payer details of an approved order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayerInfoRequest {
    /// PayPal configuration id.
    pub payment_method_config_id: String,
    /// Approved order id.
    pub order_id: String,
}

/// Response of [`PayerInfoRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayerInfoResponse {
    /// Order id.
    pub order_id: String,
    /// Payer details.
    pub external_payer_info: PayerInfo,
}

/// Details of the PayPal payer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayerInfo {
    /// PayPal payer id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_payer_id: Option<String>,
    /// Email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// First name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    /// Last name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

/// Shipping address shared by the payer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    /// Recipient first name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    /// Recipient last name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// First address line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_line1: Option<String>,
    /// Second address line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_line2: Option<String>,
    /// City.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    /// State or region.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// Country code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    /// Postal code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
}
