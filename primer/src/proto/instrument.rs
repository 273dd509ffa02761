//! Payment instruments sent to `POST /payment-instruments`.
//!
//! Each variant serializes to the bare instrument object; the backend tells
//! them apart by their fields, so the unions are untagged.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::paypal::{PayerInfo, ShippingAddress};

/// Body of a tokenization request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenizationRequestBody {
    /// Instrument to tokenize.
    pub payment_instrument: PaymentInstrument,
}

impl From<PaymentInstrument> for TokenizationRequestBody {
    fn from(payment_instrument: PaymentInstrument) -> Self {
        Self { payment_instrument }
    }
}

/// Instrument payloads understood by the tokenization endpoint.
///
/// Serialize-only: several variants share optional fields, so an untagged
/// decode would be ambiguous.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PaymentInstrument {
    /// Raw card details.
    Card(CardInstrument),
    /// PayPal order or billing agreement.
    PayPal(PayPalInstrument),
    /// Apple Pay wallet token.
    ApplePay(ApplePayInstrument),
    /// Klarna customer token.
    Klarna(KlarnaCustomerTokenInstrument),
    /// Apaya carrier billing result.
    Apaya(ApayaInstrument),
    /// Generic redirect, QR, voucher and test methods.
    OffSession(OffSessionInstrument),
    /// Merchant-defined payload.
    Raw(Value),
}

/// Card details.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardInstrument {
    /// Primary account number, digits only.
    pub number: String,
    /// Security code.
    pub cvv: String,
    /// Two-digit month.
    pub expiration_month: String,
    /// Four-digit year.
    pub expiration_year: String,
    /// Cardholder name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cardholder_name: Option<String>,
}

impl std::fmt::Debug for CardInstrument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let last4 = self.number.len().checked_sub(4).map_or("", |i| &self.number[i..]);
        f.debug_struct("CardInstrument")
            .field("number", &format_args!("****{last4}"))
            .field("cvv", &"***")
            .field("expiration_month", &self.expiration_month)
            .field("expiration_year", &self.expiration_year)
            .field("cardholder_name", &self.cardholder_name)
            .finish()
    }
}

/// PayPal instrument: an approved order (checkout) or a billing agreement (vault).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayPalInstrument {
    /// Approved order id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paypal_order_id: Option<String>,
    /// Confirmed billing agreement id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paypal_billing_agreement_id: Option<String>,
    /// Shipping address returned with the agreement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<ShippingAddress>,
    /// Payer details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_payer_info: Option<PayerInfo>,
}

/// Apple Pay instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplePayInstrument {
    /// Configuration id of the Apple Pay method.
    pub payment_method_config_id: String,
    /// Source of the token.
    pub source_config: ApplePaySourceConfig,
    /// Encrypted wallet token.
    pub token: ApplePayToken,
}

/// Where an Apple Pay token came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplePaySourceConfig {
    /// Always `"IN_APP"` for SDK payments.
    pub source: String,
    /// Merchant identifier used to request the token.
    pub merchant_id: String,
}

/// Token returned by the wallet sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplePayToken {
    /// Display name of the card.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method_display_name: Option<String>,
    /// Card network.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method_network: Option<String>,
    /// Card type (debit, credit, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method_type: Option<String>,
    /// Wallet transaction identifier.
    pub transaction_identifier: String,
    /// Encrypted payment data.
    pub payment_data: Value,
}

/// Klarna customer token instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KlarnaCustomerTokenInstrument {
    /// Customer token issued by Klarna.
    pub klarna_customer_token: String,
    /// Session data returned with the token.
    pub session_data: Value,
}

/// Apaya instrument built from the web view result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApayaInstrument {
    /// MX number.
    pub mx: String,
    /// Mobile network code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mnc: Option<u32>,
    /// Mobile country code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mcc: Option<u32>,
    /// Hashed subscriber identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hashed_identifier: Option<String>,
    /// Merchant account id.
    pub product_id: String,
    /// Currency code.
    pub currency_code: String,
}

/// Generic off-session instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OffSessionInstrument {
    /// Configuration id of the method.
    pub payment_method_config_id: String,
    /// Payment method type.
    pub payment_method_type: String,
    /// Method-specific session info.
    pub session_info: SessionInfo,
}

/// Session info attached to an [`OffSessionInstrument`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SessionInfo {
    /// BLIK one-time code.
    Blik {
        /// Six-digit code.
        #[serde(rename = "blikCode")]
        blik_code: String,
        /// Locale code (e.g. `"en-GB"`).
        locale: String,
        /// Client platform.
        platform: String,
        /// Where to send the user afterwards.
        #[serde(rename = "redirectionUrl", default, skip_serializing_if = "Option::is_none")]
        redirection_url: Option<String>,
    },
    /// Bank chosen from a list.
    BankSelector {
        /// Bank id.
        issuer: String,
        /// Locale code.
        locale: String,
        /// Client platform.
        platform: String,
    },
    /// Phone number entry.
    PhoneNumber {
        /// Phone number including dial code.
        #[serde(rename = "phoneNumber")]
        phone_number: String,
    },
    /// Test method outcome.
    PrimerTest {
        /// Requested outcome.
        #[serde(rename = "flowDecision")]
        flow_decision: FlowDecision,
    },
    /// Plain redirect.
    WebRedirect {
        /// Locale code.
        locale: String,
        /// Client platform.
        platform: String,
        /// Where to send the user afterwards.
        #[serde(rename = "redirectionUrl", default, skip_serializing_if = "Option::is_none")]
        redirection_url: Option<String>,
    },
}

/// Outcome requested from a test payment method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlowDecision {
    /// Authorize the payment.
    Success,
    /// Decline the payment.
    Decline,
    /// Fail the payment.
    Fail,
}

impl FlowDecision {
    /// Every decision, in display order.
    pub const ALL: [Self; 3] = [Self::Success, Self::Decline, Self::Fail];
}

impl std::str::FromStr for FlowDecision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "SUCCESS" => Ok(Self::Success),
            "DECLINE" => Ok(Self::Decline),
            "FAIL" => Ok(Self::Fail),
            other => Err(format!("unknown flow decision `{other}`")),
        }
    }
}

/// Extra data sent when exchanging a vaulted card.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultedCardAdditionalData {
    /// Recaptured security code.
    pub cvv: String,
}

impl std::fmt::Debug for VaultedCardAdditionalData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultedCardAdditionalData")
            .field("cvv", &"***")
            .finish()
    }
}

/// The single network call made by the tokenization step.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenizationRequest {
    /// `POST /payment-instruments`.
    Instrument(TokenizationRequestBody),
    /// `POST /payment-instruments/{id}/exchange`.
    VaultedExchange {
        /// Id of the vaulted payment method.
        payment_method_id: String,
        /// Optional recaptured data.
        additional_data: Option<VaultedCardAdditionalData>,
    },
}

impl From<PaymentInstrument> for TokenizationRequest {
    fn from(instrument: PaymentInstrument) -> Self {
        Self::Instrument(instrument.into())
    }
}
