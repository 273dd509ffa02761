//! Remote checkout configuration and client session.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use serde_with::{VecSkipError, serde_as};

/// How a payment method is implemented by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImplementationType {
    /// Handled natively by the SDK.
    NativeSdk,
    /// Generic off-session redirect.
    WebRedirect,
    /// Any implementation this SDK does not know about.
    #[serde(other)]
    Unknown,
}

/// Merchant-configured descriptor for one payment method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethodConfiguration {
    /// Configuration id, required by every tokenization request.
    #[serde(default)]
    pub id: Option<String>,
    /// Payment method type (e.g. `"PAYMENT_CARD"`).
    #[serde(rename = "type")]
    pub payment_method_type: String,
    /// Implementation type.
    #[serde(default = "default_implementation_type")]
    pub implementation_type: ImplementationType,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Processor configuration id.
    #[serde(default)]
    pub processor_config_id: Option<String>,
    /// Method-specific options.
    #[serde(default)]
    pub options: Option<Map<String, Value>>,
}

const fn default_implementation_type() -> ImplementationType {
    ImplementationType::NativeSdk
}

impl PaymentMethodConfiguration {
    /// Creates a native configuration for the given type.
    pub fn new(id: impl Into<String>, payment_method_type: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            payment_method_type: payment_method_type.into(),
            implementation_type: ImplementationType::NativeSdk,
            name: None,
            processor_config_id: None,
            options: None,
        }
    }

    /// Returns a string option by key.
    #[must_use]
    pub fn option_str(&self, key: &str) -> Option<&str> {
        self.options.as_ref()?.get(key)?.as_str()
    }
}

/// Checkout configuration fetched from the client token's configuration URL.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfiguration {
    /// Core API base URL; overrides the one in the client token.
    #[serde(default)]
    pub core_url: Option<String>,
    /// PCI API base URL; overrides the one in the client token.
    #[serde(default)]
    pub pci_url: Option<String>,
    /// Client session.
    #[serde(default)]
    pub client_session: Option<ClientSession>,
    /// Configured payment methods. Entries that fail to decode are skipped.
    #[serde(default)]
    #[serde_as(as = "VecSkipError<_>")]
    pub payment_methods: Vec<PaymentMethodConfiguration>,
}

impl ApiConfiguration {
    /// Finds the configuration for a payment method type.
    #[must_use]
    pub fn payment_method(&self, payment_method_type: &str) -> Option<&PaymentMethodConfiguration> {
        self.payment_methods
            .iter()
            .find(|pm| pm.payment_method_type == payment_method_type)
    }
}

/// Merchant client session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSession {
    /// Session id.
    #[serde(default)]
    pub client_session_id: Option<String>,
    /// Order details.
    #[serde(default)]
    pub order: Option<Order>,
    /// Customer details.
    #[serde(default)]
    pub customer: Option<Customer>,
    /// Payment method options.
    #[serde(default)]
    pub payment_method: Option<PaymentMethodOptions>,
}

/// Order details of a client session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// ISO 3166-1 alpha-2 country code.
    #[serde(default)]
    pub country_code: Option<String>,
    /// ISO 4217 currency code.
    #[serde(default)]
    pub currency_code: Option<String>,
    /// Amount set explicitly by the merchant, in minor units.
    #[serde(default)]
    pub merchant_amount: Option<i64>,
    /// Amount computed from line items, in minor units.
    #[serde(default)]
    pub total_order_amount: Option<i64>,
    /// Line items.
    #[serde(default)]
    pub line_items: Vec<LineItem>,
}

/// A single line item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    /// Merchant item id.
    #[serde(default)]
    pub item_id: Option<String>,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Unit amount in minor units.
    #[serde(default)]
    pub amount: Option<i64>,
    /// Quantity.
    #[serde(default)]
    pub quantity: Option<u32>,
    /// Discount in minor units.
    #[serde(default)]
    pub discount_amount: Option<i64>,
}

/// Customer details of a client session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    /// Email.
    #[serde(default)]
    pub email_address: Option<String>,
    /// Mobile number.
    #[serde(default)]
    pub mobile_number: Option<String>,
    /// First name.
    #[serde(default)]
    pub first_name: Option<String>,
    /// Last name.
    #[serde(default)]
    pub last_name: Option<String>,
}

/// Payment method options of a client session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethodOptions {
    /// Whether to vault the method once the payment succeeds.
    #[serde(default)]
    pub vault_on_success: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skips_malformed_payment_methods() {
        let json = r#"{
            "pciUrl": "https://pci.example",
            "paymentMethods": [
                {"id": "1", "type": "PAYMENT_CARD"},
                {"id": "2"},
                {"id": "3", "type": "ADYEN_GIROPAY", "implementationType": "WEB_REDIRECT"},
                {"id": "4", "type": "IPAY88_CARD", "implementationType": "IPAY88_SDK"}
            ]
        }"#;
        let config: ApiConfiguration = serde_json::from_str(json).unwrap();
        assert_eq!(config.payment_methods.len(), 3);
        assert_eq!(
            config.payment_method("ADYEN_GIROPAY").unwrap().implementation_type,
            ImplementationType::WebRedirect
        );
        assert_eq!(
            config.payment_method("IPAY88_CARD").unwrap().implementation_type,
            ImplementationType::Unknown
        );
        assert_eq!(
            config.payment_method("PAYMENT_CARD").unwrap().implementation_type,
            ImplementationType::NativeSdk
        );
    }

    #[test]
    fn test_option_str() {
        let json =
            r#"{"id": "a", "type": "APAYA", "options": {"merchantAccountId": "m-1", "n": 3}}"#;
        let pm: PaymentMethodConfiguration = serde_json::from_str(json).unwrap();
        assert_eq!(pm.option_str("merchantAccountId"), Some("m-1"));
        assert_eq!(pm.option_str("n"), None);
        assert_eq!(pm.option_str("missing"), None);
    }
}
