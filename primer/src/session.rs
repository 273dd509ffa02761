//! Explicit session state threaded through every flow.
//!
//! A [`SessionContext`] bundles the decoded client token, the remote
//! configuration, the merchant settings and the session intent. It is an
//! immutable value: flows read from it, and steps that change the session
//! (such as a client session action) produce a new snapshot.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::api::PrimerApi;
use crate::config::PrimerSettings;
use crate::error::PrimerError;
use crate::proto::{ApiConfiguration, ClientSession, LineItem, PaymentMethodConfiguration};
use crate::timestamp::UnixTimestamp;
use crate::token::DecodedClientToken;

#[cfg(feature = "telemetry")]
use tracing::instrument;

/// What the session is for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    /// Pay now.
    #[default]
    Checkout,
    /// Store the payment method for later.
    Vault,
}

impl Display for Intent {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Checkout => f.write_str("CHECKOUT"),
            Self::Vault => f.write_str("VAULT"),
        }
    }
}

impl FromStr for Intent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "CHECKOUT" => Ok(Self::Checkout),
            "VAULT" => Ok(Self::Vault),
            other => Err(format!("unknown intent `{other}`")),
        }
    }
}

/// Session state shared by all steps of a checkout.
#[derive(Debug, Clone)]
pub struct SessionContext {
    client_token: DecodedClientToken,
    configuration: Option<ApiConfiguration>,
    settings: PrimerSettings,
    intent: Intent,
}

impl SessionContext {
    /// Creates a session from an already decoded token, without remote configuration.
    #[must_use]
    pub const fn new(
        client_token: DecodedClientToken,
        settings: PrimerSettings,
        intent: Intent,
    ) -> Self {
        Self {
            client_token,
            configuration: None,
            settings,
            intent,
        }
    }

    /// Decodes `raw_client_token`, checks it and fetches the remote configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PrimerError::InvalidClientToken`] if the token cannot be
    /// decoded or is expired, or a network error if the configuration
    /// cannot be fetched.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "primer.session.bootstrap", skip_all, fields(intent = %intent), err)
    )]
    pub async fn bootstrap(
        api: &dyn PrimerApi,
        raw_client_token: &str,
        settings: PrimerSettings,
        intent: Intent,
    ) -> Result<Self, PrimerError> {
        let client_token = DecodedClientToken::decode(raw_client_token)?;
        if !client_token.is_valid() {
            return Err(PrimerError::InvalidClientToken);
        }
        let configuration = api.fetch_configuration(&client_token).await?;

        #[cfg(feature = "telemetry")]
        tracing::info!(
            payment_methods = configuration.payment_methods.len(),
            has_client_session = configuration.client_session.is_some(),
            "Fetched checkout configuration"
        );

        Ok(Self::new(client_token, settings, intent).with_configuration(configuration))
    }

    /// Returns a copy of the session with the given remote configuration.
    ///
    /// API base URLs set in the configuration take precedence over the ones
    /// carried by the client token.
    #[must_use]
    pub fn with_configuration(mut self, configuration: ApiConfiguration) -> Self {
        if let Some(pci_url) = &configuration.pci_url {
            self.client_token.pci_url = Some(pci_url.clone());
        }
        if let Some(core_url) = &configuration.core_url {
            self.client_token.core_url = Some(core_url.clone());
        }
        self.configuration = Some(configuration);
        self
    }

    /// Applies the configuration returned by a client session action.
    ///
    /// The client session is replaced; payment methods are kept when the
    /// update does not list any.
    #[must_use]
    pub fn with_configuration_update(self, update: ApiConfiguration) -> Self {
        let merged = match self.configuration.clone() {
            Some(mut current) => {
                current.client_session = update.client_session;
                if !update.payment_methods.is_empty() {
                    current.payment_methods = update.payment_methods;
                }
                current.core_url = update.core_url.or(current.core_url);
                current.pci_url = update.pci_url.or(current.pci_url);
                current
            }
            None => update,
        };
        self.with_configuration(merged)
    }

    /// Decoded client token, without any validity check.
    #[must_use]
    pub const fn client_token(&self) -> &DecodedClientToken {
        &self.client_token
    }

    /// Merchant settings.
    #[must_use]
    pub const fn settings(&self) -> &PrimerSettings {
        &self.settings
    }

    /// Session intent.
    #[must_use]
    pub const fn intent(&self) -> Intent {
        self.intent
    }

    /// Remote configuration, if fetched.
    #[must_use]
    pub const fn configuration(&self) -> Option<&ApiConfiguration> {
        self.configuration.as_ref()
    }

    /// Remote configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PrimerError::MissingConfiguration`] if it was never fetched.
    pub fn require_configuration(&self) -> Result<&ApiConfiguration, PrimerError> {
        self.configuration
            .as_ref()
            .ok_or(PrimerError::MissingConfiguration)
    }

    /// Client token, checked for presence of an access token and expiry at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`PrimerError::InvalidClientToken`] if the token is not valid.
    pub fn valid_client_token_at(
        &self,
        now: UnixTimestamp,
    ) -> Result<&DecodedClientToken, PrimerError> {
        if self.client_token.is_valid_at(now) {
            Ok(&self.client_token)
        } else {
            Err(PrimerError::InvalidClientToken)
        }
    }

    /// Client token, checked against the current time.
    ///
    /// # Errors
    ///
    /// Returns [`PrimerError::InvalidClientToken`] if the token is not valid.
    pub fn valid_client_token(&self) -> Result<&DecodedClientToken, PrimerError> {
        self.valid_client_token_at(UnixTimestamp::now())
    }

    /// Client session, if the configuration carries one.
    #[must_use]
    pub fn client_session(&self) -> Option<&ClientSession> {
        self.configuration.as_ref()?.client_session.as_ref()
    }

    /// Session currency code.
    #[must_use]
    pub fn currency(&self) -> Option<&str> {
        self.client_session()?.order.as_ref()?.currency_code.as_deref()
    }

    /// Session amount in minor units: the merchant amount, else the order total.
    #[must_use]
    pub fn amount(&self) -> Option<i64> {
        let order = self.client_session()?.order.as_ref()?;
        order.merchant_amount.or(order.total_order_amount)
    }

    /// Session country code.
    #[must_use]
    pub fn country_code(&self) -> Option<&str> {
        self.client_session()?.order.as_ref()?.country_code.as_deref()
    }

    /// Order line items.
    #[must_use]
    pub fn line_items(&self) -> &[LineItem] {
        self.client_session()
            .and_then(|s| s.order.as_ref())
            .map_or(&[], |o| o.line_items.as_slice())
    }

    /// Customer mobile number.
    #[must_use]
    pub fn customer_mobile_number(&self) -> Option<&str> {
        self.client_session()?.customer.as_ref()?.mobile_number.as_deref()
    }

    /// Configuration of a payment method type.
    #[must_use]
    pub fn payment_method_config(
        &self,
        payment_method_type: &str,
    ) -> Option<&PaymentMethodConfiguration> {
        self.configuration.as_ref()?.payment_method(payment_method_type)
    }

    /// Checkout amount, required for the checkout intent.
    ///
    /// # Errors
    ///
    /// Returns [`PrimerError::InvalidSetting`] naming `amount` if unset.
    pub fn require_amount(&self) -> Result<i64, PrimerError> {
        self.amount().ok_or_else(|| PrimerError::missing_setting("amount"))
    }

    /// Currency code.
    ///
    /// # Errors
    ///
    /// Returns [`PrimerError::InvalidSetting`] naming `currency` if unset.
    pub fn require_currency(&self) -> Result<&str, PrimerError> {
        self.currency().ok_or_else(|| PrimerError::missing_setting("currency"))
    }

    /// Country code.
    ///
    /// # Errors
    ///
    /// Returns [`PrimerError::InvalidSetting`] naming `countryCode` if unset.
    pub fn require_country_code(&self) -> Result<&str, PrimerError> {
        self.country_code()
            .ok_or_else(|| PrimerError::missing_setting("countryCode"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::configuration::Order;

    fn session_with_order(order: Order) -> SessionContext {
        SessionContext::new(
            DecodedClientToken::default(),
            PrimerSettings::default(),
            Intent::Checkout,
        )
        .with_configuration(ApiConfiguration {
            client_session: Some(ClientSession {
                order: Some(order),
                ..Default::default()
            }),
            ..Default::default()
        })
    }

    #[test]
    fn test_amount_prefers_merchant_amount() {
        let session = session_with_order(Order {
            merchant_amount: Some(500),
            total_order_amount: Some(700),
            ..Default::default()
        });
        assert_eq!(session.amount(), Some(500));

        let session = session_with_order(Order {
            total_order_amount: Some(700),
            ..Default::default()
        });
        assert_eq!(session.amount(), Some(700));
    }

    #[test]
    fn test_required_settings_name_the_missing_field() {
        let session = session_with_order(Order::default());
        match session.require_currency() {
            Err(PrimerError::InvalidSetting { name, .. }) => assert_eq!(name, "currency"),
            other => panic!("unexpected {other:?}"),
        }
        match session.require_amount() {
            Err(PrimerError::InvalidSetting { name, .. }) => assert_eq!(name, "amount"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_missing_configuration() {
        let session = SessionContext::new(
            DecodedClientToken::default(),
            PrimerSettings::default(),
            Intent::Vault,
        );
        assert!(matches!(
            session.require_configuration(),
            Err(PrimerError::MissingConfiguration)
        ));
        assert!(session.line_items().is_empty());
        assert_eq!(session.currency(), None);
    }

    #[test]
    fn test_configuration_urls_override_token() {
        let token = DecodedClientToken {
            pci_url: Some("https://pci.token".into()),
            core_url: Some("https://core.token".into()),
            ..Default::default()
        };
        let session = SessionContext::new(token, PrimerSettings::default(), Intent::Checkout)
            .with_configuration(ApiConfiguration {
                pci_url: Some("https://pci.config".into()),
                ..Default::default()
            });
        assert_eq!(session.client_token().pci_url.as_deref(), Some("https://pci.config"));
        assert_eq!(session.client_token().core_url.as_deref(), Some("https://core.token"));
    }

    #[test]
    fn test_configuration_update_keeps_payment_methods() {
        let session = SessionContext::new(
            DecodedClientToken::default(),
            PrimerSettings::default(),
            Intent::Checkout,
        )
        .with_configuration(ApiConfiguration {
            payment_methods: vec![PaymentMethodConfiguration::new("1", "PAYMENT_CARD")],
            ..Default::default()
        });
        let updated = session.with_configuration_update(ApiConfiguration {
            client_session: Some(ClientSession {
                client_session_id: Some("cs-2".into()),
                ..Default::default()
            }),
            ..Default::default()
        });
        assert!(updated.payment_method_config("PAYMENT_CARD").is_some());
        assert_eq!(
            updated.client_session().and_then(|s| s.client_session_id.as_deref()),
            Some("cs-2")
        );
    }

    #[test]
    fn test_intent_parse_and_display() {
        assert_eq!("vault".parse::<Intent>().unwrap(), Intent::Vault);
        assert_eq!(Intent::Checkout.to_string(), "CHECKOUT");
        assert!("pay".parse::<Intent>().is_err());
    }
}
