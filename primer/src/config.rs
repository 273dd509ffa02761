//! Merchant settings for a checkout session.
//!
//! Settings are plain data: they can be built in code or deserialized from
//! any serde format. Every field has a default, so an empty document yields
//! a usable configuration.
//!
//! # Example
//!
//! ```rust
//! use primer::config::{PaymentHandling, PrimerSettings};
//!
//! let settings: PrimerSettings = serde_json::from_str(
//!     r#"{"payment_handling": "MANUAL", "url_scheme": "merchant://checkout"}"#,
//! ).unwrap();
//! assert_eq!(settings.payment_handling, PaymentHandling::Manual);
//! assert_eq!(settings.locale.locale_code(), "en-GB");
//! ```

use serde::{Deserialize, Serialize};

use crate::polling::PollingConfig;

/// Default value of the `X-Api-Version` header.
pub const DEFAULT_API_VERSION: &str = "2.3";

/// Default platform reported in session info.
pub const DEFAULT_PLATFORM: &str = "IOS";

/// Who creates and resumes payments after tokenization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentHandling {
    /// The SDK creates and resumes the payment.
    #[default]
    Auto,
    /// The merchant backend creates the payment from the token.
    Manual,
}

/// Locale used for redirect pages and wallet sheets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocaleData {
    /// ISO 639-1 language code.
    pub language_code: String,
    /// ISO 3166-1 region code.
    pub region_code: Option<String>,
}

impl Default for LocaleData {
    fn default() -> Self {
        Self {
            language_code: "en".to_owned(),
            region_code: Some("GB".to_owned()),
        }
    }
}

impl LocaleData {
    /// Combined code, e.g. `"en-GB"`, or just the language.
    #[must_use]
    pub fn locale_code(&self) -> String {
        match &self.region_code {
            Some(region) => format!("{}-{region}", self.language_code),
            None => self.language_code.clone(),
        }
    }
}

/// Apple Pay options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplePayOptions {
    /// Merchant identifier registered with Apple.
    pub merchant_identifier: Option<String>,
    /// Name shown on the total line.
    pub merchant_name: Option<String>,
}

/// Klarna options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KlarnaOptions {
    /// Description shown to the user for recurring payments.
    pub recurring_payment_description: Option<String>,
}

/// Merchant settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrimerSettings {
    /// Payment handling mode.
    pub payment_handling: PaymentHandling,
    /// Locale.
    pub locale: LocaleData,
    /// App URL scheme used as redirect target (e.g. `"merchant://"`).
    pub url_scheme: Option<String>,
    /// Apple Pay options.
    pub apple_pay: ApplePayOptions,
    /// Klarna options.
    pub klarna: KlarnaOptions,
    /// Polling behavior for asynchronous methods.
    pub polling: PollingConfig,
    /// Value of the `X-Api-Version` header.
    pub api_version: String,
    /// Platform reported to the backend.
    pub platform: String,
}

impl Default for PrimerSettings {
    fn default() -> Self {
        Self {
            payment_handling: PaymentHandling::default(),
            locale: LocaleData::default(),
            url_scheme: None,
            apple_pay: ApplePayOptions::default(),
            klarna: KlarnaOptions::default(),
            polling: PollingConfig::default(),
            api_version: DEFAULT_API_VERSION.to_owned(),
            platform: DEFAULT_PLATFORM.to_owned(),
        }
    }
}

impl PrimerSettings {
    /// Sets the payment handling mode.
    #[must_use]
    pub const fn with_payment_handling(mut self, payment_handling: PaymentHandling) -> Self {
        self.payment_handling = payment_handling;
        self
    }

    /// Sets the app URL scheme.
    #[must_use]
    pub fn with_url_scheme(mut self, url_scheme: impl Into<String>) -> Self {
        self.url_scheme = Some(url_scheme.into());
        self
    }

    /// Sets the polling behavior.
    #[must_use]
    pub const fn with_polling(mut self, polling: PollingConfig) -> Self {
        self.polling = polling;
        self
    }

    /// URL scheme without any `://` suffix, e.g. `"merchant"`.
    #[must_use]
    pub fn url_scheme_name(&self) -> Option<&str> {
        let scheme = self.url_scheme.as_deref()?;
        let name = scheme.split("://").next().unwrap_or(scheme);
        (!name.is_empty()).then_some(name)
    }
}
