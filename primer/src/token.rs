//! Client token decoding.
//!
//! A client token is a three-segment, JWT-shaped string issued by the
//! merchant backend. Only the payload segment is read: it carries the access
//! token used as bearer credential and the base URLs for every API call.
//! The signature is verified server side and ignored here.

use std::fmt::{self, Debug, Formatter};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::PrimerError;
use crate::timestamp::UnixTimestamp;

/// Intent suffix marking tokens that require a redirect before resuming.
const REDIRECTION_INTENT_SUFFIX: &str = "_REDIRECTION";

/// Decoded payload of a client token.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedClientToken {
    /// Bearer credential sent as `Primer-Client-Token`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// Standard JWT expiry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<UnixTimestamp>,
    /// Explicit expiry; takes precedence over `exp`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<UnixTimestamp>,
    /// URL of the checkout configuration resource.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration_url: Option<String>,
    /// Base URL of the core API (PayPal, Klarna, banks, Apaya).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub core_url: Option<String>,
    /// Base URL of the PCI API (tokenization, payments).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pci_url: Option<String>,
    /// Environment name (e.g. `"SANDBOX"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<String>,
    /// Token intent, e.g. `"CHECKOUT"` or `"ADYEN_GIROPAY_REDIRECTION"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
    /// Payment flow hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_flow: Option<String>,
    /// Page the user must be redirected to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    /// Endpoint to poll for the outcome of an asynchronous step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_url: Option<String>,
    /// 3DS initialization endpoint.
    #[serde(default, rename = "threeDSecureInitUrl", skip_serializing_if = "Option::is_none")]
    pub three_d_secure_init_url: Option<String>,
    /// 3DS token.
    #[serde(default, rename = "threeDSecureToken", skip_serializing_if = "Option::is_none")]
    pub three_d_secure_token: Option<String>,
    /// QR code payload or image URL.
    #[serde(default, alias = "qrCodeUrl", skip_serializing_if = "Option::is_none")]
    pub qr_code: Option<String>,
    /// Account number for bank transfer methods.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_number: Option<String>,
    /// Voucher expiry as reported by the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    /// Voucher reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// Voucher entity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
}

impl Debug for DecodedClientToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodedClientToken")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("expires_at", &self.expires_at_time())
            .field("env", &self.env)
            .field("intent", &self.intent)
            .field("pci_url", &self.pci_url)
            .field("core_url", &self.core_url)
            .field("status_url", &self.status_url)
            .field("redirect_url", &self.redirect_url)
            .finish_non_exhaustive()
    }
}

impl DecodedClientToken {
    /// Decodes the payload segment of a raw client token.
    ///
    /// # Errors
    ///
    /// Returns [`PrimerError::InvalidClientToken`] if the token does not have
    /// three segments, or the payload is not base64url-encoded JSON.
    pub fn decode(raw: &str) -> Result<Self, PrimerError> {
        let mut segments = raw.trim().split('.');
        let (Some(_header), Some(payload), Some(_signature), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(PrimerError::InvalidClientToken);
        };

        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|_| PrimerError::InvalidClientToken)?;
        serde_json::from_slice(&bytes).map_err(|_| PrimerError::InvalidClientToken)
    }

    /// Effective expiry: `expiration` if set, otherwise `exp`.
    #[must_use]
    pub const fn expires_at_time(&self) -> Option<UnixTimestamp> {
        match self.expiration {
            Some(expiration) => Some(expiration),
            None => self.exp,
        }
    }

    /// Returns `true` if the token has an access token and expires after `now`.
    #[must_use]
    pub fn is_valid_at(&self, now: UnixTimestamp) -> bool {
        let has_access_token = self
            .access_token
            .as_deref()
            .is_some_and(|t| !t.is_empty());
        has_access_token && self.expires_at_time().is_some_and(|exp| exp > now)
    }

    /// Returns `true` if the token is valid at the current system time.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(UnixTimestamp::now())
    }

    /// Returns `true` if the token intent requires a redirect (e.g. `*_REDIRECTION`).
    #[must_use]
    pub fn is_redirection_intent(&self) -> bool {
        self.intent
            .as_deref()
            .is_some_and(|intent| intent.contains(REDIRECTION_INTENT_SUFFIX))
    }

    /// Returns the access token.
    ///
    /// # Errors
    ///
    /// Returns [`PrimerError::InvalidClientToken`] if it is absent.
    pub fn access_token(&self) -> Result<&str, PrimerError> {
        self.access_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(PrimerError::InvalidClientToken)
    }

    /// Parsed PCI base URL.
    ///
    /// # Errors
    ///
    /// Returns [`PrimerError::InvalidClientToken`] if it is absent or unparseable.
    pub fn pci_url(&self) -> Result<Url, PrimerError> {
        parse_url(self.pci_url.as_deref())
    }

    /// Parsed core base URL.
    ///
    /// # Errors
    ///
    /// Returns [`PrimerError::InvalidClientToken`] if it is absent or unparseable.
    pub fn core_url(&self) -> Result<Url, PrimerError> {
        parse_url(self.core_url.as_deref())
    }

    /// Parsed configuration URL.
    ///
    /// # Errors
    ///
    /// Returns [`PrimerError::InvalidClientToken`] if it is absent or unparseable.
    pub fn configuration_url(&self) -> Result<Url, PrimerError> {
        parse_url(self.configuration_url.as_deref())
    }

    /// Parsed status URL.
    ///
    /// # Errors
    ///
    /// Returns [`PrimerError::InvalidClientToken`] if it is absent or unparseable.
    pub fn status_url(&self) -> Result<Url, PrimerError> {
        parse_url(self.status_url.as_deref())
    }

    /// Parsed redirect URL.
    ///
    /// # Errors
    ///
    /// Returns [`PrimerError::InvalidClientToken`] if it is absent or unparseable.
    pub fn redirect_url(&self) -> Result<Url, PrimerError> {
        parse_url(self.redirect_url.as_deref())
    }
}

fn parse_url(value: Option<&str>) -> Result<Url, PrimerError> {
    value
        .and_then(|v| Url::parse(v).ok())
        .ok_or(PrimerError::InvalidClientToken)
}

/// Encodes a payload into an unsigned, JWT-shaped token.
///
/// Useful for tests and local tooling; the backend never accepts such tokens.
///
/// # Errors
///
/// Returns an error if the payload cannot be serialized.
pub fn encode_unsigned(payload: &DecodedClientToken) -> Result<String, serde_json::Error> {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(serde_json::to_vec(payload)?);
    Ok(format!("{header}.{body}.unsigned"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_with(json: &str) -> String {
        format!("e30.{}.sig", URL_SAFE_NO_PAD.encode(json))
    }

    #[test]
    fn test_decodes_payload_fields() {
        let raw = token_with(
            r#"{
                "accessToken": "at",
                "exp": 4102444800,
                "pciUrl": "https://pci.example",
                "coreUrl": "https://core.example",
                "intent": "CHECKOUT",
                "qrCodeUrl": "https://qr.example/x.png"
            }"#,
        );
        let token = DecodedClientToken::decode(&raw).unwrap();
        assert_eq!(token.access_token.as_deref(), Some("at"));
        assert_eq!(token.pci_url().unwrap().as_str(), "https://pci.example/");
        assert_eq!(token.qr_code.as_deref(), Some("https://qr.example/x.png"));
        assert!(token.is_valid_at(UnixTimestamp::from_secs(1_700_000_000)));
        assert!(!token.is_redirection_intent());
    }

    #[test]
    fn test_rejects_wrong_segment_count() {
        assert!(matches!(
            DecodedClientToken::decode("abc.def"),
            Err(PrimerError::InvalidClientToken)
        ));
        assert!(DecodedClientToken::decode("a.b.c.d").is_err());
        assert!(DecodedClientToken::decode("").is_err());
    }

    #[test]
    fn test_rejects_non_json_payload() {
        let raw = format!("e30.{}.sig", URL_SAFE_NO_PAD.encode("not json"));
        assert!(DecodedClientToken::decode(&raw).is_err());
    }

    #[test]
    fn test_accepts_padded_payload() {
        let padded = base64::engine::general_purpose::URL_SAFE.encode(r#"{"accessToken":"a"}"#);
        let token = DecodedClientToken::decode(&format!("e30.{padded}.sig")).unwrap();
        assert_eq!(token.access_token.as_deref(), Some("a"));
    }

    #[test]
    fn test_expiration_overrides_exp() {
        let token = DecodedClientToken {
            access_token: Some("at".into()),
            exp: Some(UnixTimestamp::from_secs(10)),
            expiration: Some(UnixTimestamp::from_secs(100)),
            ..Default::default()
        };
        assert_eq!(token.expires_at_time(), Some(UnixTimestamp::from_secs(100)));
        assert!(token.is_valid_at(UnixTimestamp::from_secs(50)));
        assert!(!token.is_valid_at(UnixTimestamp::from_secs(100)));
    }

    #[test]
    fn test_invalid_without_access_token_or_expiry() {
        let now = UnixTimestamp::from_secs(1);
        let no_access = DecodedClientToken {
            exp: Some(UnixTimestamp::from_secs(100)),
            ..Default::default()
        };
        assert!(!no_access.is_valid_at(now));

        let no_expiry = DecodedClientToken {
            access_token: Some("at".into()),
            ..Default::default()
        };
        assert!(!no_expiry.is_valid_at(now));
    }

    #[test]
    fn test_redirection_intent() {
        let token = DecodedClientToken {
            intent: Some("ADYEN_GIROPAY_REDIRECTION".into()),
            ..Default::default()
        };
        assert!(token.is_redirection_intent());
    }

    #[test]
    fn test_debug_redacts_access_token() {
        let token = DecodedClientToken {
            access_token: Some("secret-access".into()),
            ..Default::default()
        };
        let debug = format!("{token:?}");
        assert!(!debug.contains("secret-access"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_encode_unsigned_roundtrips_through_decode() {
        let token = DecodedClientToken {
            access_token: Some("at".into()),
            status_url: Some("https://status.example/1".into()),
            ..Default::default()
        };
        let raw = encode_unsigned(&token).unwrap();
        assert_eq!(DecodedClientToken::decode(&raw).unwrap(), token);
    }
}
