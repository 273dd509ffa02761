//! Parsing of URLs a web view is redirected to.

use url::Url;

use crate::error::PrimerError;

/// Payment method type reported by Apaya redirect errors.
const APAYA: &str = "APAYA";

/// Result of the Apaya carrier billing web view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApayaWebViewResponse {
    /// MX number.
    pub mx_number: String,
    /// Hashed subscriber identifier.
    pub hashed_identifier: String,
    /// Mobile country code.
    pub mcc: u32,
    /// Mobile network code.
    pub mnc: u32,
    /// Raw `success` flag.
    pub success: String,
    /// Raw `status` parameter, if present.
    pub status: Option<String>,
}

impl ApayaWebViewResponse {
    /// Parses the final URL of the Apaya web view.
    ///
    /// # Errors
    ///
    /// - [`PrimerError::Cancelled`] for `status=SETUP_ABANDONED`.
    /// - [`PrimerError::FlowFailed`] for `status=SETUP_ERROR`.
    /// - [`PrimerError::InvalidValue`] naming the first missing or malformed
    ///   parameter among `MX`, `HashedIdentifier`, `MCC`, `MNC` and `success`.
    pub fn from_url(url: &Url) -> Result<Self, PrimerError> {
        let param = |key: &str| -> Option<String> {
            url.query_pairs()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.into_owned())
        };

        let status = param("status");
        match status.as_deref() {
            Some("SETUP_ABANDONED") => return Err(PrimerError::cancelled(APAYA)),
            Some("SETUP_ERROR") => {
                return Err(PrimerError::FlowFailed {
                    payment_method_type: APAYA.to_owned(),
                    message: "carrier billing setup failed".to_owned(),
                });
            }
            _ => {}
        }

        let required =
            |key: &'static str| param(key).ok_or_else(|| PrimerError::missing_value(key));
        let number = |key: &'static str| -> Result<u32, PrimerError> {
            let raw = required(key)?;
            raw.parse().map_err(|_| PrimerError::invalid_value(key, raw))
        };

        Ok(Self {
            mx_number: required("MX")?,
            hashed_identifier: required("HashedIdentifier")?,
            mcc: number("MCC")?,
            mnc: number("MNC")?,
            success: required("success")?,
            status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(url: &str) -> Result<ApayaWebViewResponse, PrimerError> {
        ApayaWebViewResponse::from_url(&Url::parse(url).unwrap())
    }

    #[test]
    fn test_abandoned_setup_is_cancellation() {
        let err = parse("https://primer.io/apaya/result?status=SETUP_ABANDONED").unwrap_err();
        assert!(matches!(
            err,
            PrimerError::Cancelled { ref payment_method_type } if payment_method_type == "APAYA"
        ));
    }

    #[test]
    fn test_setup_error_fails_flow() {
        let err = parse("https://primer.io/apaya/result?status=SETUP_ERROR&MX=1").unwrap_err();
        assert!(matches!(err, PrimerError::FlowFailed { .. }));
    }

    #[test]
    fn test_populated_response() {
        let response = parse(
            "https://primer.io/apaya/result?success=1&token=abc&pt=xyz&status=SETUP_SUCCESS\
             &HashedIdentifier=602&MX=9877&MCC=234&MNC=10",
        )
        .unwrap();
        assert_eq!(response.mx_number, "9877");
        assert_eq!(response.hashed_identifier, "602");
        assert_eq!(response.mcc, 234);
        assert_eq!(response.mnc, 10);
        assert_eq!(response.success, "1");
        assert_eq!(response.status.as_deref(), Some("SETUP_SUCCESS"));
    }

    #[test]
    fn test_missing_and_malformed_parameters() {
        let no_mx = "https://primer.io/apaya/result?success=1&HashedIdentifier=602&MCC=234&MNC=10";
        let err = parse(no_mx).unwrap_err();
        assert!(matches!(err, PrimerError::InvalidValue { ref key, value: None } if key == "MX"));

        let bad_mcc =
            "https://primer.io/apaya/result?success=1&MX=9&HashedIdentifier=602&MCC=abc&MNC=10";
        let err = parse(bad_mcc).unwrap_err();
        assert!(matches!(
            err,
            PrimerError::InvalidValue { ref key, value: Some(ref v) } if key == "MCC" && v == "abc"
        ));

        let err = parse("https://primer.io/apaya/result?MX=9&HashedIdentifier=602&MCC=1&MNC=10")
            .unwrap_err();
        assert!(matches!(err, PrimerError::InvalidValue { ref key, .. } if key == "success"));
    }
}
