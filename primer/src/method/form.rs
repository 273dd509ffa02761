//! Form based methods.
//!
//! - `ADYEN_BLIK`: six-digit one-time code, confirmed in the banking app.
//! - `ADYEN_MBWAY`: phone number, confirmed in the MB WAY app.
//! - `ADYEN_MULTIBANCO`: no input; the payment returns a voucher.
//! - `RAPYD_FAST`: no input; the payment returns a bank redirect.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::PrimerError;
use crate::interaction::{FieldKind, FormField, Presentation, UserInput, VoucherDetails};
use crate::pipeline::FlowContext;
use crate::proto::{SessionInfo, TokenizationRequest};
use crate::session::SessionContext;
use crate::token::DecodedClientToken;

use super::{
    PaymentMethodFlow, off_session_request, present_and_poll_status, redirect_and_poll,
    require_config_id, require_pci_url, unexpected_input, web_redirect_info,
};

/// Payment method types handled by [`FormFlow`].
pub const TYPES: &[&str] = &["ADYEN_BLIK", "ADYEN_MBWAY", "ADYEN_MULTIBANCO", "RAPYD_FAST"];

/// Field id of the BLIK code.
pub const BLIK_CODE_FIELD: &str = "blikCode";

/// Field id of the MB WAY phone number.
pub const PHONE_NUMBER_FIELD: &str = "phoneNumber";

static BLIK_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{6}$").expect("valid BLIK pattern"));

const MIN_PHONE_DIGITS: usize = 8;

/// Variant of a [`FormFlow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormKind {
    /// One-time code.
    Blik,
    /// Phone number.
    MbWay,
    /// Voucher.
    Multibanco,
    /// Bank redirect.
    RapydFast,
}

/// Form flow.
#[derive(Debug, Clone)]
pub struct FormFlow {
    payment_method_type: String,
    kind: FormKind,
}

impl FormFlow {
    /// Creates the flow for `payment_method_type`.
    ///
    /// # Errors
    ///
    /// Returns [`PrimerError::UnsupportedPaymentMethod`] for a type not in [`TYPES`].
    pub fn new(payment_method_type: &str) -> Result<Self, PrimerError> {
        let kind = match payment_method_type {
            "ADYEN_BLIK" => FormKind::Blik,
            "ADYEN_MBWAY" => FormKind::MbWay,
            "ADYEN_MULTIBANCO" => FormKind::Multibanco,
            "RAPYD_FAST" => FormKind::RapydFast,
            other => return Err(PrimerError::UnsupportedPaymentMethod(other.to_owned())),
        };
        Ok(Self {
            payment_method_type: payment_method_type.to_owned(),
            kind,
        })
    }

    /// Variant of the flow.
    #[must_use]
    pub const fn kind(&self) -> FormKind {
        self.kind
    }

    /// Fields presented to the user; empty for methods without input.
    #[must_use]
    pub fn fields(&self) -> Vec<FormField> {
        match self.kind {
            FormKind::Blik => vec![FormField {
                id: BLIK_CODE_FIELD.to_owned(),
                label: "6 digit code".to_owned(),
                kind: FieldKind::Digits,
                prefix: None,
            }],
            FormKind::MbWay => vec![FormField {
                id: PHONE_NUMBER_FIELD.to_owned(),
                label: "Phone number".to_owned(),
                kind: FieldKind::Phone,
                prefix: Some("+351".to_owned()),
            }],
            FormKind::Multibanco | FormKind::RapydFast => Vec::new(),
        }
    }

    fn voucher(session: &SessionContext, client_token: &DecodedClientToken) -> VoucherDetails {
        VoucherDetails {
            entity: client_token.entity.clone(),
            reference: client_token.reference.clone(),
            expires_at: client_token.expires_at.clone(),
            amount: session.amount(),
            currency: session.currency().map(str::to_owned),
        }
    }
}

/// Checks a BLIK code: exactly six digits.
///
/// # Errors
///
/// Returns [`PrimerError::InvalidValue`] keyed `blikCode`.
pub fn validate_blik_code(code: &str) -> Result<(), PrimerError> {
    if BLIK_CODE.is_match(code) {
        Ok(())
    } else {
        Err(PrimerError::invalid_value(BLIK_CODE_FIELD, code))
    }
}

fn checked_blik_code(code: &str) -> Result<String, PrimerError> {
    validate_blik_code(code).map(|()| code.to_owned())
}

/// Normalizes a phone number to `+` and digits.
///
/// # Errors
///
/// Returns [`PrimerError::InvalidValue`] keyed `phoneNumber` for stray
/// characters or fewer than eight digits.
pub fn normalize_phone_number(raw: &str) -> Result<String, PrimerError> {
    let trimmed: String = raw.chars().filter(|c| !c.is_whitespace() && *c != '-').collect();
    let digits = trimmed.strip_prefix('+').unwrap_or(&trimmed);
    if digits.len() < MIN_PHONE_DIGITS || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(PrimerError::invalid_value(PHONE_NUMBER_FIELD, raw));
    }
    Ok(trimmed)
}

impl PaymentMethodFlow for FormFlow {
    type Input = Option<String>;

    fn payment_method_type(&self) -> &str {
        &self.payment_method_type
    }

    fn validate(&self, session: &SessionContext) -> Result<(), PrimerError> {
        require_pci_url(session)?;
        require_config_id(session, &self.payment_method_type)?;
        Ok(())
    }

    async fn collect_input(&self, ctx: &FlowContext) -> Result<Option<String>, PrimerError> {
        let (field, check): (&str, fn(&str) -> Result<String, PrimerError>) = match self.kind {
            FormKind::Blik => (BLIK_CODE_FIELD, checked_blik_code),
            FormKind::MbWay => (PHONE_NUMBER_FIELD, normalize_phone_number),
            FormKind::Multibanco | FormKind::RapydFast => return Ok(None),
        };

        let presentation = Presentation::Form {
            fields: self.fields(),
        };
        let mut values = match ctx.present(&self.payment_method_type, presentation).await? {
            UserInput::Form(values) => values,
            other => return Err(unexpected_input(&self.payment_method_type, &other)),
        };
        let value = values
            .remove(field)
            .ok_or_else(|| PrimerError::missing_value(field))?;
        check(&value).map(Some)
    }

    fn build_request(
        &self,
        session: &SessionContext,
        input: Option<String>,
    ) -> Result<TokenizationRequest, PrimerError> {
        let settings = session.settings();
        let session_info = match (self.kind, input) {
            (FormKind::Blik, Some(blik_code)) => SessionInfo::Blik {
                blik_code,
                locale: settings.locale.locale_code(),
                platform: settings.platform.clone(),
                redirection_url: settings.url_scheme.clone(),
            },
            (FormKind::MbWay, Some(phone_number)) => SessionInfo::PhoneNumber { phone_number },
            (FormKind::Blik, None) => return Err(PrimerError::missing_value(BLIK_CODE_FIELD)),
            (FormKind::MbWay, None) => return Err(PrimerError::missing_value(PHONE_NUMBER_FIELD)),
            (FormKind::Multibanco | FormKind::RapydFast, _) => web_redirect_info(session),
        };
        off_session_request(session, &self.payment_method_type, session_info)
    }

    async fn handle_required_action(
        &self,
        ctx: &FlowContext,
        client_token: &DecodedClientToken,
    ) -> Result<Option<String>, PrimerError> {
        match self.kind {
            FormKind::Blik | FormKind::MbWay => {
                let message = match self.kind {
                    FormKind::Blik => "Confirm the payment in your banking app",
                    _ => "Confirm the payment in the MB WAY app",
                };
                present_and_poll_status(
                    ctx,
                    &self.payment_method_type,
                    Presentation::AwaitingConfirmation {
                        message: message.to_owned(),
                    },
                    client_token,
                )
                .await
            }
            FormKind::Multibanco => {
                let voucher = Self::voucher(ctx.session(), client_token);
                // Closing the voucher is not a cancellation: the payment stays pending.
                match ctx
                    .present(&self.payment_method_type, Presentation::Voucher(voucher))
                    .await
                {
                    Ok(_) => ctx.dismiss(&self.payment_method_type).await,
                    Err(err) if err.is_cancelled() => {}
                    Err(err) => return Err(err),
                }
                Ok(None)
            }
            FormKind::RapydFast => {
                redirect_and_poll(ctx, &self.payment_method_type, client_token).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use crate::pipeline::TokenizationEngine;
    use crate::proto::PollingResponse;
    use crate::testing::{
        FakeApi, ScriptedPresenter, checkout_session, required_action_token, vault_session,
    };

    fn form(key: &str, value: &str) -> UserInput {
        UserInput::Form(BTreeMap::from([(key.to_owned(), value.to_owned())]))
    }

    #[test]
    fn test_blik_code_format() {
        assert!(validate_blik_code("123456").is_ok());
        assert!(validate_blik_code("12345").is_err());
        assert!(validate_blik_code("1234567").is_err());
        assert!(validate_blik_code("12a456").is_err());
    }

    #[test]
    fn test_phone_number_normalization() {
        assert_eq!(normalize_phone_number("+351 912 345 678").unwrap(), "+351912345678");
        assert!(normalize_phone_number("1234").is_err());
        assert!(normalize_phone_number("+351 91x 345 678").is_err());
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        assert!(matches!(
            FormFlow::new("ADYEN_SWISH"),
            Err(PrimerError::UnsupportedPaymentMethod(_))
        ));
    }

    #[tokio::test]
    async fn test_blik_tokenizes_code() {
        let api = Arc::new(FakeApi::default());
        let presenter = ScriptedPresenter::new([form(BLIK_CODE_FIELD, "777123")]);
        let mut ctx = FlowContext::new(Arc::new(vault_session()), api.clone(), Arc::new(presenter));

        TokenizationEngine::new()
            .run(&FormFlow::new("ADYEN_BLIK").unwrap(), &mut ctx)
            .await
            .unwrap();

        let body = api.last_tokenize_body().unwrap();
        assert_eq!(body["paymentInstrument"]["sessionInfo"]["blikCode"], "777123");
    }

    #[tokio::test]
    async fn test_invalid_blik_code_never_tokenizes() {
        let api = Arc::new(FakeApi::default());
        let presenter = ScriptedPresenter::new([form(BLIK_CODE_FIELD, "12")]);
        let mut ctx = FlowContext::new(Arc::new(vault_session()), api.clone(), Arc::new(presenter));

        let err = TokenizationEngine::new()
            .run(&FormFlow::new("ADYEN_BLIK").unwrap(), &mut ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, PrimerError::InvalidValue { ref key, .. } if key == BLIK_CODE_FIELD));
        assert_eq!(api.calls("tokenize"), 0);
    }

    #[tokio::test]
    async fn test_mbway_polls_while_awaiting_confirmation() {
        let api = Arc::new(FakeApi::default());
        api.script_poll([Ok(PollingResponse::complete("resume-mbway"))]);
        let ctx = FlowContext::new(
            Arc::new(checkout_session()),
            api.clone(),
            Arc::new(ScriptedPresenter::pending()),
        );

        let resume = FormFlow::new("ADYEN_MBWAY")
            .unwrap()
            .handle_required_action(&ctx, &required_action_token())
            .await
            .unwrap();
        assert_eq!(resume.as_deref(), Some("resume-mbway"));
    }

    #[tokio::test]
    async fn test_multibanco_shows_voucher_without_resume() {
        let api = Arc::new(FakeApi::default());
        let presenter = ScriptedPresenter::new([UserInput::Acknowledged]);
        let ctx = FlowContext::new(Arc::new(checkout_session()), api.clone(), Arc::new(presenter));

        let mut action = required_action_token();
        action.entity = Some("12345".into());
        action.reference = Some("999 999 999".into());
        let resume = FormFlow::new("ADYEN_MULTIBANCO")
            .unwrap()
            .handle_required_action(&ctx, &action)
            .await
            .unwrap();

        assert_eq!(resume, None);
        assert_eq!(api.calls("poll"), 0);
    }

    #[test]
    fn test_voucher_details_come_from_token_and_session() {
        let mut action = required_action_token();
        action.entity = Some("12345".into());
        action.expires_at = Some("2030-01-01T00:00:00Z".into());
        let voucher = FormFlow::voucher(&checkout_session(), &action);
        assert_eq!(voucher.entity.as_deref(), Some("12345"));
        assert_eq!(voucher.amount, Some(1000));
        assert_eq!(voucher.currency.as_deref(), Some("EUR"));
    }
}
