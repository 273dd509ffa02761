//! Payment method flows.
//!
//! Every payment method is a [`PaymentMethodFlow`]: a small capability set
//! plugged into the shared [`TokenizationEngine`]. Flows differ only in
//! what they validate, which UI they present, the instrument they build
//! and how they handle a required action once a payment is created.
//!
//! | Module            | Payment method types                                           |
//! |-------------------|----------------------------------------------------------------|
//! | [`card`]          | `PAYMENT_CARD`, `ADYEN_BANCONTACT_CARD`                        |
//! | [`paypal`]        | `PAYPAL`                                                       |
//! | [`apple_pay`]     | `APPLE_PAY`                                                    |
//! | [`klarna`]        | `KLARNA`                                                       |
//! | [`apaya`]         | `APAYA`                                                        |
//! | [`bank_selector`] | `ADYEN_IDEAL`, `ADYEN_DOTPAY`                                  |
//! | [`qr_code`]       | `XFERS_PAYNOW`, `RAPYD_PROMPTPAY`, `OMISE_PROMPTPAY`           |
//! | [`form`]          | `ADYEN_BLIK`, `ADYEN_MBWAY`, `ADYEN_MULTIBANCO`, `RAPYD_FAST`  |
//! | [`web_redirect`]  | any `WEB_REDIRECT` configuration                               |
//! | [`vaulted`]       | previously vaulted payment methods                             |
//! | [`primer_test`]   | `PRIMER_TEST_KLARNA`, `PRIMER_TEST_PAYPAL`, `PRIMER_TEST_SOFORT` |
//! | [`custom`]        | merchant-registered types                                      |
//!
//! [`AnyPaymentMethod`] dispatches statically over all of them.

pub mod apaya;
pub mod apple_pay;
pub mod bank_selector;
pub mod card;
pub mod custom;
pub mod form;
pub mod klarna;
pub mod paypal;
pub mod primer_test;
pub mod qr_code;
pub mod vaulted;
pub mod web_redirect;

use std::future::Future;

use url::Url;

use crate::error::PrimerError;
use crate::interaction::{Presentation, UserInput};
use crate::pipeline::{FlowContext, TokenizationEngine};
use crate::proto::{
    ImplementationType, OffSessionInstrument, PaymentInstrument, PaymentMethodConfiguration,
    PaymentMethodTokenData, SessionInfo, TokenizationRequest,
};
use crate::session::SessionContext;
use crate::token::DecodedClientToken;

pub use apaya::ApayaFlow;
pub use apple_pay::ApplePayFlow;
pub use bank_selector::BankSelectorFlow;
pub use card::CardFlow;
pub use custom::{CustomFlow, CustomPaymentMethod};
pub use form::FormFlow;
pub use klarna::KlarnaFlow;
pub use paypal::PayPalFlow;
pub use primer_test::PrimerTestFlow;
pub use qr_code::QrCodeFlow;
pub use vaulted::VaultedFlow;
pub use web_redirect::WebRedirectFlow;

/// Capability set of a payment method.
pub trait PaymentMethodFlow: Send + Sync {
    /// Input collected from the user or an external system.
    type Input: Send;

    /// Payment method type (e.g. `"PAYMENT_CARD"`).
    fn payment_method_type(&self) -> &str;

    /// Checks method-specific preconditions. Must not perform I/O.
    ///
    /// The engine checks the client token before calling this.
    ///
    /// # Errors
    ///
    /// Returns the first failed precondition.
    fn validate(&self, session: &SessionContext) -> Result<(), PrimerError>;

    /// Presents UI or calls preparatory endpoints, and returns the input.
    fn collect_input(
        &self,
        ctx: &FlowContext,
    ) -> impl Future<Output = Result<Self::Input, PrimerError>> + Send;

    /// Builds the tokenization request from the collected input.
    ///
    /// # Errors
    ///
    /// Returns an error if the input or session is incomplete.
    fn build_request(
        &self,
        session: &SessionContext,
        input: Self::Input,
    ) -> Result<TokenizationRequest, PrimerError>;

    /// Runs after a successful tokenization.
    fn post_tokenize(
        &self,
        _ctx: &FlowContext,
        _token_data: &PaymentMethodTokenData,
    ) -> impl Future<Output = Result<(), PrimerError>> + Send {
        async { Ok(()) }
    }

    /// Handles the client token of a required action, returning a resume token.
    ///
    /// `Ok(None)` leaves the payment as created. Methods without required
    /// actions fail with [`PrimerError::UnsupportedRequiredAction`].
    fn handle_required_action(
        &self,
        _ctx: &FlowContext,
        client_token: &DecodedClientToken,
    ) -> impl Future<Output = Result<Option<String>, PrimerError>> + Send {
        let err = unsupported_required_action(self.payment_method_type(), client_token);
        async move { Err(err) }
    }
}

/// All payment method flows.
#[derive(Debug, Clone)]
pub enum AnyPaymentMethod {
    /// Card entry.
    Card(CardFlow),
    /// PayPal.
    PayPal(PayPalFlow),
    /// Apple Pay.
    ApplePay(ApplePayFlow),
    /// Klarna.
    Klarna(KlarnaFlow),
    /// Apaya carrier billing.
    Apaya(ApayaFlow),
    /// Bank picker followed by a redirect.
    BankSelector(BankSelectorFlow),
    /// QR code.
    QrCode(QrCodeFlow),
    /// One-time code, phone number or voucher forms.
    Form(FormFlow),
    /// Generic redirect.
    WebRedirect(WebRedirectFlow),
    /// Vaulted payment method.
    Vaulted(VaultedFlow),
    /// Test payment method.
    PrimerTest(PrimerTestFlow),
    /// Merchant-defined payment method.
    Custom(CustomFlow),
}

macro_rules! dispatch {
    ($value:expr, $flow:ident => $body:expr) => {
        match $value {
            AnyPaymentMethod::Card($flow) => $body,
            AnyPaymentMethod::PayPal($flow) => $body,
            AnyPaymentMethod::ApplePay($flow) => $body,
            AnyPaymentMethod::Klarna($flow) => $body,
            AnyPaymentMethod::Apaya($flow) => $body,
            AnyPaymentMethod::BankSelector($flow) => $body,
            AnyPaymentMethod::QrCode($flow) => $body,
            AnyPaymentMethod::Form($flow) => $body,
            AnyPaymentMethod::WebRedirect($flow) => $body,
            AnyPaymentMethod::Vaulted($flow) => $body,
            AnyPaymentMethod::PrimerTest($flow) => $body,
            AnyPaymentMethod::Custom($flow) => $body,
        }
    };
}

impl AnyPaymentMethod {
    /// Picks the flow for a configured payment method.
    ///
    /// # Errors
    ///
    /// Returns [`PrimerError::UnsupportedPaymentMethod`] for unknown types.
    pub fn from_configuration(config: &PaymentMethodConfiguration) -> Result<Self, PrimerError> {
        let payment_method_type = config.payment_method_type.as_str();
        let flow = match payment_method_type {
            card::PAYMENT_CARD | card::ADYEN_BANCONTACT_CARD => {
                Self::Card(CardFlow::new(payment_method_type))
            }
            paypal::PAYPAL => Self::PayPal(PayPalFlow::new()),
            apple_pay::APPLE_PAY => Self::ApplePay(ApplePayFlow::new()),
            klarna::KLARNA => Self::Klarna(KlarnaFlow::new()),
            apaya::APAYA => Self::Apaya(ApayaFlow::new()),
            t if bank_selector::TYPES.contains(&t) => Self::BankSelector(BankSelectorFlow::new(t)),
            t if qr_code::TYPES.contains(&t) => Self::QrCode(QrCodeFlow::new(t)),
            t if form::TYPES.contains(&t) => Self::Form(FormFlow::new(t)?),
            t if primer_test::TYPES.contains(&t) => Self::PrimerTest(PrimerTestFlow::new(t)),
            t if config.implementation_type == ImplementationType::WebRedirect => {
                Self::WebRedirect(WebRedirectFlow::new(t))
            }
            other => return Err(PrimerError::UnsupportedPaymentMethod(other.to_owned())),
        };
        Ok(flow)
    }

    /// Flow for a previously vaulted payment method.
    #[must_use]
    pub fn vaulted(token_data: PaymentMethodTokenData) -> Self {
        Self::Vaulted(VaultedFlow::new(token_data))
    }

    /// Payment method type.
    #[must_use]
    pub fn payment_method_type(&self) -> &str {
        dispatch!(self, flow => flow.payment_method_type())
    }

    /// Runs the flow's preconditions, including the client token check.
    ///
    /// # Errors
    ///
    /// Returns the first failed precondition.
    pub fn validate(&self, session: &SessionContext) -> Result<(), PrimerError> {
        dispatch!(self, flow => TokenizationEngine::validate(flow, session))
    }

    /// Runs one tokenization attempt with `engine`.
    ///
    /// # Errors
    ///
    /// See [`TokenizationEngine::run`].
    pub async fn tokenize(
        &self,
        engine: &TokenizationEngine,
        ctx: &mut FlowContext,
    ) -> Result<PaymentMethodTokenData, PrimerError> {
        dispatch!(self, flow => engine.run(flow, ctx).await)
    }

    /// Handles a required action, returning the resume token if any.
    ///
    /// # Errors
    ///
    /// Returns the flow's error.
    pub async fn handle_required_action(
        &self,
        ctx: &FlowContext,
        client_token: &DecodedClientToken,
    ) -> Result<Option<String>, PrimerError> {
        dispatch!(self, flow => flow.handle_required_action(ctx, client_token).await)
    }
}

/// Configuration id of `payment_method_type`, required by every tokenization request.
pub(crate) fn require_config_id<'a>(
    session: &'a SessionContext,
    payment_method_type: &str,
) -> Result<&'a str, PrimerError> {
    session
        .payment_method_config(payment_method_type)
        .and_then(|config| config.id.as_deref())
        .ok_or_else(|| PrimerError::missing_value("configuration.id"))
}

/// Fails unless the client token carries a PCI URL.
pub(crate) fn require_pci_url(session: &SessionContext) -> Result<(), PrimerError> {
    session
        .client_token()
        .pci_url
        .as_ref()
        .map(|_| ())
        .ok_or(PrimerError::InvalidClientToken)
}

/// Fails unless the client token carries a core URL.
pub(crate) fn require_core_url(session: &SessionContext) -> Result<(), PrimerError> {
    session
        .client_token()
        .core_url
        .as_ref()
        .map(|_| ())
        .ok_or(PrimerError::InvalidClientToken)
}

/// Error for a required action `payment_method_type` has no handling for.
pub(crate) fn unsupported_required_action(
    payment_method_type: &str,
    client_token: &DecodedClientToken,
) -> PrimerError {
    PrimerError::UnsupportedRequiredAction {
        payment_method_type: payment_method_type.to_owned(),
        action: client_token.intent.clone().unwrap_or_default(),
    }
}

/// Off-session tokenization request for `payment_method_type`.
pub(crate) fn off_session_request(
    session: &SessionContext,
    payment_method_type: &str,
    session_info: SessionInfo,
) -> Result<TokenizationRequest, PrimerError> {
    let payment_method_config_id = require_config_id(session, payment_method_type)?.to_owned();
    Ok(PaymentInstrument::OffSession(OffSessionInstrument {
        payment_method_config_id,
        payment_method_type: payment_method_type.to_owned(),
        session_info,
    })
    .into())
}

/// Plain redirect session info built from the merchant settings.
pub(crate) fn web_redirect_info(session: &SessionContext) -> SessionInfo {
    let settings = session.settings();
    SessionInfo::WebRedirect {
        locale: settings.locale.locale_code(),
        platform: settings.platform.clone(),
        redirection_url: settings.url_scheme.clone(),
    }
}

/// Error for an input the flow did not ask for.
pub(crate) fn unexpected_input(payment_method_type: &str, input: &UserInput) -> PrimerError {
    let kind = match input {
        UserInput::Redirect(_) => "redirect",
        UserInput::Card(_) => "card",
        UserInput::Form(_) => "form",
        UserInput::Bank(_) => "bank",
        UserInput::Wallet(_) => "wallet",
        UserInput::Authorization(_) => "authorization",
        UserInput::TestDecision(_) => "test decision",
        UserInput::Acknowledged => "acknowledgement",
        UserInput::Cancelled => "cancellation",
    };
    PrimerError::FlowFailed {
        payment_method_type: payment_method_type.to_owned(),
        message: format!("unexpected {kind} input"),
    }
}

/// Opens the required action's redirect URL and polls its status URL.
///
/// Polling authenticates with the required action's token.
pub(crate) async fn redirect_and_poll(
    ctx: &FlowContext,
    payment_method_type: &str,
    client_token: &DecodedClientToken,
) -> Result<Option<String>, PrimerError> {
    let redirect_url = client_token.redirect_url()?;
    let status_url = client_token.status_url()?;
    let resume_token = ctx
        .present_and_poll(
            payment_method_type,
            Presentation::Redirect { url: redirect_url },
            client_token,
            &status_url,
        )
        .await?;
    Ok(Some(resume_token))
}

/// Polls the required action's status URL while `presentation` is shown.
pub(crate) async fn present_and_poll_status(
    ctx: &FlowContext,
    payment_method_type: &str,
    presentation: Presentation,
    client_token: &DecodedClientToken,
) -> Result<Option<String>, PrimerError> {
    let status_url: Url = client_token.status_url()?;
    let resume_token = ctx
        .present_and_poll(payment_method_type, presentation, client_token, &status_url)
        .await?;
    Ok(Some(resume_token))
}
