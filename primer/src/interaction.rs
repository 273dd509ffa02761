//! User interaction seam.
//!
//! Flows never draw UI. They describe what the user has to see as a
//! [`Presentation`] and wait on a [`Presenter`] for the [`UserInput`] that
//! comes back. A merchant UI implements [`Presenter`] directly, or consumes
//! [`PresenterEvent`]s from a [`ChannelPresenter`] on its own task.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use url::Url;

use crate::api::BoxFuture;
use crate::error::PrimerError;
use crate::proto::Bank;
use crate::proto::instrument::{ApplePayToken, CardInstrument, FlowDecision};

/// Kind of a form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Free text.
    Text,
    /// Digits only.
    Digits,
    /// Phone number, with an optional leading `+`.
    Phone,
}

/// One input of a [`Presentation::Form`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormField {
    /// Key of the value in [`UserInput::Form`].
    pub id: String,
    /// Label shown to the user.
    pub label: String,
    /// Field kind.
    pub kind: FieldKind,
    /// Prefix shown before the field (e.g. a dial code).
    pub prefix: Option<String>,
}

/// Voucher details shown after a voucher payment is created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoucherDetails {
    /// Payment entity.
    pub entity: Option<String>,
    /// Payment reference.
    pub reference: Option<String>,
    /// Expiry date as sent by the backend.
    pub expires_at: Option<String>,
    /// Amount in minor units.
    pub amount: Option<i64>,
    /// Currency code.
    pub currency: Option<String>,
}

/// Line shown on a wallet sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryItem {
    /// Label.
    pub label: String,
    /// Amount in minor units.
    pub amount: i64,
}

/// Wallet payment request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletRequest {
    /// Merchant identifier registered with the wallet.
    pub merchant_identifier: String,
    /// ISO 3166-1 country code.
    pub country_code: String,
    /// ISO 4217 currency code.
    pub currency_code: String,
    /// Line items; the last one is the total.
    pub items: Vec<SummaryItem>,
}

/// Something the user has to see or act upon.
#[derive(Debug, Clone, PartialEq)]
pub enum Presentation {
    /// In-app web view; resolves with the URL it was redirected to.
    WebView {
        /// Page to load.
        url: Url,
    },
    /// Authentication session that returns through the app's URL scheme.
    ExternalAuthorization {
        /// Page to load.
        url: Url,
        /// Scheme that ends the session.
        callback_scheme: String,
    },
    /// External browser or app; completion is detected by polling.
    Redirect {
        /// Page to open.
        url: Url,
    },
    /// Card entry form.
    CardForm,
    /// Generic form.
    Form {
        /// Fields to collect.
        fields: Vec<FormField>,
    },
    /// Bank picker.
    BankList {
        /// Selectable banks.
        banks: Vec<Bank>,
    },
    /// QR code to scan; completion is detected by polling.
    QrCode {
        /// QR code image data or URL.
        qr_code: String,
    },
    /// Voucher to pay offline.
    Voucher(VoucherDetails),
    /// Wait screen shown while the user confirms in another app.
    AwaitingConfirmation {
        /// Text shown to the user.
        message: String,
    },
    /// Wallet sheet.
    WalletSheet(WalletRequest),
    /// Klarna payment view; resolves with an authorization token.
    KlarnaSession {
        /// Klarna client token.
        client_token: String,
        /// Payment session id.
        session_id: String,
        /// Hosted payment page, if any.
        redirect_url: Option<Url>,
    },
    /// Outcome picker of a test payment method.
    TestDecision {
        /// Selectable decisions.
        decisions: Vec<FlowDecision>,
    },
}

impl Presentation {
    /// Short name of the presentation, for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::WebView { .. } => "web_view",
            Self::ExternalAuthorization { .. } => "external_authorization",
            Self::Redirect { .. } => "redirect",
            Self::CardForm => "card_form",
            Self::Form { .. } => "form",
            Self::BankList { .. } => "bank_list",
            Self::QrCode { .. } => "qr_code",
            Self::Voucher(_) => "voucher",
            Self::AwaitingConfirmation { .. } => "awaiting_confirmation",
            Self::WalletSheet(_) => "wallet_sheet",
            Self::KlarnaSession { .. } => "klarna_session",
            Self::TestDecision { .. } => "test_decision",
        }
    }
}

/// Input returned by a [`Presenter`].
#[derive(Debug, Clone, PartialEq)]
pub enum UserInput {
    /// URL a web view or authentication session ended on.
    Redirect(Url),
    /// Entered card.
    Card(CardInstrument),
    /// Form values by field id.
    Form(BTreeMap<String, String>),
    /// Id of the selected bank.
    Bank(String),
    /// Wallet token.
    Wallet(ApplePayToken),
    /// Authorization token issued by an external SDK.
    Authorization(String),
    /// Picked test outcome.
    TestDecision(FlowDecision),
    /// The user saw the presentation and closed it normally.
    Acknowledged,
    /// The user dismissed the presentation.
    Cancelled,
}

/// Shows payment method UI and reports what the user did.
pub trait Presenter: Send + Sync {
    /// Presents `presentation` and waits for the user.
    fn present(&self, presentation: Presentation) -> BoxFuture<'_, Result<UserInput, PrimerError>>;

    /// Removes any UI still shown for `payment_method_type`.
    fn dismiss<'a>(&'a self, _payment_method_type: &'a str) -> BoxFuture<'a, ()> {
        Box::pin(async {})
    }
}

/// A presentation waiting for an answer from the UI task.
pub struct PresentationRequest {
    /// What to show.
    pub presentation: Presentation,
    responder: oneshot::Sender<Result<UserInput, PrimerError>>,
}

impl fmt::Debug for PresentationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PresentationRequest")
            .field("presentation", &self.presentation.kind())
            .finish_non_exhaustive()
    }
}

impl PresentationRequest {
    /// Answers the request. Dropping the request instead counts as a cancellation.
    pub fn respond(self, input: UserInput) {
        let _ = self.responder.send(Ok(input));
    }

    /// Reports that the UI could not show the presentation.
    pub fn fail(self, message: impl Into<String>) {
        let _ = self.responder.send(Err(PrimerError::Presentation(message.into())));
    }
}

/// Event delivered to the UI task of a [`ChannelPresenter`].
#[derive(Debug)]
pub enum PresenterEvent {
    /// Show something and answer.
    Present(PresentationRequest),
    /// Remove the UI of a payment method.
    Dismiss {
        /// Payment method type.
        payment_method_type: String,
    },
}

/// [`Presenter`] that forwards presentations over a channel.
#[derive(Debug, Clone)]
pub struct ChannelPresenter {
    events: mpsc::Sender<PresenterEvent>,
}

impl ChannelPresenter {
    /// Creates a presenter and the receiving end for the UI task.
    #[must_use]
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<PresenterEvent>) {
        let (events, rx) = mpsc::channel(buffer.max(1));
        (Self { events }, rx)
    }
}

impl Presenter for ChannelPresenter {
    fn present(&self, presentation: Presentation) -> BoxFuture<'_, Result<UserInput, PrimerError>> {
        Box::pin(async move {
            let (responder, answer) = oneshot::channel();
            self.events
                .send(PresenterEvent::Present(PresentationRequest {
                    presentation,
                    responder,
                }))
                .await
                .map_err(|_| PrimerError::Presentation("presenter channel closed".to_owned()))?;
            answer.await.unwrap_or(Ok(UserInput::Cancelled))
        })
    }

    fn dismiss<'a>(&'a self, payment_method_type: &'a str) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let _ = self
                .events
                .send(PresenterEvent::Dismiss {
                    payment_method_type: payment_method_type.to_owned(),
                })
                .await;
        })
    }
}
