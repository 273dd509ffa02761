//! Klarna.
//!
//! A Klarna payment session is created on the backend and handed to the
//! Klarna view, which returns an authorization token. The token is then
//! exchanged for a customer token: for vaulting by creating one, for
//! checkout by finalizing the session.

use crate::error::PrimerError;
use crate::interaction::{Presentation, UserInput};
use crate::pipeline::FlowContext;
use crate::proto::instrument::KlarnaCustomerTokenInstrument;
use crate::proto::klarna::{
    CreateCustomerTokenRequest, CreatePaymentSessionRequest, CustomerTokenResponse,
    FinalizePaymentSessionRequest, KlarnaLocaleData, KlarnaOrderItem, KlarnaSessionType,
};
use crate::proto::{PaymentInstrument, TokenizationRequest};
use crate::session::{Intent, SessionContext};

use super::{PaymentMethodFlow, require_config_id, require_pci_url, unexpected_input};

/// Klarna payment method type.
pub const KLARNA: &str = "KLARNA";

/// Klarna flow.
#[derive(Debug, Clone, Default)]
pub struct KlarnaFlow;

impl KlarnaFlow {
    /// Creates the flow.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn locale_data(session: &SessionContext) -> KlarnaLocaleData {
        let locale = &session.settings().locale;
        KlarnaLocaleData {
            language_code: locale.language_code.clone(),
            locale_code: locale.locale_code(),
            region_code: locale.region_code.clone(),
        }
    }

    fn order_items(session: &SessionContext) -> Result<Vec<KlarnaOrderItem>, PrimerError> {
        let line_items = session.line_items();
        if line_items.is_empty() {
            return Err(PrimerError::missing_value("lineItems"));
        }
        line_items
            .iter()
            .map(|item| {
                let unit_amount = item
                    .amount
                    .ok_or_else(|| PrimerError::missing_value("settings.orderItems"))?;
                Ok(KlarnaOrderItem {
                    name: item
                        .description
                        .clone()
                        .or_else(|| item.item_id.clone())
                        .unwrap_or_default(),
                    unit_amount,
                    quantity: item.quantity.unwrap_or(1),
                    discount_amount: item.discount_amount,
                })
            })
            .collect()
    }

    fn session_request(
        session: &SessionContext,
    ) -> Result<CreatePaymentSessionRequest, PrimerError> {
        let settings = session.settings();
        let payment_method_config_id = require_config_id(session, KLARNA)?.to_owned();
        let (session_type, total_amount, order_items) = match session.intent() {
            Intent::Checkout => (
                KlarnaSessionType::HostedPaymentPage,
                Some(session.require_amount()?),
                Some(Self::order_items(session)?),
            ),
            Intent::Vault => (KlarnaSessionType::RecurringPayment, None, None),
        };
        Ok(CreatePaymentSessionRequest {
            payment_method_config_id,
            session_type,
            locale_data: Self::locale_data(session),
            description: settings.klarna.recurring_payment_description.clone(),
            redirect_url: settings.url_scheme.clone(),
            total_amount,
            order_items,
        })
    }
}

impl PaymentMethodFlow for KlarnaFlow {
    type Input = CustomerTokenResponse;

    fn payment_method_type(&self) -> &str {
        KLARNA
    }

    fn validate(&self, session: &SessionContext) -> Result<(), PrimerError> {
        require_pci_url(session)?;
        require_config_id(session, KLARNA)?;
        if session.intent() == Intent::Checkout {
            Self::order_items(session)?;
        }
        Ok(())
    }

    async fn collect_input(&self, ctx: &FlowContext) -> Result<CustomerTokenResponse, PrimerError> {
        let session = ctx.session();
        let client_token = ctx.client_token()?;
        let request = Self::session_request(session)?;
        let payment_method_config_id = request.payment_method_config_id.clone();

        let klarna_session = ctx
            .api()
            .create_klarna_payment_session(client_token, &request)
            .await?;

        let redirect_url = klarna_session
            .hpp_redirect_url
            .as_deref()
            .map(|raw| {
                url::Url::parse(raw).map_err(|_| PrimerError::invalid_value("hppRedirectUrl", raw))
            })
            .transpose()?;

        let presentation = Presentation::KlarnaSession {
            client_token: klarna_session.client_token.clone(),
            session_id: klarna_session.session_id.clone(),
            redirect_url,
        };
        let authorization_token = match ctx.present(KLARNA, presentation).await? {
            UserInput::Authorization(token) => token,
            other => return Err(unexpected_input(KLARNA, &other)),
        };
        ctx.dismiss(KLARNA).await;

        let response = match session.intent() {
            Intent::Vault => {
                ctx.api()
                    .create_klarna_customer_token(
                        client_token,
                        &CreateCustomerTokenRequest {
                            payment_method_config_id,
                            session_id: klarna_session.session_id,
                            authorization_token,
                            description: session
                                .settings()
                                .klarna
                                .recurring_payment_description
                                .clone(),
                            locale_data: Self::locale_data(session),
                        },
                    )
                    .await?
            }
            Intent::Checkout => {
                ctx.api()
                    .finalize_klarna_payment_session(
                        client_token,
                        &FinalizePaymentSessionRequest {
                            payment_method_config_id,
                            session_id: klarna_session.session_id,
                        },
                    )
                    .await?
            }
        };
        Ok(response)
    }

    fn build_request(
        &self,
        _session: &SessionContext,
        input: CustomerTokenResponse,
    ) -> Result<TokenizationRequest, PrimerError> {
        let klarna_customer_token = input
            .customer_token_id
            .ok_or_else(|| PrimerError::missing_value("tokenization.klarnaCustomerToken"))?;
        let session_data = input
            .session_data
            .ok_or_else(|| PrimerError::missing_value("tokenization.sessionData"))?;
        Ok(PaymentInstrument::Klarna(KlarnaCustomerTokenInstrument {
            klarna_customer_token,
            session_data,
        })
        .into())
    }
}
