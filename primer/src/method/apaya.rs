//! Apaya carrier billing.

use url::Url;

use crate::error::PrimerError;
use crate::interaction::{Presentation, UserInput};
use crate::pipeline::FlowContext;
use crate::proto::apaya::ApayaSessionRequest;
use crate::proto::instrument::ApayaInstrument;
use crate::proto::{PaymentInstrument, TokenizationRequest};
use crate::redirect::ApayaWebViewResponse;
use crate::session::SessionContext;

use super::{PaymentMethodFlow, require_pci_url, unexpected_input};

/// Apaya payment method type.
pub const APAYA: &str = "APAYA";

/// Option holding the Apaya merchant account id.
const MERCHANT_ACCOUNT_ID: &str = "merchantAccountId";

/// Apaya flow: session, web view, redirect parsing.
#[derive(Debug, Clone, Default)]
pub struct ApayaFlow;

impl ApayaFlow {
    /// Creates the flow.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn merchant_account_id(session: &SessionContext) -> Result<&str, PrimerError> {
        session
            .payment_method_config(APAYA)
            .and_then(|config| config.option_str(MERCHANT_ACCOUNT_ID))
            .ok_or(PrimerError::InvalidClientToken)
    }
}

impl PaymentMethodFlow for ApayaFlow {
    type Input = ApayaWebViewResponse;

    fn payment_method_type(&self) -> &str {
        APAYA
    }

    fn validate(&self, session: &SessionContext) -> Result<(), PrimerError> {
        require_pci_url(session)?;
        session.require_configuration()?;
        Self::merchant_account_id(session)?;
        session.require_currency()?;
        Ok(())
    }

    async fn collect_input(&self, ctx: &FlowContext) -> Result<ApayaWebViewResponse, PrimerError> {
        let session = ctx.session();
        let request = ApayaSessionRequest {
            merchant_account_id: Self::merchant_account_id(session)?.to_owned(),
            language: session.settings().locale.language_code.clone(),
            currency_code: session.require_currency()?.to_owned(),
            phone_number: session.customer_mobile_number().map(str::to_owned),
        };
        let apaya_session = ctx
            .api()
            .create_apaya_session(ctx.client_token()?, &request)
            .await?;
        let url = Url::parse(&apaya_session.url)
            .map_err(|_| PrimerError::invalid_value("apaya.url", apaya_session.url.clone()))?;

        let input = ctx.present(APAYA, Presentation::WebView { url }).await?;
        ctx.dismiss(APAYA).await;
        match input {
            UserInput::Redirect(returned) => ApayaWebViewResponse::from_url(&returned),
            other => Err(unexpected_input(APAYA, &other)),
        }
    }

    fn build_request(
        &self,
        session: &SessionContext,
        input: ApayaWebViewResponse,
    ) -> Result<TokenizationRequest, PrimerError> {
        Ok(PaymentInstrument::Apaya(ApayaInstrument {
            mx: input.mx_number,
            mnc: Some(input.mnc),
            mcc: Some(input.mcc),
            hashed_identifier: Some(input.hashed_identifier),
            product_id: Self::merchant_account_id(session)?.to_owned(),
            currency_code: session.require_currency()?.to_owned(),
        })
        .into())
    }
}
