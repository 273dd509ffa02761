//! PayPal.
//!
//! Checkout creates an order, sends the user through PayPal's approval page
//! and reads back the payer. Vaulting does the same with a billing agreement,
//! which is confirmed once approved. The approval page returns through the
//! merchant's URL scheme.

use url::Url;

use crate::error::PrimerError;
use crate::interaction::{Presentation, UserInput};
use crate::pipeline::FlowContext;
use crate::proto::instrument::PayPalInstrument;
use crate::proto::paypal::{
    ConfirmBillingAgreementRequest, CreateBillingAgreementRequest, CreateOrderRequest,
    PayerInfoRequest,
};
use crate::proto::{PaymentInstrument, TokenizationRequest};
use crate::session::{Intent, SessionContext};

use super::{
    PaymentMethodFlow, require_config_id, require_core_url, require_pci_url, unexpected_input,
};

/// PayPal payment method type.
pub const PAYPAL: &str = "PAYPAL";

/// PayPal flow.
#[derive(Debug, Clone, Default)]
pub struct PayPalFlow;

impl PayPalFlow {
    /// Creates the flow.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn url_scheme(session: &SessionContext) -> Result<&str, PrimerError> {
        session
            .settings()
            .url_scheme_name()
            .ok_or_else(|| PrimerError::InvalidUrlScheme(session.settings().url_scheme.clone()))
    }

    async fn authorize(
        &self,
        ctx: &FlowContext,
        approval_url: &str,
        callback_scheme: &str,
    ) -> Result<Url, PrimerError> {
        let url = Url::parse(approval_url)
            .map_err(|_| PrimerError::invalid_value("paypal.approvalUrl", approval_url))?;
        let presentation = Presentation::ExternalAuthorization {
            url,
            callback_scheme: callback_scheme.to_owned(),
        };
        let returned = match ctx.present(PAYPAL, presentation).await? {
            UserInput::Redirect(returned) => returned,
            other => return Err(unexpected_input(PAYPAL, &other)),
        };
        ctx.dismiss(PAYPAL).await;
        if returned.host_str() == Some("paypal-cancel") {
            return Err(PrimerError::cancelled(PAYPAL));
        }
        Ok(returned)
    }

    async fn checkout(&self, ctx: &FlowContext) -> Result<PayPalInstrument, PrimerError> {
        let session = ctx.session();
        let client_token = ctx.client_token()?;
        let config_id = require_config_id(session, PAYPAL)?.to_owned();
        let scheme = Self::url_scheme(session)?;

        let order = ctx
            .api()
            .create_paypal_order(
                client_token,
                &CreateOrderRequest {
                    payment_method_config_id: config_id.clone(),
                    amount: session.require_amount()?,
                    currency_code: session.require_currency()?.to_owned(),
                    return_url: format!("{scheme}://paypal-success"),
                    cancel_url: format!("{scheme}://paypal-cancel"),
                },
            )
            .await?;

        self.authorize(ctx, &order.approval_url, scheme).await?;

        let payer = ctx
            .api()
            .fetch_paypal_payer_info(
                client_token,
                &PayerInfoRequest {
                    payment_method_config_id: config_id,
                    order_id: order.order_id.clone(),
                },
            )
            .await?;

        Ok(PayPalInstrument {
            paypal_order_id: Some(order.order_id),
            paypal_billing_agreement_id: None,
            shipping_address: None,
            external_payer_info: Some(payer.external_payer_info),
        })
    }

    async fn vault(&self, ctx: &FlowContext) -> Result<PayPalInstrument, PrimerError> {
        let session = ctx.session();
        let client_token = ctx.client_token()?;
        let config_id = require_config_id(session, PAYPAL)?.to_owned();
        let scheme = Self::url_scheme(session)?;

        let agreement = ctx
            .api()
            .create_paypal_billing_agreement(
                client_token,
                &CreateBillingAgreementRequest {
                    payment_method_config_id: config_id.clone(),
                    return_url: format!("{scheme}://paypal-success"),
                    cancel_url: format!("{scheme}://paypal-cancel"),
                },
            )
            .await?;

        self.authorize(ctx, &agreement.approval_url, scheme).await?;

        let confirmed = ctx
            .api()
            .confirm_paypal_billing_agreement(
                client_token,
                &ConfirmBillingAgreementRequest {
                    payment_method_config_id: config_id,
                    token_id: agreement.token_id,
                },
            )
            .await?;

        Ok(PayPalInstrument {
            paypal_order_id: None,
            paypal_billing_agreement_id: Some(confirmed.billing_agreement_id),
            shipping_address: confirmed.shipping_address,
            external_payer_info: Some(confirmed.external_payer_info),
        })
    }
}

impl PaymentMethodFlow for PayPalFlow {
    type Input = PayPalInstrument;

    fn payment_method_type(&self) -> &str {
        PAYPAL
    }

    fn validate(&self, session: &SessionContext) -> Result<(), PrimerError> {
        require_pci_url(session)?;
        require_core_url(session)?;
        require_config_id(session, PAYPAL)?;
        Self::url_scheme(session)?;
        Ok(())
    }

    async fn collect_input(&self, ctx: &FlowContext) -> Result<PayPalInstrument, PrimerError> {
        match ctx.session().intent() {
            Intent::Checkout => self.checkout(ctx).await,
            Intent::Vault => self.vault(ctx).await,
        }
    }

    fn build_request(
        &self,
        _session: &SessionContext,
        input: PayPalInstrument,
    ) -> Result<TokenizationRequest, PrimerError> {
        Ok(PaymentInstrument::PayPal(input).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::config::PrimerSettings;
    use crate::pipeline::TokenizationEngine;
    use crate::testing::{FakeApi, ScriptedPresenter, checkout_session, session_with};

    fn redirect(url: &str) -> UserInput {
        UserInput::Redirect(Url::parse(url).unwrap())
    }

    #[test]
    fn test_validate_requires_url_scheme() {
        let session = session_with(Intent::Checkout, PrimerSettings::default());
        let err = PayPalFlow::new().validate(&session).unwrap_err();
        assert!(matches!(err, PrimerError::InvalidUrlScheme(None)));
    }

    #[tokio::test]
    async fn test_checkout_order_flow() {
        let api = Arc::new(FakeApi::default());
        let presenter = ScriptedPresenter::new([redirect("merchant://paypal-success?token=EC-1")]);
        let mut ctx = FlowContext::new(
            Arc::new(checkout_session()),
            api.clone(),
            Arc::new(presenter),
        );

        let flow = PayPalFlow::new();
        TokenizationEngine::new().run(&flow, &mut ctx).await.unwrap();

        assert_eq!(api.calls("create_paypal_order"), 1);
        assert_eq!(api.calls("fetch_paypal_payer_info"), 1);
        let body = api.last_tokenize_body().unwrap();
        assert_eq!(body["paymentInstrument"]["paypalOrderId"], "order-1");
        assert_eq!(body["paymentInstrument"]["externalPayerInfo"]["email"], "payer@example.com");
    }

    #[tokio::test]
    async fn test_cancel_url_cancels() {
        let api = Arc::new(FakeApi::default());
        let presenter = ScriptedPresenter::new([redirect("merchant://paypal-cancel")]);
        let mut ctx = FlowContext::new(
            Arc::new(checkout_session()),
            api.clone(),
            Arc::new(presenter),
        );

        let err = TokenizationEngine::new()
            .run(&PayPalFlow::new(), &mut ctx)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(api.calls("tokenize"), 0);
    }
}
