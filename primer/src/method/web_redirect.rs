//! Generic redirect methods.
//!
//! Any configuration with the `WEB_REDIRECT` implementation type that has
//! no dedicated flow lands here. Nothing is collected before tokenization;
//! the payment's required action carries the page to open.

use crate::error::PrimerError;
use crate::pipeline::FlowContext;
use crate::proto::TokenizationRequest;
use crate::session::SessionContext;
use crate::token::DecodedClientToken;

use super::{
    PaymentMethodFlow, off_session_request, redirect_and_poll, require_config_id, web_redirect_info,
};

/// Redirect flow.
#[derive(Debug, Clone)]
pub struct WebRedirectFlow {
    payment_method_type: String,
}

impl WebRedirectFlow {
    /// Creates the flow for `payment_method_type`.
    pub fn new(payment_method_type: impl Into<String>) -> Self {
        Self {
            payment_method_type: payment_method_type.into(),
        }
    }
}

impl PaymentMethodFlow for WebRedirectFlow {
    type Input = ();

    fn payment_method_type(&self) -> &str {
        &self.payment_method_type
    }

    fn validate(&self, session: &SessionContext) -> Result<(), PrimerError> {
        require_config_id(session, &self.payment_method_type).map(|_| ())
    }

    async fn collect_input(&self, _ctx: &FlowContext) -> Result<(), PrimerError> {
        Ok(())
    }

    fn build_request(
        &self,
        session: &SessionContext,
        (): (),
    ) -> Result<TokenizationRequest, PrimerError> {
        off_session_request(session, &self.payment_method_type, web_redirect_info(session))
    }

    async fn handle_required_action(
        &self,
        ctx: &FlowContext,
        client_token: &DecodedClientToken,
    ) -> Result<Option<String>, PrimerError> {
        if !client_token.is_redirection_intent() {
            #[cfg(feature = "telemetry")]
            tracing::debug!(intent = ?client_token.intent, "No redirect required");
            return Ok(None);
        }
        redirect_and_poll(ctx, &self.payment_method_type, client_token).await
    }
}
