//! QR code methods.
//!
//! Tokenization needs no input. The created payment returns a client token
//! carrying the QR code; it is shown while the status URL is polled.

use crate::error::PrimerError;
use crate::interaction::Presentation;
use crate::pipeline::FlowContext;
use crate::proto::TokenizationRequest;
use crate::session::SessionContext;
use crate::token::DecodedClientToken;

use super::{
    PaymentMethodFlow, off_session_request, present_and_poll_status, require_config_id,
    web_redirect_info,
};

/// Payment method types handled by [`QrCodeFlow`].
pub const TYPES: &[&str] = &["XFERS_PAYNOW", "RAPYD_PROMPTPAY", "OMISE_PROMPTPAY"];

/// QR code flow.
#[derive(Debug, Clone)]
pub struct QrCodeFlow {
    payment_method_type: String,
}

impl QrCodeFlow {
    /// Creates the flow for `payment_method_type`.
    pub fn new(payment_method_type: impl Into<String>) -> Self {
        Self {
            payment_method_type: payment_method_type.into(),
        }
    }
}

impl PaymentMethodFlow for QrCodeFlow {
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
        let qr_code = client_token
            .qr_code
            .clone()
            .ok_or_else(|| PrimerError::missing_value("clientToken.qrCode"))?;
        present_and_poll_status(
            ctx,
            &self.payment_method_type,
            Presentation::QrCode { qr_code },
            client_token,
        )
        .await
    }
}
