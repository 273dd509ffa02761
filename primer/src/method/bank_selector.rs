//! Bank selector methods (iDEAL, Dotpay).
//!
//! The user picks an issuer from the bank list fetched for the method. The
//! payment then requires a redirect to the bank, whose completion is
//! detected by polling.

use crate::error::PrimerError;
use crate::interaction::{Presentation, UserInput};
use crate::pipeline::FlowContext;
use crate::proto::banks::{BankListParameters, BankListRequest};
use crate::proto::{SessionInfo, TokenizationRequest};
use crate::session::SessionContext;
use crate::token::DecodedClientToken;

use super::{
    PaymentMethodFlow, off_session_request, redirect_and_poll, require_config_id, unexpected_input,
};

/// Payment method types handled by [`BankSelectorFlow`].
pub const TYPES: &[&str] = &["ADYEN_IDEAL", "ADYEN_DOTPAY"];

/// Bank selector flow.
#[derive(Debug, Clone)]
pub struct BankSelectorFlow {
    payment_method_type: String,
}

impl BankSelectorFlow {
    /// Creates the flow for `payment_method_type`.
    pub fn new(payment_method_type: impl Into<String>) -> Self {
        Self {
            payment_method_type: payment_method_type.into(),
        }
    }

    /// Value of the bank list `paymentMethod` parameter, e.g. `"ideal"`.
    fn bank_list_method(&self) -> String {
        self.payment_method_type
            .strip_prefix("ADYEN_")
            .unwrap_or(&self.payment_method_type)
            .to_ascii_lowercase()
    }
}

impl PaymentMethodFlow for BankSelectorFlow {
    type Input = String;

    fn payment_method_type(&self) -> &str {
        &self.payment_method_type
    }

    fn validate(&self, session: &SessionContext) -> Result<(), PrimerError> {
        require_config_id(session, &self.payment_method_type).map(|_| ())
    }

    async fn collect_input(&self, ctx: &FlowContext) -> Result<String, PrimerError> {
        let request = BankListRequest {
            payment_method_config_id: require_config_id(ctx.session(), &self.payment_method_type)?
                .to_owned(),
            parameters: BankListParameters {
                payment_method: self.bank_list_method(),
            },
        };
        let banks = ctx.api().list_banks(ctx.client_token()?, &request).await?.result;

        let input = ctx
            .present(
                &self.payment_method_type,
                Presentation::BankList {
                    banks: banks.clone(),
                },
            )
            .await?;
        let bank_id = match input {
            UserInput::Bank(id) => id,
            other => return Err(unexpected_input(&self.payment_method_type, &other)),
        };
        if !banks.iter().any(|bank| bank.id == bank_id && !bank.disabled) {
            return Err(PrimerError::invalid_value("bankId", bank_id));
        }

        #[cfg(feature = "telemetry")]
        tracing::info!(
            payment_method_type = %self.payment_method_type,
            bank = %bank_id,
            "Bank selected"
        );

        Ok(bank_id)
    }

    fn build_request(
        &self,
        session: &SessionContext,
        issuer: String,
    ) -> Result<TokenizationRequest, PrimerError> {
        let settings = session.settings();
        off_session_request(
            session,
            &self.payment_method_type,
            SessionInfo::BankSelector {
                issuer,
                locale: settings.locale.locale_code(),
                platform: settings.platform.clone(),
            },
        )
    }

    async fn handle_required_action(
        &self,
        ctx: &FlowContext,
        client_token: &DecodedClientToken,
    ) -> Result<Option<String>, PrimerError> {
        redirect_and_poll(ctx, &self.payment_method_type, client_token).await
    }
}
