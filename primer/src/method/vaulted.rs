//! Payments with a previously vaulted payment method.
//!
//! No UI is shown. Tokenization exchanges the vaulted method id for a
//! single-use token.

use crate::error::PrimerError;
use crate::pipeline::FlowContext;
use crate::proto::{PaymentMethodTokenData, TokenizationRequest, VaultedCardAdditionalData};
use crate::session::{Intent, SessionContext};

use super::PaymentMethodFlow;

/// Vaulted payment method flow.
#[derive(Debug, Clone)]
pub struct VaultedFlow {
    token_data: PaymentMethodTokenData,
    additional_data: Option<VaultedCardAdditionalData>,
}

impl VaultedFlow {
    /// Creates the flow for a vaulted method.
    #[must_use]
    pub const fn new(token_data: PaymentMethodTokenData) -> Self {
        Self {
            token_data,
            additional_data: None,
        }
    }

    /// Sends a recaptured CVV with the exchange.
    #[must_use]
    pub fn with_cvv(mut self, cvv: impl Into<String>) -> Self {
        self.additional_data = Some(VaultedCardAdditionalData { cvv: cvv.into() });
        self
    }

    /// The vaulted method.
    #[must_use]
    pub const fn token_data(&self) -> &PaymentMethodTokenData {
        &self.token_data
    }

    fn payment_method_id(&self) -> Result<&str, PrimerError> {
        self.token_data
            .id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| PrimerError::missing_value("paymentMethodTokenData.id"))
    }
}

impl PaymentMethodFlow for VaultedFlow {
    type Input = ();

    fn payment_method_type(&self) -> &str {
        self.token_data
            .payment_method_type
            .as_deref()
            .unwrap_or(&self.token_data.payment_instrument_type)
    }

    fn validate(&self, session: &SessionContext) -> Result<(), PrimerError> {
        if session.intent() != Intent::Checkout {
            return Err(PrimerError::UnsupportedIntent {
                payment_method_type: self.payment_method_type().to_owned(),
                intent: session.intent(),
            });
        }
        self.payment_method_id().map(|_| ())
    }

    async fn collect_input(&self, _ctx: &FlowContext) -> Result<(), PrimerError> {
        Ok(())
    }

    fn build_request(
        &self,
        _session: &SessionContext,
        (): (),
    ) -> Result<TokenizationRequest, PrimerError> {
        Ok(TokenizationRequest::VaultedExchange {
            payment_method_id: self.payment_method_id()?.to_owned(),
            additional_data: self.additional_data.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::pipeline::TokenizationEngine;
    use crate::testing::{FakeApi, ScriptedPresenter, checkout_session, vaulted_card, vault_session};

    #[test]
    fn test_vault_intent_is_unsupported() {
        let err = VaultedFlow::new(vaulted_card()).validate(&vault_session()).unwrap_err();
        assert!(matches!(err, PrimerError::UnsupportedIntent { intent: Intent::Vault, .. }));
    }

    #[test]
    fn test_requires_payment_method_id() {
        let mut card = vaulted_card();
        card.id = None;
        let err = VaultedFlow::new(card).validate(&checkout_session()).unwrap_err();
        assert!(matches!(
            err,
            PrimerError::InvalidValue { ref key, .. } if key == "paymentMethodTokenData.id"
        ));
    }

    #[tokio::test]
    async fn test_exchanges_vaulted_token() {
        let api = Arc::new(FakeApi::default());
        let mut ctx = FlowContext::new(
            Arc::new(checkout_session()),
            api.clone(),
            Arc::new(ScriptedPresenter::default()),
        );

        let flow = VaultedFlow::new(vaulted_card()).with_cvv("123");
        assert_eq!(flow.payment_method_type(), "PAYMENT_CARD");
        TokenizationEngine::new().run(&flow, &mut ctx).await.unwrap();

        assert_eq!(api.calls("exchange_payment_method_token"), 1);
        assert_eq!(api.calls("tokenize"), 0);
    }
}
