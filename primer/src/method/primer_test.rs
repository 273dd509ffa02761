//! Test payment methods available in sandbox.
//!
//! The user picks the outcome the backend should simulate.

use crate::error::PrimerError;
use crate::interaction::{Presentation, UserInput};
use crate::pipeline::FlowContext;
use crate::proto::{FlowDecision, SessionInfo, TokenizationRequest};
use crate::session::SessionContext;

use super::{PaymentMethodFlow, off_session_request, require_config_id, unexpected_input};

/// Payment method types handled by [`PrimerTestFlow`].
pub const TYPES: &[&str] = &["PRIMER_TEST_KLARNA", "PRIMER_TEST_PAYPAL", "PRIMER_TEST_SOFORT"];

/// Test method flow.
#[derive(Debug, Clone)]
pub struct PrimerTestFlow {
    payment_method_type: String,
}

impl PrimerTestFlow {
    /// Creates the flow for `payment_method_type`.
    pub fn new(payment_method_type: impl Into<String>) -> Self {
        Self {
            payment_method_type: payment_method_type.into(),
        }
    }
}

impl PaymentMethodFlow for PrimerTestFlow {
    type Input = FlowDecision;

    fn payment_method_type(&self) -> &str {
        &self.payment_method_type
    }

    fn validate(&self, session: &SessionContext) -> Result<(), PrimerError> {
        require_config_id(session, &self.payment_method_type).map(|_| ())
    }

    async fn collect_input(&self, ctx: &FlowContext) -> Result<FlowDecision, PrimerError> {
        let presentation = Presentation::TestDecision {
            decisions: FlowDecision::ALL.to_vec(),
        };
        let decision = match ctx.present(&self.payment_method_type, presentation).await? {
            UserInput::TestDecision(decision) => decision,
            other => return Err(unexpected_input(&self.payment_method_type, &other)),
        };
        ctx.dismiss(&self.payment_method_type).await;
        Ok(decision)
    }

    fn build_request(
        &self,
        session: &SessionContext,
        flow_decision: FlowDecision,
    ) -> Result<TokenizationRequest, PrimerError> {
        off_session_request(
            session,
            &self.payment_method_type,
            SessionInfo::PrimerTest { flow_decision },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::pipeline::TokenizationEngine;
    use crate::testing::{FakeApi, ScriptedPresenter, vault_session};

    #[tokio::test]
    async fn test_decision_is_sent_as_session_info() {
        let api = Arc::new(FakeApi::default());
        let presenter = ScriptedPresenter::new([UserInput::TestDecision(FlowDecision::Fail)]);
        let mut ctx = FlowContext::new(Arc::new(vault_session()), api.clone(), Arc::new(presenter));

        TokenizationEngine::new()
            .run(&PrimerTestFlow::new("PRIMER_TEST_SOFORT"), &mut ctx)
            .await
            .unwrap();

        let body = api.last_tokenize_body().unwrap();
        assert_eq!(body["paymentInstrument"]["sessionInfo"]["flowDecision"], "FAIL");
        assert_eq!(body["paymentInstrument"]["paymentMethodConfigId"], "cfg-PRIMER_TEST_SOFORT");
    }

    #[tokio::test]
    async fn test_unexpected_input_fails_flow() {
        let api = Arc::new(FakeApi::default());
        let presenter = ScriptedPresenter::new([UserInput::Acknowledged]);
        let mut ctx = FlowContext::new(Arc::new(vault_session()), api.clone(), Arc::new(presenter));

        let err = TokenizationEngine::new()
            .run(&PrimerTestFlow::new("PRIMER_TEST_PAYPAL"), &mut ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, PrimerError::FlowFailed { .. }));
    }
}
