//! Merchant-defined payment methods.
//!
//! A merchant registers a [`CustomPaymentMethod`] with the checkout under a
//! payment method type of its choice. It runs through the same pipeline as
//! built-in methods: the same validation gate, hooks and single
//! tokenization request.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::PrimerError;
use crate::pipeline::FlowContext;
use crate::proto::{PaymentInstrument, TokenizationRequest};
use crate::session::SessionContext;
use crate::token::DecodedClientToken;

use super::{PaymentMethodFlow, unsupported_required_action};

/// A payment method implemented by the merchant.
#[async_trait::async_trait]
pub trait CustomPaymentMethod: Send + Sync {
    /// Payment method type the method is registered under.
    fn payment_method_type(&self) -> &str;

    /// Checks preconditions. Must not perform I/O.
    ///
    /// # Errors
    ///
    /// Returns the first failed precondition.
    fn validate(&self, _session: &SessionContext) -> Result<(), PrimerError> {
        Ok(())
    }

    /// Collects the method's input, typically through `ctx.present(..)`.
    async fn collect_input(&self, ctx: &FlowContext) -> Result<Value, PrimerError>;

    /// Turns the input into the instrument to tokenize.
    ///
    /// Sends the input unchanged by default.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is incomplete.
    fn build_instrument(
        &self,
        _session: &SessionContext,
        input: Value,
    ) -> Result<PaymentInstrument, PrimerError> {
        Ok(PaymentInstrument::Raw(input))
    }

    /// Handles a required action; unsupported by default.
    async fn handle_required_action(
        &self,
        _ctx: &FlowContext,
        client_token: &DecodedClientToken,
    ) -> Result<Option<String>, PrimerError> {
        Err(unsupported_required_action(self.payment_method_type(), client_token))
    }
}

/// Adapts a [`CustomPaymentMethod`] to the pipeline.
#[derive(Clone)]
pub struct CustomFlow(Arc<dyn CustomPaymentMethod>);

impl fmt::Debug for CustomFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CustomFlow")
            .field(&self.0.payment_method_type())
            .finish()
    }
}

impl CustomFlow {
    /// Wraps `method`.
    #[must_use]
    pub fn new(method: Arc<dyn CustomPaymentMethod>) -> Self {
        Self(method)
    }
}

impl PaymentMethodFlow for CustomFlow {
    type Input = Value;

    fn payment_method_type(&self) -> &str {
        self.0.payment_method_type()
    }

    fn validate(&self, session: &SessionContext) -> Result<(), PrimerError> {
        self.0.validate(session)
    }

    async fn collect_input(&self, ctx: &FlowContext) -> Result<Value, PrimerError> {
        self.0.collect_input(ctx).await
    }

    fn build_request(
        &self,
        session: &SessionContext,
        input: Value,
    ) -> Result<TokenizationRequest, PrimerError> {
        self.0.build_instrument(session, input).map(Into::into)
    }

    async fn handle_required_action(
        &self,
        ctx: &FlowContext,
        client_token: &DecodedClientToken,
    ) -> Result<Option<String>, PrimerError> {
        self.0.handle_required_action(ctx, client_token).await
    }
}
