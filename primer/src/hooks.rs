//! Merchant lifecycle hooks.
//!
//! A checkout notifies the merchant at fixed points of an attempt: before
//! the payment is created, around presented UI, around tokenization and when
//! the checkout completes or fails. Hooks are defined via the
//! [`CheckoutHooks`] trait, whose methods all default to no-ops, so
//! implementations override only what they need.
//!
//! Hooks run in registration order. For [`CheckoutHooks::will_create_payment`]
//! the first [`HookDecision::Abort`] wins and the remaining hooks are
//! skipped. Notification hooks all run.

use std::fmt::{self, Debug};
use std::sync::Arc;

use crate::api::BoxFuture;
use crate::error::PrimerError;
use crate::proto::{Payment, PaymentMethodTokenData};

/// Decision returned by [`CheckoutHooks::will_create_payment`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum HookDecision {
    /// Let the attempt proceed.
    #[default]
    Continue,
    /// Stop the attempt with [`PrimerError::MerchantAborted`].
    Abort {
        /// Machine-readable reason (e.g. `"out_of_stock"`).
        reason: String,
        /// Human-readable message.
        message: String,
    },
}

impl HookDecision {
    /// Shorthand for [`HookDecision::Abort`].
    pub fn abort(reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Abort {
            reason: reason.into(),
            message: message.into(),
        }
    }
}

/// Lifecycle hooks of a checkout.
///
/// All methods have default no-op implementations. The trait is
/// dyn-compatible for use in heterogeneous hook lists.
pub trait CheckoutHooks: Send + Sync {
    /// Called before a checkout-intent attempt collects input.
    fn will_create_payment<'a>(
        &'a self,
        _payment_method_type: &'a str,
    ) -> BoxFuture<'a, HookDecision> {
        Box::pin(async { HookDecision::Continue })
    }

    /// Called before payment method UI is presented.
    fn will_present_ui<'a>(&'a self, _payment_method_type: &'a str) -> BoxFuture<'a, ()> {
        Box::pin(async {})
    }

    /// Called once payment method UI is dismissed.
    fn did_dismiss_ui<'a>(&'a self, _payment_method_type: &'a str) -> BoxFuture<'a, ()> {
        Box::pin(async {})
    }

    /// Called right before the tokenization request is sent.
    fn did_start_tokenization<'a>(&'a self, _payment_method_type: &'a str) -> BoxFuture<'a, ()> {
        Box::pin(async {})
    }

    /// Called with the token returned by the tokenization request.
    fn did_finish_tokenization<'a>(
        &'a self,
        _token_data: &'a PaymentMethodTokenData,
    ) -> BoxFuture<'a, ()> {
        Box::pin(async {})
    }

    /// Called after a payment was resumed.
    fn on_resume_success<'a>(&'a self, _payment: &'a Payment) -> BoxFuture<'a, ()> {
        Box::pin(async {})
    }

    /// Called when an automatically handled payment completes.
    fn did_complete_checkout<'a>(&'a self, _payment: &'a Payment) -> BoxFuture<'a, ()> {
        Box::pin(async {})
    }

    /// Called with the error that ended an attempt.
    fn on_failure<'a>(&'a self, _error: &'a PrimerError) -> BoxFuture<'a, ()> {
        Box::pin(async {})
    }
}

/// Ordered list of registered hooks.
#[derive(Clone, Default)]
pub struct HookSet {
    hooks: Vec<Arc<dyn CheckoutHooks>>,
}

impl Debug for HookSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookSet")
            .field("hooks", &format!("[{} hooks]", self.hooks.len()))
            .finish()
    }
}

impl HookSet {
    /// Creates an empty hook set.
    #[must_use]
    pub const fn new() -> Self {
        Self { hooks: Vec::new() }
    }

    /// Registers a hook. Hooks execute in registration order.
    pub fn push(&mut self, hook: impl CheckoutHooks + 'static) {
        self.hooks.push(Arc::new(hook));
    }

    /// Returns the number of registered hooks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Returns `true` if no hook is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Runs `will_create_payment` hooks; the first abort wins.
    ///
    /// # Errors
    ///
    /// Returns [`PrimerError::MerchantAborted`] if a hook aborts.
    pub async fn will_create_payment(&self, payment_method_type: &str) -> Result<(), PrimerError> {
        for hook in &self.hooks {
            if let HookDecision::Abort { reason, message } =
                hook.will_create_payment(payment_method_type).await
            {
                #[cfg(feature = "telemetry")]
                tracing::info!(
                    payment_method_type,
                    %reason,
                    "Payment creation aborted by merchant"
                );
                return Err(PrimerError::MerchantAborted { reason, message });
            }
        }
        Ok(())
    }

    pub(crate) async fn will_present_ui(&self, payment_method_type: &str) {
        for hook in &self.hooks {
            hook.will_present_ui(payment_method_type).await;
        }
    }

    pub(crate) async fn did_dismiss_ui(&self, payment_method_type: &str) {
        for hook in &self.hooks {
            hook.did_dismiss_ui(payment_method_type).await;
        }
    }

    pub(crate) async fn did_start_tokenization(&self, payment_method_type: &str) {
        for hook in &self.hooks {
            hook.did_start_tokenization(payment_method_type).await;
        }
    }

    pub(crate) async fn did_finish_tokenization(&self, token_data: &PaymentMethodTokenData) {
        for hook in &self.hooks {
            hook.did_finish_tokenization(token_data).await;
        }
    }

    pub(crate) async fn on_resume_success(&self, payment: &Payment) {
        for hook in &self.hooks {
            hook.on_resume_success(payment).await;
        }
    }

    pub(crate) async fn did_complete_checkout(&self, payment: &Payment) {
        for hook in &self.hooks {
            hook.did_complete_checkout(payment).await;
        }
    }

    pub(crate) async fn on_failure(&self, error: &PrimerError) {
        for hook in &self.hooks {
            hook.on_failure(error).await;
        }
    }
}
