//! Checkout orchestration.
//!
//! [`Checkout`] owns everything a merchant integration needs for a session:
//! the API, the presenter, hooks and custom payment methods. It runs the
//! tokenization pipeline and, depending on intent and payment handling,
//! goes on to create and resume the payment.
//!
//! | Intent     | Payment handling | Outcome                                     |
//! |------------|------------------|---------------------------------------------|
//! | `VAULT`    | any              | [`CheckoutOutcome::Vaulted`]                |
//! | `CHECKOUT` | `MANUAL`         | [`CheckoutOutcome::Tokenized`]              |
//! | `CHECKOUT` | `AUTO`           | [`CheckoutOutcome::Completed`] with payment |
//!
//! Every failure is reported once through [`CheckoutHooks::on_failure`] and
//! returned to the caller.

use std::fmt;
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::api::PrimerApi;
use crate::config::PaymentHandling;
use crate::error::PrimerError;
use crate::hooks::{CheckoutHooks, HookSet};
use crate::interaction::Presenter;
use crate::method::{AnyPaymentMethod, CustomFlow, CustomPaymentMethod};
use crate::pipeline::{AttemptState, FlowContext, TokenizationEngine};
use crate::proto::{CreatePaymentRequest, Payment, PaymentMethodTokenData, ResumePaymentRequest};
use crate::session::{Intent, SessionContext};
use crate::token::DecodedClientToken;

#[cfg(feature = "telemetry")]
use tracing::instrument;

/// Result of [`Checkout::start`].
#[derive(Debug, Clone, PartialEq)]
pub enum CheckoutOutcome {
    /// The payment method was vaulted.
    Vaulted(PaymentMethodTokenData),
    /// The payment method was tokenized; the merchant creates the payment.
    Tokenized(PaymentMethodTokenData),
    /// The payment was created, and resumed if an action was required.
    Completed(Payment),
}

/// A checkout session.
pub struct Checkout {
    session: Arc<SessionContext>,
    api: Arc<dyn PrimerApi>,
    presenter: Arc<dyn Presenter>,
    hooks: HookSet,
    custom: Vec<Arc<dyn CustomPaymentMethod>>,
    engine: TokenizationEngine,
    cancel: Mutex<CancellationToken>,
}

impl fmt::Debug for Checkout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Checkout")
            .field("intent", &self.session.intent())
            .field("hooks", &self.hooks)
            .field("custom_payment_methods", &self.custom.len())
            .field("state", &self.engine.state())
            .finish_non_exhaustive()
    }
}

impl Checkout {
    /// Creates a checkout for `session`.
    pub fn new(
        session: SessionContext,
        api: Arc<dyn PrimerApi>,
        presenter: Arc<dyn Presenter>,
    ) -> Self {
        Self {
            session: Arc::new(session),
            api,
            presenter,
            hooks: HookSet::new(),
            custom: Vec::new(),
            engine: TokenizationEngine::new(),
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    /// Registers a hook. Hooks run in registration order.
    #[must_use]
    pub fn with_hook(mut self, hook: impl CheckoutHooks + 'static) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Registers a merchant-defined payment method.
    ///
    /// It takes precedence over a configured method of the same type.
    #[must_use]
    pub fn with_custom_payment_method(
        mut self,
        method: impl CustomPaymentMethod + 'static,
    ) -> Self {
        self.custom.push(Arc::new(method));
        self
    }

    /// Session the checkout was created with.
    #[must_use]
    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Resolves a payment method type.
    ///
    /// Custom registrations are checked first, then the remote configuration.
    ///
    /// # Errors
    ///
    /// - [`PrimerError::MissingConfiguration`] if the session has no configuration.
    /// - [`PrimerError::UnsupportedPaymentMethod`] if the type is not
    ///   configured or has no flow.
    pub fn payment_method(
        &self,
        payment_method_type: &str,
    ) -> Result<AnyPaymentMethod, PrimerError> {
        if let Some(custom) = self
            .custom
            .iter()
            .find(|m| m.payment_method_type() == payment_method_type)
        {
            return Ok(AnyPaymentMethod::Custom(CustomFlow::new(Arc::clone(custom))));
        }
        let config = self
            .session
            .require_configuration()?
            .payment_method(payment_method_type)
            .ok_or_else(|| PrimerError::UnsupportedPaymentMethod(payment_method_type.to_owned()))?;
        AnyPaymentMethod::from_configuration(config)
    }

    /// Every configured or registered method the checkout can run.
    ///
    /// Configured types without a flow are skipped.
    #[must_use]
    pub fn payment_methods(&self) -> Vec<AnyPaymentMethod> {
        let configured = self
            .session
            .configuration()
            .map(|c| c.payment_methods.as_slice())
            .unwrap_or_default();
        self.custom
            .iter()
            .map(|m| AnyPaymentMethod::Custom(CustomFlow::new(Arc::clone(m))))
            .chain(
                configured
                    .iter()
                    .filter_map(|config| AnyPaymentMethod::from_configuration(config).ok()),
            )
            .collect()
    }

    /// Payment methods vaulted for the session's customer.
    ///
    /// # Errors
    ///
    /// Returns [`PrimerError::InvalidClientToken`] or a network error.
    pub async fn vaulted_payment_methods(
        &self,
    ) -> Result<Vec<PaymentMethodTokenData>, PrimerError> {
        let client_token = self.session.valid_client_token()?;
        Ok(self.api.fetch_vaulted_payment_methods(client_token).await?.data)
    }

    /// Subscribes to tokenization attempt states.
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<AttemptState> {
        self.engine.subscribe()
    }

    /// Cancels the attempt in flight, if any.
    pub fn cancel(&self) {
        if let Ok(token) = self.cancel.lock() {
            token.cancel();
        }
    }

    fn begin_attempt(&self) -> FlowContext {
        let cancel = CancellationToken::new();
        if let Ok(mut current) = self.cancel.lock() {
            *current = cancel.clone();
        }
        FlowContext::new(
            Arc::clone(&self.session),
            Arc::clone(&self.api),
            Arc::clone(&self.presenter),
        )
        .with_hooks(Arc::new(self.hooks.clone()))
        .with_cancellation(cancel)
    }

    async fn report<T>(&self, result: Result<T, PrimerError>) -> Result<T, PrimerError> {
        if let Err(err) = &result {
            #[cfg(feature = "telemetry")]
            tracing::warn!(error = %err, "Checkout failed");
            self.hooks.on_failure(err).await;
        }
        result
    }

    /// Runs the tokenization pipeline only.
    ///
    /// # Errors
    ///
    /// Returns the error of the first failing stage.
    pub async fn tokenize(
        &self,
        method: &AnyPaymentMethod,
    ) -> Result<PaymentMethodTokenData, PrimerError> {
        let mut ctx = self.begin_attempt();
        let result = method.tokenize(&self.engine, &mut ctx).await;
        self.report(result).await
    }

    /// Runs the whole checkout for `method`.
    ///
    /// # Errors
    ///
    /// Returns the first error of tokenization, payment creation, the
    /// required action or resumption. A failed or declined payment gives
    /// [`PrimerError::PaymentFailed`].
    #[cfg_attr(
        feature = "telemetry",
        instrument(
            name = "primer.checkout",
            skip_all,
            fields(
                payment_method_type = %method.payment_method_type(),
                intent = %self.session.intent()
            ),
            err
        )
    )]
    pub async fn start(&self, method: &AnyPaymentMethod) -> Result<CheckoutOutcome, PrimerError> {
        let mut ctx = self.begin_attempt();
        let result = self.run(method, &mut ctx).await;
        self.report(result).await
    }

    async fn run(
        &self,
        method: &AnyPaymentMethod,
        ctx: &mut FlowContext,
    ) -> Result<CheckoutOutcome, PrimerError> {
        let token_data = method.tokenize(&self.engine, ctx).await?;
        if self.session.intent() == Intent::Vault {
            return Ok(CheckoutOutcome::Vaulted(token_data));
        }
        if self.session.settings().payment_handling == PaymentHandling::Manual {
            return Ok(CheckoutOutcome::Tokenized(token_data));
        }

        let cancel = ctx.cancellation().clone();
        let payment = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(PrimerError::cancelled(method.payment_method_type())),
            payment = self.create_and_resume(method, ctx, &token_data) => payment,
        }?;
        ctx.hooks().did_complete_checkout(&payment).await;
        Ok(CheckoutOutcome::Completed(payment))
    }

    async fn create_and_resume(
        &self,
        method: &AnyPaymentMethod,
        ctx: &FlowContext,
        token_data: &PaymentMethodTokenData,
    ) -> Result<Payment, PrimerError> {
        let client_token = ctx.client_token()?;
        let request = CreatePaymentRequest {
            payment_method_token: token_data.token.clone(),
        };
        let payment = ensure_not_failed(self.api.create_payment(client_token, &request).await?)?;

        #[cfg(feature = "telemetry")]
        tracing::info!(payment_id = %payment.id, status = ?payment.status, "Payment created");

        let Some(action) = &payment.required_action else {
            return Ok(payment);
        };
        let action_token = DecodedClientToken::decode(&action.client_token)?;

        #[cfg(feature = "telemetry")]
        tracing::info!(
            action = %action.name,
            intent = ?action_token.intent,
            "Handling required action"
        );

        let Some(resume_token) = method.handle_required_action(ctx, &action_token).await? else {
            return Ok(payment);
        };
        let resumed = self
            .api
            .resume_payment(client_token, &payment.id, &ResumePaymentRequest { resume_token })
            .await?;
        let resumed = ensure_not_failed(resumed)?;
        ctx.hooks().on_resume_success(&resumed).await;
        Ok(resumed)
    }

    /// Runs the required action of a payment created by the merchant backend.
    ///
    /// Used with manual payment handling: `raw_client_token` is the token of
    /// the payment's required action. Returns the resume token to send to
    /// the backend, or `None` if the method had nothing to do.
    ///
    /// # Errors
    ///
    /// Returns [`PrimerError::InvalidClientToken`] for an undecodable token,
    /// or the flow's error.
    pub async fn resume_with_client_token(
        &self,
        method: &AnyPaymentMethod,
        raw_client_token: &str,
    ) -> Result<Option<String>, PrimerError> {
        let ctx = self.begin_attempt();
        let result = match DecodedClientToken::decode(raw_client_token) {
            Ok(action_token) => method.handle_required_action(&ctx, &action_token).await,
            Err(err) => Err(err),
        };
        self.report(result).await
    }
}

fn ensure_not_failed(payment: Payment) -> Result<Payment, PrimerError> {
    if payment.status.is_failure() {
        return Err(PrimerError::PaymentFailed {
            reason: payment.failure_reason(),
            payment_id: payment.id,
        });
    }
    Ok(payment)
}
