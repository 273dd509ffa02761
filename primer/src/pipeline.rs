//! Tokenization pipeline shared by every payment method.
//!
//! An attempt runs a fixed sequence of stages:
//!
//! 1. **validate**: synchronous precondition checks, no network call.
//! 2. **pre-tokenization**: selection event, client session action,
//!    `will_create_payment` hook and input collection.
//! 3. **tokenize**: exactly one tokenization request.
//! 4. **post-tokenization**: method-specific follow-up.
//!
//! The first failing stage ends the attempt. The whole attempt races
//! against the context's [`CancellationToken`].

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::api::PrimerApi;
use crate::error::PrimerError;
use crate::hooks::HookSet;
use crate::interaction::{Presentation, Presenter, UserInput};
use crate::method::PaymentMethodFlow;
use crate::polling::poll_until_complete;
use crate::proto::{
    ClientSessionActionsRequest, PaymentMethodTokenData, PollingResponse, TokenizationRequest,
};
use crate::session::{Intent, SessionContext};
use crate::token::DecodedClientToken;

#[cfg(feature = "telemetry")]
use tracing::instrument;

/// Progress of a tokenization attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum AttemptState {
    /// No attempt has run yet.
    #[default]
    NotStarted,
    /// Checking preconditions.
    Validating,
    /// Collecting input.
    PreTokenization,
    /// Sending the tokenization request.
    Tokenizing,
    /// Running follow-up steps.
    PostTokenization,
    /// Finished with a token.
    Completed,
    /// Finished with an error.
    Failed,
}

impl AttemptState {
    /// Returns `true` for `Completed` and `Failed`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Everything a flow can reach while it runs.
#[derive(Clone)]
pub struct FlowContext {
    session: Arc<SessionContext>,
    api: Arc<dyn PrimerApi>,
    presenter: Arc<dyn Presenter>,
    hooks: Arc<HookSet>,
    cancel: CancellationToken,
}

impl fmt::Debug for FlowContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowContext")
            .field("intent", &self.session.intent())
            .field("hooks", &self.hooks)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl FlowContext {
    /// Creates a context without hooks and with a fresh cancellation token.
    pub fn new(
        session: Arc<SessionContext>,
        api: Arc<dyn PrimerApi>,
        presenter: Arc<dyn Presenter>,
    ) -> Self {
        Self {
            session,
            api,
            presenter,
            hooks: Arc::new(HookSet::new()),
            cancel: CancellationToken::new(),
        }
    }

    /// Sets the hooks notified during the attempt.
    #[must_use]
    pub fn with_hooks(mut self, hooks: Arc<HookSet>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Sets the token that cancels the attempt.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Current session snapshot.
    #[must_use]
    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Backend API.
    #[must_use]
    pub fn api(&self) -> &dyn PrimerApi {
        self.api.as_ref()
    }

    /// Registered hooks.
    #[must_use]
    pub fn hooks(&self) -> &HookSet {
        &self.hooks
    }

    /// Cancellation token of the attempt.
    #[must_use]
    pub const fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Checked client token of the session.
    ///
    /// # Errors
    ///
    /// Returns [`PrimerError::InvalidClientToken`] if it is absent or expired.
    pub fn client_token(&self) -> Result<&DecodedClientToken, PrimerError> {
        self.session.valid_client_token()
    }

    pub(crate) fn replace_session(&mut self, session: SessionContext) {
        self.session = Arc::new(session);
    }

    /// Presents `presentation` and returns the user's input.
    ///
    /// # Errors
    ///
    /// Returns [`PrimerError::Cancelled`] if the user dismissed the UI or the
    /// attempt was cancelled, or the presenter's own error.
    pub async fn present(
        &self,
        payment_method_type: &str,
        presentation: Presentation,
    ) -> Result<UserInput, PrimerError> {
        #[cfg(feature = "telemetry")]
        tracing::debug!(payment_method_type, kind = presentation.kind(), "Presenting");

        self.hooks.will_present_ui(payment_method_type).await;
        let input = tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(PrimerError::cancelled(payment_method_type)),
            input = self.presenter.present(presentation) => input,
        };
        match input {
            Ok(UserInput::Cancelled) => {
                self.hooks.did_dismiss_ui(payment_method_type).await;
                Err(PrimerError::cancelled(payment_method_type))
            }
            Err(err) => {
                self.dismiss(payment_method_type).await;
                Err(err)
            }
            Ok(input) => Ok(input),
        }
    }

    /// Removes the UI of `payment_method_type`.
    pub async fn dismiss(&self, payment_method_type: &str) {
        self.presenter.dismiss(payment_method_type).await;
        self.hooks.did_dismiss_ui(payment_method_type).await;
    }

    /// Polls `status_url` with the session's polling bounds.
    ///
    /// # Errors
    ///
    /// See [`poll_until_complete`]; cancellation gives [`PrimerError::Cancelled`].
    pub async fn poll(
        &self,
        payment_method_type: &str,
        client_token: &DecodedClientToken,
        status_url: &Url,
    ) -> Result<PollingResponse, PrimerError> {
        let config = &self.session.settings().polling;
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(PrimerError::cancelled(payment_method_type)),
            response = poll_until_complete(self.api(), client_token, status_url, config) => {
                response
            }
        }
    }

    /// Shows `presentation` while polling `status_url`, returning the resume token.
    ///
    /// Closing the presentation stops polling with [`PrimerError::Cancelled`].
    /// A presentation that resolves with any other input keeps polling.
    ///
    /// # Errors
    ///
    /// Returns the polling error, the presenter's error or a cancellation.
    pub async fn present_and_poll(
        &self,
        payment_method_type: &str,
        presentation: Presentation,
        client_token: &DecodedClientToken,
        status_url: &Url,
    ) -> Result<String, PrimerError> {
        enum Race {
            Polled(Result<PollingResponse, PrimerError>),
            Shown(Result<UserInput, PrimerError>),
        }

        self.hooks.will_present_ui(payment_method_type).await;
        let poll = self.poll(payment_method_type, client_token, status_url);
        tokio::pin!(poll);
        let race = tokio::select! {
            response = &mut poll => Race::Polled(response),
            input = self.presenter.present(presentation) => Race::Shown(input),
        };
        let result = match race {
            Race::Polled(response) => response,
            Race::Shown(Ok(UserInput::Cancelled)) => {
                Err(PrimerError::cancelled(payment_method_type))
            }
            Race::Shown(Err(err)) => Err(err),
            Race::Shown(Ok(_)) => poll.await,
        };
        self.dismiss(payment_method_type).await;
        result.map(|response| response.id)
    }
}

/// Runs tokenization attempts and publishes their state.
#[derive(Debug)]
pub struct TokenizationEngine {
    state: watch::Sender<AttemptState>,
}

impl Default for TokenizationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenizationEngine {
    /// Creates an idle engine.
    #[must_use]
    pub fn new() -> Self {
        let (state, _) = watch::channel(AttemptState::NotStarted);
        Self { state }
    }

    /// Subscribes to attempt state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AttemptState> {
        self.state.subscribe()
    }

    /// State of the current or last attempt.
    #[must_use]
    pub fn state(&self) -> AttemptState {
        *self.state.borrow()
    }

    fn transition(&self, next: AttemptState) {
        #[cfg(feature = "telemetry")]
        tracing::debug!(from = ?*self.state.borrow(), to = ?next, "Attempt state changed");
        self.state.send_replace(next);
    }

    /// Checks the client token, the checkout amount and currency, and the
    /// flow's own preconditions.
    ///
    /// Pure: it makes no network call and gives the same answer for the same
    /// session.
    ///
    /// # Errors
    ///
    /// Returns the first failed precondition.
    pub fn validate<F: PaymentMethodFlow + ?Sized>(
        flow: &F,
        session: &SessionContext,
    ) -> Result<(), PrimerError> {
        session.valid_client_token()?;
        if session.intent() == Intent::Checkout {
            session.require_amount()?;
            session.require_currency()?;
        }
        flow.validate(session)
    }

    /// Runs one attempt of `flow` and returns its token.
    ///
    /// `ctx` holds the session snapshot after the attempt, including any
    /// client session update made during pre-tokenization.
    ///
    /// # Errors
    ///
    /// Returns the error of the first failing stage, or
    /// [`PrimerError::Cancelled`] if the context was cancelled.
    #[cfg_attr(
        feature = "telemetry",
        instrument(
            name = "primer.tokenization",
            skip_all,
            fields(payment_method_type = %flow.payment_method_type()),
            err
        )
    )]
    pub async fn run<F: PaymentMethodFlow>(
        &self,
        flow: &F,
        ctx: &mut FlowContext,
    ) -> Result<PaymentMethodTokenData, PrimerError> {
        let cancel = ctx.cancellation().clone();
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(PrimerError::cancelled(flow.payment_method_type())),
            result = self.stages(flow, ctx) => result,
        };
        match &result {
            Ok(_) => self.transition(AttemptState::Completed),
            Err(_err) => {
                #[cfg(feature = "telemetry")]
                tracing::warn!(error = %_err, "Tokenization attempt failed");
                self.transition(AttemptState::Failed);
            }
        }
        result
    }

    async fn stages<F: PaymentMethodFlow>(
        &self,
        flow: &F,
        ctx: &mut FlowContext,
    ) -> Result<PaymentMethodTokenData, PrimerError> {
        self.transition(AttemptState::Validating);
        Self::validate(flow, ctx.session())?;

        self.transition(AttemptState::PreTokenization);
        let input = Self::pre_tokenize(flow, ctx).await?;

        self.transition(AttemptState::Tokenizing);
        let request = flow.build_request(ctx.session(), input)?;
        let token_data = Self::tokenize(flow, ctx, request).await?;

        self.transition(AttemptState::PostTokenization);
        flow.post_tokenize(ctx, &token_data).await?;
        Ok(token_data)
    }

    async fn pre_tokenize<F: PaymentMethodFlow>(
        flow: &F,
        ctx: &mut FlowContext,
    ) -> Result<F::Input, PrimerError> {
        let payment_method_type = flow.payment_method_type();

        #[cfg(feature = "telemetry")]
        tracing::info!(
            payment_method_type,
            intent = %ctx.session().intent(),
            "Payment method selected"
        );

        if ctx.session().intent() == Intent::Checkout {
            if ctx.session().client_session().is_some() {
                let request = ClientSessionActionsRequest::select(payment_method_type);
                let update = {
                    let client_token = ctx.client_token()?;
                    ctx.api().client_session_actions(client_token, &request).await?
                };
                let session = ctx.session().clone().with_configuration_update(update);
                ctx.replace_session(session);
            }
            ctx.hooks().will_create_payment(payment_method_type).await?;
        }

        flow.collect_input(ctx).await
    }

    async fn tokenize<F: PaymentMethodFlow>(
        flow: &F,
        ctx: &FlowContext,
        request: TokenizationRequest,
    ) -> Result<PaymentMethodTokenData, PrimerError> {
        ctx.hooks().did_start_tokenization(flow.payment_method_type()).await;
        let client_token = ctx.client_token()?;
        let token_data = match &request {
            TokenizationRequest::Instrument(body) => ctx.api().tokenize(client_token, body).await?,
            TokenizationRequest::VaultedExchange {
                payment_method_id,
                additional_data,
            } => {
                ctx.api()
                    .exchange_payment_method_token(
                        client_token,
                        payment_method_id,
                        additional_data.as_ref(),
                    )
                    .await?
            }
        };

        #[cfg(feature = "telemetry")]
        tracing::info!(
            payment_method_type = flow.payment_method_type(),
            instrument_type = %token_data.payment_instrument_type,
            "Payment method tokenized"
        );

        ctx.hooks().did_finish_tokenization(&token_data).await;
        Ok(token_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NetworkError;
    use crate::hooks::{CheckoutHooks, HookDecision};
    use crate::method::form::FormFlow;
    use crate::method::primer_test::PrimerTestFlow;
    use crate::proto::FlowDecision;
    use crate::api::BoxFuture;
    use crate::testing::{
        FakeApi, ScriptedPresenter, checkout_session, configuration, expired_session, settings,
        vault_session,
    };

    fn context(
        api: &Arc<FakeApi>,
        presenter: ScriptedPresenter,
        session: SessionContext,
    ) -> FlowContext {
        FlowContext::new(Arc::new(session), api.clone(), Arc::new(presenter))
    }

    #[tokio::test]
    async fn test_successful_attempt_tokenizes_once() {
        let api = Arc::new(FakeApi::default());
        let presenter = ScriptedPresenter::new([UserInput::TestDecision(FlowDecision::Success)]);
        let mut ctx = context(&api, presenter, vault_session());
        let engine = TokenizationEngine::new();
        let mut states = engine.subscribe();

        let flow = PrimerTestFlow::new("PRIMER_TEST_KLARNA");
        let token = engine.run(&flow, &mut ctx).await.unwrap();

        assert_eq!(token.token, "tok-1");
        assert_eq!(api.calls("tokenize"), 1);
        assert_eq!(engine.state(), AttemptState::Completed);
        assert!(states.has_changed().unwrap());
        assert_eq!(*states.borrow_and_update(), AttemptState::Completed);
    }

    #[tokio::test]
    async fn test_expired_token_fails_before_any_call() {
        let api = Arc::new(FakeApi::default());
        let mut ctx = context(&api, ScriptedPresenter::default(), expired_session());
        let engine = TokenizationEngine::new();

        let flow = PrimerTestFlow::new("PRIMER_TEST_KLARNA");
        let err = engine.run(&flow, &mut ctx).await.unwrap_err();

        assert!(matches!(err, PrimerError::InvalidClientToken));
        assert_eq!(api.total_calls(), 0);
        assert_eq!(engine.state(), AttemptState::Failed);
    }

    #[tokio::test]
    async fn test_checkout_without_amount_fails_before_any_call() {
        let mut configuration = configuration();
        if let Some(order) = configuration.client_session.as_mut().and_then(|s| s.order.as_mut()) {
            order.total_order_amount = None;
            order.merchant_amount = None;
        }
        let session = SessionContext::new(FakeApi::client_token(), settings(), Intent::Checkout)
            .with_configuration(configuration);
        let api = Arc::new(FakeApi::default());
        let mut ctx = context(&api, ScriptedPresenter::default(), session);
        let engine = TokenizationEngine::new();

        let flow = FormFlow::new("ADYEN_MULTIBANCO").unwrap();
        let err = engine.run(&flow, &mut ctx).await.unwrap_err();

        assert!(matches!(err, PrimerError::InvalidSetting { ref name, .. } if name == "amount"));
        assert_eq!(api.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_validate_is_idempotent() {
        let session = expired_session();
        let flow = PrimerTestFlow::new("PRIMER_TEST_KLARNA");
        let first = TokenizationEngine::validate(&flow, &session).unwrap_err();
        let second = TokenizationEngine::validate(&flow, &session).unwrap_err();
        assert_eq!(first.to_string(), second.to_string());

        let session = vault_session();
        assert!(TokenizationEngine::validate(&flow, &session).is_ok());
        assert!(TokenizationEngine::validate(&flow, &session).is_ok());
    }

    #[tokio::test]
    async fn test_presenter_cancellation_skips_tokenize() {
        let api = Arc::new(FakeApi::default());
        let presenter = ScriptedPresenter::new([UserInput::Cancelled]);
        let mut ctx = context(&api, presenter, vault_session());
        let engine = TokenizationEngine::new();

        let flow = PrimerTestFlow::new("PRIMER_TEST_PAYPAL");
        let err = engine.run(&flow, &mut ctx).await.unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(api.calls("tokenize"), 0);
    }

    #[tokio::test]
    async fn test_cancellation_token_ends_attempt() {
        let api = Arc::new(FakeApi::default());
        let presenter = ScriptedPresenter::pending();
        let cancel = CancellationToken::new();
        let mut ctx = context(&api, presenter, vault_session()).with_cancellation(cancel.clone());
        let engine = TokenizationEngine::new();

        let flow = PrimerTestFlow::new("PRIMER_TEST_SOFORT");
        let run = engine.run(&flow, &mut ctx);
        let cancel_soon = async {
            tokio::task::yield_now().await;
            cancel.cancel();
        };
        let (result, ()) = tokio::join!(run, cancel_soon);

        assert!(result.unwrap_err().is_cancelled());
        assert_eq!(api.calls("tokenize"), 0);
    }

    #[tokio::test]
    async fn test_cancelled_presentation_is_dismissed() {
        #[derive(Clone, Default)]
        struct Dismissals(Arc<std::sync::atomic::AtomicUsize>);
        impl CheckoutHooks for Dismissals {
            fn did_dismiss_ui<'a>(&'a self, _payment_method_type: &'a str) -> BoxFuture<'a, ()> {
                self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                Box::pin(async {})
            }
        }

        let api = Arc::new(FakeApi::default());
        let dismissals = Dismissals::default();
        let mut hooks = HookSet::new();
        hooks.push(dismissals.clone());
        let cancel = CancellationToken::new();
        let ctx = context(&api, ScriptedPresenter::pending(), vault_session())
            .with_hooks(Arc::new(hooks))
            .with_cancellation(cancel.clone());

        let shown = ctx.present("PRIMER_TEST_SOFORT", Presentation::CardForm);
        let cancel_soon = async {
            tokio::task::yield_now().await;
            cancel.cancel();
        };
        let (result, ()) = tokio::join!(shown, cancel_soon);

        assert!(result.unwrap_err().is_cancelled());
        assert_eq!(dismissals.0.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_checkout_selects_payment_method_and_asks_hooks() {
        struct Refuse;
        impl CheckoutHooks for Refuse {
            fn will_create_payment<'a>(&'a self, _: &'a str) -> BoxFuture<'a, HookDecision> {
                Box::pin(async { HookDecision::abort("blocked", "not today") })
            }
        }

        let api = Arc::new(FakeApi::default());
        let presenter = ScriptedPresenter::new([UserInput::TestDecision(FlowDecision::Success)]);
        let mut hooks = HookSet::new();
        hooks.push(Refuse);
        let mut ctx =
            context(&api, presenter, checkout_session()).with_hooks(Arc::new(hooks));
        let engine = TokenizationEngine::new();

        let flow = PrimerTestFlow::new("PRIMER_TEST_KLARNA");
        let err = engine.run(&flow, &mut ctx).await.unwrap_err();

        assert!(matches!(
            err,
            PrimerError::MerchantAborted { ref reason, .. } if reason == "blocked"
        ));
        assert_eq!(api.calls("client_session_actions"), 1);
        assert_eq!(api.calls("tokenize"), 0);
    }

    #[tokio::test]
    async fn test_network_error_propagates_unchanged() {
        let api = Arc::new(FakeApi::default());
        api.fail_tokenize(NetworkError::HttpStatus {
            context: "POST /payment-instruments",
            status: 422,
            body: "bad".into(),
        });
        let presenter = ScriptedPresenter::new([UserInput::TestDecision(FlowDecision::Decline)]);
        let mut ctx = context(&api, presenter, vault_session());

        let flow = PrimerTestFlow::new("PRIMER_TEST_KLARNA");
        let err = TokenizationEngine::new().run(&flow, &mut ctx).await.unwrap_err();

        assert!(matches!(
            err,
            PrimerError::Network(NetworkError::HttpStatus { status: 422, .. })
        ));
    }
}
