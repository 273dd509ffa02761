//! Scripted fakes and session fixtures for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use serde_json::{Map, Value, json};
use url::Url;

use crate::api::{ApiResult, BoxFuture, PrimerApi};
use crate::config::PrimerSettings;
use crate::error::{NetworkError, PrimerError};
use crate::interaction::{Presentation, Presenter, UserInput};
use crate::polling::PollingConfig;
use crate::proto::apaya::{ApayaSessionRequest, ApayaSessionResponse};
use crate::proto::banks::{BankListRequest, BankListResponse};
use crate::proto::configuration::{Customer, Order};
use crate::proto::klarna::{
    CreateCustomerTokenRequest, CreatePaymentSessionRequest, CreatePaymentSessionResponse,
    CustomerTokenResponse, FinalizePaymentSessionRequest,
};
use crate::proto::paypal::{
    ConfirmBillingAgreementRequest, ConfirmBillingAgreementResponse, CreateBillingAgreementRequest,
    CreateBillingAgreementResponse, CreateOrderRequest, CreateOrderResponse, PayerInfo,
    PayerInfoRequest, PayerInfoResponse,
};
use crate::proto::token_data::{TokenType, VaultedPaymentMethods};
use crate::proto::{
    ApiConfiguration, Bank, ClientSession, ClientSessionActionsRequest, CreatePaymentRequest,
    ImplementationType, LineItem, Payment, PaymentMethodConfiguration, PaymentMethodTokenData,
    PaymentStatus, PollingResponse, RequiredAction, ResumePaymentRequest, TokenizationRequestBody,
    VaultedCardAdditionalData,
};
use crate::session::{Intent, SessionContext};
use crate::timestamp::UnixTimestamp;
use crate::token::{DecodedClientToken, encode_unsigned};

const NATIVE_TYPES: &[&str] = &[
    "PAYMENT_CARD",
    "ADYEN_BANCONTACT_CARD",
    "PAYPAL",
    "APPLE_PAY",
    "KLARNA",
    "ADYEN_IDEAL",
    "ADYEN_DOTPAY",
    "XFERS_PAYNOW",
    "RAPYD_PROMPTPAY",
    "OMISE_PROMPTPAY",
    "ADYEN_BLIK",
    "ADYEN_MBWAY",
    "ADYEN_MULTIBANCO",
    "RAPYD_FAST",
    "PRIMER_TEST_KLARNA",
    "PRIMER_TEST_PAYPAL",
    "PRIMER_TEST_SOFORT",
];

#[derive(Default)]
struct FakeState {
    calls: HashMap<&'static str, usize>,
    poll_script: VecDeque<Result<PollingResponse, NetworkError>>,
    tokenize_error: Option<NetworkError>,
    last_tokenize_body: Option<Value>,
    create_payment: Option<Payment>,
    last_resume_token: Option<String>,
}

/// In-memory [`PrimerApi`] with canned responses.
///
/// Polling follows the script given to [`FakeApi::script_poll`] and
/// completes once the script runs out.
#[derive(Default)]
pub struct FakeApi {
    state: Mutex<FakeState>,
}

impl FakeApi {
    /// A valid client token with PCI, core and configuration URLs.
    pub fn client_token() -> DecodedClientToken {
        DecodedClientToken {
            access_token: Some("access-1".into()),
            exp: Some(UnixTimestamp::from_secs(UnixTimestamp::now().as_secs() + 3600)),
            configuration_url: Some("https://config.example.com/configuration".into()),
            core_url: Some("https://core.example.com".into()),
            pci_url: Some("https://pci.example.com".into()),
            env: Some("SANDBOX".into()),
            intent: Some("CHECKOUT".into()),
            ..Default::default()
        }
    }

    fn record(&self, name: &'static str) {
        *self.state.lock().unwrap().calls.entry(name).or_default() += 1;
    }

    /// Queues polling results.
    pub fn script_poll(
        &self,
        responses: impl IntoIterator<Item = Result<PollingResponse, NetworkError>>,
    ) {
        self.state.lock().unwrap().poll_script.extend(responses);
    }

    /// Fails the next tokenization with `error`.
    pub fn fail_tokenize(&self, error: NetworkError) {
        self.state.lock().unwrap().tokenize_error = Some(error);
    }

    /// Response of the next payment creation.
    pub fn set_create_payment(&self, payment: Payment) {
        self.state.lock().unwrap().create_payment = Some(payment);
    }

    /// Number of calls to `name`.
    pub fn calls(&self, name: &str) -> usize {
        self.state.lock().unwrap().calls.get(name).copied().unwrap_or(0)
    }

    /// Number of calls to any endpoint.
    pub fn total_calls(&self) -> usize {
        self.state.lock().unwrap().calls.values().sum()
    }

    /// JSON body of the last tokenization.
    pub fn last_tokenize_body(&self) -> Option<Value> {
        self.state.lock().unwrap().last_tokenize_body.clone()
    }

    /// Resume token of the last resumption.
    pub fn last_resume_token(&self) -> Option<String> {
        self.state.lock().unwrap().last_resume_token.clone()
    }
}

fn ready<'a, T: Send + 'a>(value: T) -> ApiResult<'a, T> {
    Box::pin(async move { Ok(value) })
}

fn token_data(token: &str, instrument_type: &str) -> PaymentMethodTokenData {
    PaymentMethodTokenData {
        id: None,
        token: token.into(),
        token_type: Some(TokenType::SingleUse),
        analytics_id: None,
        payment_instrument_type: instrument_type.into(),
        payment_method_type: None,
        payment_instrument_data: None,
        three_d_secure_authentication: None,
        vault_data: None,
        is_vaulted: None,
    }
}

impl PrimerApi for FakeApi {
    fn fetch_configuration<'a>(
        &'a self,
        _: &'a DecodedClientToken,
    ) -> ApiResult<'a, ApiConfiguration> {
        self.record("fetch_configuration");
        ready(configuration())
    }

    fn tokenize<'a>(
        &'a self,
        _: &'a DecodedClientToken,
        body: &'a TokenizationRequestBody,
    ) -> ApiResult<'a, PaymentMethodTokenData> {
        self.record("tokenize");
        let mut state = self.state.lock().unwrap();
        state.last_tokenize_body = Some(serde_json::to_value(body).unwrap());
        let result = match state.tokenize_error.take() {
            Some(err) => Err(err),
            None => Ok(token_data("tok-1", "OFF_SESSION_PAYMENT")),
        };
        Box::pin(async move { result })
    }

    fn exchange_payment_method_token<'a>(
        &'a self,
        _: &'a DecodedClientToken,
        _: &'a str,
        _: Option<&'a VaultedCardAdditionalData>,
    ) -> ApiResult<'a, PaymentMethodTokenData> {
        self.record("exchange_payment_method_token");
        ready(token_data("tok-vaulted", "PAYMENT_CARD"))
    }

    fn fetch_vaulted_payment_methods<'a>(
        &'a self,
        _: &'a DecodedClientToken,
    ) -> ApiResult<'a, VaultedPaymentMethods> {
        self.record("fetch_vaulted_payment_methods");
        ready(VaultedPaymentMethods {
            data: vec![vaulted_card()],
        })
    }

    fn client_session_actions<'a>(
        &'a self,
        _: &'a DecodedClientToken,
        _: &'a ClientSessionActionsRequest,
    ) -> ApiResult<'a, ApiConfiguration> {
        self.record("client_session_actions");
        ready(configuration())
    }

    fn create_payment<'a>(
        &'a self,
        _: &'a DecodedClientToken,
        _: &'a CreatePaymentRequest,
    ) -> ApiResult<'a, Payment> {
        self.record("create_payment");
        let scripted = self.state.lock().unwrap().create_payment.take();
        ready(scripted.unwrap_or_else(|| payment("pay-1", PaymentStatus::Settled)))
    }

    fn resume_payment<'a>(
        &'a self,
        _: &'a DecodedClientToken,
        payment_id: &'a str,
        request: &'a ResumePaymentRequest,
    ) -> ApiResult<'a, Payment> {
        self.record("resume_payment");
        self.state.lock().unwrap().last_resume_token = Some(request.resume_token.clone());
        ready(payment(payment_id, PaymentStatus::Settled))
    }

    fn poll<'a>(&'a self, _: &'a DecodedClientToken, _: &'a Url) -> ApiResult<'a, PollingResponse> {
        self.record("poll");
        let next = self
            .state
            .lock()
            .unwrap()
            .poll_script
            .pop_front()
            .unwrap_or_else(|| Ok(PollingResponse::complete("resume-default")));
        Box::pin(async move {
            tokio::task::yield_now().await;
            next
        })
    }

    fn create_paypal_order<'a>(
        &'a self,
        _: &'a DecodedClientToken,
        _: &'a CreateOrderRequest,
    ) -> ApiResult<'a, CreateOrderResponse> {
        self.record("create_paypal_order");
        ready(CreateOrderResponse {
            order_id: "order-1".into(),
            approval_url: "https://paypal.example.com/approve?token=EC-1".into(),
        })
    }

    fn create_paypal_billing_agreement<'a>(
        &'a self,
        _: &'a DecodedClientToken,
        _: &'a CreateBillingAgreementRequest,
    ) -> ApiResult<'a, CreateBillingAgreementResponse> {
        self.record("create_paypal_billing_agreement");
        ready(CreateBillingAgreementResponse {
            token_id: "BA-token-1".into(),
            approval_url: "https://paypal.example.com/agreement?ba_token=BA-token-1".into(),
        })
    }

    fn confirm_paypal_billing_agreement<'a>(
        &'a self,
        _: &'a DecodedClientToken,
        _: &'a ConfirmBillingAgreementRequest,
    ) -> ApiResult<'a, ConfirmBillingAgreementResponse> {
        self.record("confirm_paypal_billing_agreement");
        ready(ConfirmBillingAgreementResponse {
            billing_agreement_id: "B-1".into(),
            external_payer_info: payer(),
            shipping_address: None,
        })
    }

    fn fetch_paypal_payer_info<'a>(
        &'a self,
        _: &'a DecodedClientToken,
        request: &'a PayerInfoRequest,
    ) -> ApiResult<'a, PayerInfoResponse> {
        self.record("fetch_paypal_payer_info");
        ready(PayerInfoResponse {
            order_id: request.order_id.clone(),
            external_payer_info: payer(),
        })
    }

    fn create_klarna_payment_session<'a>(
        &'a self,
        _: &'a DecodedClientToken,
        _: &'a CreatePaymentSessionRequest,
    ) -> ApiResult<'a, CreatePaymentSessionResponse> {
        self.record("create_klarna_payment_session");
        ready(CreatePaymentSessionResponse {
            client_token: "klarna-client-token".into(),
            session_id: "klarna-session-1".into(),
            categories: Vec::new(),
            hpp_session_id: None,
            hpp_redirect_url: None,
        })
    }

    fn create_klarna_customer_token<'a>(
        &'a self,
        _: &'a DecodedClientToken,
        _: &'a CreateCustomerTokenRequest,
    ) -> ApiResult<'a, CustomerTokenResponse> {
        self.record("create_klarna_customer_token");
        ready(klarna_customer_token())
    }

    fn finalize_klarna_payment_session<'a>(
        &'a self,
        _: &'a DecodedClientToken,
        _: &'a FinalizePaymentSessionRequest,
    ) -> ApiResult<'a, CustomerTokenResponse> {
        self.record("finalize_klarna_payment_session");
        ready(klarna_customer_token())
    }

    fn list_banks<'a>(
        &'a self,
        _: &'a DecodedClientToken,
        _: &'a BankListRequest,
    ) -> ApiResult<'a, BankListResponse> {
        self.record("list_banks");
        let bank = |id: &str, name: &str, disabled: bool| Bank {
            id: id.into(),
            name: name.into(),
            icon_url: None,
            disabled,
        };
        ready(BankListResponse {
            result: vec![
                bank("ing", "ING", false),
                bank("rabobank", "Rabobank", false),
                bank("closed", "Closed Bank", true),
            ],
        })
    }

    fn create_apaya_session<'a>(
        &'a self,
        _: &'a DecodedClientToken,
        _: &'a ApayaSessionRequest,
    ) -> ApiResult<'a, ApayaSessionResponse> {
        self.record("create_apaya_session");
        ready(ApayaSessionResponse {
            url: "https://apaya.example.com/session?token=apaya-1".into(),
            token: Some("apaya-1".into()),
            passthrough_variable: None,
        })
    }
}

fn payer() -> PayerInfo {
    PayerInfo {
        external_payer_id: Some("payer-1".into()),
        email: Some("payer@example.com".into()),
        first_name: Some("Ada".into()),
        last_name: Some("Lovelace".into()),
    }
}

fn klarna_customer_token() -> CustomerTokenResponse {
    CustomerTokenResponse {
        customer_token_id: Some("klarna-customer-1".into()),
        session_data: Some(json!({"recurringDescription": "Subscription"})),
    }
}

/// Presenter answering from a script; it never resolves once the script is empty.
#[derive(Default)]
pub struct ScriptedPresenter {
    script: Mutex<VecDeque<UserInput>>,
}

impl ScriptedPresenter {
    /// Answers presentations with `inputs` in order.
    pub fn new(inputs: impl IntoIterator<Item = UserInput>) -> Self {
        Self {
            script: Mutex::new(inputs.into_iter().collect()),
        }
    }

    /// A presenter that never answers.
    pub fn pending() -> Self {
        Self::default()
    }
}

impl Presenter for ScriptedPresenter {
    fn present(
        &self,
        _presentation: Presentation,
    ) -> BoxFuture<'_, Result<UserInput, PrimerError>> {
        let next = self.script.lock().unwrap().pop_front();
        Box::pin(async move {
            match next {
                Some(input) => Ok(input),
                None => std::future::pending().await,
            }
        })
    }
}

fn payment_method_configs() -> Vec<PaymentMethodConfiguration> {
    let mut configs: Vec<_> = NATIVE_TYPES
        .iter()
        .map(|t| PaymentMethodConfiguration::new(format!("cfg-{t}"), *t))
        .collect();

    let mut apaya = PaymentMethodConfiguration::new("cfg-APAYA", "APAYA");
    apaya.options = Some(Map::from_iter([(
        "merchantAccountId".to_owned(),
        Value::from("apaya-merchant"),
    )]));
    configs.push(apaya);

    configs.push(PaymentMethodConfiguration {
        implementation_type: ImplementationType::WebRedirect,
        ..PaymentMethodConfiguration::new("cfg-ADYEN_GIROPAY", "ADYEN_GIROPAY")
    });
    configs
}

fn line_item() -> LineItem {
    LineItem {
        item_id: Some("shoes-1".into()),
        description: Some("Running shoes".into()),
        amount: Some(1000),
        quantity: Some(1),
        discount_amount: None,
    }
}

fn configuration_with_items(line_items: Vec<LineItem>) -> ApiConfiguration {
    ApiConfiguration {
        client_session: Some(ClientSession {
            client_session_id: Some("cs-1".into()),
            order: Some(Order {
                country_code: Some("NL".into()),
                currency_code: Some("EUR".into()),
                merchant_amount: None,
                total_order_amount: Some(1000),
                line_items,
            }),
            customer: Some(Customer {
                email_address: Some("customer@example.com".into()),
                mobile_number: Some("+31612345678".into()),
                ..Default::default()
            }),
            payment_method: None,
        }),
        payment_methods: payment_method_configs(),
        ..Default::default()
    }
}

/// Remote configuration listing every supported method with id `cfg-{TYPE}`.
pub fn configuration() -> ApiConfiguration {
    configuration_with_items(vec![line_item()])
}

/// Settings used by the session fixtures: URL scheme, Apple Pay and no poll delay.
pub fn settings() -> PrimerSettings {
    let mut settings = PrimerSettings::default()
        .with_url_scheme("merchant://")
        .with_polling(PollingConfig::default().with_interval(Duration::ZERO));
    settings.apple_pay.merchant_identifier = Some("merchant.com.example".into());
    settings.apple_pay.merchant_name = Some("Example Shop".into());
    settings
}

/// Configured session for `intent` with custom settings.
pub fn session_with(intent: Intent, settings: PrimerSettings) -> SessionContext {
    SessionContext::new(FakeApi::client_token(), settings, intent)
        .with_configuration(configuration())
}

/// Checkout session: EUR 10.00 in NL with one line item.
pub fn checkout_session() -> SessionContext {
    session_with(Intent::Checkout, settings())
}

/// Checkout session with the given line items.
pub fn checkout_session_with_items(line_items: Vec<LineItem>) -> SessionContext {
    SessionContext::new(FakeApi::client_token(), settings(), Intent::Checkout)
        .with_configuration(configuration_with_items(line_items))
}

/// Vault session.
pub fn vault_session() -> SessionContext {
    session_with(Intent::Vault, settings())
}

/// Session whose client token expired long ago.
pub fn expired_session() -> SessionContext {
    let mut token = FakeApi::client_token();
    token.exp = Some(UnixTimestamp::from_secs(1));
    SessionContext::new(token, settings(), Intent::Vault).with_configuration(configuration())
}

/// Client token of a required action, with redirect and status URLs.
pub fn required_action_token() -> DecodedClientToken {
    DecodedClientToken {
        access_token: Some("access-action".into()),
        exp: Some(UnixTimestamp::from_secs(UnixTimestamp::now().as_secs() + 3600)),
        intent: Some("CHECKOUT".into()),
        redirect_url: Some("https://bank.example.com/pay?ref=1".into()),
        status_url: Some("https://pci.example.com/resume-tokens/1".into()),
        ..Default::default()
    }
}

/// Payment with `status` and no required action.
pub fn payment(id: &str, status: PaymentStatus) -> Payment {
    Payment {
        id: id.into(),
        order_id: Some("order-42".into()),
        status,
        required_action: None,
        status_reason: None,
        amount: Some(1000),
        currency_code: Some("EUR".into()),
    }
}

/// Pending payment whose required action carries `action_token`.
pub fn pending_payment(id: &str, action_token: &DecodedClientToken) -> Payment {
    Payment {
        required_action: Some(RequiredAction {
            name: "USE_PRIMER_SDK".into(),
            description: None,
            client_token: encode_unsigned(action_token).unwrap(),
        }),
        ..payment(id, PaymentStatus::Pending)
    }
}

/// A vaulted Visa card.
pub fn vaulted_card() -> PaymentMethodTokenData {
    PaymentMethodTokenData {
        id: Some("pm-1".into()),
        token_type: Some(TokenType::MultiUse),
        payment_method_type: Some("PAYMENT_CARD".into()),
        is_vaulted: Some(true),
        ..token_data("vaulted-1", "PAYMENT_CARD")
    }
}
