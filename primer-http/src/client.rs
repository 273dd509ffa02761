//! A [`PrimerApi`] implementation that talks to the Primer backend over HTTP.
//!
//! Every request carries the client token's access token, the API version
//! and the SDK version. Base URLs come from the client token: PCI calls go
//! to `pciUrl`, everything else to `coreUrl`. The configuration and status
//! URLs are used as-is.
//!
//! ## Error Handling
//!
//! Failures map onto [`NetworkError`]:
//! - a missing or malformed base URL gives `InvalidUrl`
//! - an elapsed timeout gives `Timeout`, other transport failures `Transport`
//! - any non-2xx status gives `HttpStatus` with the response body
//! - an undecodable 2xx body gives `Decode`

use std::fmt::Display;
use std::time::Duration;

use http::header::{CONTENT_TYPE, HeaderValue};
use http::HeaderMap;
use primer::api::{ApiResult, PrimerApi};
use primer::error::NetworkError;
use primer::proto::apaya::{ApayaSessionRequest, ApayaSessionResponse};
use primer::proto::banks::{BankListRequest, BankListResponse};
use primer::proto::klarna::{
    CreateCustomerTokenRequest, CreatePaymentSessionRequest, CreatePaymentSessionResponse,
    CustomerTokenResponse, FinalizePaymentSessionRequest,
};
use primer::proto::paypal::{
    ConfirmBillingAgreementRequest, ConfirmBillingAgreementResponse, CreateBillingAgreementRequest,
    CreateBillingAgreementResponse, CreateOrderRequest, CreateOrderResponse, PayerInfoRequest,
    PayerInfoResponse,
};
use primer::proto::token_data::VaultedPaymentMethods;
use primer::proto::{
    ApiConfiguration, ClientSessionActionsRequest, CreatePaymentRequest, Payment,
    PaymentMethodTokenData, PollingResponse, ResumePaymentRequest, TokenizationRequestBody,
    VaultedCardAdditionalData,
};
use primer::token::DecodedClientToken;
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

#[cfg(feature = "telemetry")]
use tracing::{Span, instrument};

use crate::constants::{
    API_VERSION_HEADER, CLIENT_TOKEN_HEADER, DEFAULT_API_VERSION, SDK_VERSION, SDK_VERSION_HEADER,
};

/// Which base URL of the client token an endpoint lives under.
#[derive(Debug, Clone, Copy)]
enum Base {
    Pci,
    Core,
}

impl Base {
    fn url(self, client_token: &DecodedClientToken) -> Option<&str> {
        match self {
            Self::Pci => client_token.pci_url.as_deref(),
            Self::Core => client_token.core_url.as_deref(),
        }
    }
}

/// A client for the Primer backend REST API.
#[derive(Clone, Debug)]
pub struct HttpPrimerApi {
    /// Shared Reqwest HTTP client
    client: Client,
    /// Extra headers sent with each request
    headers: HeaderMap,
    /// Optional per-request timeout
    timeout: Option<Duration>,
    /// Value of the `X-Api-Version` header
    api_version: String,
}

impl Default for HttpPrimerApi {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpPrimerApi {
    /// Creates a client with a fresh `reqwest` client and no timeout.
    #[must_use]
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    /// Creates a client reusing an existing `reqwest` client.
    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            headers: HeaderMap::new(),
            timeout: None,
            api_version: DEFAULT_API_VERSION.to_owned(),
        }
    }

    /// Attaches custom headers to all future requests.
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Sets a timeout for all future requests.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Overrides the API version header.
    #[must_use]
    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    /// Returns the configured timeout, if any.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Returns the API version sent with each request.
    #[must_use]
    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    fn authorize(
        &self,
        mut req: RequestBuilder,
        client_token: &DecodedClientToken,
    ) -> RequestBuilder {
        for (key, value) in &self.headers {
            req = req.header(key, value);
        }
        if let Some(access_token) = client_token.access_token.as_deref() {
            req = req.header(CLIENT_TOKEN_HEADER, access_token);
        }
        req = req
            .header(API_VERSION_HEADER, &self.api_version)
            .header(SDK_VERSION_HEADER, SDK_VERSION)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(timeout) = self.timeout {
            req = req.timeout(timeout);
        }
        req
    }

    async fn get_json<R>(
        &self,
        client_token: &DecodedClientToken,
        url: Url,
        context: &'static str,
    ) -> Result<R, NetworkError>
    where
        R: DeserializeOwned,
    {
        let req = self.authorize(self.client.get(url), client_token);
        self.send(req, context).await
    }

    async fn post_json<T, R>(
        &self,
        client_token: &DecodedClientToken,
        url: Url,
        context: &'static str,
        payload: &T,
    ) -> Result<R, NetworkError>
    where
        T: Serialize + Sync + ?Sized,
        R: DeserializeOwned,
    {
        let req = self.authorize(self.client.post(url).json(payload), client_token);
        self.send(req, context).await
    }

    /// Sends `req` and decodes a 2xx JSON body.
    ///
    /// `context` names the request in errors and spans (e.g. `"POST /payments"`).
    #[cfg_attr(
        feature = "telemetry",
        instrument(
            name = "primer.http.request",
            skip_all,
            fields(
                context = context,
                otel.status_code = tracing::field::Empty,
                error.message = tracing::field::Empty
            )
        )
    )]
    async fn send<R>(&self, req: RequestBuilder, context: &'static str) -> Result<R, NetworkError>
    where
        R: DeserializeOwned,
    {
        let result = async {
            let response = req.send().await.map_err(|e| transport_error(context, e))?;
            let status = response.status();
            let body = response.bytes().await.map_err(|e| transport_error(context, e))?;
            if !status.is_success() {
                return Err(NetworkError::HttpStatus {
                    context,
                    status: status.as_u16(),
                    body: String::from_utf8_lossy(&body).into_owned(),
                });
            }
            serde_json::from_slice::<R>(&body).map_err(|e| NetworkError::Decode {
                context,
                source: Box::new(e),
            })
        }
        .await;

        record_result_on_span(&result);

        result
    }
}

/// Builds `{base}/{segments...}` from one of the client token's base URLs.
fn endpoint(
    client_token: &DecodedClientToken,
    base: Base,
    context: &'static str,
    segments: &[&str],
) -> Result<Url, NetworkError> {
    let mut url = parse(base.url(client_token), context)?;
    url.path_segments_mut()
        .map_err(|()| NetworkError::InvalidUrl {
            context,
            source: url::ParseError::RelativeUrlWithoutBase,
        })?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn parse(value: Option<&str>, context: &'static str) -> Result<Url, NetworkError> {
    Url::parse(value.unwrap_or_default())
        .map_err(|source| NetworkError::InvalidUrl { context, source })
}

fn transport_error(context: &'static str, err: reqwest::Error) -> NetworkError {
    if err.is_timeout() {
        NetworkError::Timeout { context }
    } else {
        NetworkError::Transport {
            context,
            source: Box::new(err),
        }
    }
}

impl PrimerApi for HttpPrimerApi {
    fn fetch_configuration<'a>(
        &'a self,
        client_token: &'a DecodedClientToken,
    ) -> ApiResult<'a, ApiConfiguration> {
        Box::pin(async move {
            let context = "GET configuration";
            let url = parse(client_token.configuration_url.as_deref(), context)?;
            self.get_json(client_token, url, context).await
        })
    }

    fn tokenize<'a>(
        &'a self,
        client_token: &'a DecodedClientToken,
        body: &'a TokenizationRequestBody,
    ) -> ApiResult<'a, PaymentMethodTokenData> {
        Box::pin(async move {
            let context = "POST /payment-instruments";
            let url = endpoint(client_token, Base::Pci, context, &["payment-instruments"])?;
            self.post_json(client_token, url, context, body).await
        })
    }

    fn exchange_payment_method_token<'a>(
        &'a self,
        client_token: &'a DecodedClientToken,
        payment_method_id: &'a str,
        additional_data: Option<&'a VaultedCardAdditionalData>,
    ) -> ApiResult<'a, PaymentMethodTokenData> {
        Box::pin(async move {
            let context = "POST /payment-instruments/{id}/exchange";
            let url = endpoint(
                client_token,
                Base::Pci,
                context,
                &["payment-instruments", payment_method_id, "exchange"],
            )?;
            match additional_data {
                Some(data) => self.post_json(client_token, url, context, data).await,
                None => {
                    self.post_json(client_token, url, context, &serde_json::Map::new())
                        .await
                }
            }
        })
    }

    fn fetch_vaulted_payment_methods<'a>(
        &'a self,
        client_token: &'a DecodedClientToken,
    ) -> ApiResult<'a, VaultedPaymentMethods> {
        Box::pin(async move {
            let context = "GET /payment-instruments";
            let url = endpoint(client_token, Base::Pci, context, &["payment-instruments"])?;
            self.get_json(client_token, url, context).await
        })
    }

    fn client_session_actions<'a>(
        &'a self,
        client_token: &'a DecodedClientToken,
        request: &'a ClientSessionActionsRequest,
    ) -> ApiResult<'a, ApiConfiguration> {
        Box::pin(async move {
            let context = "POST /client-session/actions";
            let url = endpoint(client_token, Base::Pci, context, &["client-session", "actions"])?;
            self.post_json(client_token, url, context, request).await
        })
    }

    fn create_payment<'a>(
        &'a self,
        client_token: &'a DecodedClientToken,
        request: &'a CreatePaymentRequest,
    ) -> ApiResult<'a, Payment> {
        Box::pin(async move {
            let context = "POST /payments";
            let url = endpoint(client_token, Base::Pci, context, &["payments"])?;
            self.post_json(client_token, url, context, request).await
        })
    }

    fn resume_payment<'a>(
        &'a self,
        client_token: &'a DecodedClientToken,
        payment_id: &'a str,
        request: &'a ResumePaymentRequest,
    ) -> ApiResult<'a, Payment> {
        Box::pin(async move {
            let context = "POST /payments/{id}/resume";
            let url = endpoint(
                client_token,
                Base::Pci,
                context,
                &["payments", payment_id, "resume"],
            )?;
            self.post_json(client_token, url, context, request).await
        })
    }

    fn poll<'a>(
        &'a self,
        client_token: &'a DecodedClientToken,
        url: &'a Url,
    ) -> ApiResult<'a, PollingResponse> {
        Box::pin(self.get_json(client_token, url.clone(), "GET status"))
    }

    fn create_paypal_order<'a>(
        &'a self,
        client_token: &'a DecodedClientToken,
        request: &'a CreateOrderRequest,
    ) -> ApiResult<'a, CreateOrderResponse> {
        Box::pin(async move {
            let context = "POST /paypal/orders/create";
            let url = endpoint(client_token, Base::Core, context, &["paypal", "orders", "create"])?;
            self.post_json(client_token, url, context, request).await
        })
    }

    fn create_paypal_billing_agreement<'a>(
        &'a self,
        client_token: &'a DecodedClientToken,
        request: &'a CreateBillingAgreementRequest,
    ) -> ApiResult<'a, CreateBillingAgreementResponse> {
        Box::pin(async move {
            let context = "POST /paypal/billing-agreements/create-agreement";
            let url = endpoint(
                client_token,
                Base::Core,
                context,
                &["paypal", "billing-agreements", "create-agreement"],
            )?;
            self.post_json(client_token, url, context, request).await
        })
    }

    fn confirm_paypal_billing_agreement<'a>(
        &'a self,
        client_token: &'a DecodedClientToken,
        request: &'a ConfirmBillingAgreementRequest,
    ) -> ApiResult<'a, ConfirmBillingAgreementResponse> {
        Box::pin(async move {
            let context = "POST /paypal/billing-agreements/confirm-agreement";
            let url = endpoint(
                client_token,
                Base::Core,
                context,
                &["paypal", "billing-agreements", "confirm-agreement"],
            )?;
            self.post_json(client_token, url, context, request).await
        })
    }

    fn fetch_paypal_payer_info<'a>(
        &'a self,
        client_token: &'a DecodedClientToken,
        request: &'a PayerInfoRequest,
    ) -> ApiResult<'a, PayerInfoResponse> {
        Box::pin(async move {
            let context = "POST /paypal/orders";
            let url = endpoint(client_token, Base::Core, context, &["paypal", "orders"])?;
            self.post_json(client_token, url, context, request).await
        })
    }

    fn create_klarna_payment_session<'a>(
        &'a self,
        client_token: &'a DecodedClientToken,
        request: &'a CreatePaymentSessionRequest,
    ) -> ApiResult<'a, CreatePaymentSessionResponse> {
        Box::pin(async move {
            let context = "POST /klarna/payment-sessions";
            let url = endpoint(client_token, Base::Core, context, &["klarna", "payment-sessions"])?;
            self.post_json(client_token, url, context, request).await
        })
    }

    fn create_klarna_customer_token<'a>(
        &'a self,
        client_token: &'a DecodedClientToken,
        request: &'a CreateCustomerTokenRequest,
    ) -> ApiResult<'a, CustomerTokenResponse> {
        Box::pin(async move {
            let context = "POST /klarna/customer-tokens";
            let url = endpoint(client_token, Base::Core, context, &["klarna", "customer-tokens"])?;
            self.post_json(client_token, url, context, request).await
        })
    }

    fn finalize_klarna_payment_session<'a>(
        &'a self,
        client_token: &'a DecodedClientToken,
        request: &'a FinalizePaymentSessionRequest,
    ) -> ApiResult<'a, CustomerTokenResponse> {
        Box::pin(async move {
            let context = "POST /klarna/payment-sessions/finalize";
            let url = endpoint(
                client_token,
                Base::Core,
                context,
                &["klarna", "payment-sessions", "finalize"],
            )?;
            self.post_json(client_token, url, context, request).await
        })
    }

    fn list_banks<'a>(
        &'a self,
        client_token: &'a DecodedClientToken,
        request: &'a BankListRequest,
    ) -> ApiResult<'a, BankListResponse> {
        Box::pin(async move {
            let context = "POST /adyen/checkout";
            let url = endpoint(client_token, Base::Core, context, &["adyen", "checkout"])?;
            self.post_json(client_token, url, context, request).await
        })
    }

    fn create_apaya_session<'a>(
        &'a self,
        client_token: &'a DecodedClientToken,
        request: &'a ApayaSessionRequest,
    ) -> ApiResult<'a, ApayaSessionResponse> {
        Box::pin(async move {
            let context = "POST /session-token";
            let url = endpoint(client_token, Base::Core, context, &["session-token"])?;
            self.post_json(client_token, url, context, request).await
        })
    }
}

/// Records the outcome of a request on the current span.
#[cfg(feature = "telemetry")]
fn record_result_on_span<R, E: Display>(result: &Result<R, E>) {
    let span = Span::current();
    match result {
        Ok(_) => {
            span.record("otel.status_code", "OK");
        }
        Err(err) => {
            span.record("otel.status_code", "ERROR");
            span.record("error.message", tracing::field::display(err));
            tracing::event!(tracing::Level::ERROR, error = %err, "Request to Primer failed");
        }
    }
}

/// Noop if telemetry feature is off.
#[cfg(not(feature = "telemetry"))]
fn record_result_on_span<R, E: Display>(_result: &Result<R, E>) {}

#[cfg(test)]
mod tests {
    use super::*;
    use primer::proto::{PaymentInstrument, PollingStatus};
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn token_for(server: &MockServer) -> DecodedClientToken {
        DecodedClientToken {
            access_token: Some("access-1".into()),
            pci_url: Some(format!("{}/pci", server.uri())),
            core_url: Some(server.uri()),
            configuration_url: Some(format!("{}/client-sdk/configuration", server.uri())),
            ..Default::default()
        }
    }

    fn token_data_json() -> serde_json::Value {
        json!({
            "token": "tok-1",
            "tokenType": "SINGLE_USE",
            "paymentInstrumentType": "OFF_SESSION_PAYMENT"
        })
    }

    #[tokio::test]
    async fn test_tokenize_sends_headers_and_body() {
        let server = MockServer::start().await;
        let raw = json!({"giftCardNumber": "6006"});
        Mock::given(method("POST"))
            .and(path("/pci/payment-instruments"))
            .and(header(CLIENT_TOKEN_HEADER, "access-1"))
            .and(header(API_VERSION_HEADER, "2.3"))
            .and(header(SDK_VERSION_HEADER, SDK_VERSION))
            .and(body_json(json!({"paymentInstrument": raw})))
            .respond_with(ResponseTemplate::new(201).set_body_json(token_data_json()))
            .expect(1)
            .mount(&server)
            .await;

        let body = TokenizationRequestBody {
            payment_instrument: PaymentInstrument::Raw(raw.clone()),
        };
        let token_data = HttpPrimerApi::new()
            .tokenize(&token_for(&server), &body)
            .await
            .unwrap();
        assert_eq!(token_data.token, "tok-1");
    }

    #[tokio::test]
    async fn test_non_success_status_keeps_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/pci/payments"))
            .respond_with(ResponseTemplate::new(422).set_body_string("invalid token"))
            .mount(&server)
            .await;

        let request = CreatePaymentRequest {
            payment_method_token: "tok-1".into(),
        };
        let err = HttpPrimerApi::new()
            .create_payment(&token_for(&server), &request)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            NetworkError::HttpStatus { status: 422, ref body, .. } if body == "invalid token"
        ));
    }

    #[tokio::test]
    async fn test_undecodable_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/client-sdk/configuration"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = HttpPrimerApi::new()
            .fetch_configuration(&token_for(&server))
            .await
            .unwrap_err();
        assert!(matches!(err, NetworkError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_path_parameters_are_escaped() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/pci/payment-instruments/pm%2F1/exchange"))
            .and(body_json(json!({})))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_data_json()))
            .expect(1)
            .mount(&server)
            .await;

        HttpPrimerApi::new()
            .exchange_payment_method_token(&token_for(&server), "pm/1", None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_core_endpoints_use_core_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/paypal/orders/create"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({
                    "orderId": "order-1",
                    "approvalUrl": "https://paypal.example/a"
                })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let request = CreateOrderRequest {
            payment_method_config_id: "cfg-1".into(),
            amount: 1000,
            currency_code: "EUR".into(),
            return_url: "merchant://paypal-success".into(),
            cancel_url: "merchant://paypal-cancel".into(),
        };
        let order = HttpPrimerApi::new()
            .create_paypal_order(&token_for(&server), &request)
            .await
            .unwrap();
        assert_eq!(order.order_id, "order-1");
    }

    #[tokio::test]
    async fn test_poll_uses_status_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/resume-tokens/1"))
            .and(header(CLIENT_TOKEN_HEADER, "access-1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"status": "COMPLETE", "id": "resume-1"})),
            )
            .mount(&server)
            .await;

        let status_url = Url::parse(&format!("{}/resume-tokens/1", server.uri())).unwrap();
        let response = HttpPrimerApi::new()
            .poll(&token_for(&server), &status_url)
            .await
            .unwrap();
        assert_eq!(response.status, PollingStatus::Complete);
        assert_eq!(response.id, "resume-1");
    }

    #[tokio::test]
    async fn test_missing_base_url() {
        let token = DecodedClientToken {
            access_token: Some("access-1".into()),
            ..Default::default()
        };
        let err = HttpPrimerApi::new()
            .fetch_vaulted_payment_methods(&token)
            .await
            .unwrap_err();
        assert!(matches!(err, NetworkError::InvalidUrl { .. }));
    }

    #[tokio::test]
    async fn test_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pci/payment-instruments"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"data": []}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let err = HttpPrimerApi::new()
            .with_timeout(Duration::from_millis(50))
            .fetch_vaulted_payment_methods(&token_for(&server))
            .await
            .unwrap_err();
        assert!(matches!(err, NetworkError::Timeout { .. }));
        assert!(err.is_transient(false));
    }

    #[tokio::test]
    async fn test_api_version_override() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pci/payment-instruments"))
            .and(header(API_VERSION_HEADER, "2.4"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .expect(1)
            .mount(&server)
            .await;

        let api = HttpPrimerApi::new().with_api_version("2.4");
        assert_eq!(api.api_version(), "2.4");
        let vaulted = api.fetch_vaulted_payment_methods(&token_for(&server)).await.unwrap();
        assert!(vaulted.data.is_empty());
    }
}
