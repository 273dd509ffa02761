//! Transport abstraction over the Primer REST API.
//!
//! [`PrimerApi`] lists every backend call the checkout makes. The core only
//! depends on this trait; `primer-http` provides the `reqwest` implementation
//! and tests use a scripted fake.
//!
//! Base URLs are taken from the [`DecodedClientToken`] passed to each call.
//! Every request authenticates with the token's access token.

pub use futures_util::future::BoxFuture;
use url::Url;

use crate::error::NetworkError;
use crate::proto::apaya::{ApayaSessionRequest, ApayaSessionResponse};
use crate::proto::banks::{BankListRequest, BankListResponse};
use crate::proto::klarna::{
    CreateCustomerTokenRequest, CreatePaymentSessionRequest, CreatePaymentSessionResponse,
    CustomerTokenResponse, FinalizePaymentSessionRequest,
};
use crate::proto::paypal::{
    ConfirmBillingAgreementRequest, ConfirmBillingAgreementResponse, CreateBillingAgreementRequest,
    CreateBillingAgreementResponse, CreateOrderRequest, CreateOrderResponse, PayerInfoRequest,
    PayerInfoResponse,
};
use crate::proto::token_data::VaultedPaymentMethods;
use crate::proto::{
    ApiConfiguration, ClientSessionActionsRequest, CreatePaymentRequest, Payment,
    PaymentMethodTokenData, PollingResponse, ResumePaymentRequest, TokenizationRequestBody,
    VaultedCardAdditionalData,
};
use crate::token::DecodedClientToken;

/// Result of a [`PrimerApi`] call.
pub type ApiResult<'a, T> = BoxFuture<'a, Result<T, NetworkError>>;

/// Primer backend calls.
///
/// The trait is dyn-compatible so a checkout can hold an
/// `Arc<dyn PrimerApi>` chosen at runtime.
pub trait PrimerApi: Send + Sync {
    /// `GET {configurationUrl}`.
    fn fetch_configuration<'a>(
        &'a self,
        client_token: &'a DecodedClientToken,
    ) -> ApiResult<'a, ApiConfiguration>;

    /// `POST {pciUrl}/payment-instruments`.
    fn tokenize<'a>(
        &'a self,
        client_token: &'a DecodedClientToken,
        body: &'a TokenizationRequestBody,
    ) -> ApiResult<'a, PaymentMethodTokenData>;

    /// `POST {pciUrl}/payment-instruments/{id}/exchange`.
    fn exchange_payment_method_token<'a>(
        &'a self,
        client_token: &'a DecodedClientToken,
        payment_method_id: &'a str,
        additional_data: Option<&'a VaultedCardAdditionalData>,
    ) -> ApiResult<'a, PaymentMethodTokenData>;

    /// `GET {pciUrl}/payment-instruments`.
    fn fetch_vaulted_payment_methods<'a>(
        &'a self,
        client_token: &'a DecodedClientToken,
    ) -> ApiResult<'a, VaultedPaymentMethods>;

    /// `POST {pciUrl}/client-session/actions`.
    fn client_session_actions<'a>(
        &'a self,
        client_token: &'a DecodedClientToken,
        request: &'a ClientSessionActionsRequest,
    ) -> ApiResult<'a, ApiConfiguration>;

    /// `POST {pciUrl}/payments`.
    fn create_payment<'a>(
        &'a self,
        client_token: &'a DecodedClientToken,
        request: &'a CreatePaymentRequest,
    ) -> ApiResult<'a, Payment>;

    /// `POST {pciUrl}/payments/{id}/resume`.
    fn resume_payment<'a>(
        &'a self,
        client_token: &'a DecodedClientToken,
        payment_id: &'a str,
        request: &'a ResumePaymentRequest,
    ) -> ApiResult<'a, Payment>;

    /// `GET {url}` on a status URL.
    fn poll<'a>(
        &'a self,
        client_token: &'a DecodedClientToken,
        url: &'a Url,
    ) -> ApiResult<'a, PollingResponse>;

    /// `POST {coreUrl}/paypal/orders/create`.
    fn create_paypal_order<'a>(
        &'a self,
        client_token: &'a DecodedClientToken,
        request: &'a CreateOrderRequest,
    ) -> ApiResult<'a, CreateOrderResponse>;

    /// `POST {coreUrl}/paypal/billing-agreements/create-agreement`.
    fn create_paypal_billing_agreement<'a>(
        &'a self,
        client_token: &'a DecodedClientToken,
        request: &'a CreateBillingAgreementRequest,
    ) -> ApiResult<'a, CreateBillingAgreementResponse>;

    /// `POST {coreUrl}/paypal/billing-agreements/confirm-agreement`.
    fn confirm_paypal_billing_agreement<'a>(
        &'a self,
        client_token: &'a DecodedClientToken,
        request: &'a ConfirmBillingAgreementRequest,
    ) -> ApiResult<'a, ConfirmBillingAgreementResponse>;

    /// `POST {coreUrl}/paypal/orders`.
    fn fetch_paypal_payer_info<'a>(
        &'a self,
        client_token: &'a DecodedClientToken,
        request: &'a PayerInfoRequest,
    ) -> ApiResult<'a, PayerInfoResponse>;

    /// `POST {coreUrl}/klarna/payment-sessions`.
    fn create_klarna_payment_session<'a>(
        &'a self,
        client_token: &'a DecodedClientToken,
        request: &'a CreatePaymentSessionRequest,
    ) -> ApiResult<'a, CreatePaymentSessionResponse>;

    /// `POST {coreUrl}/klarna/customer-tokens`.
    fn create_klarna_customer_token<'a>(
        &'a self,
        client_token: &'a DecodedClientToken,
        request: &'a CreateCustomerTokenRequest,
    ) -> ApiResult<'a, CustomerTokenResponse>;

    /// `POST {coreUrl}/klarna/payment-sessions/finalize`.
    fn finalize_klarna_payment_session<'a>(
        &'a self,
        client_token: &'a DecodedClientToken,
        request: &'a FinalizePaymentSessionRequest,
    ) -> ApiResult<'a, CustomerTokenResponse>;

    /// `POST {coreUrl}/adyen/checkout`.
    fn list_banks<'a>(
        &'a self,
        client_token: &'a DecodedClientToken,
        request: &'a BankListRequest,
    ) -> ApiResult<'a, BankListResponse>;

    /// `POST {coreUrl}/session-token`.
    fn create_apaya_session<'a>(
        &'a self,
        client_token: &'a DecodedClientToken,
        request: &'a ApayaSessionRequest,
    ) -> ApiResult<'a, ApayaSessionResponse>;
}
