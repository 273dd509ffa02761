//! Wire types exchanged with the Primer backend.
//!
//! Field names follow the backend's camelCase JSON. Optional fields are
//! decoded leniently; most of them are absent depending on the payment
//! method or environment.

pub mod apaya;
pub mod banks;
pub mod configuration;
pub mod instrument;
pub mod klarna;
pub mod payment;
pub mod paypal;
pub mod polling;
pub mod session_action;
pub mod token_data;

pub use banks::Bank;
pub use configuration::{
    ApiConfiguration, ClientSession, ImplementationType, LineItem, PaymentMethodConfiguration,
};
pub use instrument::{
    FlowDecision, OffSessionInstrument, PaymentInstrument, SessionInfo, TokenizationRequest,
    TokenizationRequestBody, VaultedCardAdditionalData,
};
pub use payment::{
    CreatePaymentRequest, Payment, PaymentStatus, RequiredAction, ResumePaymentRequest,
};
pub use polling::{PollingResponse, PollingStatus};
pub use session_action::ClientSessionActionsRequest;
pub use token_data::PaymentMethodTokenData;
