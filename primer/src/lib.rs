#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Tokenization orchestration for the Primer checkout SDK.
//!
//! This crate turns a merchant client token into a checkout session and
//! drives payment methods through a single pipeline: validate, collect
//! the user's input, tokenize, then optionally create and resume the
//! payment. It is transport-agnostic; the backend is reached through the
//! [`api::PrimerApi`] trait and the user through [`interaction::Presenter`].
//!
//! # Modules
//!
//! - [`token`] - Client token decoding and expiry
//! - [`config`] - Merchant settings
//! - [`session`] - Immutable per-session context
//! - [`proto`] - Wire types of the Primer backend
//! - [`api`] - Backend abstraction
//! - [`interaction`] - UI abstraction and an async channel presenter
//! - [`hooks`] - Merchant lifecycle callbacks
//! - [`pipeline`] - The tokenization engine shared by all methods
//! - [`method`] - Built-in and custom payment method flows
//! - [`polling`] - Status URL polling
//! - [`redirect`] - Redirect URL parsing
//! - [`checkout`] - Session-level orchestration, payment creation and resume
//!
//! # Feature Flags
//!
//! - `telemetry` - Enables tracing instrumentation

pub mod api;
pub mod checkout;
pub mod config;
pub mod error;
pub mod hooks;
pub mod interaction;
pub mod method;
pub mod pipeline;
pub mod polling;
pub mod proto;
pub mod redirect;
pub mod session;
pub mod timestamp;
pub mod token;

#[cfg(test)]
mod testing;
