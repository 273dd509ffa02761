//! HTTP transport for the Primer checkout SDK.
//!
//! [`client::HttpPrimerApi`] implements [`primer::api::PrimerApi`] over
//! `reqwest`, authenticating every call with the session's client token.
//!
//! # Modules
//!
//! - [`constants`] - Header names and defaults
//! - [`client`] - The `reqwest`-based backend client

pub mod client;
pub mod constants;
