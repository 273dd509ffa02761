//! Command-line checkout runner for the Primer SDK.
//!
//! # Modules
//!
//! - [`config`] - TOML configuration with environment variable expansion
//! - [`presenter`] - A terminal [`primer::interaction::Presenter`]

pub mod config;
pub mod presenter;
