//! CLI configuration.
//!
//! Loads configuration from a TOML file. String values may reference
//! environment variables with `$VAR` or `${VAR}` syntax.
//!
//! # Example Configuration
//!
//! ```toml
//! client_token = "$PRIMER_CLIENT_TOKEN"
//! intent = "CHECKOUT"
//! timeout_secs = 30
//!
//! [settings]
//! payment_handling = "AUTO"
//! url_scheme = "merchant://"
//!
//! [settings.polling]
//! interval_ms = 2000
//! timeout_secs = 120
//! ```
//!
//! # Environment Variables
//!
//! - `PRIMER_CONFIG` - Path to configuration file (default: `primer.toml`)
//! - `PRIMER_CLIENT_TOKEN` - Overrides `client_token`

use std::path::Path;
use std::time::Duration;

use primer::config::PrimerSettings;
use primer::session::Intent;
use serde::{Deserialize, Serialize};

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_VAR: &str = "PRIMER_CONFIG";

/// Configuration file used when [`CONFIG_PATH_VAR`] is unset.
pub const DEFAULT_CONFIG_PATH: &str = "primer.toml";

/// Environment variable overriding [`CliConfig::client_token`].
pub const CLIENT_TOKEN_VAR: &str = "PRIMER_CLIENT_TOKEN";

/// Top-level CLI configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Raw client token issued by the merchant backend.
    pub client_token: Option<String>,

    /// Default session intent.
    pub intent: Intent,

    /// Per-request HTTP timeout in seconds.
    pub timeout_secs: Option<u64>,

    /// SDK settings.
    pub settings: PrimerSettings,
}

impl CliConfig {
    /// Loads configuration from the path in `PRIMER_CONFIG`, falling back to
    /// `primer.toml` in the current directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let path =
            std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_owned());
        Self::load_from(Path::new(&path))
    }

    /// Loads configuration from a specific file path.
    ///
    /// A missing file yields the defaults. `PRIMER_CLIENT_TOKEN`, when set,
    /// replaces the file's client token.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let content = if path.exists() {
            std::fs::read_to_string(path)?
        } else {
            String::new()
        };

        let mut config = Self::from_toml(&content, |name| std::env::var(name).ok())?;
        if let Ok(token) = std::env::var(CLIENT_TOKEN_VAR) {
            config.client_token = Some(token);
        }
        Ok(config)
    }

    /// Parses TOML after expanding variables through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns an error if the expanded document is not valid configuration.
    pub fn from_toml(
        content: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, toml::de::Error> {
        toml::from_str(&expand_vars(content, lookup))
    }

    /// Per-request HTTP timeout.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Expands `$VAR` and `${VAR}` references through `lookup`.
///
/// Unresolved references are left as-is.
fn expand_vars(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' {
            result.push(ch);
            continue;
        }

        let braced = chars.next_if_eq(&'{').is_some();
        let mut name = String::new();
        let mut closed = false;
        while let Some(&c) = chars.peek() {
            if braced && c == '}' {
                chars.next();
                closed = true;
                break;
            }
            if !braced && !c.is_ascii_alphanumeric() && c != '_' {
                break;
            }
            name.push(c);
            chars.next();
        }

        let complete = !name.is_empty() && (closed || !braced);
        match lookup(&name).filter(|_| complete) {
            Some(value) => result.push_str(&value),
            None => {
                result.push('$');
                if braced {
                    result.push('{');
                }
                result.push_str(&name);
                if closed {
                    result.push('}');
                }
            }
        }
    }

    result
}
