//! Command-line checkout runner for the Primer SDK.
//!
//! # Usage
//!
//! ```bash
//! # Inspect a client token
//! primer --client-token "$TOKEN" decode-token
//!
//! # List the payment methods of a session
//! primer methods
//!
//! # Pay with a sandbox test method, answering its prompt up front
//! primer pay PRIMER_TEST_SOFORT --decision success
//!
//! # Configure logging level
//! RUST_LOG=debug primer methods
//! ```
//!
//! # Environment Variables
//!
//! - `PRIMER_CONFIG` - Path to TOML configuration file (default: `primer.toml`)
//! - `PRIMER_CLIENT_TOKEN` - Client token
//! - `RUST_LOG` - Log level filter (default: `info`)

use std::io::Write;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use primer::checkout::{Checkout, CheckoutOutcome};
use primer::method::AnyPaymentMethod;
use primer::polling::poll_until_complete;
use primer::proto::FlowDecision;
use primer::redirect::ApayaWebViewResponse;
use primer::session::{Intent, SessionContext};
use primer::token::DecodedClientToken;
use primer_cli::config::CliConfig;
use primer_cli::presenter::{PresetAnswers, TerminalPresenter};
use primer_http::client::HttpPrimerApi;
use serde::Serialize;
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "primer", version, about = "Run Primer checkouts from the terminal")]
struct Cli {
    /// Client token; overrides the configuration file and `PRIMER_CLIENT_TOKEN`.
    #[arg(long, global = true)]
    client_token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the decoded client token as JSON.
    DecodeToken,

    /// List the session's payment methods and whether they are supported.
    Methods,

    /// Tokenize a payment method and, for checkouts, complete the payment.
    Pay {
        /// Payment method type, e.g. `PAYPAL` or `ADYEN_IDEAL`.
        payment_method_type: String,

        /// Vault the payment method instead of paying.
        #[arg(long)]
        vault: bool,

        /// Outcome of a test payment method (success, decline, fail).
        #[arg(long, env = "PRIMER_TEST_DECISION")]
        decision: Option<FlowDecision>,

        /// BLIK code.
        #[arg(long)]
        blik_code: Option<String>,

        /// Phone number.
        #[arg(long)]
        phone: Option<String>,

        /// Bank id.
        #[arg(long)]
        bank: Option<String>,
    },

    /// Poll a status URL until it completes.
    Poll {
        /// Status URL from a required action.
        status_url: Url,
    },

    /// Parse the final URL of an Apaya web view.
    ParseRedirect {
        /// Redirect URL.
        url: Url,
    },
}

#[derive(Serialize)]
struct MethodRow<'a> {
    payment_method_type: &'a str,
    id: Option<&'a str>,
    supported: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run().await {
        tracing::error!("primer failed: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = CliConfig::load()?;

    let client_token = cli.client_token.or_else(|| config.client_token.clone());
    let raw_token = || {
        client_token
            .as_deref()
            .ok_or("no client token: pass --client-token or set PRIMER_CLIENT_TOKEN")
    };

    let mut api = HttpPrimerApi::new().with_api_version(config.settings.api_version.clone());
    if let Some(timeout) = config.timeout() {
        api = api.with_timeout(timeout);
    }

    match cli.command {
        Command::DecodeToken => {
            let token = DecodedClientToken::decode(raw_token()?)?;
            emit(&token)?;
        }
        Command::Methods => {
            let session =
                SessionContext::bootstrap(&api, raw_token()?, config.settings, config.intent)
                    .await?;
            let configuration = session.require_configuration()?;
            let rows: Vec<_> = configuration
                .payment_methods
                .iter()
                .map(|c| MethodRow {
                    payment_method_type: &c.payment_method_type,
                    id: c.id.as_deref(),
                    supported: AnyPaymentMethod::from_configuration(c).is_ok(),
                })
                .collect();
            emit(&rows)?;
        }
        Command::Pay {
            payment_method_type,
            vault,
            decision,
            blik_code,
            phone,
            bank,
        } => {
            let intent = if vault { Intent::Vault } else { config.intent };
            let session =
                SessionContext::bootstrap(&api, raw_token()?, config.settings, intent).await?;
            tracing::info!(%intent, %payment_method_type, "Starting");

            let presenter = TerminalPresenter::new(PresetAnswers {
                decision,
                blik_code,
                phone,
                bank,
            });
            let checkout = Arc::new(Checkout::new(session, Arc::new(api), Arc::new(presenter)));
            let method = checkout.payment_method(&payment_method_type)?;

            let canceller = Arc::clone(&checkout);
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("Received Ctrl-C, cancelling");
                    canceller.cancel();
                }
            });

            match checkout.start(&method).await? {
                CheckoutOutcome::Vaulted(token_data) => {
                    tracing::info!("Payment method vaulted");
                    emit(&token_data)?;
                }
                CheckoutOutcome::Tokenized(token_data) => {
                    tracing::info!(
                        "Payment method tokenized; create the payment from your backend"
                    );
                    emit(&token_data)?;
                }
                CheckoutOutcome::Completed(payment) => {
                    tracing::info!(status = ?payment.status, "Payment completed");
                    emit(&payment)?;
                }
            }
        }
        Command::Poll { status_url } => {
            let token = DecodedClientToken::decode(raw_token()?)?;
            let response =
                poll_until_complete(&api, &token, &status_url, &config.settings.polling).await?;
            emit(&response)?;
        }
        Command::ParseRedirect { url } => {
            let response = ApayaWebViewResponse::from_url(&url)?;
            emit(&serde_json::json!({
                "mx_number": response.mx_number,
                "hashed_identifier": response.hashed_identifier,
                "mcc": response.mcc,
                "mnc": response.mnc,
                "success": response.success,
                "status": response.status,
            }))?;
        }
    }

    Ok(())
}

/// Writes `value` to stdout as pretty JSON.
fn emit(value: &impl Serialize) -> Result<(), Box<dyn std::error::Error>> {
    let mut out = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}
