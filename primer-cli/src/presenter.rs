//! Terminal presenter.
//!
//! Answers come from command-line flags first and stdin otherwise. Pages
//! the user has to open are logged; the URL the browser ends on is pasted
//! back on stdin. An empty line dismisses the presentation.

use std::collections::BTreeMap;

use primer::api::BoxFuture;
use primer::error::PrimerError;
use primer::interaction::{Presentation, Presenter, UserInput};
use primer::method::form::{BLIK_CODE_FIELD, PHONE_NUMBER_FIELD};
use primer::proto::FlowDecision;
use primer::proto::instrument::CardInstrument;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;
use url::Url;

/// Answers given up front on the command line.
#[derive(Debug, Clone, Default)]
pub struct PresetAnswers {
    /// Outcome of a test payment method.
    pub decision: Option<FlowDecision>,
    /// BLIK code.
    pub blik_code: Option<String>,
    /// Phone number for MB Way and similar forms.
    pub phone: Option<String>,
    /// Bank id for bank selector methods.
    pub bank: Option<String>,
}

impl PresetAnswers {
    fn field(&self, id: &str) -> Option<&str> {
        match id {
            BLIK_CODE_FIELD => self.blik_code.as_deref(),
            PHONE_NUMBER_FIELD => self.phone.as_deref(),
            _ => None,
        }
    }
}

/// [`Presenter`] driven by the terminal.
#[derive(Debug)]
pub struct TerminalPresenter {
    answers: PresetAnswers,
    stdin: Mutex<Lines<BufReader<Stdin>>>,
}

impl TerminalPresenter {
    /// Creates a presenter reading from the process's stdin.
    #[must_use]
    pub fn new(answers: PresetAnswers) -> Self {
        Self {
            answers,
            stdin: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
        }
    }

    /// Logs `prompt` and reads one trimmed line; `None` on an empty line or EOF.
    async fn ask(&self, prompt: &str) -> Result<Option<String>, PrimerError> {
        tracing::info!("{prompt}");
        let line = self
            .stdin
            .lock()
            .await
            .next_line()
            .await
            .map_err(|e| PrimerError::Presentation(format!("failed to read stdin: {e}")))?;
        Ok(line.map(|l| l.trim().to_owned()).filter(|l| !l.is_empty()))
    }

    async fn ask_redirect(&self, url: &Url) -> Result<UserInput, PrimerError> {
        let prompt =
            format!("Open {url} and paste the URL you were sent back to (empty line cancels)");
        let Some(answer) = self.ask(&prompt).await? else {
            return Ok(UserInput::Cancelled);
        };
        Url::parse(&answer)
            .map(UserInput::Redirect)
            .map_err(|e| PrimerError::Presentation(format!("invalid URL `{answer}`: {e}")))
    }

    async fn ask_card(&self) -> Result<UserInput, PrimerError> {
        let Some(answer) = self.ask("Enter card as `NUMBER MM/YY CVV [NAME]`").await? else {
            return Ok(UserInput::Cancelled);
        };
        parse_card(&answer).map(UserInput::Card)
    }

    async fn ask_form(
        &self,
        fields: &[primer::interaction::FormField],
    ) -> Result<UserInput, PrimerError> {
        let mut values = BTreeMap::new();
        for field in fields {
            let value = match self.answers.field(&field.id) {
                Some(value) => value.to_owned(),
                None => match self.ask(&format!("{}:", field.label)).await? {
                    Some(value) => value,
                    None => return Ok(UserInput::Cancelled),
                },
            };
            values.insert(field.id.clone(), value);
        }
        Ok(UserInput::Form(values))
    }

    async fn show(&self, presentation: Presentation) -> Result<UserInput, PrimerError> {
        match presentation {
            Presentation::WebView { url } | Presentation::ExternalAuthorization { url, .. } => {
                self.ask_redirect(&url).await
            }
            Presentation::Redirect { url } => {
                tracing::info!(%url, "Complete the payment in a browser; waiting for confirmation");
                std::future::pending().await
            }
            Presentation::QrCode { qr_code } => {
                tracing::info!(%qr_code, "Scan the QR code; waiting for confirmation");
                std::future::pending().await
            }
            Presentation::AwaitingConfirmation { message } => {
                tracing::info!("{message}");
                std::future::pending().await
            }
            Presentation::CardForm => self.ask_card().await,
            Presentation::Form { fields } => self.ask_form(&fields).await,
            Presentation::BankList { banks } => {
                if let Some(bank) = &self.answers.bank {
                    return Ok(UserInput::Bank(bank.clone()));
                }
                for bank in banks.iter().filter(|b| !b.disabled) {
                    tracing::info!(id = %bank.id, name = %bank.name, "Bank");
                }
                Ok(self
                    .ask("Bank id:")
                    .await?
                    .map_or(UserInput::Cancelled, UserInput::Bank))
            }
            Presentation::Voucher(voucher) => {
                tracing::info!(
                    entity = voucher.entity.as_deref().unwrap_or_default(),
                    reference = voucher.reference.as_deref().unwrap_or_default(),
                    expires_at = voucher.expires_at.as_deref().unwrap_or_default(),
                    amount = voucher.amount.unwrap_or_default(),
                    currency = voucher.currency.as_deref().unwrap_or_default(),
                    "Voucher"
                );
                Ok(UserInput::Acknowledged)
            }
            Presentation::KlarnaSession { session_id, redirect_url, .. } => {
                if let Some(url) = redirect_url {
                    tracing::info!(%url, "Klarna hosted payment page");
                }
                let prompt =
                    format!("Paste the Klarna authorization token for session {session_id}");
                Ok(self
                    .ask(&prompt)
                    .await?
                    .map_or(UserInput::Cancelled, UserInput::Authorization))
            }
            Presentation::TestDecision { decisions } => {
                if let Some(decision) = self.answers.decision {
                    return Ok(UserInput::TestDecision(decision));
                }
                let prompt = format!("Pick an outcome {decisions:?}");
                let Some(answer) = self.ask(&prompt).await? else {
                    return Ok(UserInput::Cancelled);
                };
                answer
                    .parse()
                    .map(UserInput::TestDecision)
                    .map_err(PrimerError::Presentation)
            }
            Presentation::WalletSheet(_) => Err(PrimerError::Presentation(
                "wallet sheets cannot be shown in a terminal".to_owned(),
            )),
        }
    }
}

impl Presenter for TerminalPresenter {
    fn present(&self, presentation: Presentation) -> BoxFuture<'_, Result<UserInput, PrimerError>> {
        Box::pin(self.show(presentation))
    }
}

/// Parses `NUMBER MM/YY CVV [NAME]`.
fn parse_card(input: &str) -> Result<CardInstrument, PrimerError> {
    let invalid = || PrimerError::invalid_value("card", input);
    let mut parts = input.split_whitespace();
    let number = parts.next().ok_or_else(invalid)?;
    let expiry = parts.next().ok_or_else(invalid)?;
    let cvv = parts.next().ok_or_else(invalid)?;
    let name = parts.collect::<Vec<_>>().join(" ");

    let (month, year) = expiry.split_once('/').ok_or_else(invalid)?;
    let year = if year.len() == 2 { format!("20{year}") } else { year.to_owned() };

    Ok(CardInstrument {
        number: number.to_owned(),
        cvv: cvv.to_owned(),
        expiration_month: month.to_owned(),
        expiration_year: year,
        cardholder_name: (!name.is_empty()).then_some(name),
    })
}
