//! Card entry.
//!
//! The card form is presented through the [`Presenter`](crate::interaction::Presenter);
//! the entered details are normalized and checked locally (Luhn checksum,
//! expiry, security code length for the detected network) before anything
//! is sent to the PCI endpoint.

use time::OffsetDateTime;

use crate::error::PrimerError;
use crate::interaction::{Presentation, UserInput};
use crate::pipeline::FlowContext;
use crate::proto::instrument::CardInstrument;
use crate::proto::{PaymentInstrument, TokenizationRequest};
use crate::session::SessionContext;
use crate::timestamp::UnixTimestamp;

use super::{PaymentMethodFlow, require_pci_url, unexpected_input};

/// Card payment method type.
pub const PAYMENT_CARD: &str = "PAYMENT_CARD";
/// Bancontact card payment method type.
pub const ADYEN_BANCONTACT_CARD: &str = "ADYEN_BANCONTACT_CARD";

/// Card network detected from the number prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CardNetwork {
    /// Visa.
    Visa,
    /// Mastercard.
    Mastercard,
    /// American Express.
    Amex,
    /// Discover.
    Discover,
    /// JCB.
    Jcb,
    /// Diners Club.
    Diners,
    /// Maestro.
    Maestro,
    /// Anything else.
    Unknown,
}

impl CardNetwork {
    /// Detects the network from the leading digits of `number`.
    #[must_use]
    pub fn detect(number: &str) -> Self {
        let prefix = |len: usize| -> Option<u32> {
            number.get(..len).and_then(|p| p.parse().ok())
        };
        let p1 = prefix(1);
        let p2 = prefix(2);
        let p3 = prefix(3);
        let p4 = prefix(4);

        if matches!(p2, Some(34 | 37)) {
            Self::Amex
        } else if matches!(p3, Some(300..=305)) || matches!(p2, Some(36 | 38 | 39)) {
            Self::Diners
        } else if matches!(p4, Some(6011))
            || matches!(p3, Some(644..=649))
            || matches!(p2, Some(65))
        {
            Self::Discover
        } else if matches!(p4, Some(3528..=3589)) {
            Self::Jcb
        } else if matches!(p2, Some(51..=55)) || matches!(p4, Some(2221..=2720)) {
            Self::Mastercard
        } else if matches!(p2, Some(50 | 56..=58 | 63 | 67)) {
            Self::Maestro
        } else if p1 == Some(4) {
            Self::Visa
        } else {
            Self::Unknown
        }
    }

    /// Backend name of the network.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Visa => "VISA",
            Self::Mastercard => "MASTERCARD",
            Self::Amex => "AMEX",
            Self::Discover => "DISCOVER",
            Self::Jcb => "JCB",
            Self::Diners => "DINERS_CLUB",
            Self::Maestro => "MAESTRO",
            Self::Unknown => "OTHER",
        }
    }

    /// Accepted security code lengths.
    #[must_use]
    pub const fn cvv_lengths(self) -> &'static [usize] {
        match self {
            Self::Amex => &[4],
            Self::Unknown => &[3, 4],
            _ => &[3],
        }
    }
}

/// Whether `number` is 12 to 19 ASCII digits passing the Luhn checksum.
#[must_use]
pub fn is_valid_number(number: &str) -> bool {
    (12..=19).contains(&number.len())
        && number.bytes().all(|b| b.is_ascii_digit())
        && luhn::valid(number)
}

/// Calendar year and month of a Unix timestamp (UTC).
fn year_month(now: UnixTimestamp) -> (i32, u8) {
    let now = i64::try_from(now.as_secs())
        .ok()
        .and_then(|secs| OffsetDateTime::from_unix_timestamp(secs).ok())
        .unwrap_or(OffsetDateTime::UNIX_EPOCH);
    (now.year(), u8::from(now.month()))
}

/// Normalizes and checks a card against the time `now`.
///
/// The number loses spaces and dashes, the month is zero-padded and a
/// two-digit year is expanded to `20YY`.
///
/// # Errors
///
/// Returns [`PrimerError::InvalidValue`] naming the first invalid field.
pub fn validate_card_at(
    card: &CardInstrument,
    require_cvv: bool,
    now: UnixTimestamp,
) -> Result<CardInstrument, PrimerError> {
    let number: String = card
        .number
        .chars()
        .filter(|c| !matches!(c, ' ' | '-'))
        .collect();
    if !is_valid_number(&number) {
        return Err(PrimerError::invalid_value("cardNumber", mask(&number)));
    }
    let network = CardNetwork::detect(&number);

    let month: u8 = card
        .expiration_month
        .trim()
        .parse()
        .ok()
        .filter(|m| (1..=12).contains(m))
        .ok_or_else(|| PrimerError::invalid_value("expiryDate", card.expiration_month.clone()))?;
    let year_text = card.expiration_year.trim();
    let year: i32 = match (year_text.len(), year_text.parse::<i32>()) {
        (2, Ok(y)) => 2000 + y,
        (4, Ok(y)) => y,
        _ => return Err(PrimerError::invalid_value("expiryDate", card.expiration_year.clone())),
    };
    let (current_year, current_month) = year_month(now);
    if (year, month) < (current_year, current_month) {
        return Err(PrimerError::invalid_value(
            "expiryDate",
            format!("{month:02}/{year}"),
        ));
    }

    let cvv = card.cvv.trim();
    let cvv_ok = cvv.bytes().all(|b| b.is_ascii_digit())
        && (network.cvv_lengths().contains(&cvv.len()) || (!require_cvv && cvv.is_empty()));
    if !cvv_ok {
        return Err(PrimerError::missing_value("cvv"));
    }

    let cardholder_name = card
        .cardholder_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_owned);

    Ok(CardInstrument {
        number,
        cvv: cvv.to_owned(),
        expiration_month: format!("{month:02}"),
        expiration_year: year.to_string(),
        cardholder_name,
    })
}

fn mask(number: &str) -> String {
    let mut last4: Vec<char> = number.chars().rev().take(4).collect();
    last4.reverse();
    format!("****{}", last4.into_iter().collect::<String>())
}

/// Card entry flow.
#[derive(Debug, Clone)]
pub struct CardFlow {
    payment_method_type: String,
}

impl CardFlow {
    /// Creates a card flow for `payment_method_type`.
    pub fn new(payment_method_type: impl Into<String>) -> Self {
        Self {
            payment_method_type: payment_method_type.into(),
        }
    }

    fn requires_cvv(&self) -> bool {
        self.payment_method_type != ADYEN_BANCONTACT_CARD
    }
}

impl PaymentMethodFlow for CardFlow {
    type Input = CardInstrument;

    fn payment_method_type(&self) -> &str {
        &self.payment_method_type
    }

    fn validate(&self, session: &SessionContext) -> Result<(), PrimerError> {
        require_pci_url(session)
    }

    async fn collect_input(&self, ctx: &FlowContext) -> Result<CardInstrument, PrimerError> {
        match ctx.present(&self.payment_method_type, Presentation::CardForm).await? {
            UserInput::Card(card) => {
                validate_card_at(&card, self.requires_cvv(), UnixTimestamp::now())
            }
            other => Err(unexpected_input(&self.payment_method_type, &other)),
        }
    }

    fn build_request(
        &self,
        _session: &SessionContext,
        input: CardInstrument,
    ) -> Result<TokenizationRequest, PrimerError> {
        Ok(PaymentInstrument::Card(input).into())
    }
}
