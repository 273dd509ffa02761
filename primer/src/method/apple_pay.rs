//! Apple Pay.
//!
//! The wallet sheet itself is platform UI; the flow only builds the payment
//! request shown on it and tokenizes the encrypted token it returns. Apple
//! Pay is only offered for the checkout intent.

use crate::error::PrimerError;
use crate::interaction::{Presentation, SummaryItem, UserInput, WalletRequest};
use crate::pipeline::FlowContext;
use crate::proto::instrument::{ApplePayInstrument, ApplePaySourceConfig, ApplePayToken};
use crate::proto::{PaymentInstrument, TokenizationRequest};
use crate::session::{Intent, SessionContext};

use super::{PaymentMethodFlow, require_config_id, unexpected_input};

/// Apple Pay payment method type.
pub const APPLE_PAY: &str = "APPLE_PAY";

/// Apple Pay flow.
#[derive(Debug, Clone, Default)]
pub struct ApplePayFlow;

impl ApplePayFlow {
    /// Creates the flow.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn merchant_identifier(session: &SessionContext) -> Result<&str, PrimerError> {
        session
            .settings()
            .apple_pay
            .merchant_identifier
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| PrimerError::missing_setting("merchantIdentifier"))
    }

    /// Payment request shown on the wallet sheet.
    ///
    /// One line per order item followed by the total, labelled with the
    /// merchant name.
    ///
    /// # Errors
    ///
    /// Returns [`PrimerError::InvalidSetting`] for a missing currency,
    /// country, amount or merchant identifier.
    pub fn wallet_request(session: &SessionContext) -> Result<WalletRequest, PrimerError> {
        let settings = session.settings();
        let amount = session.require_amount()?;
        let mut items: Vec<SummaryItem> = session
            .line_items()
            .iter()
            .filter_map(|item| {
                let quantity = i64::from(item.quantity.unwrap_or(1));
                let total = item.amount? * quantity - item.discount_amount.unwrap_or(0);
                Some(SummaryItem {
                    label: item
                        .description
                        .clone()
                        .or_else(|| item.item_id.clone())
                        .unwrap_or_default(),
                    amount: total,
                })
            })
            .collect();
        items.push(SummaryItem {
            label: settings.apple_pay.merchant_name.clone().unwrap_or_default(),
            amount,
        });

        Ok(WalletRequest {
            merchant_identifier: Self::merchant_identifier(session)?.to_owned(),
            country_code: session.require_country_code()?.to_owned(),
            currency_code: session.require_currency()?.to_owned(),
            items,
        })
    }
}

impl PaymentMethodFlow for ApplePayFlow {
    type Input = ApplePayToken;

    fn payment_method_type(&self) -> &str {
        APPLE_PAY
    }

    fn validate(&self, session: &SessionContext) -> Result<(), PrimerError> {
        if session.intent() == Intent::Vault {
            return Err(PrimerError::UnsupportedIntent {
                payment_method_type: APPLE_PAY.to_owned(),
                intent: Intent::Vault,
            });
        }
        session.require_currency()?;
        session.require_country_code()?;
        session.require_amount()?;
        Self::merchant_identifier(session)?;
        Ok(())
    }

    async fn collect_input(&self, ctx: &FlowContext) -> Result<ApplePayToken, PrimerError> {
        let request = Self::wallet_request(ctx.session())?;
        let input = ctx.present(APPLE_PAY, Presentation::WalletSheet(request)).await?;
        ctx.dismiss(APPLE_PAY).await;
        match input {
            UserInput::Wallet(token) => Ok(token),
            other => Err(unexpected_input(APPLE_PAY, &other)),
        }
    }

    fn build_request(
        &self,
        session: &SessionContext,
        input: ApplePayToken,
    ) -> Result<TokenizationRequest, PrimerError> {
        Ok(PaymentInstrument::ApplePay(ApplePayInstrument {
            payment_method_config_id: require_config_id(session, APPLE_PAY)?.to_owned(),
            source_config: ApplePaySourceConfig {
                source: "IN_APP".to_owned(),
                merchant_id: Self::merchant_identifier(session)?.to_owned(),
            },
            token: input,
        })
        .into())
    }
}
