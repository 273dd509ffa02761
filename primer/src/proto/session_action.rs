//! Client session actions.

use serde::{Deserialize, Serialize};

/// `POST /client-session/actions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSessionActionsRequest {
    /// Actions to apply in order.
    pub actions: Vec<ClientSessionAction>,
}

/// A single client session action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "params", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientSessionAction {
    /// The user picked a payment method.
    SelectPaymentMethod(SelectPaymentMethodParams),
    /// The user left a payment method.
    UnselectPaymentMethod,
}

/// Parameters of [`ClientSessionAction::SelectPaymentMethod`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectPaymentMethodParams {
    /// Payment method type.
    pub payment_method_type: String,
    /// Card network, for card methods.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bin_data: Option<BinData>,
}

/// Card network detected from the first digits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinData {
    /// Network name (e.g. `"VISA"`).
    pub network: String,
}

impl ClientSessionActionsRequest {
    /// A request selecting one payment method.
    pub fn select(payment_method_type: impl Into<String>) -> Self {
        Self {
            actions: vec![ClientSessionAction::SelectPaymentMethod(
                SelectPaymentMethodParams {
                    payment_method_type: payment_method_type.into(),
                    bin_data: None,
                },
            )],
        }
    }
}
