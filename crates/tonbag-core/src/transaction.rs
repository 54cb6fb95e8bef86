//! Contract submission payloads and wallet signing requests.

use serde::{Deserialize, Serialize};

use crate::amount::TonAmount;

/// Payload produced by the backend for a contract operation.
///
/// Opaque blobs (`state_init`, `body`) are base64 strings the wallet forwards
/// as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionPayload {
    /// Contract address the message goes to
    pub destination: String,
    /// Amount attached to the message
    pub amount: TonAmount,
    /// Contract state-init (deployment only)
    #[serde(default)]
    pub state_init: Option<String>,
    /// Message body
    #[serde(default)]
    pub body: Option<String>,
}

/// One message of a wallet transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletMessage {
    /// Destination address
    pub address: String,
    /// Attached amount
    pub amount: TonAmount,
    /// Contract state-init
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_init: Option<String>,
    /// Message payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
}

impl WalletMessage {
    /// Message carrying the full payload (deployment, apply changes, withdrawal).
    pub fn full(payload: &SubmissionPayload) -> Self {
        Self {
            address: payload.destination.clone(),
            amount: payload.amount,
            state_init: payload.state_init.clone(),
            payload: payload.body.clone(),
        }
    }

    /// Plain transfer to the contract; immutable deployment data is not resent.
    pub fn transfer_only(payload: &SubmissionPayload) -> Self {
        Self {
            address: payload.destination.clone(),
            amount: payload.amount,
            state_init: None,
            payload: None,
        }
    }
}

/// A transaction handed to the wallet collaborator for signing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletRequest {
    /// Unix time (seconds) after which the wallet must refuse to sign
    pub valid_until: u64,
    /// Messages to send
    pub messages: Vec<WalletMessage>,
}

/// What the wallet returns once the transaction has been sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletReceipt {
    /// Opaque result token (serialized message)
    pub result_token: String,
}
