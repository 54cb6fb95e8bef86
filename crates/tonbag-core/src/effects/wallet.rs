//! Wallet collaborator interface.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::transaction::{WalletReceipt, WalletRequest};

/// Error type for wallet signing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum WalletError {
    /// No wallet is connected
    #[error("wallet not connected")]
    NotConnected,
    /// The user declined to sign
    #[error("transaction rejected by the wallet")]
    Rejected,
    /// The validity window elapsed before the user signed
    #[error("wallet request expired")]
    Expired,
    /// Any other wallet failure
    #[error("wallet failure: {reason}")]
    Failed {
        /// Failure description
        reason: String,
    },
}

/// Signing and sending of transactions.
#[async_trait]
pub trait WalletEffects: Send + Sync {
    /// Ask the wallet to sign and send the request.
    async fn send_transaction(&self, request: WalletRequest) -> Result<WalletReceipt, WalletError>;
}
