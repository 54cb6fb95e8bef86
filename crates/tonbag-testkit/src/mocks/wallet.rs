//! Scripted wallet.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::time::Duration;
use tonbag_core::effects::{WalletEffects, WalletError};
use tonbag_core::{WalletReceipt, WalletRequest};

#[derive(Debug)]
struct WalletState {
    response: Result<WalletReceipt, WalletError>,
    delay: Option<Duration>,
    pending: bool,
    requests: Vec<WalletRequest>,
}

/// Wallet that signs everything unless told otherwise.
#[derive(Debug)]
pub struct MockWallet {
    state: Mutex<WalletState>,
}

impl Default for MockWallet {
    fn default() -> Self {
        Self::new()
    }
}

impl MockWallet {
    /// Wallet that answers with a fixed receipt.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(WalletState {
                response: Ok(WalletReceipt {
                    result_token: "te6cckboc".to_string(),
                }),
                delay: None,
                pending: false,
                requests: Vec::new(),
            }),
        }
    }

    /// Answer every request with `response`.
    pub fn set_response(&self, response: Result<WalletReceipt, WalletError>) {
        self.state.lock().response = response;
    }

    /// Let the user take `delay` to sign.
    pub fn set_delay(&self, delay: Option<Duration>) {
        self.state.lock().delay = delay;
    }

    /// Never answer, as if the user left the prompt open.
    pub fn set_pending(&self, pending: bool) {
        self.state.lock().pending = pending;
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<WalletRequest> {
        self.state.lock().requests.clone()
    }
}

#[async_trait]
impl WalletEffects for MockWallet {
    async fn send_transaction(&self, request: WalletRequest) -> Result<WalletReceipt, WalletError> {
        let (response, delay, pending) = {
            let mut state = self.state.lock();
            state.requests.push(request);
            (state.response.clone(), state.delay, state.pending)
        };
        if pending {
            std::future::pending::<()>().await;
        }
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        response
    }
}
