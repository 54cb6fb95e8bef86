//! Build-and-sign transaction flow.
//!
//! A `want_set_providers` intent becomes the pending request. Confirming it
//! with a deposit walks the flow through
//! `Idle → BuildingPayload → AwaitingSignature → Sent → Idle`:
//! the backend builds the contract message, the wallet signs and sends it,
//! and `transaction-sent` is published. Provider state is never touched
//! here; the next poll reports whatever the network accepted.
//!
//! Cancelling before `Sent` drops the in-flight call and returns to `Idle`
//! without side effects. A failure also returns to `Idle` and keeps the
//! pending request so the user can retry.

use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tonbag_core::effects::{BackendEffects, BackendError, PhysicalTimeEffects, WalletEffects};
use tonbag_core::{
    ContentKey, OwnerAddress, SubmissionPayload, TonAmount, WalletMessage, WalletReceipt,
    WalletRequest,
};
use tonbag_effects::{EventBus, Subscription};

use crate::config::TransactionConfig;
use crate::errors::AppError;
use crate::events::{
    SetProvidersIntent, TransactionKind, TransactionSent, TRANSACTION_SENT, WANT_SET_PROVIDERS,
};
use crate::tasks::CancellationToken;

/// Decimal places a deposit is rounded to before it is sent.
pub const DEPOSIT_DECIMALS: u32 = 6;

/// Step of the transaction flow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FlowState {
    /// Nothing running
    #[default]
    Idle,
    /// Waiting for the backend to build the contract message
    BuildingPayload,
    /// Waiting for the wallet to sign and send
    AwaitingSignature,
    /// Sent; about to return to `Idle`
    Sent,
}

impl FlowState {
    /// Whether a flow is in progress.
    pub fn is_running(self) -> bool {
        matches!(self, Self::BuildingPayload | Self::AwaitingSignature)
    }
}

#[derive(Debug, Default)]
struct FlowInner {
    state: FlowState,
    pending: Option<SetProvidersIntent>,
    last_error: Option<AppError>,
    run: u64,
    cancel_tx: Option<watch::Sender<bool>>,
}

/// Handle of one running flow.
struct FlowRun {
    run: u64,
    token: CancellationToken,
}

/// Drives contract transactions from intent to wallet receipt.
pub struct TransactionFlowCoordinator {
    bus: EventBus,
    backend: Arc<dyn BackendEffects>,
    wallet: Arc<dyn WalletEffects>,
    clock: Arc<dyn PhysicalTimeEffects>,
    config: TransactionConfig,
    inner: Arc<Mutex<FlowInner>>,
    _intents: Subscription,
}

impl TransactionFlowCoordinator {
    /// Create the coordinator and start listening for intents.
    pub fn new(
        bus: EventBus,
        backend: Arc<dyn BackendEffects>,
        wallet: Arc<dyn WalletEffects>,
        clock: Arc<dyn PhysicalTimeEffects>,
        config: TransactionConfig,
    ) -> Self {
        let inner = Arc::new(Mutex::new(FlowInner::default()));
        let slot = inner.clone();
        let intents = bus.subscribe(&WANT_SET_PROVIDERS, move |intent: &SetProvidersIntent| {
            let mut inner = slot.lock();
            if inner.state.is_running() {
                tracing::warn!(
                    content = intent.content_key.short(),
                    "ignoring provider change request while a transaction is running"
                );
                return;
            }
            tracing::debug!(
                content = intent.content_key.short(),
                providers = intent.providers.len(),
                just_topup = intent.just_topup,
                "transaction requested"
            );
            inner.pending = Some(intent.clone());
            inner.last_error = None;
        });

        Self {
            bus,
            backend,
            wallet,
            clock,
            config,
            inner,
            _intents: intents,
        }
    }

    /// Current step.
    pub fn state(&self) -> FlowState {
        self.inner.lock().state
    }

    /// Request awaiting confirmation.
    pub fn pending(&self) -> Option<SetProvidersIntent> {
        self.inner.lock().pending.clone()
    }

    /// Failure of the last flow, until cleared or a new flow starts.
    pub fn last_error(&self) -> Option<AppError> {
        self.inner.lock().last_error.clone()
    }

    /// Forget the last failure.
    pub fn clear_error(&self) {
        self.inner.lock().last_error = None;
    }

    /// Deposit proposed when the flow opens.
    pub fn default_deposit(&self) -> TonAmount {
        self.config.default_deposit
    }

    /// Parse a deposit typed by the user, rounded to [`DEPOSIT_DECIMALS`]
    /// places. The rounded amount must exceed the minimum.
    pub fn validate_deposit(&self, raw: &str) -> Result<TonAmount, AppError> {
        let amount = TonAmount::parse(raw)
            .map_err(|e| AppError::invalid_input("amount", e.to_string()))?
            .round_to_places(DEPOSIT_DECIMALS);
        if amount <= self.config.min_deposit {
            return Err(AppError::invalid_input(
                "amount",
                format!("must be greater than {} TON", self.config.min_deposit),
            ));
        }
        Ok(amount)
    }

    /// Build, sign and send the pending request with `raw_amount` attached.
    pub async fn confirm(&self, raw_amount: &str) -> Result<WalletReceipt, AppError> {
        let amount = self.validate_deposit(raw_amount)?;
        let (intent, flow) = {
            let mut inner = self.inner.lock();
            if inner.state.is_running() {
                return Err(AppError::busy("Transaction"));
            }
            let intent = inner
                .pending
                .clone()
                .ok_or_else(|| AppError::not_found("pending transaction request"))?;
            (intent, Self::begin(&mut inner))
        };

        let kind = if intent.just_topup {
            TransactionKind::TopUp
        } else {
            TransactionKind::SetProviders
        };
        tracing::info!(
            content = intent.content_key.short(),
            kind = kind.as_str(),
            amount = %amount,
            "transaction started"
        );
        let build = self.backend.build_provider_submission(
            &intent.content_key,
            &intent.owner,
            amount,
            &intent.providers,
        );
        let receipt = self
            .execute(flow, &intent.content_key, kind, intent.just_topup, build)
            .await?;

        let mut inner = self.inner.lock();
        if inner.pending.as_ref() == Some(&intent) {
            inner.pending = None;
        }
        Ok(receipt)
    }

    /// Withdraw the remaining balance of a content item's contract.
    pub async fn withdraw(
        &self,
        content: &ContentKey,
        owner: &OwnerAddress,
    ) -> Result<WalletReceipt, AppError> {
        let flow = {
            let mut inner = self.inner.lock();
            if inner.state.is_running() {
                return Err(AppError::busy("Transaction"));
            }
            Self::begin(&mut inner)
        };
        tracing::info!(content = content.short(), "withdrawal started");
        let build = self.backend.build_withdrawal(content, owner);
        self.execute(flow, content, TransactionKind::Withdraw, false, build)
            .await
    }

    /// Abandon the running flow and close the pending request. Returns
    /// whether anything was cancelled.
    pub fn cancel(&self) -> bool {
        let mut inner = self.inner.lock();
        let was_running = inner.state.is_running();
        if let Some(cancel_tx) = inner.cancel_tx.take() {
            let _ = cancel_tx.send(true);
        }
        if was_running {
            inner.run += 1;
            inner.state = FlowState::Idle;
            tracing::info!("transaction cancelled");
        }
        let had_pending = inner.pending.take().is_some();
        was_running || had_pending
    }

    fn begin(inner: &mut FlowInner) -> FlowRun {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        inner.run += 1;
        inner.state = FlowState::BuildingPayload;
        inner.last_error = None;
        inner.cancel_tx = Some(cancel_tx);
        FlowRun {
            run: inner.run,
            token: CancellationToken::from_receiver(cancel_rx),
        }
    }

    async fn execute<B>(
        &self,
        flow: FlowRun,
        content: &ContentKey,
        kind: TransactionKind,
        transfer_only: bool,
        build: B,
    ) -> Result<WalletReceipt, AppError>
    where
        B: Future<Output = Result<SubmissionPayload, BackendError>>,
    {
        let payload = match flow.token.run_until_cancelled(build).await {
            None => return Err(AppError::cancelled("transaction")),
            Some(Err(e)) => return Err(self.fail(&flow, e.into())),
            Some(Ok(payload)) => payload,
        };

        if !self.advance(&flow, FlowState::AwaitingSignature) {
            return Err(AppError::cancelled("transaction"));
        }
        let message = if transfer_only {
            WalletMessage::transfer_only(&payload)
        } else {
            WalletMessage::full(&payload)
        };
        let request = WalletRequest {
            valid_until: self.clock.now_secs().await + self.config.valid_for_secs,
            messages: vec![message],
        };

        let receipt = match flow
            .token
            .run_until_cancelled(self.wallet.send_transaction(request))
            .await
        {
            None => return Err(AppError::cancelled("transaction")),
            Some(Err(e)) => return Err(self.fail(&flow, e.into())),
            Some(Ok(receipt)) => receipt,
        };

        if !self.advance(&flow, FlowState::Sent) {
            return Err(AppError::cancelled("transaction"));
        }
        let delivered = self.bus.publish(
            &TRANSACTION_SENT,
            TransactionSent {
                content_key: content.clone(),
                kind,
                receipt: receipt.clone(),
            },
        );
        tracing::info!(
            content = content.short(),
            kind = kind.as_str(),
            delivered,
            "transaction sent"
        );
        self.finish(&flow);
        Ok(receipt)
    }

    /// Move the flow to `next` unless it was cancelled meanwhile.
    fn advance(&self, flow: &FlowRun, next: FlowState) -> bool {
        let mut inner = self.inner.lock();
        if inner.run != flow.run {
            return false;
        }
        inner.state = next;
        true
    }

    fn finish(&self, flow: &FlowRun) {
        let mut inner = self.inner.lock();
        if inner.run == flow.run {
            inner.state = FlowState::Idle;
            inner.cancel_tx = None;
        }
    }

    fn fail(&self, flow: &FlowRun, error: AppError) -> AppError {
        let mut inner = self.inner.lock();
        if inner.run == flow.run {
            tracing::warn!(error = %error, "transaction failed");
            inner.state = FlowState::Idle;
            inner.cancel_tx = None;
            inner.last_error = Some(error.clone());
        }
        error
    }
}

impl std::fmt::Debug for TransactionFlowCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("TransactionFlowCoordinator")
            .field("state", &inner.state)
            .field("pending", &inner.pending.is_some())
            .finish_non_exhaustive()
    }
}
