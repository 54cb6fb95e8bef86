//! Contract polling loop.
//!
//! While a wallet is bound, the contract of the selected content item is
//! fetched on a fixed interval. Every fetch is issued under the scope ticket
//! of the selection that started the loop, so a response that completes
//! after a scope switch is dropped instead of reaching the view.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tonbag_core::effects::BackendEffects;
use tonbag_core::ContractSnapshot;

use crate::scope::ScopeTicket;
use crate::tasks::TaskRegistry;

/// Receiver of successful contract snapshots.
#[async_trait]
pub trait SnapshotSink: Send + Sync {
    /// Fold `snapshot`, fetched under `ticket`, into the view.
    async fn apply_snapshot(&self, ticket: &ScopeTicket, snapshot: ContractSnapshot);
}

/// Fixed-interval contract poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingLoop {
    interval: Duration,
}

impl PollingLoop {
    /// Poller with the given cadence.
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// Time between fetches.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start polling on `tasks` for the scope of `ticket`.
    ///
    /// Returns `false` without spawning when the scope has no wallet bound.
    /// The loop ends when `tasks` shuts down or the ticket is cancelled.
    pub fn spawn(
        &self,
        tasks: &TaskRegistry,
        backend: Arc<dyn BackendEffects>,
        ticket: ScopeTicket,
        sink: Arc<dyn SnapshotSink>,
    ) -> bool {
        if !ticket.scope().is_authorized() {
            return false;
        }
        tracing::debug!(
            scope = %ticket.scope(),
            interval_ms = self.interval.as_millis() as u64,
            "polling started"
        );

        tasks.spawn_interval_until(self.interval, move || {
            let backend = backend.clone();
            let ticket = ticket.clone();
            let sink = sink.clone();
            async move {
                if ticket.is_cancelled() {
                    return false;
                }
                if let Some(snapshot) = poll_once(backend.as_ref(), &ticket).await {
                    sink.apply_snapshot(&ticket, snapshot).await;
                }
                !ticket.is_cancelled()
            }
        });
        true
    }
}

/// One fetch of the contract for the ticket's scope.
///
/// Returns `None` when the scope has no wallet, the ticket is cancelled
/// before the response arrives, the call fails, or the backend could not
/// read the contract. Failures are logged and left for the next tick.
pub async fn poll_once(
    backend: &dyn BackendEffects,
    ticket: &ScopeTicket,
) -> Option<ContractSnapshot> {
    let scope = ticket.scope();
    let owner = scope.owner.as_ref()?;

    let result = ticket
        .run(backend.fetch_provider_contract(&scope.content_key, owner))
        .await;
    match result {
        None => {
            tracing::debug!(scope = %scope, "contract fetch abandoned after scope switch");
            None
        }
        Some(Err(e)) => {
            tracing::debug!(scope = %scope, error = %e, "contract fetch failed, skipping tick");
            None
        }
        Some(Ok(snapshot)) if !snapshot.success => {
            tracing::debug!(scope = %scope, "backend could not read contract, skipping tick");
            None
        }
        Some(Ok(snapshot)) => Some(snapshot),
    }
}
