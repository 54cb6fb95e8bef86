//! Scope tracking for in-flight requests.
//!
//! Every request that outlives a user action is issued under a
//! [`ScopeTicket`]. Switching scope cancels the old ticket's token (so its
//! future is dropped at the next suspension point) and bumps a generation
//! counter (so a response that still slips through is recognized as stale
//! and discarded on arrival).

use parking_lot::Mutex;
use std::future::Future;
use tokio::sync::watch;
use tonbag_core::ContentScope;

use crate::tasks::CancellationToken;

/// Tag attached to work issued for one scope selection.
#[derive(Debug, Clone)]
pub struct ScopeTicket {
    scope: ContentScope,
    generation: u64,
    token: CancellationToken,
}

impl ScopeTicket {
    /// The scope the work was issued for.
    pub fn scope(&self) -> &ContentScope {
        &self.scope
    }

    /// Selection counter at issue time.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether the scope has been switched away from.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolve once the scope has been switched away from.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    /// Run `fut` unless the scope is switched first.
    pub async fn run<F: Future>(&self, fut: F) -> Option<F::Output> {
        self.token.run_until_cancelled(fut).await
    }
}

#[derive(Debug)]
struct ScopeState {
    current: Option<ContentScope>,
    generation: u64,
    cancel_tx: watch::Sender<bool>,
}

/// Holder of the currently selected scope.
#[derive(Debug)]
pub struct ScopeTracker {
    state: Mutex<ScopeState>,
}

impl ScopeTracker {
    /// Tracker with nothing selected.
    pub fn new() -> Self {
        let (cancel_tx, _) = watch::channel(false);
        Self {
            state: Mutex::new(ScopeState {
                current: None,
                generation: 0,
                cancel_tx,
            }),
        }
    }

    /// Make `scope` current, cancelling every ticket of the previous
    /// selection. Selecting the same scope again still starts a new
    /// generation. Returns the ticket of the new selection.
    pub fn switch(&self, scope: Option<ContentScope>) -> Option<ScopeTicket> {
        let mut state = self.state.lock();
        let _ = state.cancel_tx.send(true);

        let (cancel_tx, cancel_rx) = watch::channel(false);
        state.cancel_tx = cancel_tx;
        state.generation += 1;
        state.current = scope.clone();

        scope.map(|scope| ScopeTicket {
            scope,
            generation: state.generation,
            token: CancellationToken::from_receiver(cancel_rx),
        })
    }

    /// Ticket for new work under the current selection.
    pub fn ticket(&self) -> Option<ScopeTicket> {
        let state = self.state.lock();
        let scope = state.current.clone()?;
        Some(ScopeTicket {
            scope,
            generation: state.generation,
            token: CancellationToken::from_receiver(state.cancel_tx.subscribe()),
        })
    }

    /// Currently selected scope.
    pub fn current(&self) -> Option<ContentScope> {
        self.state.lock().current.clone()
    }

    /// Whether work tagged with `ticket` may still touch the view.
    pub fn is_current(&self, ticket: &ScopeTicket) -> bool {
        let state = self.state.lock();
        state.generation == ticket.generation && state.current.as_ref() == Some(&ticket.scope)
    }
}

impl Default for ScopeTracker {
    fn default() -> Self {
        Self::new()
    }
}
