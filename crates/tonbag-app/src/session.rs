//! Provider view session.
//!
//! A [`ProvidersSession`] hosts the provider view of whichever content item
//! is selected. It owns the per-scope resources (the `provider-added`
//! subscription and the poll loop) and releases them on every scope switch,
//! so a view that is selected, left and selected again never receives an
//! event twice.
//!
//! Cache writes go through a single worker task in submission order. A
//! discard followed by a quick reselect therefore always reads the cache
//! after the discard has been written.
//!
//! # Blocking Lock Usage
//!
//! The view and the scope tracker are guarded by `parking_lot::Mutex`.
//! Neither is held across `.await`. Where both are taken, the view lock is
//! taken first.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tonbag_core::effects::{BackendEffects, PhysicalTimeEffects};
use tonbag_core::{
    ContentKey, ContentScope, ContractSnapshot, ProviderKey, ProviderState, TonbagError,
};
use tonbag_effects::{EventBus, Subscription};

use crate::cache::{CachedDraft, PersistentEditCache};
use crate::errors::AppError;
use crate::events::{
    ProviderAdded, SetProvidersIntent, PROVIDER_ADDED, WANT_ADD_PROVIDER, WANT_SET_PROVIDERS,
};
use crate::reconciler::{DraftChange, ProviderReconciler};
use crate::scope::{ScopeTicket, ScopeTracker};
use crate::tasks::TaskRegistry;
use crate::views::ProvidersView;
use crate::workflows::polling::{poll_once, PollingLoop, SnapshotSink};

enum CacheOp {
    Add {
        ticket: ScopeTicket,
        event: ProviderAdded,
    },
    Remove {
        content: ContentKey,
        key: ProviderKey,
        ack: oneshot::Sender<Result<bool, TonbagError>>,
    },
    Purge {
        content: ContentKey,
        keys: Vec<ProviderKey>,
    },
    Load {
        content: ContentKey,
        reply: oneshot::Sender<Vec<CachedDraft>>,
    },
    Flush {
        reply: oneshot::Sender<()>,
    },
}

/// Applies cache operations one at a time.
struct CacheWorker {
    cache: Arc<PersistentEditCache>,
    clock: Arc<dyn PhysicalTimeEffects>,
    scope: Arc<ScopeTracker>,
    view: Arc<Mutex<ProviderReconciler>>,
}

impl CacheWorker {
    async fn run(self, mut ops: mpsc::UnboundedReceiver<CacheOp>) {
        while let Some(op) = ops.recv().await {
            self.handle(op).await;
        }
    }

    async fn handle(&self, op: CacheOp) {
        match op {
            CacheOp::Add { ticket, event } => self.add(&ticket, event).await,
            CacheOp::Remove { content, key, ack } => {
                let removed = self.cache.remove(&content, &key).await;
                if let Err(e) = &removed {
                    tracing::warn!(
                        content = content.short(),
                        provider = key.short(),
                        error = %e,
                        "failed to drop cached draft"
                    );
                }
                let _ = ack.send(removed);
            }
            CacheOp::Purge { content, keys } => {
                if let Err(e) = self.cache.purge(&content, &keys).await {
                    tracing::warn!(content = content.short(), error = %e, "failed to purge cached drafts");
                }
            }
            CacheOp::Load { content, reply } => {
                let drafts = self.cache.load(&content).await.unwrap_or_else(|e| {
                    tracing::warn!(content = content.short(), error = %e, "failed to read cached drafts");
                    Vec::new()
                });
                let _ = reply.send(drafts);
            }
            CacheOp::Flush { reply } => {
                let _ = reply.send(());
            }
        }
    }

    async fn add(&self, ticket: &ScopeTicket, event: ProviderAdded) {
        let now = self.clock.now_secs().await;
        let persist = {
            let mut view = self.view.lock();
            if self.scope.is_current(ticket) {
                matches!(
                    view.add_local(event.draft.clone(), event.proof.clone(), now),
                    Some(DraftChange::Insert(_))
                )
            } else {
                // Scope left before the event was handled; keep the draft for
                // the next visit.
                true
            }
        };
        if !persist {
            return;
        }
        if let Err(e) = self
            .cache
            .insert(&event.content_key, event.draft, event.proof)
            .await
        {
            tracing::warn!(content = event.content_key.short(), error = %e, "failed to cache draft");
        }
    }
}

/// Folds polled snapshots into the view of the scope they were fetched for.
struct ViewSink {
    scope: Arc<ScopeTracker>,
    view: Arc<Mutex<ProviderReconciler>>,
    cache_tx: mpsc::UnboundedSender<CacheOp>,
}

impl ViewSink {
    fn apply(&self, ticket: &ScopeTicket, snapshot: &ContractSnapshot) -> bool {
        let change = {
            let mut view = self.view.lock();
            if !self.scope.is_current(ticket) {
                tracing::debug!(scope = %ticket.scope(), "discarding snapshot for a previous scope");
                return false;
            }
            view.apply_snapshot(snapshot)
        };
        if let Some(DraftChange::Purge(keys)) = change {
            let _ = self.cache_tx.send(CacheOp::Purge {
                content: ticket.scope().content_key.clone(),
                keys,
            });
        }
        true
    }
}

#[async_trait]
impl SnapshotSink for ViewSink {
    async fn apply_snapshot(&self, ticket: &ScopeTicket, snapshot: ContractSnapshot) {
        self.apply(ticket, &snapshot);
    }
}

/// Resources that live exactly as long as one scope selection.
struct ActiveScope {
    tasks: TaskRegistry,
    _added: Subscription,
}

/// The provider view of the selected content item.
///
/// Must be created inside a Tokio runtime.
pub struct ProvidersSession {
    bus: EventBus,
    backend: Arc<dyn BackendEffects>,
    polling: PollingLoop,
    scope: Arc<ScopeTracker>,
    view: Arc<Mutex<ProviderReconciler>>,
    sink: Arc<ViewSink>,
    cache_tx: mpsc::UnboundedSender<CacheOp>,
    active: Mutex<Option<ActiveScope>>,
    worker: TaskRegistry,
}

impl ProvidersSession {
    /// Create a session with nothing selected.
    pub fn new(
        bus: EventBus,
        backend: Arc<dyn BackendEffects>,
        cache: Arc<PersistentEditCache>,
        clock: Arc<dyn PhysicalTimeEffects>,
        polling: PollingLoop,
    ) -> Self {
        let scope = Arc::new(ScopeTracker::new());
        let view = Arc::new(Mutex::new(ProviderReconciler::new()));
        let (cache_tx, cache_rx) = mpsc::unbounded_channel();

        let worker = TaskRegistry::new();
        let cache_worker = CacheWorker {
            cache,
            clock,
            scope: scope.clone(),
            view: view.clone(),
        };
        worker.spawn_cancellable(cache_worker.run(cache_rx));

        let sink = Arc::new(ViewSink {
            scope: scope.clone(),
            view: view.clone(),
            cache_tx: cache_tx.clone(),
        });

        Self {
            bus,
            backend,
            polling,
            scope,
            view,
            sink,
            cache_tx,
            active: Mutex::new(None),
            worker,
        }
    }

    /// Switch the view to `scope`, or to nothing.
    ///
    /// Releases everything held for the previous scope, cancels its
    /// in-flight requests and resets the view. The new view starts from the
    /// cached drafts, listens for providers added to its content item and,
    /// when a wallet is bound, starts polling.
    pub async fn select_scope(&self, scope: Option<ContentScope>) -> Result<(), AppError> {
        drop(self.active.lock().take());

        let ticket = {
            let mut view = self.view.lock();
            *view = ProviderReconciler::new();
            self.scope.switch(scope)
        };
        let Some(ticket) = ticket else {
            tracing::debug!("selection cleared");
            return Ok(());
        };
        tracing::info!(scope = %ticket.scope(), "scope selected");

        let content = ticket.scope().content_key.clone();
        let added_tx = self.cache_tx.clone();
        let added_ticket = ticket.clone();
        let added = self.bus.subscribe(&PROVIDER_ADDED, move |event: &ProviderAdded| {
            if event.content_key == added_ticket.scope().content_key {
                let _ = added_tx.send(CacheOp::Add {
                    ticket: added_ticket.clone(),
                    event: event.clone(),
                });
            }
        });

        let (reply, drafts) = oneshot::channel();
        self.send(CacheOp::Load { content, reply })?;
        let drafts = match ticket.run(drafts).await {
            None => return Ok(()),
            Some(Ok(drafts)) => drafts,
            Some(Err(_)) => return Err(AppError::internal("session", "cache worker stopped")),
        };

        {
            let mut view = self.view.lock();
            if !self.scope.is_current(&ticket) {
                return Ok(());
            }
            view.rehydrate(drafts);
        }

        let tasks = TaskRegistry::new();
        self.polling.spawn(
            &tasks,
            self.backend.clone(),
            ticket,
            self.sink.clone() as Arc<dyn SnapshotSink>,
        );
        *self.active.lock() = Some(ActiveScope {
            tasks,
            _added: added,
        });
        Ok(())
    }

    /// Tear down the selection and stop the cache worker once every queued
    /// write has been applied.
    pub async fn close(&self) {
        if let Err(e) = self.select_scope(None).await {
            tracing::debug!(error = %e, "closing session");
        }
        if self.flush().await.is_err() {
            tracing::debug!("cache worker already stopped");
        }
        self.worker.shutdown();
        tracing::info!("session closed");
    }

    /// Currently selected scope.
    pub fn scope(&self) -> Option<ContentScope> {
        self.scope.current()
    }

    /// Ticket for work issued under the current selection.
    pub fn ticket(&self) -> Option<ScopeTicket> {
        self.scope.ticket()
    }

    /// Whether a poll loop is running for the current selection.
    pub fn is_polling(&self) -> bool {
        self.active
            .lock()
            .as_ref()
            .is_some_and(|active| active.tasks.active_tasks() > 0)
    }

    /// Read-only copy of the merged view.
    pub fn snapshot(&self) -> ProvidersView {
        self.view.lock().view()
    }

    /// Fold a snapshot fetched under `ticket` into the view. Returns `false`
    /// when the ticket belongs to a previous selection and the snapshot was
    /// dropped.
    pub fn apply_snapshot(&self, ticket: &ScopeTicket, snapshot: &ContractSnapshot) -> bool {
        self.sink.apply(ticket, snapshot)
    }

    /// Flag a committed provider for removal, or unflag it.
    pub fn toggle_removal(&self, key: &ProviderKey) -> Result<ProviderState, AppError> {
        let state = self.view.lock().toggle_removal(key)?;
        tracing::debug!(provider = key.short(), state = state.as_str(), "provider toggled");
        Ok(state)
    }

    /// Drop an uncommitted provider from the view and, once this returns,
    /// from the cache.
    ///
    /// If the cache cannot be updated the provider is put back in the view
    /// and the storage error is returned.
    pub async fn discard_uncommitted(&self, key: &ProviderKey) -> Result<(), AppError> {
        let ticket = self
            .scope
            .ticket()
            .ok_or_else(|| AppError::not_found("selected content item"))?;
        let discarded = self.view.lock().discard_uncommitted(key)?;

        let removed = async {
            let (ack, done) = oneshot::channel();
            self.send(CacheOp::Remove {
                content: ticket.scope().content_key.clone(),
                key: key.clone(),
                ack,
            })?;
            let removed = done
                .await
                .map_err(|_| AppError::internal("session", "cache worker stopped"))?;
            removed.map_err(AppError::from)
        }
        .await;

        match removed {
            Ok(_) => {
                tracing::debug!(provider = key.short(), "draft discarded");
                Ok(())
            }
            Err(e) => {
                let mut view = self.view.lock();
                if self.scope.is_current(&ticket) {
                    view.restore(discarded);
                }
                Err(e)
            }
        }
    }

    /// Open the add-provider workflow for the selected content item.
    pub fn request_add_provider(&self) -> Result<(), AppError> {
        let content = self.selected_content()?;
        self.bus.publish(&WANT_ADD_PROVIDER, content);
        Ok(())
    }

    /// Hand the current provider set to the transaction flow.
    pub fn request_submission(&self) -> Result<SetProvidersIntent, AppError> {
        let scope = self
            .scope
            .current()
            .ok_or_else(|| AppError::not_found("selected content item"))?;
        let owner = scope
            .owner
            .ok_or_else(|| AppError::invalid_input("wallet", "connect a wallet first"))?;

        let intent = {
            let view = self.view.lock();
            SetProvidersIntent {
                content_key: scope.content_key,
                owner,
                providers: view.submission_set(),
                just_topup: view.submit_action().is_just_topup(),
            }
        };
        self.bus.publish(&WANT_SET_PROVIDERS, intent.clone());
        Ok(intent)
    }

    /// Fetch the contract now instead of waiting for the next tick. Returns
    /// whether a snapshot was applied.
    pub async fn poll_now(&self) -> Result<bool, AppError> {
        let ticket = self
            .scope
            .ticket()
            .ok_or_else(|| AppError::not_found("selected content item"))?;
        match poll_once(self.backend.as_ref(), &ticket).await {
            Some(snapshot) => Ok(self.sink.apply(&ticket, &snapshot)),
            None => Ok(false),
        }
    }

    /// Wait until every cache write queued so far has been applied.
    pub async fn flush(&self) -> Result<(), AppError> {
        let (reply, done) = oneshot::channel();
        self.send(CacheOp::Flush { reply })?;
        done.await
            .map_err(|_| AppError::internal("session", "cache worker stopped"))
    }

    fn selected_content(&self) -> Result<ContentKey, AppError> {
        self.scope
            .current()
            .map(|scope| scope.content_key)
            .ok_or_else(|| AppError::not_found("selected content item"))
    }

    fn send(&self, op: CacheOp) -> Result<(), AppError> {
        self.cache_tx
            .send(op)
            .map_err(|_| AppError::internal("session", "cache worker stopped"))
    }
}

impl Drop for ProvidersSession {
    fn drop(&mut self) {
        self.active.lock().take();
        self.scope.switch(None);
    }
}

impl std::fmt::Debug for ProvidersSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProvidersSession")
            .field("scope", &self.scope.current())
            .field("polling", &self.polling)
            .finish_non_exhaustive()
    }
}
