//! # tonbag-app - Layer 5: Application Core
//!
//! **Purpose**: Keep each content item's provider view consistent with its
//! on-chain contract while the user edits it, and coordinate the modal
//! workflows (add provider, sign transaction, approve tunnel route) over the
//! typed event bus.
//!
//! ## Architecture Constraints
//!
//! This crate depends on:
//! - **Layer 1**: `tonbag-core` for the domain vocabulary and effect traits
//! - **Layer 3**: `tonbag-effects` for the event bus
//! - **MUST NOT**: implement effect handlers (use `tonbag-effects`)
//! - **MUST NOT**: render anything; views are plain data
//!
//! ## Key Components
//!
//! - [`ProviderReconciler`]: merges contract snapshots with local edits
//! - [`PersistentEditCache`]: keeps uncommitted providers across restarts
//! - [`PollingLoop`]: fetches the contract while a wallet is bound
//! - [`ProvidersSession`]: binds the above to the selected scope
//! - [`AddProviderFlow`], [`TransactionFlowCoordinator`],
//!   [`TunnelRouteNegotiator`]: the user-facing workflows
//!
//! ## Usage
//!
//! ```rust,ignore
//! let session = ProvidersSession::new(bus, backend, cache, clock, polling);
//! session.select_scope(Some(ContentScope::bound(content, owner))).await?;
//! let view = session.snapshot();
//! ```

#![forbid(unsafe_code)]

pub mod cache;
pub mod config;
pub mod errors;
pub mod events;
pub mod reconciler;
pub mod scope;
pub mod session;
pub mod tasks;
pub mod views;
pub mod workflows;

pub use cache::{CachedDraft, PersistentEditCache, CACHE_PREFIX};
pub use config::AppConfig;
pub use errors::{AppError, ErrorCategory, ToastLevel};
pub use reconciler::{
    reconcile, reconcile_undeployed, DiscardedDraft, DraftChange, ProviderReconciler,
    ReconcileOutcome,
};
pub use scope::{ScopeTicket, ScopeTracker};
pub use session::ProvidersSession;
pub use tasks::{CancellationToken, TaskRegistry};
pub use views::{ProviderRow, ProvidersView, StatusIndicator, SubmitAction};
pub use workflows::{
    poll_once, request_route_approval, validate_provider_key, AddProviderFlow, FlowState,
    PollingLoop, SectionCounter, SnapshotSink, TransactionFlowCoordinator, TunnelRouteNegotiator,
};
