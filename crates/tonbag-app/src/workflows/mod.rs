//! Workflows driven by user intents and bus events.
//!
//! Each workflow owns its bus subscriptions; dropping it releases them.

pub mod add_provider;
pub mod polling;
pub mod transaction;
pub mod tunnel;

pub use add_provider::{validate_provider_key, AddProviderFlow};
pub use polling::{poll_once, PollingLoop, SnapshotSink};
pub use transaction::{FlowState, TransactionFlowCoordinator, DEPOSIT_DECIMALS};
pub use tunnel::{request_route_approval, SectionCounter, TunnelRouteNegotiator};
