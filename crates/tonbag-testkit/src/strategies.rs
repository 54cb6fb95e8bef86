//! Property test strategies for tonbag types
//!
//! Provider keys are drawn from a small pool so generated snapshots and
//! views overlap often enough to exercise promotion and removal.

use proptest::prelude::*;
use std::collections::HashSet;
use tonbag_core::{Provider, ProviderState, RemoteProvider};

// Re-export proptest for convenience
pub use proptest;

use crate::fixtures;

const KEY_POOL: u8 = 6;

const STATUSES: [&str; 8] = [
    "active",
    "balance",
    "downloading",
    "resolving",
    "error",
    "inactive",
    "warning-low balance",
    "",
];

/// Strategy for a provider index from the shared pool.
pub fn arb_provider_index() -> impl Strategy<Value = u8> {
    0..KEY_POOL
}

/// Strategy for a remote entry; keys may repeat across calls.
pub fn arb_remote() -> impl Strategy<Value = RemoteProvider> {
    (arb_provider_index(), 0..STATUSES.len(), any::<bool>()).prop_map(|(n, status, peer)| {
        let mut remote = fixtures::remote(n, STATUSES[status]);
        if peer {
            remote.peer = Some(format!("peer{n:02}ffffffff"));
        }
        remote
    })
}

/// Strategy for a contract snapshot's provider list, duplicates allowed.
pub fn arb_snapshot() -> impl Strategy<Value = Vec<RemoteProvider>> {
    prop::collection::vec(arb_remote(), 0..8)
}

/// Strategy for a lifecycle tag.
pub fn arb_state() -> impl Strategy<Value = ProviderState> {
    prop_oneof![
        Just(ProviderState::New),
        Just(ProviderState::Committed),
        Just(ProviderState::Removed),
    ]
}

/// Strategy for a merged view with unique keys.
pub fn arb_view() -> impl Strategy<Value = Vec<Provider>> {
    prop::collection::vec((arb_provider_index(), arb_state()), 0..8).prop_map(|entries| {
        let mut seen = HashSet::new();
        entries
            .into_iter()
            .filter(|(n, _)| seen.insert(*n))
            .map(|(n, state)| match state {
                ProviderState::New => fixtures::proposed(n),
                state => Provider::from_remote(fixtures::remote(n, "active"), state),
            })
            .collect()
    })
}
