//! Algebraic properties of the snapshot merge.

#![allow(clippy::unwrap_used)]

use proptest::prelude::*;
use std::collections::HashSet;
use tonbag_app::{reconcile, CachedDraft, DraftChange, ProviderReconciler};
use tonbag_core::{ContractSnapshot, ProviderState};
use tonbag_testkit::fixtures;
use tonbag_testkit::strategies::{arb_provider_index, arb_snapshot, arb_view};

proptest! {
    #[test]
    fn merge_is_idempotent(snapshot in arb_snapshot(), view in arb_view()) {
        let once = reconcile(&snapshot, &view).providers;
        let twice = reconcile(&snapshot, &once).providers;
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn merged_keys_are_unique(snapshot in arb_snapshot(), view in arb_view()) {
        let merged = reconcile(&snapshot, &view).providers;
        let keys: HashSet<_> = merged.iter().map(|p| p.key.clone()).collect();
        prop_assert_eq!(keys.len(), merged.len());
    }

    #[test]
    fn remote_entries_lead_in_snapshot_order(snapshot in arb_snapshot(), view in arb_view()) {
        let merged = reconcile(&snapshot, &view).providers;
        let mut expected = Vec::new();
        for remote in &snapshot {
            if !expected.contains(&remote.key) {
                expected.push(remote.key.clone());
            }
        }
        let leading: Vec<_> = merged.iter().take(expected.len()).map(|p| p.key.clone()).collect();
        prop_assert_eq!(&leading, &expected);
        prop_assert!(merged[expected.len()..].iter().all(|p| p.state == ProviderState::New));
    }

    #[test]
    fn new_entries_seen_remotely_are_promoted(snapshot in arb_snapshot(), view in arb_view()) {
        let outcome = reconcile(&snapshot, &view);
        let remote: HashSet<_> = snapshot.iter().map(|r| r.key.clone()).collect();
        for local in view.iter().filter(|p| p.state == ProviderState::New) {
            let entries: Vec<_> = outcome.providers.iter().filter(|p| p.key == local.key).collect();
            prop_assert_eq!(entries.len(), 1);
            if remote.contains(&local.key) {
                prop_assert_eq!(entries[0].state, ProviderState::Committed);
                prop_assert!(outcome.promoted.contains(&local.key));
            } else {
                prop_assert_eq!(entries[0].state, ProviderState::New);
            }
        }
    }

    #[test]
    fn removal_persists_while_remote(snapshot in arb_snapshot(), view in arb_view()) {
        let merged = reconcile(&snapshot, &view).providers;
        let remote: HashSet<_> = snapshot.iter().map(|r| r.key.clone()).collect();
        for removed in view.iter().filter(|p| p.state == ProviderState::Removed) {
            let entry = merged.iter().find(|p| p.key == removed.key);
            if remote.contains(&removed.key) {
                prop_assert_eq!(entry.map(|p| p.state), Some(ProviderState::Removed));
            } else {
                prop_assert!(entry.is_none());
            }
        }
    }

    #[test]
    fn promoted_drafts_leave_the_mirror(
        locals in prop::collection::vec(arb_provider_index(), 0..6),
        snapshot in arb_snapshot(),
    ) {
        let mut reconciler = ProviderReconciler::new();
        for n in &locals {
            reconciler.add_local(fixtures::draft(*n), fixtures::proof(*n), 0);
        }
        let change = reconciler.apply_snapshot(&fixtures::deployed(snapshot.clone()));

        let remote: HashSet<_> = snapshot.iter().map(|r| r.key.clone()).collect();
        let mirrored: HashSet<_> = reconciler.drafts().iter().map(CachedDraft::key).cloned().collect();
        prop_assert!(mirrored.is_disjoint(&remote));
        match change {
            Some(DraftChange::Purge(keys)) => {
                prop_assert!(keys.iter().all(|k| remote.contains(k)));
            }
            None => prop_assert!(locals.iter().all(|n| !remote.contains(&fixtures::provider_key(*n)))),
            Some(other) => prop_assert!(false, "unexpected change {:?}", other),
        }
    }

    #[test]
    fn undeployed_snapshot_keeps_only_local_drafts(view in arb_view()) {
        let mut reconciler = ProviderReconciler::new();
        for provider in view.iter().filter(|p| p.state == ProviderState::New) {
            reconciler.add_local(provider.draft.clone(), provider.proof.clone(), 0);
        }
        let before: Vec<_> = reconciler.providers().to_vec();
        reconciler.apply_snapshot(&ContractSnapshot::not_deployed());
        prop_assert_eq!(reconciler.providers(), before.as_slice());
        prop_assert!(reconciler.fetched());
    }
}
