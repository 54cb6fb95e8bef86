//! Provider session: scope lifecycle, polling and the reconciliation
//! scenarios end to end.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;
use tonbag_app::events::{ProviderAdded, PROVIDER_ADDED, WANT_ADD_PROVIDER, WANT_SET_PROVIDERS};
use tonbag_app::{
    AddProviderFlow, AppError, PersistentEditCache, PollingLoop, ProvidersSession, SubmitAction,
};
use tonbag_core::effects::BackendError;
use tonbag_core::{ContentKey, ContractSnapshot, ProviderKey, ProviderState};
use tonbag_effects::EventBus;
use tonbag_testkit::{fixtures, FixedClock, MemoryStorageHandler, MockBackend};

const INTERVAL: Duration = Duration::from_secs(3);

struct Harness {
    bus: EventBus,
    backend: Arc<MockBackend>,
    storage: MemoryStorageHandler,
    session: ProvidersSession,
    add: AddProviderFlow,
}

impl Harness {
    fn new() -> Self {
        let bus = EventBus::new();
        let backend = Arc::new(MockBackend::new());
        let storage = MemoryStorageHandler::new();
        let clock = Arc::new(FixedClock::new(1_700_000_000));
        let cache = Arc::new(PersistentEditCache::new(
            Arc::new(storage.clone()),
            clock.clone(),
        ));
        let session = ProvidersSession::new(
            bus.clone(),
            backend.clone(),
            cache,
            clock,
            PollingLoop::new(INTERVAL),
        );
        let add = AddProviderFlow::new(bus.clone(), backend.clone());
        Self {
            bus,
            backend,
            storage,
            session,
            add,
        }
    }

    async fn add_provider(&self, content: &ContentKey, n: u8) {
        self.add
            .submit(content, fixtures::provider_key(n).as_str())
            .await
            .unwrap();
        self.session.flush().await.unwrap();
    }

    fn keys(&self) -> Vec<(ProviderKey, ProviderState)> {
        self.session
            .snapshot()
            .providers
            .into_iter()
            .map(|p| (p.key, p.state))
            .collect()
    }
}

#[tokio::test]
async fn scenario_a_undeployed_contract_keeps_new_provider() {
    let h = Harness::new();
    let content = fixtures::content_key(1);
    h.session.select_scope(Some(fixtures::bound_scope(1))).await.unwrap();

    h.add_provider(&content, 1).await;
    assert!(h.session.poll_now().await.unwrap());
    h.session.flush().await.unwrap();

    assert_eq!(h.keys(), vec![(fixtures::provider_key(1), ProviderState::New)]);
    let view = h.session.snapshot();
    assert!(view.fetched);
    assert_eq!(view.submit_action, SubmitAction::DeployContract);
    assert!(h
        .storage
        .raw(&PersistentEditCache::storage_key(&content))
        .is_some());
}

#[tokio::test]
async fn scenario_b_remote_confirmation_promotes_and_clears_cache() {
    let h = Harness::new();
    let content = fixtures::content_key(1);
    h.session.select_scope(Some(fixtures::bound_scope(1))).await.unwrap();
    h.add_provider(&content, 1).await;

    h.backend
        .set_contract(&content, fixtures::deployed(vec![fixtures::remote(1, "active")]));
    assert!(h.session.poll_now().await.unwrap());
    h.session.flush().await.unwrap();

    assert_eq!(
        h.keys(),
        vec![(fixtures::provider_key(1), ProviderState::Committed)]
    );
    assert!(h.storage.is_empty());
    assert_eq!(h.session.snapshot().submit_action, SubmitAction::TopUpBalance);
}

#[tokio::test]
async fn scenario_c_removal_survives_next_snapshot() {
    let h = Harness::new();
    let content = fixtures::content_key(1);
    h.backend
        .set_contract(&content, fixtures::deployed(vec![fixtures::remote(2, "active")]));
    h.session.select_scope(Some(fixtures::bound_scope(1))).await.unwrap();
    h.session.poll_now().await.unwrap();

    let state = h.session.toggle_removal(&fixtures::provider_key(2)).unwrap();
    assert_eq!(state, ProviderState::Removed);
    assert_eq!(h.backend.submissions().len(), 0);

    h.session.poll_now().await.unwrap();
    assert_eq!(
        h.keys(),
        vec![(fixtures::provider_key(2), ProviderState::Removed)]
    );
    assert_eq!(h.session.snapshot().submit_action, SubmitAction::ApplyChanges);
}

#[tokio::test]
async fn stale_snapshot_is_discarded_after_scope_switch() {
    let h = Harness::new();
    h.session.select_scope(Some(fixtures::bound_scope(1))).await.unwrap();
    let stale = h.session.ticket().unwrap();

    h.session.select_scope(Some(fixtures::bound_scope(2))).await.unwrap();
    let before = h.session.snapshot();
    let applied = h.session.apply_snapshot(
        &stale,
        &fixtures::deployed(vec![fixtures::remote(1, "active")]),
    );

    assert!(!applied);
    assert_eq!(h.session.snapshot(), before);
    assert!(stale.is_cancelled());
}

#[tokio::test(start_paused = true)]
async fn in_flight_fetch_for_previous_scope_never_lands() {
    let h = Harness::new();
    let first = fixtures::content_key(1);
    h.backend
        .set_contract(&first, fixtures::deployed(vec![fixtures::remote(1, "active")]));
    h.backend.set_contract_delay(Some(Duration::from_secs(1)));

    h.session.select_scope(Some(fixtures::bound_scope(1))).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(h.backend.contract_calls(), 1);

    h.session.select_scope(Some(fixtures::bound_scope(2))).await.unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;

    let view = h.session.snapshot();
    assert!(view.providers.is_empty());
    assert!(view.contract_address.is_none());
}

#[tokio::test(start_paused = true)]
async fn polling_runs_only_while_wallet_bound() {
    let h = Harness::new();
    let content = fixtures::content_key(1);
    h.backend
        .set_contract(&content, fixtures::deployed(vec![fixtures::remote(1, "active")]));

    h.session.select_scope(Some(fixtures::bound_scope(1))).await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(h.backend.contract_calls(), 1);
    assert!(h.session.is_polling());
    assert_eq!(h.session.snapshot().contract_address.as_deref(), Some("EQcontract"));

    tokio::time::sleep(INTERVAL).await;
    assert_eq!(h.backend.contract_calls(), 2);

    h.session.select_scope(Some(fixtures::unbound_scope(1))).await.unwrap();
    assert!(!h.session.is_polling());
    tokio::time::sleep(INTERVAL * 5).await;
    assert_eq!(h.backend.contract_calls(), 2);
    assert!(!h.session.snapshot().fetched);
}

#[tokio::test(start_paused = true)]
async fn failed_tick_is_skipped_and_retried() {
    let h = Harness::new();
    let content = fixtures::content_key(1);
    h.backend
        .set_contract(&content, fixtures::deployed(vec![fixtures::remote(1, "active")]));
    h.backend.fail_next_contract(BackendError::Unavailable);

    h.session.select_scope(Some(fixtures::bound_scope(1))).await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(!h.session.snapshot().fetched);

    tokio::time::sleep(INTERVAL).await;
    assert!(h.session.snapshot().fetched);
    assert_eq!(h.session.snapshot().providers.len(), 1);
}

#[tokio::test]
async fn unsuccessful_read_changes_nothing() {
    let h = Harness::new();
    let content = fixtures::content_key(1);
    h.session.select_scope(Some(fixtures::bound_scope(1))).await.unwrap();
    h.backend.set_contract(
        &content,
        ContractSnapshot {
            success: false,
            ..Default::default()
        },
    );
    assert!(!h.session.poll_now().await.unwrap());
    assert!(!h.session.snapshot().fetched);
}

#[tokio::test]
async fn remounting_never_duplicates_delivery() {
    let h = Harness::new();
    let content = fixtures::content_key(1);
    for scope in [1, 2, 1, 2, 1] {
        h.session
            .select_scope(Some(fixtures::bound_scope(scope)))
            .await
            .unwrap();
    }
    assert_eq!(h.bus.subscriber_count(&PROVIDER_ADDED), 1);

    let delivered = h.bus.publish(
        &PROVIDER_ADDED,
        ProviderAdded {
            content_key: content,
            draft: fixtures::draft(3),
            proof: fixtures::proof(3),
        },
    );
    assert_eq!(delivered, 1);
    h.session.flush().await.unwrap();
    assert_eq!(h.keys(), vec![(fixtures::provider_key(3), ProviderState::New)]);
}

#[tokio::test]
async fn events_for_other_content_are_ignored() {
    let h = Harness::new();
    h.session.select_scope(Some(fixtures::bound_scope(1))).await.unwrap();
    h.add_provider(&fixtures::content_key(2), 5).await;
    assert!(h.session.snapshot().providers.is_empty());
    assert!(h.storage.is_empty());
}

#[tokio::test]
async fn drafts_rehydrate_on_return() {
    let h = Harness::new();
    let content = fixtures::content_key(1);
    h.session.select_scope(Some(fixtures::bound_scope(1))).await.unwrap();
    h.add_provider(&content, 1).await;
    h.add_provider(&content, 2).await;

    h.session.select_scope(Some(fixtures::bound_scope(2))).await.unwrap();
    assert!(h.session.snapshot().providers.is_empty());

    h.session.select_scope(Some(fixtures::unbound_scope(1))).await.unwrap();
    assert_eq!(
        h.keys(),
        vec![
            (fixtures::provider_key(1), ProviderState::New),
            (fixtures::provider_key(2), ProviderState::New),
        ]
    );
}

#[tokio::test]
async fn discarded_draft_is_not_resurrected() {
    let h = Harness::new();
    let content = fixtures::content_key(1);
    h.session.select_scope(Some(fixtures::bound_scope(1))).await.unwrap();
    h.add_provider(&content, 1).await;

    h.session
        .discard_uncommitted(&fixtures::provider_key(1))
        .await
        .unwrap();
    h.session.poll_now().await.unwrap();
    assert!(h.session.snapshot().providers.is_empty());

    h.session.select_scope(Some(fixtures::bound_scope(2))).await.unwrap();
    h.session.select_scope(Some(fixtures::bound_scope(1))).await.unwrap();
    assert!(h.session.snapshot().providers.is_empty());
    assert!(h.storage.is_empty());
}

#[tokio::test]
async fn failed_discard_keeps_the_draft() {
    let h = Harness::new();
    let content = fixtures::content_key(1);
    let key = PersistentEditCache::storage_key(&content);
    h.session.select_scope(Some(fixtures::bound_scope(1))).await.unwrap();
    h.add_provider(&content, 1).await;
    h.add_provider(&content, 2).await;

    h.storage.fail_writes(true);
    let err = h
        .session
        .discard_uncommitted(&fixtures::provider_key(1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Internal { .. }));
    assert_eq!(
        h.keys(),
        vec![
            (fixtures::provider_key(1), ProviderState::New),
            (fixtures::provider_key(2), ProviderState::New),
        ]
    );
    assert!(h.storage.raw(&key).is_some());

    h.storage.fail_writes(false);
    h.session.select_scope(Some(fixtures::bound_scope(2))).await.unwrap();
    h.session.select_scope(Some(fixtures::bound_scope(1))).await.unwrap();
    assert_eq!(h.keys().len(), 2);

    h.session
        .discard_uncommitted(&fixtures::provider_key(1))
        .await
        .unwrap();
    h.session
        .discard_uncommitted(&fixtures::provider_key(2))
        .await
        .unwrap();
    assert!(h.keys().is_empty());
    assert!(h.storage.raw(&key).is_none());
}

#[tokio::test]
async fn discard_and_toggle_guard_their_states() {
    let h = Harness::new();
    let content = fixtures::content_key(1);
    h.backend
        .set_contract(&content, fixtures::deployed(vec![fixtures::remote(1, "active")]));
    h.session.select_scope(Some(fixtures::bound_scope(1))).await.unwrap();
    h.session.poll_now().await.unwrap();
    h.add_provider(&content, 2).await;

    let err = h
        .session
        .discard_uncommitted(&fixtures::provider_key(1))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "INPUT_INVALID");
    assert!(h.session.toggle_removal(&fixtures::provider_key(2)).is_err());
    assert!(matches!(
        h.session.toggle_removal(&fixtures::provider_key(9)),
        Err(AppError::NotFound { .. })
    ));
}

#[tokio::test]
async fn requests_publish_intents() {
    let h = Harness::new();
    let content = fixtures::content_key(1);
    let mut add_requests = h.bus.subscribe_stream(&WANT_ADD_PROVIDER);
    let mut set_requests = h.bus.subscribe_stream(&WANT_SET_PROVIDERS);

    assert!(h.session.request_add_provider().is_err());

    h.session.select_scope(Some(fixtures::unbound_scope(1))).await.unwrap();
    h.session.request_add_provider().unwrap();
    assert_eq!(add_requests.try_recv(), Some(content.clone()));
    assert!(matches!(
        h.session.request_submission(),
        Err(AppError::InvalidInput { .. })
    ));

    h.backend.set_contract(
        &content,
        fixtures::deployed(vec![fixtures::remote(1, "active"), fixtures::remote(2, "active")]),
    );
    h.session.select_scope(Some(fixtures::bound_scope(1))).await.unwrap();
    h.session.poll_now().await.unwrap();
    h.session.toggle_removal(&fixtures::provider_key(2)).unwrap();
    h.add_provider(&content, 3).await;

    let intent = h.session.request_submission().unwrap();
    assert_eq!(set_requests.try_recv(), Some(intent.clone()));
    let keys: Vec<_> = intent.providers.iter().map(|d| d.key.clone()).collect();
    assert_eq!(keys, vec![fixtures::provider_key(1), fixtures::provider_key(3)]);
    assert!(!intent.just_topup);
    assert_eq!(intent.owner, fixtures::owner());
}

#[tokio::test]
async fn close_releases_everything() {
    let h = Harness::new();
    h.session.select_scope(Some(fixtures::bound_scope(1))).await.unwrap();
    h.add_provider(&fixtures::content_key(1), 1).await;

    h.session.close().await;
    assert_eq!(h.bus.subscriber_count(&PROVIDER_ADDED), 0);
    assert!(h.session.scope().is_none());
    assert!(!h.session.is_polling());
    assert_eq!(h.storage.len(), 1);
    assert!(h.session.flush().await.is_err());
}
