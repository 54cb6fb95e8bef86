//! Tunnel route negotiation over the bus.

#![allow(clippy::unwrap_used)]

use assert_matches::assert_matches;
use std::sync::Arc;
use tonbag_app::events::{
    TUNNEL_CHECK, TUNNEL_CHECK_RESULT, TUNNEL_REINIT_ASK, TUNNEL_REINIT_ASK_RESULT,
};
use tonbag_app::{request_route_approval, AppError, TunnelRouteNegotiator};
use tonbag_core::{TunnelDecision, TunnelResolution};
use tonbag_effects::EventBus;
use tonbag_testkit::{fixtures, MockBackend};

fn setup() -> (EventBus, Arc<MockBackend>, TunnelRouteNegotiator) {
    let bus = EventBus::new();
    let backend = Arc::new(MockBackend::new());
    let negotiator = TunnelRouteNegotiator::new(bus.clone(), backend.clone());
    (bus, backend, negotiator)
}

#[tokio::test]
async fn scenario_d_reroute_resolves_once_per_proposal() {
    let (bus, _backend, negotiator) = setup();
    let mut results = bus.subscribe_stream(&TUNNEL_CHECK_RESULT);

    bus.publish(&TUNNEL_CHECK, fixtures::proposal(2));
    assert_eq!(negotiator.pending().map(|p| p.len()), Some(2));
    assert!(negotiator.is_blocking());

    negotiator.reroute(3).await.unwrap();
    assert_eq!(
        results.try_recv(),
        Some(TunnelResolution::new(2, TunnelDecision::Reroute(3)))
    );
    assert!(!negotiator.is_blocking());

    assert_matches!(negotiator.accept(), Err(AppError::NotFound { .. }));
    assert_matches!(negotiator.reroute(2).await, Err(AppError::NotFound { .. }));
    assert!(results.try_recv().is_none());

    bus.publish(&TUNNEL_CHECK, fixtures::proposal(3));
    negotiator.accept().unwrap();
    assert_eq!(
        results.try_recv(),
        Some(TunnelResolution::new(3, TunnelDecision::Accept))
    );
    assert!(results.try_recv().is_none());
}

#[tokio::test]
async fn second_proposal_replaces_the_first() {
    let (bus, _backend, negotiator) = setup();
    let mut results = bus.subscribe_stream(&TUNNEL_CHECK_RESULT);

    bus.publish(&TUNNEL_CHECK, fixtures::proposal(2));
    bus.publish(&TUNNEL_CHECK, fixtures::proposal(4));
    assert_eq!(negotiator.pending(), Some(fixtures::proposal(4)));
    assert_eq!(
        results.try_recv(),
        Some(TunnelResolution::new(2, TunnelDecision::Cancel))
    );

    negotiator.accept().unwrap();
    assert_eq!(
        results.try_recv(),
        Some(TunnelResolution::new(4, TunnelDecision::Accept))
    );
    assert!(negotiator.cancel().is_err());
    assert!(results.try_recv().is_none());
}

#[tokio::test]
async fn replaced_requester_is_told_cancel() {
    let (bus, _backend, negotiator) = setup();

    let requester = bus.clone();
    let first = tokio::spawn(async move {
        request_route_approval(&requester, fixtures::proposal(2)).await
    });
    while negotiator.pending().is_none() {
        tokio::task::yield_now().await;
    }

    let requester = bus.clone();
    let second = tokio::spawn(async move {
        request_route_approval(&requester, fixtures::proposal(4)).await
    });
    while negotiator.pending().map(|p| p.len()) != Some(4) {
        tokio::task::yield_now().await;
    }
    negotiator.accept().unwrap();

    assert_eq!(first.await.unwrap(), Some(TunnelDecision::Cancel));
    assert_eq!(second.await.unwrap(), Some(TunnelDecision::Accept));
    assert!(negotiator.pending().is_none());
}

#[tokio::test]
async fn out_of_range_counts_are_rejected_before_publish() {
    let (bus, backend, negotiator) = setup();
    let mut results = bus.subscribe_stream(&TUNNEL_CHECK_RESULT);
    backend.set_max_sections(4);
    bus.publish(&TUNNEL_CHECK, fixtures::proposal(2));

    assert_matches!(negotiator.reroute(0).await, Err(AppError::InvalidInput { .. }));
    assert_matches!(negotiator.reroute(5).await, Err(AppError::InvalidInput { .. }));
    assert!(results.try_recv().is_none());
    assert!(negotiator.pending().is_some());

    negotiator.reroute(4).await.unwrap();
    assert_eq!(
        results.try_recv(),
        Some(TunnelResolution::new(2, TunnelDecision::Reroute(4)))
    );
    assert_eq!(negotiator.max_sections().await.unwrap(), 4);
    assert_eq!(backend.max_sections_calls(), 1);
}

#[tokio::test]
async fn section_counter_starts_at_route_length() {
    let (bus, backend, negotiator) = setup();
    backend.set_max_sections(3);
    bus.publish(&TUNNEL_CHECK, fixtures::proposal(2));

    let mut counter = negotiator.section_counter().await.unwrap();
    assert_eq!(counter.value(), 2);
    assert_eq!(counter.increment(), 3);
    assert_eq!(counter.increment(), 3);
    negotiator.reroute(counter.value()).await.unwrap();
}

#[tokio::test]
async fn route_approval_round_trip() {
    let (bus, _backend, negotiator) = setup();

    let requester = bus.clone();
    let waiting = tokio::spawn(async move {
        request_route_approval(&requester, fixtures::proposal(3)).await
    });
    while negotiator.pending().is_none() {
        tokio::task::yield_now().await;
    }
    negotiator.accept().unwrap();

    assert_eq!(waiting.await.unwrap(), Some(TunnelDecision::Accept));
    assert_eq!(bus.subscriber_count(&TUNNEL_CHECK_RESULT), 0);
}

#[tokio::test]
async fn reinit_question_is_answered_once() {
    let (bus, _backend, negotiator) = setup();
    let mut answers = bus.subscribe_stream(&TUNNEL_REINIT_ASK_RESULT);

    assert!(negotiator.answer_reinit(true).is_err());
    bus.publish(&TUNNEL_REINIT_ASK, ());
    assert!(negotiator.reinit_asked());
    assert!(negotiator.is_blocking());

    negotiator.answer_reinit(false).unwrap();
    assert_eq!(answers.try_recv(), Some(false));
    assert!(negotiator.answer_reinit(true).is_err());
    assert!(answers.try_recv().is_none());
}
