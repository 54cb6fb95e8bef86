//! Tunnel route negotiation.
//!
//! The backend proposes a route on `tunnel_check` and blocks until the user
//! resolves it on `tunnel_check_result`. Each proposal is resolved exactly
//! once, by id. A proposal that arrives while another is unresolved replaces
//! it, and the replaced one is resolved as cancelled.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tonbag_core::effects::BackendEffects;
use tonbag_core::{TunnelDecision, TunnelResolution, TunnelRouteProposal};
use tonbag_effects::{EventBus, Subscription};

use crate::errors::AppError;
use crate::events::{TUNNEL_CHECK, TUNNEL_CHECK_RESULT, TUNNEL_REINIT_ASK, TUNNEL_REINIT_ASK_RESULT};

#[derive(Debug, Default)]
struct NegotiationState {
    pending: Option<TunnelRouteProposal>,
    reinit_asked: bool,
    max_sections: Option<u32>,
}

/// Holds the route awaiting the user's decision.
pub struct TunnelRouteNegotiator {
    bus: EventBus,
    backend: Arc<dyn BackendEffects>,
    state: Arc<Mutex<NegotiationState>>,
    _proposals: Subscription,
    _reinit: Subscription,
}

impl TunnelRouteNegotiator {
    /// Create the negotiator and start listening for proposals.
    pub fn new(bus: EventBus, backend: Arc<dyn BackendEffects>) -> Self {
        let state = Arc::new(Mutex::new(NegotiationState::default()));

        let slot = state.clone();
        let results = bus.clone();
        let proposals = bus.subscribe(&TUNNEL_CHECK, move |proposal: &TunnelRouteProposal| {
            let previous = slot.lock().pending.replace(proposal.clone());
            match previous {
                Some(previous) => {
                    tracing::warn!(
                        previous = previous.id,
                        id = proposal.id,
                        sections = proposal.len(),
                        "unresolved tunnel route replaced by a new proposal"
                    );
                    results.publish(
                        &TUNNEL_CHECK_RESULT,
                        TunnelResolution::new(previous.id, TunnelDecision::Cancel),
                    );
                }
                None => {
                    tracing::info!(
                        id = proposal.id,
                        sections = proposal.len(),
                        "tunnel route awaiting approval"
                    );
                }
            }
        });

        let slot = state.clone();
        let reinit = bus.subscribe(&TUNNEL_REINIT_ASK, move |_: &()| {
            slot.lock().reinit_asked = true;
        });

        Self {
            bus,
            backend,
            state,
            _proposals: proposals,
            _reinit: reinit,
        }
    }

    /// Route awaiting a decision.
    pub fn pending(&self) -> Option<TunnelRouteProposal> {
        self.state.lock().pending.clone()
    }

    /// Whether the user must answer before doing anything else.
    pub fn is_blocking(&self) -> bool {
        let state = self.state.lock();
        state.pending.is_some() || state.reinit_asked
    }

    /// Largest route length the backend supports. Queried once.
    pub async fn max_sections(&self) -> Result<u32, AppError> {
        let cached = self.state.lock().max_sections;
        if let Some(max) = cached {
            return Ok(max);
        }
        let max = self.backend.max_tunnel_sections().await?.max(1);
        self.state.lock().max_sections = Some(max);
        Ok(max)
    }

    /// Stepper for the reroute length, starting at the pending route's length.
    pub async fn section_counter(&self) -> Result<SectionCounter, AppError> {
        let max = self.max_sections().await?;
        let initial = self
            .pending()
            .map_or(1, |proposal| u32::try_from(proposal.len()).unwrap_or(u32::MAX));
        Ok(SectionCounter::new(initial, max))
    }

    /// Approve the pending route.
    pub fn accept(&self) -> Result<(), AppError> {
        self.resolve(TunnelDecision::Accept)
    }

    /// Reject the pending route.
    pub fn cancel(&self) -> Result<(), AppError> {
        self.resolve(TunnelDecision::Cancel)
    }

    /// Ask for a new route of `count` sections.
    pub async fn reroute(&self, count: u32) -> Result<(), AppError> {
        let max = self.max_sections().await?;
        if !(1..=max).contains(&count) {
            return Err(AppError::invalid_input(
                "sections",
                format!("must be between 1 and {max}, got {count}"),
            ));
        }
        self.resolve(TunnelDecision::Reroute(count))
    }

    /// Whether the backend asked to rebuild a stalled tunnel.
    pub fn reinit_asked(&self) -> bool {
        self.state.lock().reinit_asked
    }

    /// Answer the rebuild question.
    pub fn answer_reinit(&self, rebuild: bool) -> Result<(), AppError> {
        if !std::mem::take(&mut self.state.lock().reinit_asked) {
            return Err(AppError::not_found("tunnel reinit question"));
        }
        tracing::info!(rebuild, "tunnel reinit answered");
        self.bus.publish(&TUNNEL_REINIT_ASK_RESULT, rebuild);
        Ok(())
    }

    fn resolve(&self, decision: TunnelDecision) -> Result<(), AppError> {
        let proposal = self
            .state
            .lock()
            .pending
            .take()
            .ok_or_else(|| AppError::not_found("pending tunnel route"))?;
        tracing::info!(
            id = proposal.id,
            sections = proposal.len(),
            ?decision,
            "tunnel route resolved"
        );
        self.bus
            .publish(&TUNNEL_CHECK_RESULT, TunnelResolution::new(proposal.id, decision));
        Ok(())
    }
}

impl std::fmt::Debug for TunnelRouteNegotiator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TunnelRouteNegotiator")
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}

static NEXT_PROPOSAL_ID: AtomicU64 = AtomicU64::new(1);

/// Publish `proposal` under a fresh id and wait for the decision on it.
///
/// Decisions addressed to other negotiations are skipped. A proposal
/// replaced before the user answers comes back as [`TunnelDecision::Cancel`].
/// Returns `None` if the bus goes away first.
pub async fn request_route_approval(
    bus: &EventBus,
    proposal: TunnelRouteProposal,
) -> Option<TunnelDecision> {
    let id = NEXT_PROPOSAL_ID.fetch_add(1, Ordering::Relaxed);
    let mut results = bus.subscribe_stream(&TUNNEL_CHECK_RESULT);
    bus.publish(&TUNNEL_CHECK, proposal.with_id(id));
    loop {
        let resolution = results.recv().await?;
        if resolution.id == id {
            return Some(resolution.decision);
        }
    }
}

/// +/- stepper for the route length, clamped to `1..=max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionCounter {
    value: u32,
    max: u32,
}

impl SectionCounter {
    /// Counter at `initial`, clamped into range.
    pub fn new(initial: u32, max: u32) -> Self {
        let max = max.max(1);
        Self {
            value: initial.clamp(1, max),
            max,
        }
    }

    /// Step up, stopping at the maximum.
    pub fn increment(&mut self) -> u32 {
        self.value = (self.value + 1).min(self.max);
        self.value
    }

    /// Step down, stopping at one.
    pub fn decrement(&mut self) -> u32 {
        self.value = self.value.saturating_sub(1).max(1);
        self.value
    }

    /// Current count.
    pub fn value(&self) -> u32 {
        self.value
    }

    /// Upper bound.
    pub fn max(&self) -> u32 {
        self.max
    }
}
