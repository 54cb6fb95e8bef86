//! Tunnel route proposals and their resolution.

use serde::{Deserialize, Serialize};

/// One hop of a proposed tunnel route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunnelSection {
    /// Node name or identifier
    pub name: String,
    /// Whether this hop was supplied by the user rather than the backend
    #[serde(default)]
    pub outer: bool,
}

impl TunnelSection {
    /// Backend-chosen hop.
    pub fn inner(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outer: false,
        }
    }

    /// User-supplied hop.
    pub fn outer(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outer: true,
        }
    }
}

/// A route the backend asks the user to approve.
///
/// `id` identifies the negotiation; its resolution carries the same id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunnelRouteProposal {
    /// Negotiation identifier
    #[serde(default)]
    pub id: u64,
    /// Ordered hops
    pub sections: Vec<TunnelSection>,
    /// Price per MB of inbound traffic
    pub price_per_mb_in: String,
    /// Price per MB of outbound traffic
    pub price_per_mb_out: String,
}

impl TunnelRouteProposal {
    /// The same route under another negotiation id.
    pub fn with_id(mut self, id: u64) -> Self {
        self.id = id;
        self
    }

    /// Number of hops in the route.
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// Whether the route has no hops.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

/// The user's single decision on a pending route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TunnelDecision {
    /// Use the proposed route
    Accept,
    /// Abandon the tunnel setup
    Cancel,
    /// Ask for a fresh route with the given number of sections
    Reroute(u32),
}

impl TunnelDecision {
    /// The `accepted?` flag of the wire form; `None` for reroute.
    pub fn accepted(self) -> Option<bool> {
        match self {
            Self::Accept => Some(true),
            Self::Cancel => Some(false),
            Self::Reroute(_) => None,
        }
    }

    /// The requested section count of a reroute.
    pub fn reroute_count(self) -> Option<u32> {
        match self {
            Self::Reroute(count) => Some(count),
            Self::Accept | Self::Cancel => None,
        }
    }
}

/// A decision addressed to one negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunnelResolution {
    /// Id of the proposal being answered
    pub id: u64,
    /// The outcome
    pub decision: TunnelDecision,
}

impl TunnelResolution {
    /// Resolve proposal `id` with `decision`.
    pub fn new(id: u64, decision: TunnelDecision) -> Self {
        Self { id, decision }
    }
}
