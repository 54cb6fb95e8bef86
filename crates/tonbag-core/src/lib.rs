//! # tonbag-core - Layer 1: Foundation
//!
//! **Purpose**: Define the domain vocabulary and effect interfaces shared by
//! every tonbag crate.
//!
//! # Architecture Constraints
//!
//! - YES identifiers, amounts and domain records (providers, tunnel routes,
//!   transaction payloads)
//! - YES effect traits for the external collaborators (backend, wallet,
//!   storage, clock)
//! - YES the unified [`TonbagError`]
//! - NO handler implementations (those live in `tonbag-effects`)
//! - NO workflow or view state (that is `tonbag-app`)

#![forbid(unsafe_code)]

pub mod amount;
pub mod effects;
pub mod errors;
pub mod identifiers;
pub mod provider;
pub mod transaction;
pub mod tunnel;

pub use amount::TonAmount;
pub use errors::{Result, TonbagError};
pub use identifiers::{ContentKey, ContentScope, OwnerAddress, ProviderKey};
pub use provider::{
    ContractSnapshot, ProofMetadata, Provider, ProviderDraft, ProviderRates, ProviderState,
    ProviderStatus, RemoteProvider,
};
pub use transaction::{SubmissionPayload, WalletMessage, WalletReceipt, WalletRequest};
pub use tunnel::{TunnelDecision, TunnelResolution, TunnelRouteProposal, TunnelSection};
