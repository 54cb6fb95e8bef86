//! Backend collaborator interface.
//!
//! The backend reads the per-bag provider contract, prices candidate
//! providers and builds the opaque payloads that the wallet signs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::amount::TonAmount;
use crate::identifiers::{ContentKey, OwnerAddress, ProviderKey};
use crate::provider::{ContractSnapshot, ProviderDraft, ProviderRates};
use crate::transaction::SubmissionPayload;

/// Error type for backend calls.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum BackendError {
    /// The backend process is not reachable
    #[error("backend unavailable")]
    Unavailable,
    /// The call did not complete in time
    #[error("backend call timed out")]
    Timeout,
    /// The backend answered with an error
    #[error("backend rejected the request: {reason}")]
    Rejected {
        /// Reason reported by the backend
        reason: String,
    },
    /// The backend answered with something that could not be decoded
    #[error("malformed backend response: {reason}")]
    Malformed {
        /// Decode failure
        reason: String,
    },
}

impl BackendError {
    /// Shorthand for [`BackendError::Rejected`].
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }
}

/// Calls served by the storage backend.
#[async_trait]
pub trait BackendEffects: Send + Sync {
    /// Read the provider contract of a bag for the given owner.
    async fn fetch_provider_contract(
        &self,
        content: &ContentKey,
        owner: &OwnerAddress,
    ) -> Result<ContractSnapshot, BackendError>;

    /// Contact a candidate provider and obtain its offer for the bag.
    async fn fetch_provider_rates(
        &self,
        content: &ContentKey,
        candidate: &ProviderKey,
    ) -> Result<ProviderRates, BackendError>;

    /// Build the deploy / update / top-up message for a provider set.
    async fn build_provider_submission(
        &self,
        content: &ContentKey,
        owner: &OwnerAddress,
        amount: TonAmount,
        providers: &[ProviderDraft],
    ) -> Result<SubmissionPayload, BackendError>;

    /// Build the message that withdraws the remaining contract balance.
    async fn build_withdrawal(
        &self,
        content: &ContentKey,
        owner: &OwnerAddress,
    ) -> Result<SubmissionPayload, BackendError>;

    /// Upper bound on the number of sections a tunnel route may have.
    async fn max_tunnel_sections(&self) -> Result<u32, BackendError>;
}
