//! Bus topic catalogue.
//!
//! Every channel the workflows use is declared here with its payload type.

use serde::{Deserialize, Serialize};
use tonbag_core::{
    ContentKey, OwnerAddress, ProofMetadata, ProviderDraft, RemoteProvider, TunnelResolution,
    TunnelRouteProposal, WalletReceipt,
};
use tonbag_effects::Topic;

/// Open the add-provider workflow for a content item.
pub const WANT_ADD_PROVIDER: Topic<ContentKey> = Topic::new("want_add_provider");

/// A candidate provider was priced and accepted as a local draft.
pub const PROVIDER_ADDED: Topic<ProviderAdded> = Topic::new("provider-added");

/// Start the build-and-sign flow for a provider set.
pub const WANT_SET_PROVIDERS: Topic<SetProvidersIntent> = Topic::new("want_set_providers");

/// The backend proposes a tunnel route.
pub const TUNNEL_CHECK: Topic<TunnelRouteProposal> = Topic::new("tunnel_check");

/// The user's resolution of the pending tunnel route.
pub const TUNNEL_CHECK_RESULT: Topic<TunnelResolution> = Topic::new("tunnel_check_result");

/// A transaction was signed and sent by the wallet.
pub const TRANSACTION_SENT: Topic<TransactionSent> = Topic::new("transaction-sent");

/// The backend asks whether a stalled tunnel should be rebuilt.
pub const TUNNEL_REINIT_ASK: Topic<()> = Topic::new("tunnel_reinit_ask");

/// The user's answer to [`TUNNEL_REINIT_ASK`].
pub const TUNNEL_REINIT_ASK_RESULT: Topic<bool> = Topic::new("tunnel_reinit_ask_result");

/// Payload of [`PROVIDER_ADDED`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderAdded {
    /// Content item the provider was added for
    pub content_key: ContentKey,
    /// Submission payload of the provider
    pub draft: ProviderDraft,
    /// Quoted proof and pricing figures
    pub proof: ProofMetadata,
}

impl ProviderAdded {
    /// Build the event from a priced remote offer.
    pub fn from_offer(content_key: ContentKey, offer: RemoteProvider) -> Self {
        Self {
            content_key,
            draft: offer.draft,
            proof: offer.proof,
        }
    }
}

/// Payload of [`WANT_SET_PROVIDERS`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetProvidersIntent {
    /// Content item whose contract is changed
    pub content_key: ContentKey,
    /// Wallet that authorizes the change
    pub owner: OwnerAddress,
    /// Provider set to submit; removed providers are already omitted
    pub providers: Vec<ProviderDraft>,
    /// Only add balance; deployment data is not resent
    pub just_topup: bool,
}

/// What a sent transaction did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Deploy the contract or replace its provider set
    SetProviders,
    /// Add balance to a deployed contract
    TopUp,
    /// Withdraw the remaining balance
    Withdraw,
}

impl TransactionKind {
    /// Short lowercase label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SetProviders => "set_providers",
            Self::TopUp => "top_up",
            Self::Withdraw => "withdraw",
        }
    }
}

/// Payload of [`TRANSACTION_SENT`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSent {
    /// Content item the contract belongs to
    pub content_key: ContentKey,
    /// What the transaction did
    pub kind: TransactionKind,
    /// Wallet result
    pub receipt: WalletReceipt,
}
