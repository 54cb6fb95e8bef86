//! Storage provider records.
//!
//! [`RemoteProvider`] is what the backend reports; [`Provider`] is the
//! record held in the merged view, tagged with its [`ProviderState`].

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::identifiers::ProviderKey;

/// Lifecycle tag of a provider in the merged view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderState {
    /// Proposed locally, not yet seen in the contract
    New,
    /// Present in the latest contract snapshot
    Committed,
    /// Committed, but flagged by the user for removal on the next submission
    Removed,
}

impl ProviderState {
    /// Short lowercase label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Committed => "committed",
            Self::Removed => "removed",
        }
    }
}

impl fmt::Display for ProviderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remote status of a provider as reported by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProviderStatus {
    /// No status reported yet (fresh local drafts)
    #[default]
    Pending,
    /// Backend is still contacting the provider
    Connecting,
    /// Provider stores the bag and proofs are arriving
    Active,
    /// Provider is funded and serving
    Balance,
    /// Provider is downloading the bag
    Downloading,
    /// Provider is looking for a source for the bag
    Resolving,
    /// Provider sent an incorrect proof
    Untrusted,
    /// Provider reported an error
    Error,
    /// Provider could not be reached
    Inactive,
    /// `warning-<detail>` statuses; the detail is kept without the prefix
    Warning(String),
    /// Anything this client does not know about
    Other(String),
}

impl ProviderStatus {
    const WARNING_PREFIX: &'static str = "warning-";

    /// Parse a backend status string.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "" => Self::Pending,
            "connecting..." | "connecting" => Self::Connecting,
            "active" => Self::Active,
            "balance" => Self::Balance,
            "downloading" => Self::Downloading,
            "resolving" => Self::Resolving,
            "untrusted" => Self::Untrusted,
            "error" => Self::Error,
            "inactive" => Self::Inactive,
            other => match other.strip_prefix(Self::WARNING_PREFIX) {
                Some(detail) => Self::Warning(detail.to_string()),
                None => Self::Other(other.to_string()),
            },
        }
    }

    /// The status word shown to the user (warning prefix stripped).
    pub fn label(&self) -> &str {
        match self {
            Self::Pending => "",
            Self::Connecting => "connecting",
            Self::Active => "active",
            Self::Balance => "balance",
            Self::Downloading => "downloading",
            Self::Resolving => "resolving",
            Self::Untrusted => "untrusted",
            Self::Error => "error",
            Self::Inactive => "inactive",
            Self::Warning(detail) => detail,
            Self::Other(raw) => raw,
        }
    }
}

impl From<String> for ProviderStatus {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<ProviderStatus> for String {
    fn from(value: ProviderStatus) -> Self {
        match value {
            ProviderStatus::Connecting => "connecting...".to_string(),
            ProviderStatus::Warning(detail) => format!("{}{detail}", ProviderStatus::WARNING_PREFIX),
            other => other.label().to_string(),
        }
    }
}

/// Proof and pricing figures, pre-formatted by the backend for display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofMetadata {
    /// When the last storage proof was observed
    #[serde(default)]
    pub last_proof: String,
    /// Proof interval ("span")
    #[serde(default)]
    pub span: String,
    /// Price per day
    #[serde(default)]
    pub price_per_day: String,
    /// Price per proof
    #[serde(default)]
    pub price_per_proof: String,
}

/// Raw provider offer needed to rebuild a contract submission.
///
/// Carried through the client unchanged; only the backend interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDraft {
    /// Provider identity
    pub key: ProviderKey,
    /// Maximum proof interval in seconds the provider accepts
    pub max_span: u32,
    /// Price per megabyte per day, as quoted by the provider
    pub price_per_mb_day: String,
}

/// A provider entry as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteProvider {
    /// Provider identity
    pub key: ProviderKey,
    /// Proof and pricing figures
    #[serde(default)]
    pub proof: ProofMetadata,
    /// Remote status
    #[serde(default)]
    pub status: ProviderStatus,
    /// Free-text diagnostic accompanying the status
    #[serde(default)]
    pub reason: String,
    /// Connected peer, if a data-plane link is up
    #[serde(default)]
    pub peer: Option<String>,
    /// Submission payload for this provider
    pub draft: ProviderDraft,
}

/// A provider in the merged view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    /// Provider identity, unique within one content item's set
    pub key: ProviderKey,
    /// Lifecycle tag
    pub state: ProviderState,
    /// Proof and pricing figures
    pub proof: ProofMetadata,
    /// Remote status
    pub status: ProviderStatus,
    /// Free-text diagnostic from the remote side
    pub reason: String,
    /// Connected peer, if a data-plane link is up
    pub peer: Option<String>,
    /// Submission payload for this provider
    pub draft: ProviderDraft,
}

impl Provider {
    /// A locally proposed provider that has not reached the contract yet.
    pub fn proposed(draft: ProviderDraft, proof: ProofMetadata) -> Self {
        Self {
            key: draft.key.clone(),
            state: ProviderState::New,
            proof,
            status: ProviderStatus::Pending,
            reason: String::new(),
            peer: None,
            draft,
        }
    }

    /// A provider confirmed by the contract snapshot.
    pub fn committed(remote: RemoteProvider) -> Self {
        Self::from_remote(remote, ProviderState::Committed)
    }

    /// Build a view record from a remote entry with the given tag.
    pub fn from_remote(remote: RemoteProvider, state: ProviderState) -> Self {
        Self {
            key: remote.key,
            state,
            proof: remote.proof,
            status: remote.status,
            reason: remote.reason,
            peer: remote.peer.filter(|p| !p.is_empty()),
            draft: remote.draft,
        }
    }

    /// Whether a data-plane link to the provider is up.
    pub fn has_peer(&self) -> bool {
        self.peer.is_some()
    }
}

/// Authoritative remote state of one content item's provider contract.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractSnapshot {
    /// Whether the backend managed to read the contract at all
    pub success: bool,
    /// Whether the contract exists on-chain
    pub deployed: bool,
    /// Contract address, once known
    #[serde(default)]
    pub address: Option<String>,
    /// Registered providers
    #[serde(default)]
    pub providers: Vec<RemoteProvider>,
    /// Contract balance, pre-formatted for display
    #[serde(default)]
    pub balance: String,
}

impl ContractSnapshot {
    /// Snapshot of a contract that has not been deployed yet.
    pub fn not_deployed() -> Self {
        Self {
            success: true,
            deployed: false,
            address: None,
            providers: Vec::new(),
            balance: String::new(),
        }
    }

    /// Snapshot of a deployed contract.
    pub fn deployed(
        address: impl Into<String>,
        providers: Vec<RemoteProvider>,
        balance: impl Into<String>,
    ) -> Self {
        Self {
            success: true,
            deployed: true,
            address: Some(address.into()),
            providers,
            balance: balance.into(),
        }
    }
}

/// Result of validating and pricing a candidate provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderRates {
    /// Whether the provider accepted the bag
    pub success: bool,
    /// Rejection reason when `success` is false
    #[serde(default)]
    pub reason: String,
    /// Quoted offer when `success` is true
    #[serde(default)]
    pub provider: Option<RemoteProvider>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_known_values() {
        assert_eq!(ProviderStatus::parse("active"), ProviderStatus::Active);
        assert_eq!(ProviderStatus::parse("connecting..."), ProviderStatus::Connecting);
        assert_eq!(ProviderStatus::parse(""), ProviderStatus::Pending);
        assert_eq!(
            ProviderStatus::parse("warning-balance"),
            ProviderStatus::Warning("balance".to_string())
        );
        assert_eq!(
            ProviderStatus::parse("sleeping"),
            ProviderStatus::Other("sleeping".to_string())
        );
    }

    #[test]
    fn test_status_label_strips_warning_prefix() {
        assert_eq!(ProviderStatus::parse("warning-balance").label(), "balance");
    }

    #[test]
    fn test_status_serde_uses_wire_strings() {
        let json = serde_json::to_string(&ProviderStatus::Warning("balance".into())).unwrap();
        assert_eq!(json, "\"warning-balance\"");
        let back: ProviderStatus = serde_json::from_str("\"downloading\"").unwrap();
        assert_eq!(back, ProviderStatus::Downloading);
    }

    #[test]
    fn test_empty_peer_is_no_peer() {
        let key = ProviderKey::from_bytes([7; 32]);
        let remote = RemoteProvider {
            key: key.clone(),
            proof: ProofMetadata::default(),
            status: ProviderStatus::Active,
            reason: String::new(),
            peer: Some(String::new()),
            draft: ProviderDraft {
                key,
                max_span: 86400,
                price_per_mb_day: "0.0001".to_string(),
            },
        };
        assert!(!Provider::committed(remote).has_peer());
    }
}
