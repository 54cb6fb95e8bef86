//! Provider table view model.

use serde::Serialize;
use tonbag_core::{Provider, ProviderState, ProviderStatus};

/// Snapshot of one content item's merged provider view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProvidersView {
    /// Providers in display order
    pub providers: Vec<Provider>,
    /// Whether the contract has been read since the scope was selected
    pub fetched: bool,
    /// Contract address, once deployed
    pub contract_address: Option<String>,
    /// Contract balance, pre-formatted
    pub balance: String,
    /// What the submit button does
    pub submit_action: SubmitAction,
}

impl ProvidersView {
    /// Table rows in display order.
    pub fn rows(&self) -> Vec<ProviderRow> {
        self.providers.iter().map(ProviderRow::from_provider).collect()
    }

    /// Whether the contract exists on-chain.
    pub fn is_deployed(&self) -> bool {
        self.contract_address.is_some()
    }
}

/// The single submit action offered for the current view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitAction {
    /// No contract yet: deploy it with the listed providers
    #[default]
    DeployContract,
    /// Some providers are new or flagged for removal
    ApplyChanges,
    /// Everything is committed: only add balance
    TopUpBalance,
}

impl SubmitAction {
    /// Button caption.
    pub fn label(self) -> &'static str {
        match self {
            Self::DeployContract => "Deploy contract",
            Self::ApplyChanges => "Apply changes",
            Self::TopUpBalance => "Topup balance",
        }
    }

    /// Whether the transaction carries no deployment data.
    pub fn is_just_topup(self) -> bool {
        matches!(self, Self::TopUpBalance)
    }
}

/// Coloured status dot of a provider row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusIndicator {
    /// Provider reported an error
    Fail,
    /// Provider is fetching the bag
    Downloading,
    /// Active with a live peer link
    Seeding,
    /// Active, no peer link
    Active,
    /// Provider is looking for the bag or has a warning
    Searching,
    /// Anything else
    Inactive,
}

impl StatusIndicator {
    /// Indicator for a remote status.
    pub fn from_status(status: &ProviderStatus, has_peer: bool) -> Self {
        match status {
            ProviderStatus::Error => Self::Fail,
            ProviderStatus::Downloading => Self::Downloading,
            ProviderStatus::Active if has_peer => Self::Seeding,
            ProviderStatus::Active => Self::Active,
            ProviderStatus::Resolving | ProviderStatus::Warning(_) => Self::Searching,
            _ => Self::Inactive,
        }
    }

    /// CSS-style class name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fail => "fail",
            Self::Downloading => "downloading",
            Self::Seeding => "seeding",
            Self::Active => "active",
            Self::Searching => "searching",
            Self::Inactive => "inactive",
        }
    }
}

/// One rendered row of the provider table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderRow {
    /// Full provider key
    pub key: String,
    /// Lifecycle tag, for row styling
    pub state: ProviderState,
    /// Status dot; absent for providers not yet in the contract
    pub indicator: Option<StatusIndicator>,
    /// Status column text
    pub status_text: String,
    /// Hover text of the status dot
    pub tooltip: String,
    /// Proof interval
    pub span: String,
    /// Price per day
    pub price_per_day: String,
    /// Price per proof
    pub price_per_proof: String,
}

const PEER_PREFIX_LEN: usize = 8;

impl ProviderRow {
    /// Derive the row for one provider.
    pub fn from_provider(provider: &Provider) -> Self {
        let word = provider.status.label();
        let mut status_text = capitalize(word);
        let mut reason = provider.reason.clone();

        let serving = matches!(
            provider.status,
            ProviderStatus::Balance | ProviderStatus::Active
        );
        match (&provider.peer, serving) {
            (Some(peer), true) => {
                status_text = "Peer".to_string();
                let short: String = peer.chars().take(PEER_PREFIX_LEN).collect();
                reason = if reason.is_empty() {
                    format!("peer connected: {short}")
                } else {
                    format!("{reason}, peer connected: {short}")
                };
            }
            _ if provider.status == ProviderStatus::Balance => {
                status_text = "Active".to_string();
            }
            _ => {}
        }

        let mut tooltip = if reason.is_empty() {
            capitalize(word)
        } else {
            capitalize(&reason)
        };
        if provider.status == ProviderStatus::Inactive {
            status_text = format!("Proof {}", provider.proof.last_proof);
            tooltip = "Not connected".to_string();
        }

        let indicator = (provider.state != ProviderState::New)
            .then(|| StatusIndicator::from_status(&provider.status, provider.has_peer()));

        Self {
            key: provider.key.to_string(),
            state: provider.state,
            indicator,
            status_text,
            tooltip,
            span: provider.proof.span.clone(),
            price_per_day: provider.proof.price_per_day.clone(),
            price_per_proof: provider.proof.price_per_proof.clone(),
        }
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
