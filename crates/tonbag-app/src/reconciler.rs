//! Provider reconciliation.
//!
//! Merges the authoritative contract snapshot with the locally proposed
//! edits of one content item. The merge functions are pure; the
//! [`ProviderReconciler`] applies them to the held view and reports the
//! cache changes the caller must persist.
//!
//! Merge rules:
//! 1. Every snapshot entry appears once, in snapshot order, as `Committed`
//!    with fresh metadata (a repeated remote key keeps its first position
//!    and its last value).
//! 2. A snapshot entry that is `Removed` in the view stays `Removed`.
//! 3. `New` entries absent from the snapshot follow, in view order.
//! 4. `New` entries present in the snapshot are promoted: the remote copy
//!    wins and the key is reported so the cached draft can be purged.
//! 5. While the contract is not deployed only `New` entries are kept, and
//!    cached drafts not yet in the view are rehydrated.

use indexmap::IndexMap;
use std::collections::HashSet;
use tonbag_core::{
    ContractSnapshot, ProofMetadata, Provider, ProviderDraft, ProviderKey, ProviderState,
    RemoteProvider,
};

use crate::cache::CachedDraft;
use crate::errors::AppError;
use crate::views::providers::{ProvidersView, SubmitAction};

/// Result of one merge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// The merged view
    pub providers: Vec<Provider>,
    /// `New` entries that appeared remotely
    pub promoted: Vec<ProviderKey>,
}

/// Merge a deployed contract's providers with the current view.
pub fn reconcile(snapshot: &[RemoteProvider], view: &[Provider]) -> ReconcileOutcome {
    let removed: HashSet<&ProviderKey> = view
        .iter()
        .filter(|p| p.state == ProviderState::Removed)
        .map(|p| &p.key)
        .collect();

    let mut merged: IndexMap<ProviderKey, Provider> = IndexMap::with_capacity(snapshot.len());
    for remote in snapshot {
        let state = if removed.contains(&remote.key) {
            ProviderState::Removed
        } else {
            ProviderState::Committed
        };
        merged.insert(
            remote.key.clone(),
            Provider::from_remote(remote.clone(), state),
        );
    }

    let mut promoted = Vec::new();
    for local in view.iter().filter(|p| p.state == ProviderState::New) {
        if merged.contains_key(&local.key) {
            if !promoted.contains(&local.key) {
                promoted.push(local.key.clone());
            }
        } else {
            merged
                .entry(local.key.clone())
                .or_insert_with(|| local.clone());
        }
    }

    ReconcileOutcome {
        providers: merged.into_values().collect(),
        promoted,
    }
}

/// View for a contract that does not exist yet: local drafts only, plus
/// cached drafts not already shown.
pub fn reconcile_undeployed(view: &[Provider], cached: &[CachedDraft]) -> Vec<Provider> {
    let known: HashSet<&ProviderKey> = view.iter().map(|p| &p.key).collect();
    let mut merged: IndexMap<ProviderKey, Provider> = view
        .iter()
        .filter(|p| p.state == ProviderState::New)
        .map(|p| (p.key.clone(), p.clone()))
        .collect();
    for draft in cached {
        if !known.contains(draft.key()) {
            merged
                .entry(draft.key().clone())
                .or_insert_with(|| draft.to_provider());
        }
    }
    merged.into_values().collect()
}

/// A change to the persisted drafts of the current content item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftChange {
    /// Cache a new draft
    Insert(CachedDraft),
    /// Drop promoted drafts
    Purge(Vec<ProviderKey>),
}

/// A `New` provider taken out of the view, kept until the cache confirms
/// the removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscardedDraft {
    position: usize,
    provider: Provider,
    cached: Option<CachedDraft>,
}

impl DiscardedDraft {
    /// Provider identity.
    pub fn key(&self) -> &ProviderKey {
        &self.provider.key
    }
}

/// Merged provider view of one content item.
///
/// Also mirrors the content item's cached drafts so rehydration never has to
/// wait on storage and cannot resurrect a draft discarded a moment earlier.
#[derive(Debug, Clone, Default)]
pub struct ProviderReconciler {
    providers: Vec<Provider>,
    drafts: Vec<CachedDraft>,
    fetched: bool,
    contract_address: Option<String>,
    balance: String,
}

impl ProviderReconciler {
    /// Empty, not yet fetched view.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from the drafts persisted for this content item. Drafts added
    /// to the view while the cache was being read are kept.
    pub fn rehydrate(&mut self, cached: Vec<CachedDraft>) {
        self.providers = reconcile_undeployed(&self.providers, &cached);
        let mut drafts = cached;
        for draft in std::mem::take(&mut self.drafts) {
            if !drafts.iter().any(|known| known.key() == draft.key()) {
                drafts.push(draft);
            }
        }
        self.drafts = drafts;
    }

    /// Providers in display order.
    pub fn providers(&self) -> &[Provider] {
        &self.providers
    }

    /// Mirrored drafts in insertion order.
    pub fn drafts(&self) -> &[CachedDraft] {
        &self.drafts
    }

    /// Whether a snapshot has been applied since the view was reset.
    pub fn fetched(&self) -> bool {
        self.fetched
    }

    /// Contract address once the contract is deployed.
    pub fn contract_address(&self) -> Option<&str> {
        self.contract_address.as_deref()
    }

    /// Look up one provider.
    pub fn get(&self, key: &ProviderKey) -> Option<&Provider> {
        self.providers.iter().find(|p| &p.key == key)
    }

    /// Fold a contract snapshot into the view.
    ///
    /// An unsuccessful snapshot changes nothing. Returns the draft purge the
    /// caller must persist, if anything was promoted.
    pub fn apply_snapshot(&mut self, snapshot: &ContractSnapshot) -> Option<DraftChange> {
        if !snapshot.success {
            return None;
        }
        self.fetched = true;

        if !snapshot.deployed {
            self.providers = reconcile_undeployed(&self.providers, &self.drafts);
            self.contract_address = None;
            return None;
        }

        let outcome = reconcile(&snapshot.providers, &self.providers);
        self.providers = outcome.providers;
        self.contract_address = snapshot.address.clone().filter(|a| !a.is_empty());
        self.balance = snapshot.balance.clone();

        if outcome.promoted.is_empty() {
            return None;
        }
        tracing::info!(promoted = outcome.promoted.len(), "local providers confirmed by contract");
        self.drafts
            .retain(|draft| !outcome.promoted.contains(draft.key()));
        Some(DraftChange::Purge(outcome.promoted))
    }

    /// Append a locally proposed provider. A key already present in any
    /// state is ignored.
    pub fn add_local(
        &mut self,
        draft: ProviderDraft,
        proof: ProofMetadata,
        added_at: u64,
    ) -> Option<DraftChange> {
        if self.get(&draft.key).is_some() {
            tracing::debug!(provider = draft.key.short(), "provider already listed");
            return None;
        }
        self.providers
            .push(Provider::proposed(draft.clone(), proof.clone()));

        if self.drafts.iter().any(|cached| cached.key() == &draft.key) {
            return None;
        }
        let cached = CachedDraft {
            draft,
            proof,
            added_at,
        };
        self.drafts.push(cached.clone());
        Some(DraftChange::Insert(cached))
    }

    /// Drop a `New` provider from the view and the draft mirror. The caller
    /// removes it from the cache, and hands it to [`Self::restore`] if that
    /// fails.
    pub fn discard_uncommitted(
        &mut self,
        key: &ProviderKey,
    ) -> Result<DiscardedDraft, AppError> {
        let position = self
            .providers
            .iter()
            .position(|p| &p.key == key)
            .ok_or_else(|| AppError::not_found(format!("provider {}", key.short())))?;
        if self.providers[position].state != ProviderState::New {
            return Err(AppError::invalid_input(
                "provider",
                "only uncommitted providers can be discarded",
            ));
        }
        let provider = self.providers.remove(position);
        let cached = self
            .drafts
            .iter()
            .position(|draft| draft.key() == key)
            .map(|index| self.drafts.remove(index));
        Ok(DiscardedDraft {
            position,
            provider,
            cached,
        })
    }

    /// Undo a discard. No-op if the key has been listed again since.
    pub fn restore(&mut self, discarded: DiscardedDraft) {
        if self.get(discarded.key()).is_some() {
            return;
        }
        if let Some(cached) = discarded.cached {
            if !self.drafts.iter().any(|draft| draft.key() == cached.key()) {
                self.drafts.push(cached);
            }
        }
        let position = discarded.position.min(self.providers.len());
        self.providers.insert(position, discarded.provider);
    }

    /// Flip a committed provider to `Removed` or back. Returns the new state.
    pub fn toggle_removal(&mut self, key: &ProviderKey) -> Result<ProviderState, AppError> {
        let provider = self
            .providers
            .iter_mut()
            .find(|p| &p.key == key)
            .ok_or_else(|| AppError::not_found(format!("provider {}", key.short())))?;
        provider.state = match provider.state {
            ProviderState::Committed => ProviderState::Removed,
            ProviderState::Removed => ProviderState::Committed,
            ProviderState::New => {
                return Err(AppError::invalid_input(
                    "provider",
                    "uncommitted providers are discarded, not removed",
                ))
            }
        };
        Ok(provider.state)
    }

    /// Drafts to submit: everything except providers flagged for removal.
    pub fn submission_set(&self) -> Vec<ProviderDraft> {
        self.providers
            .iter()
            .filter(|p| p.state != ProviderState::Removed)
            .map(|p| p.draft.clone())
            .collect()
    }

    /// What submitting now would do.
    pub fn submit_action(&self) -> SubmitAction {
        if self.contract_address.is_none() {
            SubmitAction::DeployContract
        } else if self
            .providers
            .iter()
            .any(|p| p.state != ProviderState::Committed)
        {
            SubmitAction::ApplyChanges
        } else {
            SubmitAction::TopUpBalance
        }
    }

    /// Read-only copy for rendering.
    pub fn view(&self) -> ProvidersView {
        ProvidersView {
            providers: self.providers.clone(),
            fetched: self.fetched,
            contract_address: self.contract_address.clone(),
            balance: self.balance.clone(),
            submit_action: self.submit_action(),
        }
    }
}
