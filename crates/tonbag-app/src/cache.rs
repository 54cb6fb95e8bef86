//! Persistent edit cache.
//!
//! Keeps the locally proposed (`New`) providers of each content item across
//! poll cycles and restarts. One storage entry per content item, at
//! `provider-drafts/<content-key>`, holding the drafts in insertion order:
//!
//! ```json
//! { "version": 1, "drafts": [ { "draft": {..}, "proof": {..}, "added_at": 1700000000 } ] }
//! ```
//!
//! Entries that become empty are deleted. Drafts older than the configured
//! TTL are dropped when read. Read-modify-write cycles are serialized inside
//! one process; concurrent processes sharing a directory are not supported.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;
use tonbag_core::effects::{PhysicalTimeEffects, StorageEffects};
use tonbag_core::{ContentKey, ProofMetadata, Provider, ProviderDraft, ProviderKey, TonbagError};

/// Storage key prefix of all cache entries.
pub const CACHE_PREFIX: &str = "provider-drafts/";

const CACHE_VERSION: u32 = 1;

/// One cached `New` provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedDraft {
    /// Submission payload
    pub draft: ProviderDraft,
    /// Quoted proof and pricing figures
    #[serde(default)]
    pub proof: ProofMetadata,
    /// Unix seconds when the draft was first cached
    #[serde(default)]
    pub added_at: u64,
}

impl CachedDraft {
    /// Provider identity.
    pub fn key(&self) -> &ProviderKey {
        &self.draft.key
    }

    /// The view record this draft rehydrates to.
    pub fn to_provider(&self) -> Provider {
        Provider::proposed(self.draft.clone(), self.proof.clone())
    }

    fn is_expired(&self, now: u64, ttl: Option<Duration>) -> bool {
        match ttl {
            Some(ttl) => now.saturating_sub(self.added_at) >= ttl.as_secs(),
            None => false,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    version: u32,
    drafts: Vec<CachedDraft>,
}

/// Typed store of uncommitted provider drafts, keyed by content item.
pub struct PersistentEditCache {
    storage: Arc<dyn StorageEffects>,
    clock: Arc<dyn PhysicalTimeEffects>,
    ttl: Option<Duration>,
    write_lock: AsyncMutex<()>,
}

impl PersistentEditCache {
    /// Create a cache without expiry.
    pub fn new(storage: Arc<dyn StorageEffects>, clock: Arc<dyn PhysicalTimeEffects>) -> Self {
        Self {
            storage,
            clock,
            ttl: None,
            write_lock: AsyncMutex::new(()),
        }
    }

    /// Set the draft lifetime; `None` keeps drafts until promoted or discarded.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    /// Storage key of a content item's entry.
    pub fn storage_key(content: &ContentKey) -> String {
        format!("{CACHE_PREFIX}{content}")
    }

    /// Cached drafts of a content item, oldest first. Expired drafts are
    /// dropped and the entry rewritten.
    pub async fn load(&self, content: &ContentKey) -> Result<Vec<CachedDraft>, TonbagError> {
        let drafts = self.read(content).await?;
        let now = self.clock.now_secs().await;
        let (live, expired): (Vec<_>, Vec<_>) = drafts
            .into_iter()
            .partition(|draft| !draft.is_expired(now, self.ttl));
        if expired.is_empty() {
            return Ok(live);
        }

        tracing::debug!(
            content = content.short(),
            expired = expired.len(),
            "dropping expired cached drafts"
        );
        let _guard = self.write_lock.lock().await;
        // Re-read under the lock so a concurrent insert is not lost.
        let fresh: Vec<CachedDraft> = self
            .read(content)
            .await?
            .into_iter()
            .filter(|draft| !draft.is_expired(now, self.ttl))
            .collect();
        self.write(content, &fresh).await?;
        Ok(fresh)
    }

    /// Every stored draft of a content item, expired ones included, without
    /// rewriting the entry.
    pub async fn peek(&self, content: &ContentKey) -> Result<Vec<CachedDraft>, TonbagError> {
        self.read(content).await
    }

    /// Whether `draft` is past the TTL as of `now` (Unix seconds).
    pub fn is_expired(&self, draft: &CachedDraft, now: u64) -> bool {
        draft.is_expired(now, self.ttl)
    }

    /// Append a draft unless its key is already cached. Returns whether it
    /// was added.
    pub async fn insert(
        &self,
        content: &ContentKey,
        draft: ProviderDraft,
        proof: ProofMetadata,
    ) -> Result<bool, TonbagError> {
        let added_at = self.clock.now_secs().await;
        let _guard = self.write_lock.lock().await;
        let mut drafts = self.read(content).await?;
        if drafts.iter().any(|cached| cached.draft.key == draft.key) {
            return Ok(false);
        }
        drafts.push(CachedDraft {
            draft,
            proof,
            added_at,
        });
        self.write(content, &drafts).await?;
        Ok(true)
    }

    /// Drop one draft. Returns whether it was cached.
    pub async fn remove(&self, content: &ContentKey, key: &ProviderKey) -> Result<bool, TonbagError> {
        Ok(self.purge(content, std::slice::from_ref(key)).await? > 0)
    }

    /// Drop every draft whose key is in `keys`. Returns how many were removed.
    pub async fn purge(
        &self,
        content: &ContentKey,
        keys: &[ProviderKey],
    ) -> Result<usize, TonbagError> {
        if keys.is_empty() {
            return Ok(0);
        }
        let _guard = self.write_lock.lock().await;
        let mut drafts = self.read(content).await?;
        let before = drafts.len();
        drafts.retain(|cached| !keys.contains(&cached.draft.key));
        let removed = before - drafts.len();
        if removed > 0 {
            self.write(content, &drafts).await?;
        }
        Ok(removed)
    }

    /// Delete a content item's entry. Returns whether one existed.
    pub async fn clear(&self, content: &ContentKey) -> Result<bool, TonbagError> {
        let _guard = self.write_lock.lock().await;
        Ok(self.storage.remove(&Self::storage_key(content)).await?)
    }

    /// Content items that have an entry.
    pub async fn list_content(&self) -> Result<Vec<ContentKey>, TonbagError> {
        let keys = self.storage.list_keys(Some(CACHE_PREFIX)).await?;
        Ok(keys
            .iter()
            .filter_map(|key| key.strip_prefix(CACHE_PREFIX))
            .filter_map(|raw| match ContentKey::parse(raw) {
                Ok(content) => Some(content),
                Err(_) => {
                    tracing::warn!(key = raw, "ignoring cache entry with malformed content key");
                    None
                }
            })
            .collect())
    }

    /// Drop drafts older than the TTL across all content items, as of `now`
    /// (Unix seconds). Returns how many drafts were dropped.
    pub async fn prune_expired(&self, now: u64) -> Result<usize, TonbagError> {
        if self.ttl.is_none() {
            return Ok(0);
        }
        let mut pruned = 0;
        for content in self.list_content().await? {
            let _guard = self.write_lock.lock().await;
            let mut drafts = self.read(&content).await?;
            let before = drafts.len();
            drafts.retain(|draft| !draft.is_expired(now, self.ttl));
            if drafts.len() != before {
                pruned += before - drafts.len();
                self.write(&content, &drafts).await?;
            }
        }
        tracing::info!(pruned, "pruned expired cached drafts");
        Ok(pruned)
    }

    async fn read(&self, content: &ContentKey) -> Result<Vec<CachedDraft>, TonbagError> {
        let Some(bytes) = self.storage.retrieve(&Self::storage_key(content)).await? else {
            return Ok(Vec::new());
        };
        match serde_json::from_slice::<CacheEntry>(&bytes) {
            Ok(entry) if entry.version == CACHE_VERSION => Ok(entry.drafts),
            Ok(entry) => {
                tracing::warn!(
                    content = content.short(),
                    version = entry.version,
                    "ignoring cache entry with unsupported version"
                );
                Ok(Vec::new())
            }
            Err(e) => {
                tracing::warn!(content = content.short(), error = %e, "ignoring corrupt cache entry");
                Ok(Vec::new())
            }
        }
    }

    async fn write(&self, content: &ContentKey, drafts: &[CachedDraft]) -> Result<(), TonbagError> {
        let key = Self::storage_key(content);
        if drafts.is_empty() {
            self.storage.remove(&key).await?;
            return Ok(());
        }
        let entry = CacheEntry {
            version: CACHE_VERSION,
            drafts: drafts.to_vec(),
        };
        self.storage.store(&key, serde_json::to_vec(&entry)?).await?;
        Ok(())
    }
}

impl std::fmt::Debug for PersistentEditCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistentEditCache")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
