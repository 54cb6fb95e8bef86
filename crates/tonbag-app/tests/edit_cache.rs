//! Persistent edit cache behaviour against in-memory and on-disk storage.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;
use tonbag_app::{PersistentEditCache, CACHE_PREFIX};
use tonbag_effects::FilesystemStorageHandler;
use tonbag_testkit::{fixtures, FixedClock, MemoryStorageHandler};

const DAY: u64 = 24 * 60 * 60;

fn cache_with(storage: &MemoryStorageHandler, clock: &FixedClock) -> PersistentEditCache {
    PersistentEditCache::new(Arc::new(storage.clone()), Arc::new(clock.clone()))
}

#[tokio::test]
async fn drafts_keep_insertion_order_and_ignore_duplicates() {
    let storage = MemoryStorageHandler::new();
    let clock = FixedClock::new(1_000);
    let cache = cache_with(&storage, &clock);
    let content = fixtures::content_key(1);

    assert!(cache.insert(&content, fixtures::draft(2), fixtures::proof(2)).await.unwrap());
    assert!(cache.insert(&content, fixtures::draft(1), fixtures::proof(1)).await.unwrap());
    assert!(!cache.insert(&content, fixtures::draft(2), fixtures::proof(2)).await.unwrap());

    let drafts = cache.load(&content).await.unwrap();
    let keys: Vec<_> = drafts.iter().map(|d| d.key().clone()).collect();
    assert_eq!(keys, vec![fixtures::provider_key(2), fixtures::provider_key(1)]);
    assert_eq!(drafts[0].added_at, 1_000);
}

#[tokio::test]
async fn content_items_are_isolated() {
    let storage = MemoryStorageHandler::new();
    let cache = cache_with(&storage, &FixedClock::new(0));
    let first = fixtures::content_key(1);
    let second = fixtures::content_key(2);

    cache.insert(&first, fixtures::draft(1), fixtures::proof(1)).await.unwrap();
    assert!(cache.load(&second).await.unwrap().is_empty());

    let mut listed = cache.list_content().await.unwrap();
    listed.sort();
    assert_eq!(listed, vec![first]);
}

#[tokio::test]
async fn removing_last_draft_deletes_entry() {
    let storage = MemoryStorageHandler::new();
    let cache = cache_with(&storage, &FixedClock::new(0));
    let content = fixtures::content_key(1);

    cache.insert(&content, fixtures::draft(1), fixtures::proof(1)).await.unwrap();
    cache.insert(&content, fixtures::draft(2), fixtures::proof(2)).await.unwrap();
    assert_eq!(
        cache
            .purge(&content, &[fixtures::provider_key(1), fixtures::provider_key(9)])
            .await
            .unwrap(),
        1
    );
    assert!(cache.remove(&content, &fixtures::provider_key(2)).await.unwrap());
    assert!(!cache.remove(&content, &fixtures::provider_key(2)).await.unwrap());
    assert!(storage.is_empty());
}

#[tokio::test]
async fn corrupt_entry_reads_as_empty() {
    let storage = MemoryStorageHandler::new();
    let cache = cache_with(&storage, &FixedClock::new(0));
    let content = fixtures::content_key(1);
    storage.insert_raw(&PersistentEditCache::storage_key(&content), "{not json");

    assert!(cache.load(&content).await.unwrap().is_empty());

    cache.insert(&content, fixtures::draft(1), fixtures::proof(1)).await.unwrap();
    assert_eq!(cache.load(&content).await.unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_version_reads_as_empty() {
    let storage = MemoryStorageHandler::new();
    let cache = cache_with(&storage, &FixedClock::new(0));
    let content = fixtures::content_key(1);
    storage.insert_raw(
        &PersistentEditCache::storage_key(&content),
        r#"{"version":99,"drafts":[]}"#,
    );
    assert!(cache.load(&content).await.unwrap().is_empty());
}

#[tokio::test]
async fn expired_drafts_are_dropped_on_load() {
    let storage = MemoryStorageHandler::new();
    let clock = FixedClock::new(10 * DAY);
    let cache = cache_with(&storage, &clock).with_ttl(Some(Duration::from_secs(7 * DAY)));
    let content = fixtures::content_key(1);

    cache.insert(&content, fixtures::draft(1), fixtures::proof(1)).await.unwrap();
    clock.advance(3 * DAY);
    cache.insert(&content, fixtures::draft(2), fixtures::proof(2)).await.unwrap();
    clock.advance(5 * DAY);

    let drafts = cache.load(&content).await.unwrap();
    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0].key(), &fixtures::provider_key(2));

    clock.advance(10 * DAY);
    assert!(cache.load(&content).await.unwrap().is_empty());
    assert!(storage.is_empty());
}

#[tokio::test]
async fn peek_reports_expired_drafts_without_writing() {
    let storage = MemoryStorageHandler::new();
    let clock = FixedClock::new(0);
    let cache = cache_with(&storage, &clock).with_ttl(Some(Duration::from_secs(DAY)));
    let content = fixtures::content_key(1);
    cache.insert(&content, fixtures::draft(1), fixtures::proof(1)).await.unwrap();
    let stored = storage.raw(&PersistentEditCache::storage_key(&content));

    clock.set(2 * DAY);
    let drafts = cache.peek(&content).await.unwrap();
    assert_eq!(drafts.len(), 1);
    assert!(cache.is_expired(&drafts[0], 2 * DAY));
    assert!(!cache.is_expired(&drafts[0], DAY / 2));
    assert_eq!(storage.raw(&PersistentEditCache::storage_key(&content)), stored);
}

#[tokio::test]
async fn prune_sweeps_every_content_item() {
    let storage = MemoryStorageHandler::new();
    let clock = FixedClock::new(0);
    let cache = cache_with(&storage, &clock).with_ttl(Some(Duration::from_secs(DAY)));

    cache.insert(&fixtures::content_key(1), fixtures::draft(1), fixtures::proof(1)).await.unwrap();
    cache.insert(&fixtures::content_key(2), fixtures::draft(2), fixtures::proof(2)).await.unwrap();
    clock.set(DAY / 2);
    cache.insert(&fixtures::content_key(2), fixtures::draft(3), fixtures::proof(3)).await.unwrap();

    assert_eq!(cache.prune_expired(DAY + 1).await.unwrap(), 2);
    assert_eq!(cache.list_content().await.unwrap(), vec![fixtures::content_key(2)]);
}

#[tokio::test]
async fn prune_without_ttl_keeps_everything() {
    let storage = MemoryStorageHandler::new();
    let cache = cache_with(&storage, &FixedClock::new(0));
    cache.insert(&fixtures::content_key(1), fixtures::draft(1), fixtures::proof(1)).await.unwrap();
    assert_eq!(cache.prune_expired(u64::MAX).await.unwrap(), 0);
    assert_eq!(storage.len(), 1);
}

#[tokio::test]
async fn entries_survive_restart_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let content = fixtures::content_key(7);

    {
        let storage = Arc::new(FilesystemStorageHandler::new(dir.path().to_path_buf()));
        let cache = PersistentEditCache::new(storage, Arc::new(FixedClock::new(5)));
        cache.insert(&content, fixtures::draft(1), fixtures::proof(1)).await.unwrap();
    }

    let storage = Arc::new(FilesystemStorageHandler::new(dir.path().to_path_buf()));
    let cache = PersistentEditCache::new(storage, Arc::new(FixedClock::new(6)));
    let drafts = cache.load(&content).await.unwrap();
    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0].proof, fixtures::proof(1));
    assert!(PersistentEditCache::storage_key(&content).starts_with(CACHE_PREFIX));
}
