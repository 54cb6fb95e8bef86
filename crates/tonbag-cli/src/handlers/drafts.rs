//! Drafts command handler
//!
//! Reads and cleans the on-disk cache of providers added locally but not yet
//! submitted. Listing never writes; expired drafts are shown as such until
//! `drafts prune` drops them.

use anyhow::Result;
use std::sync::Arc;
use tonbag_app::{AppConfig, CachedDraft, PersistentEditCache};
use tonbag_core::effects::{PhysicalTimeEffects, StorageEffects};
use tonbag_core::ContentKey;
use tonbag_effects::{FilesystemStorageHandler, SystemClockHandler};

use super::cache_dir;
use crate::DraftsAction;

/// Handle `drafts` subcommands.
pub async fn handle_drafts(config: &AppConfig, action: &DraftsAction) -> Result<()> {
    let storage: Arc<dyn StorageEffects> =
        Arc::new(FilesystemStorageHandler::new(cache_dir(config)?));
    let clock: Arc<dyn PhysicalTimeEffects> = Arc::new(SystemClockHandler::new());
    let cache = PersistentEditCache::new(storage, clock.clone()).with_ttl(config.cache.draft_ttl());

    match action {
        DraftsAction::List { content, json } => {
            let now = clock.now_secs().await;
            let listing = collect(&cache, content.as_ref(), now).await?;
            if *json {
                println!("{}", render_json(&listing)?);
            } else {
                print!("{}", render_table(&listing));
            }
        }
        DraftsAction::Prune => {
            let now = clock.now_secs().await;
            let dropped = cache.prune_expired(now).await?;
            tracing::info!(dropped, "pruned expired drafts");
            println!("dropped {dropped} expired draft(s)");
        }
        DraftsAction::Clear { content } => {
            if cache.clear(content).await? {
                println!("cleared drafts for {content}");
            } else {
                println!("no drafts cached for {content}");
            }
        }
    }
    Ok(())
}

struct Listed {
    draft: CachedDraft,
    expired: bool,
}

type Listing = Vec<(ContentKey, Vec<Listed>)>;

async fn collect(
    cache: &PersistentEditCache,
    content: Option<&ContentKey>,
    now: u64,
) -> Result<Listing> {
    let keys = match content {
        Some(content) => vec![content.clone()],
        None => cache.list_content().await?,
    };
    let mut listing = Vec::with_capacity(keys.len());
    for key in keys {
        let drafts: Vec<Listed> = cache
            .peek(&key)
            .await?
            .into_iter()
            .map(|draft| Listed {
                expired: cache.is_expired(&draft, now),
                draft,
            })
            .collect();
        if !drafts.is_empty() {
            listing.push((key, drafts));
        }
    }
    Ok(listing)
}

fn render_table(listing: &[(ContentKey, Vec<Listed>)]) -> String {
    if listing.is_empty() {
        return "no cached drafts\n".to_string();
    }
    let mut out = String::new();
    for (content, drafts) in listing {
        out.push_str(&format!("{content} ({} draft(s))\n", drafts.len()));
        for Listed { draft, expired } in drafts {
            out.push_str(&format!(
                "  {}  span {}s  {} per MB/day  added {}{}\n",
                draft.key(),
                draft.draft.max_span,
                draft.draft.price_per_mb_day,
                draft.added_at,
                if *expired { "  (expired)" } else { "" }
            ));
        }
    }
    out
}

fn render_json(listing: &[(ContentKey, Vec<Listed>)]) -> Result<String> {
    let entries: Vec<serde_json::Value> = listing
        .iter()
        .map(|(content, drafts)| {
            let drafts = drafts
                .iter()
                .map(|listed| {
                    let mut value = serde_json::to_value(&listed.draft)?;
                    if let Some(fields) = value.as_object_mut() {
                        fields.insert("expired".to_string(), listed.expired.into());
                    }
                    Ok(value)
                })
                .collect::<Result<Vec<_>, serde_json::Error>>()?;
            Ok(serde_json::json!({
                "content": content.as_str(),
                "drafts": drafts,
            }))
        })
        .collect::<Result<_, serde_json::Error>>()?;
    Ok(serde_json::to_string_pretty(&entries)?)
}
