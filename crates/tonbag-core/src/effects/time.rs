//! Wall-clock time.

use async_trait::async_trait;

/// Physical (wall-clock) time source.
#[async_trait]
pub trait PhysicalTimeEffects: Send + Sync {
    /// Seconds since the Unix epoch.
    async fn now_secs(&self) -> u64;
}
