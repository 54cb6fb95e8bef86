//! Settable clock.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tonbag_core::effects::PhysicalTimeEffects;

/// Clock that only moves when the test moves it.
#[derive(Debug, Clone, Default)]
pub struct FixedClock {
    now: Arc<AtomicU64>,
}

impl FixedClock {
    /// Clock reading `secs` Unix seconds.
    pub fn new(secs: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(secs)),
        }
    }

    /// Jump to `secs`.
    pub fn set(&self, secs: u64) {
        self.now.store(secs, Ordering::SeqCst);
    }

    /// Move forward by `secs`.
    pub fn advance(&self, secs: u64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }

    /// Current reading.
    pub fn current(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PhysicalTimeEffects for FixedClock {
    async fn now_secs(&self) -> u64 {
        self.current()
    }
}
