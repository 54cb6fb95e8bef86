//! Layer 3: System clock handler.

use async_trait::async_trait;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tonbag_core::effects::PhysicalTimeEffects;

/// Wall-clock time from the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClockHandler;

impl SystemClockHandler {
    /// Create a new system clock handler
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PhysicalTimeEffects for SystemClockHandler {
    async fn now_secs(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_secs()
    }
}
