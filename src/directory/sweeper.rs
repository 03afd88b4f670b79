use std::time::Duration;

use crate::EntityStore;
use crate::LivenessConfig;

/// Finds entities whose owners stopped refreshing them.
#[derive(Debug, Clone)]
pub struct LivenessSweeper {
    interval: Duration,
    ttl_ms: u64,
}

impl LivenessSweeper {
    pub fn new(config: &LivenessConfig) -> Self {
        Self {
            interval: Duration::from_millis(config.heartbeat_interval_ms),
            ttl_ms: config.ttl_ms(),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Paths older than the TTL. An entity exactly at the TTL is kept.
    ///
    /// Pinned entities and aggregates are never returned.
    pub fn expired(
        &self,
        store: &EntityStore,
        now: u64,
    ) -> Vec<String> {
        store
            .iter()
            .filter(|e| !e.pinned && !e.is_aggregate())
            .filter(|e| now.saturating_sub(e.last_updated) > self.ttl_ms)
            .map(|e| e.resource.clone())
            .collect()
    }
}
