use std::sync::Arc;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use parking_lot::RwLock;

/// Millisecond wall clock used for `lastUpdated` stamps and packet times.
///
/// Injected into every directory so liveness tests can move time by hand.
pub trait Clock: Send + Sync + 'static {
    fn now_ms(&self) -> u64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        timestamp_millis()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default, Clone)]
pub struct ManualClock {
    now: Arc<RwLock<u64>>,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: Arc::new(RwLock::new(start_ms)),
        }
    }

    pub fn advance(
        &self,
        delta_ms: u64,
    ) {
        *self.now.write() += delta_ms;
    }

    pub fn set(
        &self,
        now_ms: u64,
    ) {
        *self.now.write() = now_ms;
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        *self.now.read()
    }
}

/// return milliseconds since the unix epoch, or 0 if the system clock is before it
pub(crate) fn timestamp_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
