use lazy_static::lazy_static;
use prometheus::Encoder;
use prometheus::IntCounterVec;
use prometheus::IntGaugeVec;
use prometheus::Opts;
use prometheus::Registry;
use prometheus::TextEncoder;
use tracing::error;


lazy_static! {
    pub static ref REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("iwc_requests_total", "Requests processed per directory, action and outcome"),
        &["api", "action", "outcome"]
    )
    .expect("metric can not be created");

    pub static ref EVICTIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("iwc_evictions_total", "Entities evicted by the liveness sweeper"),
        &["api"]
    )
    .expect("metric can not be created");

    pub static ref QUEUED_REQUESTS: IntGaugeVec = IntGaugeVec::new(
        Opts::new("iwc_queued_requests", "Writes waiting for leadership"),
        &["api"]
    )
    .expect("metric can not be created");

    pub static ref INTENT_TRANSITIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("iwc_intent_transitions_total", "In-flight intent state transitions"),
        &["state"]
    )
    .expect("metric can not be created");

    pub static ref REGISTRY: Registry = Registry::new();
}

pub fn register_custom_metrics(registry: &Registry) -> prometheus::Result<()> {
    registry.register(Box::new(REQUESTS_TOTAL.clone()))?;
    registry.register(Box::new(EVICTIONS_TOTAL.clone()))?;
    registry.register(Box::new(QUEUED_REQUESTS.clone()))?;
    registry.register(Box::new(INTENT_TRANSITIONS_TOTAL.clone()))?;
    Ok(())
}

/// Bounded `action` label for [`REQUESTS_TOTAL`].
pub fn action_label(action: &str) -> &str {
    if crate::constants::KNOWN_ACTIONS.contains(&action) {
        action
    } else {
        "other"
    }
}

/// Text exposition of everything registered in `registry`.
pub fn encode_metrics(registry: &Registry) -> String {
    let mut buffer = Vec::new();
    if let Err(e) = TextEncoder::new().encode(&registry.gather(), &mut buffer) {
        error!("could not encode custom metrics: {}", e);
    }
    String::from_utf8(buffer).unwrap_or_default()
}
