use serde_json::json;

use crate::test_utils::names_fixture;
use crate::test_utils::START_MS;
use crate::EntityStore;
use crate::LivenessConfig;
use crate::LivenessSweeper;
use crate::Packet;

const TTL_MS: u64 = 30_000;

#[test]
fn test_expired_skips_pinned_and_aggregates() {
    let sweeper = LivenessSweeper::new(&LivenessConfig::enabled());
    let mut store = EntityStore::new();
    for (resource, kind, pinned) in [
        ("/a", crate::ValueKind::Plain, false),
        ("/b", crate::ValueKind::Plain, true),
        ("/c", crate::ValueKind::Aggregate, false),
    ] {
        let mut entity = crate::Entity::new(resource, kind);
        entity.pinned = pinned;
        store.insert(entity);
    }

    assert_eq!(sweeper.expired(&store, TTL_MS), Vec::<String>::new());
    assert_eq!(sweeper.expired(&store, TTL_MS + 1), vec!["/a".to_string()]);
}

/// # Case 1: eviction exactly around the TTL boundary
///
/// ## Setup:
/// 1. p1 registers its address at START_MS, w watches the /address aggregate
///
/// ## Criterias:
/// 1. at START_MS + TTL the entry is kept
/// 2. at START_MS + TTL + 1 it is evicted exactly once
/// 3. the aggregate is recomputed once and w hears about it once
/// 4. bootstrap entries are never evicted
#[tokio::test]
async fn test_sweep_evicts_after_ttl() {
    let mut f = names_fixture();
    f.lead();
    f.call(Packet::request("p1", "names.api", "set", "/address/p1").with_entity(json!({})))
        .await;
    f.call(Packet::request("w", "names.api", "watch", "/address")).await;
    let aggregate_version = f.dir.core().store.get("/address").unwrap().version;
    f.sent();

    f.clock.set(START_MS + TTL_MS);
    assert_eq!(f.dir.sweep(), 0);
    assert!(f.dir.core().store.get("/address/p1").is_some());

    f.clock.advance(1);
    assert_eq!(f.dir.sweep(), 1);
    assert_eq!(f.dir.sweep(), 0);

    let store = &f.dir.core().store;
    assert!(store.get("/address/p1").is_none());
    let aggregate = store.get("/address").unwrap();
    assert_eq!(aggregate.entity, json!([]));
    assert_eq!(aggregate.version, aggregate_version + 1);
    assert!(store.get("/api/data.api").is_some());

    let sent = f.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].dst, "w");
    assert_eq!(sent[0].entity["newValue"], json!([]));
    assert_eq!(sent[0].entity["oldValue"], json!(["/address/p1"]));
}

#[tokio::test]
async fn test_only_leader_sweeps() {
    let mut f = names_fixture();
    f.lead();
    f.call(Packet::request("p1", "names.api", "set", "/address/p1").with_entity(json!({})))
        .await;
    f.dir.set_role(crate::ElectedRole::Member);

    f.clock.advance(TTL_MS * 10);

    assert_eq!(f.dir.sweep(), 0);
    assert!(f.dir.core().store.get("/address/p1").is_some());
}

#[tokio::test]
async fn test_refresh_postpones_eviction() {
    let mut f = names_fixture();
    f.lead();
    let heartbeat = Packet::request("p1", "names.api", "set", "/address/p1").with_entity(json!({}));
    f.call(heartbeat.clone()).await;

    f.clock.advance(TTL_MS);
    f.call(heartbeat).await;
    f.clock.advance(TTL_MS);

    assert_eq!(f.dir.sweep(), 0);
}
