use serde_json::json;
use tokio::sync::mpsc;

use crate::test_utils::data_fixture;
use crate::test_utils::names_fixture;
use crate::ElectedRole;
use crate::LeaderState;
use crate::Packet;
use crate::PacketContext;
use crate::RemoteEntity;

fn data(
    action: &str,
    resource: &str,
) -> Packet {
    Packet::request("p1", "data.api", action, resource)
}

fn drain(rx: &mut mpsc::UnboundedReceiver<Packet>) -> Vec<Packet> {
    let mut packets = Vec::new();
    while let Ok(p) = rx.try_recv() {
        packets.push(p);
    }
    packets
}

/// # Case 1: writes before leadership
///
/// ## Setup:
/// 1. directory starts as member
/// 2. writes A then B arrive, then a read
///
/// ## Criterias:
/// 1. the read is answered immediately, the writes are not
/// 2. after leadership A is applied before B, each answered once
#[tokio::test]
async fn test_queued_writes_replay_in_order() {
    let mut f = data_fixture();
    assert_eq!(f.dir.leader_state(), LeaderState::Member);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let write_a = PacketContext::new(data("set", "/x").with_entity(json!("A")).with_msg_id(1), tx.clone());
    let write_b = PacketContext::new(data("set", "/x").with_entity(json!("B")).with_msg_id(2), tx.clone());
    let read = PacketContext::new(data("get", "/x").with_msg_id(3), tx);

    assert!(f.dir.receive(write_a).is_empty());
    assert!(f.dir.receive(write_b).is_empty());
    assert!(f.dir.receive(read).is_empty());

    let early = drain(&mut rx);
    assert_eq!(early.len(), 1);
    assert_eq!(early[0].reply_to, Some(3));
    assert_eq!(early[0].version, Some(0));

    assert!(f.dir.set_role(ElectedRole::Leader));
    assert_eq!(f.dir.leader_state(), LeaderState::Transitioning);
    assert!(f.dir.finish_transition(Vec::new()).is_empty());
    assert_eq!(f.dir.leader_state(), LeaderState::Leader);

    let replayed = drain(&mut rx);
    let order: Vec<(Option<u64>, Option<u64>)> = replayed.iter().map(|p| (p.reply_to, p.version)).collect();
    assert_eq!(order, vec![(Some(1), Some(1)), (Some(2), Some(2))]);
    assert_eq!(f.dir.core().store.get("/x").unwrap().entity, json!("B"));
}

#[tokio::test]
async fn test_second_leader_signal_is_ignored() {
    let mut f = data_fixture();

    assert!(f.dir.set_role(ElectedRole::Leader));
    assert!(!f.dir.set_role(ElectedRole::Leader));
    f.dir.finish_transition(Vec::new());
    assert!(!f.dir.set_role(ElectedRole::Leader));
    assert_eq!(f.dir.leader_state(), LeaderState::Leader);
}

#[tokio::test]
async fn test_losing_leadership_while_loading_keeps_queue() {
    let mut f = data_fixture();
    let (ctx, mut rx) = PacketContext::channel(data("set", "/x").with_entity(json!(1)));
    f.dir.receive(ctx);

    f.dir.set_role(ElectedRole::Leader);
    f.dir.set_role(ElectedRole::Member);
    assert!(f.dir.finish_transition(Vec::new()).is_empty());

    assert_eq!(f.dir.leader_state(), LeaderState::Member);
    assert!(rx.try_recv().is_err());
    assert!(f.dir.core().store.get("/x").is_none());
}

#[tokio::test]
async fn test_remote_entities_are_pinned() {
    let mut f = names_fixture();
    f.dir.set_role(ElectedRole::Leader);
    f.dir.finish_transition(vec![
        RemoteEntity {
            resource: "/router/r1".to_string(),
            entity: json!({ "region": "east" }),
            content_type: None,
        },
        RemoteEntity {
            resource: "/elsewhere".to_string(),
            entity: json!({}),
            content_type: None,
        },
    ]);

    let router = f.dir.core().store.get("/router/r1").unwrap();
    assert!(router.pinned);
    assert_eq!(router.entity, json!({ "region": "east" }));
    assert!(f.dir.core().store.get("/elsewhere").is_none());
    assert_eq!(f.dir.core().store.get("/router").unwrap().entity, json!(["/router/r1"]));

    f.clock.advance(1_000_000);
    assert_eq!(f.dir.sweep(), 0);
}

#[tokio::test]
async fn test_export_skips_aggregates() {
    let mut f = names_fixture();
    f.lead();
    f.call(Packet::request("p1", "names.api", "set", "/address/p1").with_entity(json!({ "a": 1 })))
        .await;

    let exported: Vec<String> = f.dir.export().into_iter().map(|e| e.resource).collect();

    assert!(exported.contains(&"/address/p1".to_string()));
    assert!(exported.contains(&"/api/names.api".to_string()));
    assert!(!exported.contains(&"/address".to_string()));
    assert!(!exported.contains(&"/api".to_string()));
}
