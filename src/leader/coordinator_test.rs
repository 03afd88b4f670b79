use super::*;
use crate::Packet;
use crate::PacketContext;

fn ctx(
    action: &str,
    msg_id: u64,
) -> PacketContext {
    PacketContext::channel(Packet::request("p1", "data.api", action, "/a").with_msg_id(msg_id)).0
}

#[test]
fn test_member_queues_writes_and_serves_reads() {
    let mut coordinator = LeaderCoordinator::new("coordinator-test-1");
    assert!(coordinator.is_request_queueing());

    assert!(coordinator.admit(ctx("set", 1)).is_none());
    assert!(coordinator.admit(ctx("delete", 2)).is_none());

    let read = coordinator.admit(ctx("get", 3)).unwrap();
    assert_eq!(read.leader_state, LeaderState::Member);
    assert!(coordinator.admit(ctx("watch", 4)).is_some());
    assert_eq!(coordinator.queued(), 2);
}

#[test]
fn test_become_leader_replays_in_arrival_order() {
    let mut coordinator = LeaderCoordinator::new("coordinator-test-2");
    coordinator.admit(ctx("set", 1));
    coordinator.begin_transition();
    assert!(coordinator.admit(ctx("set", 2)).is_none());

    let replay = coordinator.become_leader();

    let ids: Vec<u64> = replay.iter().map(|c| c.packet.msg_id).collect();
    assert_eq!(ids, vec![1, 2]);
    assert!(replay.iter().all(|c| c.leader_state == LeaderState::Leader));
    assert_eq!(coordinator.queued(), 0);
    assert!(!coordinator.is_request_queueing());
}

#[test]
fn test_leader_applies_writes_immediately() {
    let mut coordinator = LeaderCoordinator::new("coordinator-test-3");
    coordinator.become_leader();

    let admitted = coordinator.admit(ctx("set", 1)).unwrap();
    assert_eq!(admitted.leader_state, LeaderState::Leader);

    coordinator.step_down();
    assert_eq!(coordinator.state(), LeaderState::Member);
    assert!(coordinator.admit(ctx("set", 2)).is_none());
}
