use super::*;

fn watcher(
    address: &str,
    msg_id: u64,
) -> Watcher {
    Watcher {
        address: address.to_string(),
        msg_id,
    }
}

#[test]
fn test_watch_is_idempotent() {
    let mut registry = WatchRegistry::new();
    registry.watch("/a", watcher("p1", 1));
    registry.watch("/a", watcher("p1", 2));

    assert_eq!(registry.watchers_of("/a"), vec![watcher("p1", 2)]);
    assert_eq!(registry.watcher_count(), 1);
}

#[test]
fn test_unwatch_is_idempotent() {
    let mut registry = WatchRegistry::new();
    registry.watch("/a", watcher("p1", 1));

    registry.unwatch("/a", "p1");
    registry.unwatch("/a", "p1");
    registry.unwatch("/never", "p1");

    assert!(registry.watchers_of("/a").is_empty());
    assert_eq!(registry.watcher_count(), 0);
}

#[test]
fn test_pattern_watch_matches_and_dedups_with_exact() {
    let mut registry = WatchRegistry::new();
    registry.watch("/address/p2", watcher("p1", 1));
    registry.watch_pattern("^/address/.*$", watcher("p1", 5)).unwrap();
    registry.watch_pattern("^/address/.*$", watcher("p3", 6)).unwrap();

    let watchers = registry.watchers_of("/address/p2");
    assert_eq!(watchers, vec![watcher("p1", 1), watcher("p3", 6)]);

    assert_eq!(registry.watchers_of("/address/p9"), vec![watcher("p1", 5), watcher("p3", 6)]);
    assert!(registry.watchers_of("/router/x").is_empty());

    registry.unwatch_pattern("^/address/.*$", "p3");
    assert_eq!(registry.watchers_of("/address/p9"), vec![watcher("p1", 5)]);
}

#[test]
fn test_invalid_pattern_is_rejected() {
    let mut registry = WatchRegistry::new();
    assert!(registry.watch_pattern("^/(", watcher("p1", 1)).is_err());
    assert_eq!(registry.watcher_count(), 0);
}

#[test]
fn test_remove_participant_drops_all_registrations() {
    let mut registry = WatchRegistry::new();
    registry.watch("/a", watcher("p1", 1));
    registry.watch("/b", watcher("p1", 2));
    registry.watch("/b", watcher("p2", 3));
    registry.watch_pattern("^/.*$", watcher("p1", 4)).unwrap();

    registry.remove_participant("p1");

    assert!(registry.watchers_of("/a").is_empty());
    assert_eq!(registry.watchers_of("/b"), vec![watcher("p2", 3)]);
    assert_eq!(registry.watcher_count(), 1);
}
