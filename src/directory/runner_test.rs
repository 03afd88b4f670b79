use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::mpsc;
use tokio::sync::watch;

use crate::test_utils::START_MS;
use crate::DataApi;
use crate::DataConfig;
use crate::Directory;
use crate::DirectoryCore;
use crate::DirectoryEvent;
use crate::DirectoryRunner;
use crate::ElectedRole;
use crate::EndpointLoader;
use crate::LivenessConfig;
use crate::ManualClock;
use crate::MockEndpoint;
use crate::Outbox;
use crate::Packet;
use crate::PacketContext;

fn data_directory() -> Directory<DataApi> {
    let (outbox, _rx) = Outbox::channel();
    let core = DirectoryCore::new("data.api", outbox, Arc::new(ManualClock::new(START_MS)));
    Directory::new(core, DataApi::new(&DataConfig::default()), &LivenessConfig::default()).unwrap()
}

async fn response_of(
    events: &mpsc::UnboundedSender<DirectoryEvent>,
    packet: Packet,
) -> Packet {
    let (ctx, mut replies) = PacketContext::channel(packet);
    events.send(DirectoryEvent::Packet(ctx)).unwrap();
    tokio::time::timeout(Duration::from_secs(5), replies.recv())
        .await
        .expect("response in time")
        .expect("reply channel open")
}

/// # Case 1: full leadership cycle of a runner
///
/// ## Setup:
/// 1. the endpoint embeds one persisted entity, `/saved`
/// 2. a write arrives around the time leadership is granted
///
/// ## Criterias:
/// 1. the write is answered only after the load finished
/// 2. the loaded entity is readable
/// 3. on shutdown both entities are written back
#[tokio::test]
async fn test_runner_loads_replays_and_persists() {
    let mut endpoint = MockEndpoint::new();
    endpoint
        .expect_get()
        .withf(|path| path == "/api")
        .times(1)
        .returning(|_| {
            Ok(json!({
                "_embedded": { "item": [{ "resource": "/saved", "entity": { "n": 1 } }] }
            }))
        });
    endpoint
        .expect_put()
        .withf(|path, body| path == "/saved" && body["entity"] == json!({ "n": 1 }))
        .times(1)
        .returning(|_, _| Ok(()));
    endpoint
        .expect_put()
        .withf(|path, body| path == "/x" && body["entity"] == json!("A"))
        .times(1)
        .returning(|_, _| Ok(()));
    let loader = EndpointLoader::new(Arc::new(endpoint), "/api");

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (role_tx, role_rx) = watch::channel(ElectedRole::Member);
    let (shutdown_tx, shutdown_rx) = watch::channel(());
    let runner = DirectoryRunner::new(data_directory(), Some(loader), events_rx, role_rx, shutdown_rx);
    let handle = tokio::spawn(runner.run());

    let (ctx, mut replies) = PacketContext::channel(Packet::request("p1", "data.api", "set", "/x").with_entity(json!("A")));
    events_tx.send(DirectoryEvent::Packet(ctx)).unwrap();
    role_tx.send(ElectedRole::Leader).unwrap();

    let write = tokio::time::timeout(Duration::from_secs(5), replies.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(write.response.as_deref(), Some("ok"));

    let saved = response_of(&events_tx, Packet::request("p1", "data.api", "get", "/saved")).await;
    assert_eq!(saved.entity, json!({ "n": 1 }));

    shutdown_tx.send(()).unwrap();
    handle.await.unwrap().unwrap();
}

/// # Case 2: a loaded entity deleted while leading
///
/// ## Criterias:
/// 1. the survivor is written back
/// 2. the deleted one is removed from the endpoint so the next load does not revive it
#[tokio::test]
async fn test_runner_deletes_remote_entities_removed_locally() {
    let mut endpoint = MockEndpoint::new();
    endpoint.expect_get().withf(|path| path == "/api").times(1).returning(|_| {
        Ok(json!({
            "_embedded": { "item": [
                { "resource": "/kept", "entity": 1 },
                { "resource": "/gone", "entity": 2 }
            ] }
        }))
    });
    endpoint
        .expect_put()
        .withf(|path, _| path == "/kept")
        .times(1)
        .returning(|_, _| Ok(()));
    endpoint
        .expect_delete()
        .withf(|path| path == "/gone")
        .times(1)
        .returning(|_| Ok(()));
    let loader = EndpointLoader::new(Arc::new(endpoint), "/api");

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (_role_tx, role_rx) = watch::channel(ElectedRole::Leader);
    let (shutdown_tx, shutdown_rx) = watch::channel(());
    let handle = tokio::spawn(DirectoryRunner::new(data_directory(), Some(loader), events_rx, role_rx, shutdown_rx).run());

    let deleted = response_of(&events_tx, Packet::request("p1", "data.api", "delete", "/gone")).await;
    assert_eq!(deleted.response.as_deref(), Some("ok"));

    shutdown_tx.send(()).unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_runner_without_loader_leads_immediately() {
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (_role_tx, role_rx) = watch::channel(ElectedRole::Leader);
    let (_shutdown_tx, shutdown_rx) = watch::channel(());
    let handle = tokio::spawn(DirectoryRunner::new(data_directory(), None, events_rx, role_rx, shutdown_rx).run());

    let write = response_of(&events_tx, Packet::request("p1", "data.api", "set", "/x").with_entity(json!(1))).await;
    assert_eq!(write.version, Some(1));

    drop(events_tx);
    handle.await.unwrap().unwrap();
}
