use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::mpsc;

use crate::BusConfig;
use crate::BusNode;
use crate::ElectedRole;
use crate::Error;
use crate::ManualClock;
use crate::NodeBuilder;
use crate::Packet;
use crate::PacketContext;

fn build() -> (BusNode, mpsc::UnboundedReceiver<Packet>) {
    NodeBuilder::new(BusConfig::default())
        .with_clock(Arc::new(ManualClock::new(1_000)))
        .build()
        .unwrap()
}

async fn call(
    node: &BusNode,
    packet: Packet,
) -> Packet {
    let (ctx, mut rx) = PacketContext::channel(packet);
    node.route(ctx).unwrap();
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("response in time")
        .expect("reply channel open")
}

#[tokio::test]
async fn test_route_by_destination() {
    let (node, _outbound) = build();
    node.set_role(ElectedRole::Leader);

    let names = call(&node, Packet::request("p1", "names.api", "get", "/api")).await;
    assert_eq!(names.src, "names.api");
    assert_eq!(names.entity.as_array().map(Vec::len), Some(4));

    let data = call(&node, Packet::request("p1", "data.api", "set", "/x").with_entity(json!(1))).await;
    assert_eq!(data.src, "data.api");
    assert_eq!(data.version, Some(1));

    node.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_unknown_destination_is_an_error() {
    let (node, _outbound) = build();

    let (ctx, _rx) = PacketContext::channel(Packet::request("p1", "system.api", "get", "/"));
    let result = node.route(ctx);

    assert!(matches!(result, Err(Error::UnknownDirectory(dst)) if dst == "system.api"));
    node.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_roles_are_per_directory() {
    let (node, _outbound) = build();

    node.set_role_of("data.api", ElectedRole::Leader).unwrap();

    assert_eq!(node.role_of("data.api"), Some(ElectedRole::Leader));
    assert_eq!(node.role_of("names.api"), Some(ElectedRole::Member));
    assert!(node.set_role_of("nope", ElectedRole::Leader).is_err());
    node.shutdown().await.unwrap();
}

/// # Case 1: disconnect reaches every directory
///
/// ## Setup:
/// 1. p1 holds an address in names.api and a handler in intents.api
///
/// ## Criterias:
/// 1. both entries are gone after the disconnect
#[tokio::test]
async fn test_disconnect_fans_out() {
    let (node, _outbound) = build();
    node.set_role(ElectedRole::Leader);
    call(&node, Packet::request("p1", "names.api", "set", "/address/p1").with_entity(json!({}))).await;
    let registered = call(&node, Packet::request("p1", "intents.api", "register", "/text/plain/view")).await;
    let handler = registered.entity["resource"].as_str().unwrap().to_string();

    node.disconnect("p1");

    let address = call(&node, Packet::request("p2", "names.api", "get", "/address/p1")).await;
    assert_eq!(address.version, Some(0));
    let handler = call(&node, Packet::request("p2", "intents.api", "get", &handler)).await;
    assert_eq!(handler.version, Some(0));
    node.shutdown().await.unwrap();
}
