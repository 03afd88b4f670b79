use serde_json::json;

use crate::test_utils::data_fixture;
use crate::Packet;

fn data(
    action: &str,
    resource: &str,
) -> Packet {
    Packet::request("p1", "data.api", action, resource)
}

fn children(
    f: &crate::test_utils::Fixture<crate::DataApi>,
    resource: &str,
) -> Vec<String> {
    f.dir
        .core()
        .store
        .get(resource)
        .and_then(|e| e.children())
        .map(|c| c.iter().cloned().collect())
        .unwrap_or_default()
}

#[tokio::test]
async fn test_add_child_creates_and_links() {
    let mut f = data_fixture();
    f.lead();

    let response = f.call(data("addChild", "/todo").with_entity(json!({ "title": "milk" }))).await;

    assert_eq!(response.response.as_deref(), Some("ok"));
    let child = response.entity["resource"].as_str().unwrap().to_string();
    assert!(child.starts_with("/todo/"));
    assert_eq!(f.dir.core().store.get(&child).unwrap().entity, json!({ "title": "milk" }));
    assert_eq!(children(&f, "/todo"), vec![child.clone()]);

    let parent = f.call(data("get", "/todo")).await;
    assert_eq!(parent.links, Some(json!({ "children": [child] })));
}

#[tokio::test]
async fn test_remove_child_unlinks_and_deletes() {
    let mut f = data_fixture();
    f.lead();
    let added = f.call(data("addChild", "/todo").with_entity(json!(1))).await;
    let child = added.entity["resource"].as_str().unwrap().to_string();

    let response = f.call(data("removeChild", "/todo").with_entity(json!({ "resource": child }))).await;

    assert_eq!(response.response.as_deref(), Some("ok"));
    assert!(children(&f, "/todo").is_empty());
    assert!(f.dir.core().store.get(&child).is_none());
}

/// # Case 1: caller may not delete the child
///
/// ## Criterias:
/// 1. `noPermission`
/// 2. parent keeps the link and the child survives
#[tokio::test]
async fn test_remove_child_without_permission_keeps_link() {
    let mut f = data_fixture();
    f.lead();
    let added = f
        .call(
            Packet::request("a", "data.api", "addChild", "/list")
                .with_entity(json!(1))
                .with_permissions(&["a"]),
        )
        .await;
    let child = added.entity["resource"].as_str().unwrap().to_string();
    let version = f.dir.core().store.get("/list").unwrap().version;

    let response = f
        .call(Packet::request("b", "data.api", "removeChild", "/list").with_entity(json!({ "resource": child })))
        .await;

    assert_eq!(response.response.as_deref(), Some("noPermission"));
    assert_eq!(children(&f, "/list"), vec![child.clone()]);
    assert_eq!(f.dir.core().store.get("/list").unwrap().version, version);
    assert!(f.dir.core().store.get(&child).is_some());
}

#[tokio::test]
async fn test_remove_child_requires_resource() {
    let mut f = data_fixture();
    f.lead();

    let response = f.call(data("removeChild", "/todo").with_entity(json!({}))).await;

    assert_eq!(response.response.as_deref(), Some("badRequest"));
}

#[tokio::test]
async fn test_list_ends_are_ordered() {
    let mut f = data_fixture();
    f.lead();

    f.call(data("pushChild", "/queue").with_entity(json!({ "resource": "/b" }))).await;
    f.call(data("pushChild", "/queue").with_entity(json!({ "resource": "/c" }))).await;
    let unshift = f.call(data("unshiftChild", "/queue").with_entity(json!({ "resource": "/a" }))).await;
    assert_eq!(unshift.version, Some(3));
    assert_eq!(children(&f, "/queue"), vec!["/a", "/b", "/c"]);

    let popped = f.call(data("popChild", "/queue")).await;
    assert_eq!(popped.entity, json!({ "resource": "/c" }));
    let shifted = f.call(data("shiftChild", "/queue")).await;
    assert_eq!(shifted.entity, json!({ "resource": "/a" }));
    assert_eq!(children(&f, "/queue"), vec!["/b"]);
}

#[tokio::test]
async fn test_pop_on_empty_list_changes_nothing() {
    let mut f = data_fixture();
    f.lead();
    f.call(data("set", "/queue").with_entity(json!("x"))).await;

    let popped = f.call(data("popChild", "/queue")).await;

    assert_eq!(popped.entity, json!({ "resource": null }));
    assert_eq!(f.dir.core().store.get("/queue").unwrap().version, 1);
}

#[tokio::test]
async fn test_relative_path_is_bad_resource() {
    let mut f = data_fixture();
    f.lead();

    let response = f.call(data("set", "no-slash").with_entity(json!(1))).await;

    assert_eq!(response.response.as_deref(), Some("badResource"));
}
