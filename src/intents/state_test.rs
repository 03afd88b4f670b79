use serde_json::json;

use super::*;
use crate::ApiError;

const RESOURCE: &str = "/inFlightIntent/abc";

fn record(state: IntentState) -> InFlightIntent {
    InFlightIntent {
        state,
        invoker: "app2".to_string(),
        intent: IntentRef {
            intent_type: "text/plain".to_string(),
            action: "view".to_string(),
        },
        entity: json!("hello"),
        content_type: None,
        handler_choices: vec!["/text/plain/view/a".to_string(), "/text/plain/view/b".to_string()],
        handler_chosen: None,
        handler: None,
        reply: None,
    }
}

fn update(value: serde_json::Value) -> StateUpdate {
    serde_json::from_value(value).unwrap()
}

#[test]
fn test_transition_table() {
    use IntentState::*;
    let all = [Choosing, Delivering, Running, Complete, Fail];
    let allowed = [
        (Choosing, Delivering),
        (Choosing, Fail),
        (Delivering, Running),
        (Delivering, Complete),
        (Delivering, Fail),
        (Running, Complete),
        (Running, Fail),
    ];
    for from in all {
        for to in all {
            assert_eq!(
                from.can_transition_to(to),
                allowed.contains(&(from, to)),
                "{} -> {}",
                from.as_str(),
                to.as_str()
            );
        }
    }
    assert!(Complete.is_terminal());
    assert!(Fail.is_terminal());
    assert!(!Running.is_terminal());
}

#[test]
fn test_delivering_requires_a_candidate() {
    let mut r = record(IntentState::Choosing);

    let missing = r.apply(RESOURCE, update(json!({ "state": "delivering" })));
    assert!(matches!(missing, Err(ApiError::BadContent { .. })));

    let outsider = r.apply(
        RESOURCE,
        update(json!({ "state": "delivering", "handlerChosen": { "resource": "/text/plain/view/z" } })),
    );
    assert!(matches!(outsider, Err(ApiError::StateConflict { .. })));
    assert_eq!(r, record(IntentState::Choosing));

    r.apply(
        RESOURCE,
        update(json!({ "state": "delivering", "handlerChosen": { "resource": "/text/plain/view/b" } })),
    )
    .unwrap();
    assert_eq!(r.state, IntentState::Delivering);
    let chosen = r.handler_chosen.as_ref().unwrap();
    assert_eq!(chosen.resource, "/text/plain/view/b");
    assert_eq!(chosen.reason, "user");
}

#[test]
fn test_running_records_the_handler() {
    let mut r = record(IntentState::Delivering);

    r.apply(
        RESOURCE,
        update(json!({ "state": "running", "handler": { "address": "app1", "resource": "/view" } })),
    )
    .unwrap();

    assert_eq!(r.state, IntentState::Running);
    assert_eq!(
        r.handler,
        Some(HandlerEndpoint {
            address: "app1".to_string(),
            resource: Some("/view".to_string()),
        })
    );
}

#[test]
fn test_terminal_records_reject_everything() {
    for terminal in [IntentState::Complete, IntentState::Fail] {
        let mut r = record(terminal);
        let result = r.apply(RESOURCE, update(json!({ "state": "fail", "reply": "late" })));
        assert!(matches!(result, Err(ApiError::StateConflict { .. })));
        assert_eq!(r, record(terminal));
    }
}

#[test]
fn test_complete_keeps_reply() {
    let mut r = record(IntentState::Running);
    r.apply(RESOURCE, update(json!({ "state": "complete", "reply": { "ok": 1 } }))).unwrap();
    assert_eq!(r.state, IntentState::Complete);
    assert_eq!(r.reply, Some(json!({ "ok": 1 })));
}

#[test]
fn test_registration_fills_defaults_from_context() {
    let handler = IntentHandler::from_registration(
        "/text/plain/view/a",
        &serde_json::Value::Null,
        "text/plain",
        "view",
        "app1",
    )
    .unwrap();

    assert_eq!(handler.intent_type, "text/plain");
    assert_eq!(handler.action, "view");
    assert_eq!(handler.invoke_intent.dst, "app1");
    assert_eq!(handler.invoke_intent.resource, None);

    let wire = serde_json::to_value(&handler).unwrap();
    assert_eq!(wire, json!({ "type": "text/plain", "action": "view", "invokeIntent": { "dst": "app1" } }));
}

#[test]
fn test_remember_is_read_but_never_stored() {
    let chosen: HandlerChosen =
        serde_json::from_value(json!({ "resource": "/text/plain/view/a", "remember": true })).unwrap();
    assert!(chosen.remember);
    assert_eq!(
        serde_json::to_value(&chosen).unwrap(),
        json!({ "resource": "/text/plain/view/a", "reason": "user" })
    );
}
