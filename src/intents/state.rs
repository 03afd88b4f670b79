use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::ApiError;
use crate::ApiResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentState {
    Choosing,
    Delivering,
    Running,
    Complete,
    Fail,
}

impl IntentState {
    pub fn as_str(self) -> &'static str {
        match self {
            IntentState::Choosing => "choosing",
            IntentState::Delivering => "delivering",
            IntentState::Running => "running",
            IntentState::Complete => "complete",
            IntentState::Fail => "fail",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, IntentState::Complete | IntentState::Fail)
    }

    pub fn can_transition_to(
        self,
        next: IntentState,
    ) -> bool {
        use IntentState::*;
        matches!(
            (self, next),
            (Choosing, Delivering)
                | (Choosing, Fail)
                | (Delivering, Running)
                | (Delivering, Complete)
                | (Delivering, Fail)
                | (Running, Complete)
                | (Running, Fail)
        )
    }
}

/// Where an invocation is delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvokeTarget {
    pub dst: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

/// A participant's offer to handle one type/action pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentHandler {
    #[serde(rename = "type")]
    pub intent_type: String,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub invoke_intent: InvokeTarget,
}

fn string_field(
    map: &Map<String, Value>,
    key: &str,
) -> Option<String> {
    map.get(key).and_then(Value::as_str).map(str::to_string)
}

impl IntentHandler {
    /// Reads a registration payload, filling what it omits from context.
    ///
    /// `type` and `action` default to the registered path, and
    /// `invokeIntent.dst` defaults to the registering participant.
    pub fn from_registration(
        resource: &str,
        entity: &Value,
        intent_type: &str,
        action: &str,
        src: &str,
    ) -> ApiResult<Self> {
        let empty = Map::new();
        let map = match entity {
            Value::Null => &empty,
            Value::Object(map) => map,
            _ => return Err(ApiError::bad_content(resource, "handler registration must be an object")),
        };
        let target = map.get("invokeIntent").and_then(Value::as_object).unwrap_or(&empty);

        Ok(Self {
            intent_type: string_field(map, "type").unwrap_or_else(|| intent_type.to_string()),
            action: string_field(map, "action").unwrap_or_else(|| action.to_string()),
            label: string_field(map, "label"),
            icon: string_field(map, "icon"),
            invoke_intent: InvokeTarget {
                dst: string_field(target, "dst").unwrap_or_else(|| src.to_string()),
                resource: string_field(target, "resource"),
                action: string_field(target, "action"),
            },
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentRef {
    #[serde(rename = "type")]
    pub intent_type: String,
    pub action: String,
}

/// Which candidate was picked, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerChosen {
    pub resource: String,
    #[serde(default = "default_reason")]
    pub reason: String,
    /// Save the choice as the preference for this intent
    #[serde(default, skip_serializing)]
    pub remember: bool,
}

fn default_reason() -> String {
    "user".to_string()
}

impl HandlerChosen {
    pub fn new(
        resource: &str,
        reason: &str,
    ) -> Self {
        Self {
            resource: resource.to_string(),
            reason: reason.to_string(),
            remember: false,
        }
    }
}

/// The participant actually executing the invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerEndpoint {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
}

/// Progress report written onto an in-flight record.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateUpdate {
    pub state: IntentState,
    #[serde(default)]
    pub handler_chosen: Option<HandlerChosen>,
    #[serde(default)]
    pub handler: Option<HandlerEndpoint>,
    #[serde(default)]
    pub reply: Option<Value>,
}

/// Record of one invocation in progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InFlightIntent {
    pub state: IntentState,
    pub invoker: String,
    pub intent: IntentRef,
    /// Payload the invoker passed along
    #[serde(default)]
    pub entity: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default)]
    pub handler_choices: Vec<String>,
    #[serde(default)]
    pub handler_chosen: Option<HandlerChosen>,
    #[serde(default)]
    pub handler: Option<HandlerEndpoint>,
    #[serde(default)]
    pub reply: Option<Value>,
}

impl InFlightIntent {
    /// Applies `update`, leaving the record untouched if it is rejected.
    pub fn apply(
        &mut self,
        resource: &str,
        update: StateUpdate,
    ) -> ApiResult<()> {
        if self.state.is_terminal() {
            return Err(ApiError::state_conflict(
                resource,
                format!("invocation already {}", self.state.as_str()),
            ));
        }
        if !self.state.can_transition_to(update.state) {
            return Err(ApiError::state_conflict(
                resource,
                format!("{} cannot follow {}", update.state.as_str(), self.state.as_str()),
            ));
        }

        match update.state {
            IntentState::Delivering => {
                let chosen = update
                    .handler_chosen
                    .ok_or_else(|| ApiError::bad_content(resource, "handlerChosen is required"))?;
                if !self.handler_choices.contains(&chosen.resource) {
                    return Err(ApiError::state_conflict(
                        resource,
                        format!("{} is not a candidate", chosen.resource),
                    ));
                }
                self.handler_chosen = Some(chosen);
            }
            IntentState::Running => {
                let handler = update
                    .handler
                    .ok_or_else(|| ApiError::bad_content(resource, "handler.address is required"))?;
                self.handler = Some(handler);
            }
            IntentState::Complete | IntentState::Fail => {
                if update.reply.is_some() {
                    self.reply = update.reply;
                }
            }
            IntentState::Choosing => {}
        }
        self.state = update.state;
        Ok(())
    }
}
