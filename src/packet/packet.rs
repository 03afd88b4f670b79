use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::constants::PACKET_VERSION;

/// Which responses a requester wants back.
///
/// Error responses are sent regardless of this setting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RespondOn {
    #[default]
    All,
    Errors,
    None,
}

/// Message unit exchanged between participants and directories.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Packet {
    #[serde(default = "default_ver")]
    pub ver: u32,
    pub src: String,
    pub dst: String,
    #[serde(rename = "msg_id")]
    pub msg_id: u64,
    #[serde(default)]
    pub time: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default)]
    pub entity: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(default, rename = "reply_to", skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<u64>,
    #[serde(default)]
    pub respond_on: RespondOn,
    /// Replaces the entity's allowed callers on a write
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
    /// Turns a watch/unwatch into a pattern registration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Value>,
}

fn default_ver() -> u32 {
    PACKET_VERSION
}

impl Packet {
    pub fn request(
        src: &str,
        dst: &str,
        action: &str,
        resource: &str,
    ) -> Self {
        Self {
            ver: PACKET_VERSION,
            src: src.to_string(),
            dst: dst.to_string(),
            action: Some(action.to_string()),
            resource: Some(resource.to_string()),
            ..Default::default()
        }
    }

    /// Response skeleton correlated to `request`.
    pub fn response_to(
        request: &Packet,
        src: &str,
        response: &str,
    ) -> Self {
        Self {
            ver: PACKET_VERSION,
            src: src.to_string(),
            dst: request.src.clone(),
            resource: request.resource.clone(),
            action: request.action.clone(),
            response: Some(response.to_string()),
            reply_to: Some(request.msg_id),
            ..Default::default()
        }
    }

    pub fn with_entity(
        mut self,
        entity: Value,
    ) -> Self {
        self.entity = entity;
        self
    }

    pub fn with_content_type(
        mut self,
        content_type: &str,
    ) -> Self {
        self.content_type = Some(content_type.to_string());
        self
    }

    pub fn with_msg_id(
        mut self,
        msg_id: u64,
    ) -> Self {
        self.msg_id = msg_id;
        self
    }

    pub fn with_respond_on(
        mut self,
        respond_on: RespondOn,
    ) -> Self {
        self.respond_on = respond_on;
        self
    }

    pub fn with_pattern(
        mut self,
        pattern: &str,
    ) -> Self {
        self.pattern = Some(pattern.to_string());
        self
    }

    pub fn with_permissions(
        mut self,
        permissions: &[&str],
    ) -> Self {
        self.permissions = Some(permissions.iter().map(|p| p.to_string()).collect());
        self
    }

    pub fn action(&self) -> &str {
        self.action.as_deref().unwrap_or_default()
    }

    pub fn resource(&self) -> &str {
        self.resource.as_deref().unwrap_or_default()
    }

    pub fn is_error(&self) -> bool {
        !matches!(self.response.as_deref(), None | Some("ok") | Some("changed"))
    }
}
