use std::collections::BTreeSet;
use std::collections::VecDeque;

use serde_json::json;
use serde_json::Value;

use crate::ApiError;
use crate::ApiResult;

/// Shape of the value held by an [`Entity`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueKind {
    /// Caller-supplied payload
    Plain,
    /// Payload plus an ordered sequence of child resource names
    List(VecDeque<String>),
    /// Computed from the other entities of the directory
    Aggregate,
    /// Intent handler registration
    Handler,
    /// One intent invocation in progress
    InFlightIntent,
}

/// Versioned value stored at a resource path.
#[derive(Debug, Clone)]
pub struct Entity {
    pub resource: String,
    pub entity: Value,
    pub content_type: Option<String>,
    /// Strictly increases on every successful mutation, never reused
    pub version: u64,
    /// Callers allowed to write; empty means anyone
    pub permissions: BTreeSet<String>,
    pub last_updated: u64,
    /// `None` accepts any content type
    pub allowed_content_types: Option<BTreeSet<String>>,
    pub kind: ValueKind,
    /// Exempt from liveness eviction
    pub pinned: bool,
}

/// Opaque marker of an entity's state, taken before a mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub(crate) existed: bool,
    pub(crate) version: u64,
    pub(crate) entity: Value,
    pub(crate) children: Option<Vec<String>>,
}

impl Snapshot {
    pub(crate) fn absent() -> Self {
        Self {
            existed: false,
            version: 0,
            entity: Value::Null,
            children: None,
        }
    }
}

/// Difference between a snapshot and the current state of a resource.
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    pub resource: String,
    pub old_value: Value,
    pub new_value: Value,
    pub old_collection: Option<Vec<String>>,
    pub new_collection: Option<Vec<String>>,
    pub deleted: bool,
}

impl Change {
    pub(crate) fn deleted(
        resource: &str,
        snapshot: &Snapshot,
    ) -> Self {
        Self {
            resource: resource.to_string(),
            old_value: snapshot.entity.clone(),
            new_value: Value::Null,
            old_collection: snapshot.children.clone(),
            new_collection: None,
            deleted: true,
        }
    }

    /// Entity of a `changed` notification packet.
    pub fn to_entity(&self) -> Value {
        json!({
            "newValue": self.new_value,
            "oldValue": self.old_value,
            "newCollection": self.new_collection,
            "oldCollection": self.old_collection,
            "deleted": self.deleted,
        })
    }
}

impl Entity {
    pub fn new(
        resource: &str,
        kind: ValueKind,
    ) -> Self {
        Self {
            resource: resource.to_string(),
            entity: Value::Null,
            content_type: None,
            version: 0,
            permissions: BTreeSet::new(),
            last_updated: 0,
            allowed_content_types: None,
            kind,
            pinned: false,
        }
    }

    pub fn with_content_type(
        mut self,
        content_type: &str,
    ) -> Self {
        self.content_type = Some(content_type.to_string());
        self
    }

    pub fn with_allowed_content_types(
        mut self,
        allowed: &[&str],
    ) -> Self {
        self.allowed_content_types = Some(allowed.iter().map(|c| c.to_string()).collect());
        self
    }

    pub fn pinned(mut self) -> Self {
        self.pinned = true;
        self
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self.kind, ValueKind::Aggregate)
    }

    /// An omitted content type keeps the entity's current one.
    pub fn accepts(
        &self,
        content_type: Option<&str>,
    ) -> bool {
        match (&self.allowed_content_types, content_type) {
            (None, _) | (_, None) => true,
            (Some(allowed), Some(ct)) => allowed.contains(ct),
        }
    }

    pub fn check_permission(
        &self,
        src: &str,
    ) -> ApiResult<()> {
        if self.permissions.is_empty() || self.permissions.contains(src) {
            Ok(())
        } else {
            Err(ApiError::NoPermission {
                resource: self.resource.clone(),
                src: src.to_string(),
            })
        }
    }

    pub fn replace_permissions(
        &mut self,
        permissions: &[String],
    ) {
        self.permissions = permissions.iter().cloned().collect();
    }

    /// Replaces the payload. Leaves the entity untouched on a content type mismatch.
    pub fn set(
        &mut self,
        value: Value,
        content_type: Option<&str>,
        now: u64,
    ) -> ApiResult<()> {
        if !self.accepts(content_type) {
            return Err(ApiError::ContentTypeMismatch {
                resource: self.resource.clone(),
                content_type: content_type.map(str::to_string),
            });
        }
        self.entity = value;
        if let Some(ct) = content_type {
            self.content_type = Some(ct.to_string());
        }
        self.bump(now);
        Ok(())
    }

    pub(crate) fn bump(
        &mut self,
        now: u64,
    ) {
        self.version += 1;
        self.last_updated = now;
    }

    pub fn children(&self) -> Option<&VecDeque<String>> {
        match &self.kind {
            ValueKind::List(children) => Some(children),
            _ => None,
        }
    }

    fn children_mut(
        &mut self,
        action: &str,
    ) -> ApiResult<&mut VecDeque<String>> {
        match &mut self.kind {
            ValueKind::List(children) => Ok(children),
            _ => Err(ApiError::BadAction {
                resource: self.resource.clone(),
                action: action.to_string(),
            }),
        }
    }

    pub fn push_child(
        &mut self,
        child: &str,
        now: u64,
    ) -> ApiResult<()> {
        self.children_mut("pushChild")?.push_back(child.to_string());
        self.bump(now);
        Ok(())
    }

    pub fn unshift_child(
        &mut self,
        child: &str,
        now: u64,
    ) -> ApiResult<()> {
        self.children_mut("unshiftChild")?.push_front(child.to_string());
        self.bump(now);
        Ok(())
    }

    pub fn pop_child(
        &mut self,
        now: u64,
    ) -> ApiResult<Option<String>> {
        let removed = self.children_mut("popChild")?.pop_back();
        if removed.is_some() {
            self.bump(now);
        }
        Ok(removed)
    }

    pub fn shift_child(
        &mut self,
        now: u64,
    ) -> ApiResult<Option<String>> {
        let removed = self.children_mut("shiftChild")?.pop_front();
        if removed.is_some() {
            self.bump(now);
        }
        Ok(removed)
    }

    /// Unlinks every occurrence of `child`; returns whether anything was removed.
    pub fn remove_child(
        &mut self,
        child: &str,
        now: u64,
    ) -> ApiResult<bool> {
        let children = self.children_mut("removeChild")?;
        let before = children.len();
        children.retain(|c| c != child);
        let removed = children.len() != before;
        if removed {
            self.bump(now);
        }
        Ok(removed)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            existed: true,
            version: self.version,
            entity: self.entity.clone(),
            children: self.children_vec(),
        }
    }

    pub fn changes_since(
        &self,
        snapshot: &Snapshot,
    ) -> Option<Change> {
        if snapshot.existed && snapshot.version == self.version {
            return None;
        }
        Some(Change {
            resource: self.resource.clone(),
            old_value: snapshot.entity.clone(),
            new_value: self.entity.clone(),
            old_collection: snapshot.children.clone(),
            new_collection: self.children_vec(),
            deleted: false,
        })
    }

    /// Packet form of the entity, as embedded in other packets.
    pub fn to_packet_value(&self) -> Value {
        let mut packet = json!({
            "resource": self.resource,
            "entity": self.entity,
            "contentType": self.content_type,
            "version": self.version,
        });
        if let Some(links) = self.links() {
            packet["links"] = links;
        }
        packet
    }

    /// `links` field of the entity's packet form.
    pub fn links(&self) -> Option<Value> {
        self.children_vec().map(|children| json!({ "children": children }))
    }

    fn children_vec(&self) -> Option<Vec<String>> {
        self.children().map(|c| c.iter().cloned().collect())
    }
}
