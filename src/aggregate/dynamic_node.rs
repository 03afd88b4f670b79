use regex::Regex;
use serde_json::Value;

use crate::Change;
use crate::Entity;
use crate::EntityStore;
use crate::Result;
use crate::ValueKind;

/// Derived entity listing every stored path that matches a fixed pattern.
///
/// The value is recomputed from scratch on write, never patched, and reads
/// never trigger a recompute.
#[derive(Debug, Clone)]
pub struct DynamicNode {
    pub resource: String,
    pub pattern: Regex,
    pub content_type: String,
}

impl DynamicNode {
    pub fn new(
        resource: &str,
        pattern: &str,
        content_type: &str,
    ) -> Result<Self> {
        Ok(Self {
            resource: resource.to_string(),
            pattern: Regex::new(pattern)?,
            content_type: content_type.to_string(),
        })
    }

    pub fn matches(
        &self,
        resource: &str,
    ) -> bool {
        self.pattern.is_match(resource)
    }

    pub fn compute(
        &self,
        store: &EntityStore,
    ) -> Vec<String> {
        store.matching(&self.pattern)
    }

    /// Replaces the node's value with a fresh computation and bumps its version.
    pub fn refresh(
        &self,
        store: &mut EntityStore,
        now: u64,
    ) -> Option<Change> {
        let members = Value::from(self.compute(store));
        let snapshot = store.snapshot(&self.resource);

        if !store.contains(&self.resource) {
            store.insert(Entity::new(&self.resource, ValueKind::Aggregate));
        }
        let node = store.get_mut(&self.resource)?;
        node.kind = ValueKind::Aggregate;
        node.content_type = Some(self.content_type.clone());
        node.entity = members;
        node.bump(now);
        store.record_version(&self.resource);

        store.changes_since(&self.resource, &snapshot)
    }
}
