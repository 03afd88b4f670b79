use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::collections::HashMap;

use regex::Regex;
use serde_json::Value;

use super::Change;
use super::Entity;
use super::Snapshot;
use super::ValueKind;
use crate::ApiResult;

/// Resource path to entity mapping owned by one directory.
///
/// Remembers the last version of every path it ever held, so a resource
/// that is deleted and written again continues counting where it stopped.
#[derive(Debug, Default)]
pub struct EntityStore {
    entities: BTreeMap<String, Entity>,
    last_versions: HashMap<String, u64>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(
        &self,
        resource: &str,
    ) -> Option<&Entity> {
        self.entities.get(resource)
    }

    pub fn get_mut(
        &mut self,
        resource: &str,
    ) -> Option<&mut Entity> {
        self.entities.get_mut(resource)
    }

    pub fn contains(
        &self,
        resource: &str,
    ) -> bool {
        self.entities.contains_key(resource)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Prepares a not-yet-stored entity so its first mutation yields a never-used version.
    pub fn fresh(
        &self,
        mut entity: Entity,
    ) -> Entity {
        let last = self.last_versions.get(&entity.resource).copied().unwrap_or_default();
        entity.version = entity.version.max(last);
        entity
    }

    pub fn insert(
        &mut self,
        entity: Entity,
    ) -> &mut Entity {
        let entity = self.fresh(entity);
        self.last_versions.insert(entity.resource.clone(), entity.version);
        match self.entities.entry(entity.resource.clone()) {
            Entry::Occupied(mut slot) => {
                slot.insert(entity);
                slot.into_mut()
            }
            Entry::Vacant(slot) => slot.insert(entity),
        }
    }

    /// Writes `value`, creating the entity with `make` if absent.
    ///
    /// A rejected write leaves the store exactly as it was.
    pub fn set_with(
        &mut self,
        resource: &str,
        make: impl FnOnce(&str) -> Entity,
        value: Value,
        content_type: Option<&str>,
        now: u64,
    ) -> ApiResult<&Entity> {
        match self.entities.entry(resource.to_string()) {
            Entry::Occupied(slot) => {
                let existing = slot.into_mut();
                existing.set(value, content_type, now)?;
                self.last_versions.insert(resource.to_string(), existing.version);
                Ok(existing)
            }
            Entry::Vacant(slot) => {
                let mut created = make(resource);
                let last = self.last_versions.get(resource).copied().unwrap_or_default();
                created.version = created.version.max(last);
                created.set(value, content_type, now)?;
                self.last_versions.insert(resource.to_string(), created.version);
                Ok(slot.insert(created))
            }
        }
    }

    pub fn set(
        &mut self,
        resource: &str,
        value: Value,
        content_type: Option<&str>,
        now: u64,
    ) -> ApiResult<&Entity> {
        self.set_with(
            resource,
            |r| Entity::new(r, ValueKind::Plain),
            value,
            content_type,
            now,
        )
    }

    /// Records a version bump made through [`EntityStore::get_mut`].
    pub(crate) fn record_version(
        &mut self,
        resource: &str,
    ) {
        if let Some(entity) = self.entities.get(resource) {
            self.last_versions.insert(resource.to_string(), entity.version);
        }
    }

    pub fn delete(
        &mut self,
        resource: &str,
    ) -> Option<Entity> {
        let removed = self.entities.remove(resource)?;
        let last = self.last_versions.entry(resource.to_string()).or_default();
        *last = (*last).max(removed.version);
        Some(removed)
    }

    pub fn snapshot(
        &self,
        resource: &str,
    ) -> Snapshot {
        self.entities
            .get(resource)
            .map(Entity::snapshot)
            .unwrap_or_else(Snapshot::absent)
    }

    pub fn changes_since(
        &self,
        resource: &str,
        snapshot: &Snapshot,
    ) -> Option<Change> {
        match self.entities.get(resource) {
            Some(entity) => entity.changes_since(snapshot),
            None if snapshot.existed => Some(Change::deleted(resource, snapshot)),
            None => None,
        }
    }

    /// Sorted paths of stored, non-aggregate entities matching `pattern`.
    pub fn matching(
        &self,
        pattern: &Regex,
    ) -> Vec<String> {
        self.entities
            .values()
            .filter(|e| !e.is_aggregate() && pattern.is_match(&e.resource))
            .map(|e| e.resource.clone())
            .collect()
    }
}
