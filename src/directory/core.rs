use std::sync::Arc;

use serde_json::Value;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use crate::constants::RESPONSE_CHANGED;
use crate::constants::RESPONSE_OK;
use crate::ApiError;
use crate::ApiResult;
use crate::Change;
use crate::Clock;
use crate::DynamicNode;
use crate::Entity;
use crate::EntityStore;
use crate::Outbox;
use crate::Packet;
use crate::PacketContext;
use crate::RespondOn;
use crate::Result;
use crate::action_label;
use crate::WatchRegistry;
use crate::Watcher;
use crate::REQUESTS_TOTAL;

/// Payload of an `ok` response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reply {
    pub entity: Value,
    pub content_type: Option<String>,
    pub version: Option<u64>,
    pub links: Option<Value>,
}

impl Reply {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_entity(entity: Value) -> Self {
        Self {
            entity,
            ..Default::default()
        }
    }

    pub fn from_entity(entity: &Entity) -> Self {
        Self {
            entity: entity.entity.clone(),
            content_type: entity.content_type.clone(),
            version: Some(entity.version),
            links: entity.links(),
        }
    }

    /// What a read of a resource that does not exist returns.
    pub fn absent() -> Self {
        Self {
            version: Some(0),
            ..Default::default()
        }
    }
}

/// State shared by every directory regardless of its API.
///
/// Every mutation, whether requested, evicted, or caused by a disconnect,
/// funnels through [`DirectoryCore::mutate`] or [`DirectoryCore::remove`] so
/// watchers are notified before aggregates are recomputed.
pub struct DirectoryCore {
    pub name: String,
    pub store: EntityStore,
    pub watches: WatchRegistry,
    dynamic_nodes: Vec<DynamicNode>,
    outbox: Outbox,
    clock: Arc<dyn Clock>,
    next_msg_id: u64,
}

impl std::fmt::Debug for DirectoryCore {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("DirectoryCore")
            .field("name", &self.name)
            .field("entities", &self.store.len())
            .field("watchers", &self.watches.watcher_count())
            .field("dynamic_nodes", &self.dynamic_nodes.len())
            .finish()
    }
}

impl DirectoryCore {
    pub fn new(
        name: &str,
        outbox: Outbox,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            name: name.to_string(),
            store: EntityStore::new(),
            watches: WatchRegistry::new(),
            dynamic_nodes: Vec::new(),
            outbox,
            clock,
            next_msg_id: 0,
        }
    }

    pub fn now(&self) -> u64 {
        self.clock.now_ms()
    }

    fn next_msg_id(&mut self) -> u64 {
        self.next_msg_id += 1;
        self.next_msg_id
    }

    pub fn is_dynamic(
        &self,
        resource: &str,
    ) -> bool {
        self.dynamic_nodes.iter().any(|n| n.resource == resource)
    }

    /// Registers a node once and computes its initial value.
    pub fn ensure_dynamic_node(
        &mut self,
        resource: &str,
        pattern: &str,
        content_type: &str,
    ) -> Result<()> {
        if self.is_dynamic(resource) {
            return Ok(());
        }
        let node = DynamicNode::new(resource, pattern, content_type)?;
        debug!(directory = %self.name, %resource, %pattern, "dynamic node registered");
        self.refresh_node(&node);
        self.dynamic_nodes.push(node);
        Ok(())
    }

    pub fn get(
        &self,
        resource: &str,
    ) -> Reply {
        self.store
            .get(resource)
            .map(Reply::from_entity)
            .unwrap_or_else(Reply::absent)
    }

    /// Applies `apply` to the entity at `resource`, creating it from `template` if absent.
    ///
    /// A created entity is only stored if `apply` succeeded and moved its version.
    pub fn mutate<T>(
        &mut self,
        resource: &str,
        src: &str,
        template: Entity,
        apply: impl FnOnce(&mut Entity, u64) -> ApiResult<T>,
    ) -> ApiResult<T> {
        let now = self.now();
        let snapshot = self.store.snapshot(resource);

        let out = if let Some(existing) = self.store.get_mut(resource) {
            if existing.is_aggregate() {
                return Err(ApiError::NoPermission {
                    resource: resource.to_string(),
                    src: src.to_string(),
                });
            }
            existing.check_permission(src)?;
            let out = apply(existing, now)?;
            self.store.record_version(resource);
            out
        } else {
            let mut created = self.store.fresh(template);
            let before = created.version;
            let out = apply(&mut created, now)?;
            if created.version != before {
                self.store.insert(created);
            }
            out
        };

        if let Some(change) = self.store.changes_since(resource, &snapshot) {
            self.propagate(&change);
        }
        Ok(out)
    }

    /// Plain write of the packet's entity.
    pub fn set(
        &mut self,
        packet: &Packet,
        template: Entity,
    ) -> ApiResult<Reply> {
        let value = packet.entity.clone();
        let content_type = packet.content_type.clone();
        let permissions = packet.permissions.clone();

        self.mutate(packet.resource(), &packet.src, template, |entity, now| {
            entity.set(value, content_type.as_deref(), now)?;
            if let Some(permissions) = permissions {
                entity.replace_permissions(&permissions);
            }
            Ok(Reply {
                version: Some(entity.version),
                ..Default::default()
            })
        })
    }

    /// Stores an entity that did not come from a participant request.
    pub fn put_pinned(
        &mut self,
        template: Entity,
        value: Value,
    ) -> ApiResult<()> {
        let resource = template.resource.clone();
        let content_type = template.content_type.clone();
        self.mutate(&resource, "", template.pinned(), |entity, now| {
            entity.pinned = true;
            entity.set(value, content_type.as_deref(), now)
        })
    }

    /// Whether `src` may delete `resource`. Absent resources are deletable.
    pub fn check_delete(
        &self,
        resource: &str,
        src: &str,
    ) -> ApiResult<()> {
        match self.store.get(resource) {
            Some(existing) if existing.is_aggregate() => Err(ApiError::NoPermission {
                resource: resource.to_string(),
                src: src.to_string(),
            }),
            Some(existing) => existing.check_permission(src),
            None => Ok(()),
        }
    }

    pub fn delete(
        &mut self,
        resource: &str,
        src: &str,
    ) -> ApiResult<Reply> {
        self.check_delete(resource, src)?;
        self.remove(resource);
        Ok(Reply::empty())
    }

    /// Deletes `resource`, then notifies its watchers, then recomputes aggregates.
    pub fn remove(
        &mut self,
        resource: &str,
    ) -> Option<Entity> {
        let snapshot = self.store.snapshot(resource);
        let removed = self.store.delete(resource)?;
        trace!(directory = %self.name, %resource, "removed");
        if let Some(change) = self.store.changes_since(resource, &snapshot) {
            self.propagate(&change);
        }
        Some(removed)
    }

    pub fn watch(
        &mut self,
        packet: &Packet,
    ) -> ApiResult<Reply> {
        let watcher = Watcher {
            address: packet.src.clone(),
            msg_id: packet.msg_id,
        };
        match &packet.pattern {
            Some(pattern) => {
                self.watches
                    .watch_pattern(pattern, watcher)
                    .map_err(|e| ApiError::bad_content(packet.resource(), e))?;
                Ok(Reply::empty())
            }
            None => {
                self.watches.watch(packet.resource(), watcher);
                Ok(self.get(packet.resource()))
            }
        }
    }

    pub fn unwatch(
        &mut self,
        packet: &Packet,
    ) -> ApiResult<Reply> {
        match &packet.pattern {
            Some(pattern) => self.watches.unwatch_pattern(pattern, &packet.src),
            None => self.watches.unwatch(packet.resource(), &packet.src),
        }
        Ok(Reply::empty())
    }

    fn propagate(
        &mut self,
        change: &Change,
    ) {
        self.notify(change);

        let affected: Vec<DynamicNode> = self
            .dynamic_nodes
            .iter()
            .filter(|n| n.resource != change.resource && n.matches(&change.resource))
            .cloned()
            .collect();
        for node in affected {
            self.refresh_node(&node);
        }
    }

    fn refresh_node(
        &mut self,
        node: &DynamicNode,
    ) {
        let now = self.now();
        if let Some(change) = node.refresh(&mut self.store, now) {
            self.notify(&change);
        }
    }

    fn notify(
        &mut self,
        change: &Change,
    ) {
        for watcher in self.watches.watchers_of(&change.resource) {
            let packet = Packet {
                dst: watcher.address,
                resource: Some(change.resource.clone()),
                response: Some(RESPONSE_CHANGED.to_string()),
                reply_to: Some(watcher.msg_id),
                entity: change.to_entity(),
                ..Default::default()
            };
            self.send(packet);
        }
    }

    /// Stamps and sends a packet originating from this directory.
    pub fn send(
        &mut self,
        mut packet: Packet,
    ) {
        packet.ver = crate::constants::PACKET_VERSION;
        packet.src = self.name.clone();
        packet.msg_id = self.next_msg_id();
        packet.time = self.now();
        self.outbox.send(packet);
    }

    /// Emits the single response owed to `ctx`.
    pub fn respond(
        &mut self,
        ctx: &PacketContext,
        result: ApiResult<Reply>,
    ) {
        let request = &ctx.packet;
        let outcome = match &result {
            Ok(_) => RESPONSE_OK,
            Err(e) => e.response_name(),
        };
        REQUESTS_TOTAL
            .with_label_values(&[&self.name, action_label(request.action()), outcome])
            .inc();

        let mut packet = Packet::response_to(request, &self.name, outcome);
        match result {
            Ok(reply) => {
                if request.respond_on != RespondOn::All {
                    return;
                }
                packet.entity = reply.entity;
                packet.content_type = reply.content_type;
                packet.version = reply.version;
                packet.links = reply.links;
            }
            Err(e) => {
                warn!(
                    directory = %self.name,
                    src = %request.src,
                    action = %request.action(),
                    resource = %request.resource(),
                    "request rejected: {}",
                    e
                );
                packet.entity = e.body();
            }
        }
        packet.msg_id = self.next_msg_id();
        packet.time = self.now();
        ctx.reply(packet);
    }
}
