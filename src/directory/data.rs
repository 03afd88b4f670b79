use std::collections::VecDeque;
use std::convert::Infallible;

use futures::future::BoxFuture;
use serde_json::json;
use serde_json::Value;

use super::DirectoryCore;
use super::DirectoryHandler;
use super::Outcome;
use super::Reply;
use crate::ApiError;
use crate::ApiResult;
use crate::DataConfig;
use crate::Entity;
use crate::Packet;
use crate::PacketContext;
use crate::ValueKind;

/// Free-form shared values. Every entity can also act as a list of children.
#[derive(Debug)]
pub struct DataApi {
    name: String,
}

impl DataApi {
    pub fn new(config: &DataConfig) -> Self {
        Self {
            name: config.directory.name.clone(),
        }
    }

    fn child_resource(packet: &Packet) -> ApiResult<String> {
        packet
            .entity
            .get("resource")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ApiError::bad_content(packet.resource(), "entity.resource is required"))
    }

    /// Creates `<parent>/<id>` from the packet and links it at the back of the parent.
    fn add_child(
        &self,
        core: &mut DirectoryCore,
        packet: &Packet,
    ) -> ApiResult<Reply> {
        let parent = packet.resource();
        let child = format!("{}/{}", parent.trim_end_matches('/'), nanoid::nanoid!());

        core.mutate(parent, &packet.src, self.make_value(parent)?, |entity, now| {
            entity.push_child(&child, now)
        })?;

        let mut create = packet.clone();
        create.resource = Some(child.clone());
        core.set(&create, self.make_value(&child)?)?;

        Ok(Reply::with_entity(json!({ "resource": child })))
    }

    /// Unlinks the named child from the parent and deletes it.
    fn remove_child(
        &self,
        core: &mut DirectoryCore,
        packet: &Packet,
    ) -> ApiResult<Reply> {
        let parent = packet.resource();
        let child = Self::child_resource(packet)?;
        core.check_delete(&child, &packet.src)?;

        core.mutate(parent, &packet.src, self.make_value(parent)?, |entity, now| {
            entity.remove_child(&child, now)
        })?;
        core.delete(&child, &packet.src)?;
        Ok(Reply::empty())
    }

    fn link_child(
        &self,
        core: &mut DirectoryCore,
        packet: &Packet,
        front: bool,
    ) -> ApiResult<Reply> {
        let parent = packet.resource();
        let child = Self::child_resource(packet)?;

        let version = core.mutate(parent, &packet.src, self.make_value(parent)?, |entity, now| {
            if front {
                entity.unshift_child(&child, now)?;
            } else {
                entity.push_child(&child, now)?;
            }
            Ok(entity.version)
        })?;
        Ok(Reply {
            version: Some(version),
            ..Default::default()
        })
    }

    fn unlink_child(
        &self,
        core: &mut DirectoryCore,
        packet: &Packet,
        front: bool,
    ) -> ApiResult<Reply> {
        let parent = packet.resource();
        let removed = core.mutate(parent, &packet.src, self.make_value(parent)?, |entity, now| {
            if front {
                entity.shift_child(now)
            } else {
                entity.pop_child(now)
            }
        })?;
        Ok(Reply::with_entity(json!({ "resource": removed })))
    }
}

impl DirectoryHandler for DataApi {
    type Completion = Infallible;

    fn validate_resource(
        &self,
        resource: &str,
    ) -> bool {
        resource.starts_with('/')
    }

    fn make_value(
        &self,
        resource: &str,
    ) -> ApiResult<Entity> {
        if !self.validate_resource(resource) {
            return Err(ApiError::bad_resource(&self.name, resource));
        }
        Ok(Entity::new(resource, ValueKind::List(VecDeque::new())))
    }

    fn handle_action(
        &mut self,
        core: &mut DirectoryCore,
        packet: &Packet,
    ) -> ApiResult<Outcome<Infallible>> {
        let reply = match packet.action() {
            "addChild" => self.add_child(core, packet)?,
            "removeChild" => self.remove_child(core, packet)?,
            "pushChild" => self.link_child(core, packet, false)?,
            "unshiftChild" => self.link_child(core, packet, true)?,
            "popChild" => self.unlink_child(core, packet, false)?,
            "shiftChild" => self.unlink_child(core, packet, true)?,
            action => {
                return Err(ApiError::BadAction {
                    resource: packet.resource().to_string(),
                    action: action.to_string(),
                })
            }
        };
        Ok(Outcome::Reply(reply))
    }

    fn complete(
        &mut self,
        _core: &mut DirectoryCore,
        _ctx: &PacketContext,
        completion: Infallible,
    ) -> Vec<BoxFuture<'static, Infallible>> {
        match completion {}
    }
}
