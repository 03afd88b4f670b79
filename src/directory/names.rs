use std::convert::Infallible;

use futures::future::BoxFuture;
use serde_json::json;

use super::DirectoryCore;
use super::DirectoryHandler;
use crate::constants::*;
use crate::ApiError;
use crate::ApiResult;
use crate::Entity;
use crate::NamesConfig;
use crate::Packet;
use crate::PacketContext;
use crate::ResourceRouter;
use crate::Result;
use crate::ValueKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NameKind {
    Api,
    Address,
    Multicast,
    Router,
}

impl NameKind {
    fn content_type(self) -> &'static str {
        match self {
            NameKind::Api => API_CONTENT_TYPE,
            NameKind::Address => ADDRESS_CONTENT_TYPE,
            NameKind::Multicast => MULTICAST_CONTENT_TYPE,
            NameKind::Router => ROUTER_CONTENT_TYPE,
        }
    }
}

/// Directory of who is on the bus: addresses, multicast groups, routers and APIs.
#[derive(Debug)]
pub struct NamesApi {
    name: String,
    config: NamesConfig,
    router: ResourceRouter<NameKind>,
}

impl NamesApi {
    pub fn new(config: NamesConfig) -> Result<Self> {
        let router = ResourceRouter::new()
            .add(r"^/api(/.*)?$", NameKind::Api)?
            .add(r"^/address(/.*)?$", NameKind::Address)?
            .add(r"^/multicast(/.*)?$", NameKind::Multicast)?
            .add(r"^/router(/.*)?$", NameKind::Router)?;
        Ok(Self {
            name: config.directory.name.clone(),
            config,
            router,
        })
    }
}

impl DirectoryHandler for NamesApi {
    type Completion = Infallible;

    fn validate_resource(
        &self,
        resource: &str,
    ) -> bool {
        self.router.matches(resource)
    }

    fn rewrite_resource(
        &self,
        packet: &mut Packet,
    ) {
        if packet.resource.as_deref() == Some(SELF_ALIAS) {
            packet.resource = Some(format!("/address/{}", packet.src));
        }
    }

    fn make_value(
        &self,
        resource: &str,
    ) -> ApiResult<Entity> {
        let kind = self
            .router
            .route(resource)
            .ok_or_else(|| ApiError::bad_resource(&self.name, resource))?;
        let content_type = kind.content_type();
        Ok(Entity::new(resource, ValueKind::Plain)
            .with_content_type(content_type)
            .with_allowed_content_types(&[content_type]))
    }

    fn bootstrap(
        &mut self,
        core: &mut DirectoryCore,
    ) -> Result<()> {
        core.ensure_dynamic_node("/address", r"^/address/.*$", ADDRESS_LIST_CONTENT_TYPE)?;
        core.ensure_dynamic_node("/multicast", r"^/multicast/.*$", MULTICAST_LIST_CONTENT_TYPE)?;
        core.ensure_dynamic_node("/router", r"^/router/.*$", ROUTER_LIST_CONTENT_TYPE)?;
        core.ensure_dynamic_node("/api", r"^/api/.*$", API_LIST_CONTENT_TYPE)?;

        for descriptor in &self.config.bootstrap {
            let template = self.make_value(&descriptor.resource)?;
            core.put_pinned(template, json!({ "actions": descriptor.actions }))?;
        }
        Ok(())
    }

    fn owned_resources(
        &self,
        core: &DirectoryCore,
        address: &str,
    ) -> Vec<String> {
        let own = format!("/address/{address}");
        let is_member = |resource: &str| {
            resource
                .strip_prefix("/multicast/")
                .and_then(|rest| rest.split_once('/'))
                .is_some_and(|(_group, member)| member == address)
        };
        core.store
            .iter()
            .map(|e| e.resource.as_str())
            .filter(|r| *r == own || is_member(r))
            .map(str::to_string)
            .collect()
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
