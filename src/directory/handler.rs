use futures::future::BoxFuture;

use super::DirectoryCore;
use super::Reply;
use crate::ApiError;
use crate::ApiResult;
use crate::Entity;
use crate::Packet;
use crate::PacketContext;
use crate::Result;

/// What a handler did with a request.
pub enum Outcome<C> {
    /// Answer now
    Reply(Reply),
    /// Answer once the collaborator work resolves, through [`DirectoryHandler::complete`]
    Deferred(BoxFuture<'static, C>),
    /// Answer now and finish background work later
    ReplyAndDefer(Reply, BoxFuture<'static, C>),
}

impl<C> std::fmt::Debug for Outcome<C> {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            Outcome::Reply(reply) => f.debug_tuple("Reply").field(reply).finish(),
            Outcome::Deferred(_) => f.write_str("Deferred"),
            Outcome::ReplyAndDefer(reply, _) => f.debug_tuple("ReplyAndDefer").field(reply).finish(),
        }
    }
}

/// API-specific behaviour plugged into the shared request pipeline.
///
/// Every action has a default that goes straight to [`DirectoryCore`]; an API
/// only overrides what it does differently.
pub trait DirectoryHandler: Send + 'static {
    /// Result of deferred collaborator work, fed back through [`DirectoryHandler::complete`].
    type Completion: Send + 'static;

    fn validate_resource(
        &self,
        resource: &str,
    ) -> bool;

    /// Rewrites aliases in the inbound resource before validation.
    fn rewrite_resource(
        &self,
        _packet: &mut Packet,
    ) {
    }

    /// Default entity for a resource written for the first time.
    fn make_value(
        &self,
        resource: &str,
    ) -> ApiResult<Entity>;

    /// Pre-populates the directory.
    fn bootstrap(
        &mut self,
        _core: &mut DirectoryCore,
    ) -> Result<()> {
        Ok(())
    }

    /// Resources that disappear with a participant.
    fn owned_resources(
        &self,
        _core: &DirectoryCore,
        _address: &str,
    ) -> Vec<String> {
        Vec::new()
    }

    fn handle_get(
        &mut self,
        core: &mut DirectoryCore,
        packet: &Packet,
    ) -> ApiResult<Outcome<Self::Completion>> {
        Ok(Outcome::Reply(core.get(packet.resource())))
    }

    fn handle_set(
        &mut self,
        core: &mut DirectoryCore,
        packet: &Packet,
    ) -> ApiResult<Outcome<Self::Completion>> {
        let template = self.make_value(packet.resource())?;
        core.set(packet, template).map(Outcome::Reply)
    }

    fn handle_delete(
        &mut self,
        core: &mut DirectoryCore,
        packet: &Packet,
    ) -> ApiResult<Outcome<Self::Completion>> {
        core.delete(packet.resource(), &packet.src).map(Outcome::Reply)
    }

    fn handle_watch(
        &mut self,
        core: &mut DirectoryCore,
        packet: &Packet,
    ) -> ApiResult<Outcome<Self::Completion>> {
        core.watch(packet).map(Outcome::Reply)
    }

    fn handle_unwatch(
        &mut self,
        core: &mut DirectoryCore,
        packet: &Packet,
    ) -> ApiResult<Outcome<Self::Completion>> {
        core.unwatch(packet).map(Outcome::Reply)
    }

    /// Anything beyond the five common actions.
    fn handle_action(
        &mut self,
        _core: &mut DirectoryCore,
        packet: &Packet,
    ) -> ApiResult<Outcome<Self::Completion>> {
        Err(ApiError::BadAction {
            resource: packet.resource().to_string(),
            action: packet.action().to_string(),
        })
    }

    /// Finishes deferred work started for `ctx`, possibly starting more.
    fn complete(
        &mut self,
        _core: &mut DirectoryCore,
        _ctx: &PacketContext,
        _completion: Self::Completion,
    ) -> Vec<BoxFuture<'static, Self::Completion>> {
        Vec::new()
    }
}
