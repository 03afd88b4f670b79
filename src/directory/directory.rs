use std::time::Duration;

use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::FutureExt;
use futures::StreamExt;
use tracing::debug;
use tracing::info;
use tracing::trace;
use tracing::warn;

use super::DirectoryCore;
use super::DirectoryHandler;
use super::LivenessSweeper;
use super::Outcome;
use crate::ApiError;
use crate::ElectedRole;
use crate::LeaderCoordinator;
use crate::LeaderState;
use crate::LivenessConfig;
use crate::PacketContext;
use crate::RemoteEntity;
use crate::Result;
use crate::EVICTIONS_TOTAL;

/// Deferred handler work, paired with the request it belongs to.
pub type Pending<C> = BoxFuture<'static, (PacketContext, C)>;

/// One API's entity store plus the pipeline in front of it.
///
/// Single-threaded by construction: every method takes `&mut self`, and the
/// only suspension points are the [`Pending`] futures handed back to the caller.
#[derive(Debug)]
pub struct Directory<H: DirectoryHandler> {
    core: DirectoryCore,
    handler: H,
    coordinator: LeaderCoordinator,
    sweeper: Option<LivenessSweeper>,
}

fn attach<C: Send + 'static>(
    ctx: PacketContext,
    work: BoxFuture<'static, C>,
) -> Pending<C> {
    work.map(move |completion| (ctx, completion)).boxed()
}

impl<H: DirectoryHandler> Directory<H> {
    pub fn new(
        mut core: DirectoryCore,
        mut handler: H,
        liveness: &LivenessConfig,
    ) -> Result<Self> {
        handler.bootstrap(&mut core)?;
        let coordinator = LeaderCoordinator::new(&core.name);
        let sweeper = liveness.enabled.then(|| LivenessSweeper::new(liveness));
        Ok(Self {
            core,
            handler,
            coordinator,
            sweeper,
        })
    }

    pub fn name(&self) -> &str {
        &self.core.name
    }

    pub fn core(&self) -> &DirectoryCore {
        &self.core
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn leader_state(&self) -> LeaderState {
        self.coordinator.state()
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        self.sweeper.as_ref().map(LivenessSweeper::interval)
    }

    /// Entry point for every inbound packet: alias rewrite, leader gating, then processing.
    pub fn receive(
        &mut self,
        mut ctx: PacketContext,
    ) -> Vec<Pending<H::Completion>> {
        self.handler.rewrite_resource(&mut ctx.packet);
        match self.coordinator.admit(ctx) {
            Some(ctx) => self.process(ctx),
            None => Vec::new(),
        }
    }

    fn process(
        &mut self,
        ctx: PacketContext,
    ) -> Vec<Pending<H::Completion>> {
        let packet = &ctx.packet;
        trace!(
            directory = %self.core.name,
            src = %packet.src,
            msg_id = packet.msg_id,
            action = %packet.action(),
            resource = %packet.resource(),
            "processing"
        );

        if !self.handler.validate_resource(packet.resource()) {
            let error = ApiError::bad_resource(&self.core.name, packet.resource());
            self.core.respond(&ctx, Err(error));
            return Vec::new();
        }

        let core = &mut self.core;
        let outcome = match packet.action() {
            "get" => self.handler.handle_get(core, packet),
            "set" => self.handler.handle_set(core, packet),
            "delete" => self.handler.handle_delete(core, packet),
            "watch" => self.handler.handle_watch(core, packet),
            "unwatch" => self.handler.handle_unwatch(core, packet),
            _ => self.handler.handle_action(core, packet),
        };

        match outcome {
            Ok(Outcome::Reply(reply)) => {
                self.core.respond(&ctx, Ok(reply));
                Vec::new()
            }
            Ok(Outcome::Deferred(work)) => vec![attach(ctx, work)],
            Ok(Outcome::ReplyAndDefer(reply, work)) => {
                self.core.respond(&ctx, Ok(reply));
                vec![attach(ctx, work)]
            }
            Err(e) => {
                self.core.respond(&ctx, Err(e));
                Vec::new()
            }
        }
    }

    /// Feeds the result of deferred work back into the handler.
    pub fn complete(
        &mut self,
        ctx: PacketContext,
        completion: H::Completion,
    ) -> Vec<Pending<H::Completion>> {
        self.handler
            .complete(&mut self.core, &ctx, completion)
            .into_iter()
            .map(|work| attach(ctx.clone(), work))
            .collect()
    }

    /// Returns true when the caller must load remote state and then call
    /// [`Directory::finish_transition`].
    pub fn set_role(
        &mut self,
        role: ElectedRole,
    ) -> bool {
        match role {
            ElectedRole::Leader if self.coordinator.state() == LeaderState::Member => {
                self.coordinator.begin_transition();
                true
            }
            ElectedRole::Leader => false,
            ElectedRole::Member => {
                self.coordinator.step_down();
                false
            }
        }
    }

    /// Applies loaded remote state, takes leadership and replays queued writes.
    pub fn finish_transition(
        &mut self,
        remote: Vec<RemoteEntity>,
    ) -> Vec<Pending<H::Completion>> {
        if self.coordinator.state() != LeaderState::Transitioning {
            debug!(directory = %self.core.name, "leadership lost while loading, staying member");
            return Vec::new();
        }
        self.apply_remote(remote);

        let mut pending = Vec::new();
        for ctx in self.coordinator.become_leader() {
            pending.extend(self.process(ctx));
        }
        pending
    }

    /// Stores externally persisted entities as pinned entries.
    pub fn apply_remote(
        &mut self,
        remote: Vec<RemoteEntity>,
    ) {
        let count = remote.len();
        for item in remote {
            if !self.handler.validate_resource(&item.resource) {
                warn!(directory = %self.core.name, resource = %item.resource, "skipping remote entity outside this directory");
                continue;
            }
            let stored = self.handler.make_value(&item.resource).and_then(|mut template| {
                if let Some(ct) = item.content_type {
                    template.content_type = Some(ct);
                }
                self.core.put_pinned(template, item.entity)
            });
            if let Err(e) = stored {
                warn!(directory = %self.core.name, resource = %item.resource, "remote entity rejected: {}", e);
            }
        }
        if count > 0 {
            info!(directory = %self.core.name, count, "remote entities applied");
        }
    }

    /// Everything worth persisting; computed nodes are left out.
    pub fn export(&self) -> Vec<RemoteEntity> {
        self.core
            .store
            .iter()
            .filter(|e| !e.is_aggregate())
            .map(|e| RemoteEntity {
                resource: e.resource.clone(),
                entity: e.entity.clone(),
                content_type: e.content_type.clone(),
            })
            .collect()
    }

    /// Evicts stale entities. Only the leader evicts; returns how many were removed.
    pub fn sweep(&mut self) -> usize {
        let Some(sweeper) = &self.sweeper else {
            return 0;
        };
        if self.coordinator.is_request_queueing() {
            return 0;
        }

        let expired = sweeper.expired(&self.core.store, self.core.now());
        for resource in &expired {
            debug!(directory = %self.core.name, %resource, "evicting stale entity");
            self.core.remove(resource);
            EVICTIONS_TOTAL.with_label_values(&[&self.core.name]).inc();
        }
        expired.len()
    }

    /// Forgets a participant's watches; the leader also removes what it owned.
    pub fn disconnect(
        &mut self,
        address: &str,
    ) {
        self.core.watches.remove_participant(address);
        if self.coordinator.is_request_queueing() {
            return;
        }
        let owned = self.handler.owned_resources(&self.core, address);
        debug!(directory = %self.core.name, %address, owned = owned.len(), "participant disconnected");
        for resource in owned {
            self.core.remove(&resource);
        }
    }

    /// Receives `ctx` and runs every piece of deferred work it spawns to completion.
    pub async fn drive(
        &mut self,
        ctx: PacketContext,
    ) {
        let mut pending: FuturesUnordered<_> = self.receive(ctx).into_iter().collect();
        while let Some((ctx, completion)) = pending.next().await {
            pending.extend(self.complete(ctx, completion));
        }
    }
}
