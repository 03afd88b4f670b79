use std::collections::BTreeSet;

use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::FutureExt;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio::time::Interval;
use tokio::time::MissedTickBehavior;
use tracing::debug;
use tracing::info;
use tracing::trace;
use tracing::warn;

use super::Directory;
use super::DirectoryHandler;
use super::Pending;
use crate::ElectedRole;
use crate::EndpointLoader;
use crate::LeaderState;
use crate::PacketContext;
use crate::RemoteEntity;
use crate::Result;

/// Input of a directory task.
#[derive(Debug)]
pub enum DirectoryEvent {
    Packet(PacketContext),
    /// A participant left the bus
    Disconnect(String),
}

enum RunnerWork<C> {
    Handler(PacketContext, C),
    Loaded(Vec<RemoteEntity>),
}

type Work<C> = BoxFuture<'static, RunnerWork<C>>;

fn handler_work<C: Send + 'static>(pending: Pending<C>) -> Work<C> {
    pending.map(|(ctx, completion)| RunnerWork::Handler(ctx, completion)).boxed()
}

async fn next_sweep(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// What a leader hands to [`persist`] on the way out.
struct Persistable {
    loader: EndpointLoader,
    entities: Vec<RemoteEntity>,
    stale: Vec<String>,
}

/// Owns one [`Directory`] and serializes everything that touches it.
pub struct DirectoryRunner<H: DirectoryHandler> {
    directory: Directory<H>,
    loader: Option<EndpointLoader>,
    /// Resources the endpoint is known to hold
    remote: BTreeSet<String>,
    events: mpsc::UnboundedReceiver<DirectoryEvent>,
    roles: watch::Receiver<ElectedRole>,
    shutdown_signal: watch::Receiver<()>,
}

impl<H: DirectoryHandler> DirectoryRunner<H> {
    pub fn new(
        directory: Directory<H>,
        loader: Option<EndpointLoader>,
        events: mpsc::UnboundedReceiver<DirectoryEvent>,
        roles: watch::Receiver<ElectedRole>,
        shutdown_signal: watch::Receiver<()>,
    ) -> Self {
        Self {
            directory,
            loader,
            remote: BTreeSet::new(),
            events,
            roles,
            shutdown_signal,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        let name = self.directory.name().to_string();
        let mut work: FuturesUnordered<Work<H::Completion>> = FuturesUnordered::new();
        let mut sweep = self.directory.sweep_interval().map(|period| {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });
        let mut roles_open = true;

        let initial = *self.roles.borrow_and_update();
        self.on_role(initial, &mut work);
        info!(directory = %name, "directory started");

        loop {
            tokio::select! {
                // Use biased to ensure branch order
                biased;
                // P0: shutdown received
                _ = self.shutdown_signal.changed() => {
                    warn!(directory = %name, "shutdown signal received.");
                    if let Some(persistable) = self.persistable() {
                        persist(&name, persistable).await;
                    }
                    return Ok(());
                }
                // P1: election result
                changed = self.roles.changed(), if roles_open => {
                    match changed {
                        Ok(()) => {
                            let role = *self.roles.borrow_and_update();
                            debug!(directory = %name, ?role, "role changed");
                            self.on_role(role, &mut work);
                        }
                        Err(_) => {
                            debug!(directory = %name, "role channel closed, keeping current role");
                            roles_open = false;
                        }
                    }
                }
                // P2: inbound packets and disconnects
                event = self.events.recv() => {
                    match event {
                        Some(DirectoryEvent::Packet(ctx)) => {
                            work.extend(self.directory.receive(ctx).into_iter().map(handler_work));
                        }
                        Some(DirectoryEvent::Disconnect(address)) => self.directory.disconnect(&address),
                        None => {
                            info!(directory = %name, "event channel closed, stopping");
                            if let Some(persistable) = self.persistable() {
                                persist(&name, persistable).await;
                            }
                            return Ok(());
                        }
                    }
                }
                // P3: liveness
                _ = next_sweep(&mut sweep) => {
                    let evicted = self.directory.sweep();
                    trace!(directory = %name, evicted, "sweep");
                }
                // P4: collaborator work
                Some(done) = work.next(), if !work.is_empty() => {
                    let pending = match done {
                        RunnerWork::Handler(ctx, completion) => self.directory.complete(ctx, completion),
                        RunnerWork::Loaded(remote) => self.on_loaded(remote),
                    };
                    work.extend(pending.into_iter().map(handler_work));
                }
            }
        }
    }

    fn on_role(
        &mut self,
        role: ElectedRole,
        work: &mut FuturesUnordered<Work<H::Completion>>,
    ) {
        if !self.directory.set_role(role) {
            return;
        }
        info!(directory = %self.directory.name(), "leadership won, loading state");
        match &self.loader {
            Some(loader) => {
                let loader = loader.clone();
                work.push(async move { RunnerWork::Loaded(loader.load().await) }.boxed());
            }
            None => work.extend(
                self.directory
                    .finish_transition(Vec::new())
                    .into_iter()
                    .map(handler_work),
            ),
        }
    }

    fn on_loaded(
        &mut self,
        remote: Vec<RemoteEntity>,
    ) -> Vec<Pending<H::Completion>> {
        let resources: Vec<String> = remote.iter().map(|r| r.resource.clone()).collect();
        let pending = self.directory.finish_transition(remote);
        let store = &self.directory.core().store;
        self.remote
            .extend(resources.into_iter().filter(|r| store.contains(r)));
        pending
    }

    /// What a leader writes back to the endpoint on the way out.
    ///
    /// Remote resources deleted here since the load are deleted there too.
    fn persistable(&self) -> Option<Persistable> {
        if self.directory.leader_state() != LeaderState::Leader {
            return None;
        }
        let loader = self.loader.clone()?;
        let entities = self.directory.export();
        let kept: BTreeSet<&str> = entities.iter().map(|e| e.resource.as_str()).collect();
        let stale = self
            .remote
            .iter()
            .filter(|r| !kept.contains(r.as_str()))
            .cloned()
            .collect();
        Some(Persistable {
            loader,
            entities,
            stale,
        })
    }
}

async fn persist(
    name: &str,
    persistable: Persistable,
) {
    let Persistable {
        loader,
        entities,
        stale,
    } = persistable;
    let total = entities.len();
    let saved = loader.save(entities).await;
    let deleted = loader.forget(stale).await;
    info!(directory = %name, saved, total, deleted, "state persisted");
}
