//! Routing front of a bus participant.
//!
//! ## Key Responsibilities
//! - Hands each inbound packet to the directory named by its `dst`
//! - Fans participant disconnects out to every directory
//! - Publishes election results to the directories
//! - Stops every directory task on shutdown
//!
//! ## Example Usage
//! ```rust,ignore
//! let (node, mut outbound) = NodeBuilder::new(config).build()?;
//! node.set_role(ElectedRole::Leader);
//! node.route(PacketContext::new(packet, replies_tx))?;
//! ```

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::DirectoryEvent;
use crate::ElectedRole;
use crate::Error;
use crate::PacketContext;
use crate::Result;

/// Sending side of one running directory.
#[derive(Debug)]
pub struct DirectoryHandle {
    events: mpsc::UnboundedSender<DirectoryEvent>,
    roles: watch::Sender<ElectedRole>,
}

impl DirectoryHandle {
    pub fn new(
        events: mpsc::UnboundedSender<DirectoryEvent>,
        roles: watch::Sender<ElectedRole>,
    ) -> Self {
        Self { events, roles }
    }

    pub fn send(
        &self,
        event: DirectoryEvent,
    ) -> Result<()> {
        self.events
            .send(event)
            .map_err(|_| Error::ChannelClosed("directory event channel".to_string()))
    }

    pub fn set_role(
        &self,
        role: ElectedRole,
    ) {
        self.roles.send_replace(role);
    }

    pub fn role(&self) -> ElectedRole {
        *self.roles.borrow()
    }
}

pub struct BusNode {
    directories: DashMap<String, DirectoryHandle>,
    tasks: Mutex<Vec<JoinHandle<Result<()>>>>,
    shutdown_tx: watch::Sender<()>,
}

impl std::fmt::Debug for BusNode {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("BusNode")
            .field("directories", &self.directory_names())
            .finish()
    }
}

impl BusNode {
    pub(crate) fn new(shutdown_tx: watch::Sender<()>) -> Self {
        Self {
            directories: DashMap::new(),
            tasks: Mutex::new(Vec::new()),
            shutdown_tx,
        }
    }

    pub(crate) fn attach(
        &self,
        name: &str,
        handle: DirectoryHandle,
        task: JoinHandle<Result<()>>,
    ) {
        debug!(directory = %name, "directory attached");
        self.directories.insert(name.to_string(), handle);
        self.tasks.lock().push(task);
    }

    pub(crate) fn shutdown_signal(&self) -> watch::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Sorted names of the directories this node runs.
    pub fn directory_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.directories.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Delivers `ctx` to the directory named by its `dst`.
    pub fn route(
        &self,
        ctx: PacketContext,
    ) -> Result<()> {
        let dst = ctx.packet.dst.clone();
        match self.directories.get(&dst) {
            Some(handle) => handle.send(DirectoryEvent::Packet(ctx)),
            None => {
                warn!(%dst, src = %ctx.packet.src, "packet for unknown directory dropped");
                Err(Error::UnknownDirectory(dst))
            }
        }
    }

    /// Tells every directory that `address` left the bus.
    pub fn disconnect(
        &self,
        address: &str,
    ) {
        info!(%address, "participant disconnected");
        for entry in self.directories.iter() {
            if let Err(e) = entry.value().send(DirectoryEvent::Disconnect(address.to_string())) {
                warn!(directory = %entry.key(), "disconnect not delivered: {}", e);
            }
        }
    }

    /// Publishes the election result to every directory.
    pub fn set_role(
        &self,
        role: ElectedRole,
    ) {
        info!(?role, "role published");
        for entry in self.directories.iter() {
            entry.value().set_role(role);
        }
    }

    pub fn set_role_of(
        &self,
        directory: &str,
        role: ElectedRole,
    ) -> Result<()> {
        let handle = self
            .directories
            .get(directory)
            .ok_or_else(|| Error::UnknownDirectory(directory.to_string()))?;
        handle.set_role(role);
        Ok(())
    }

    pub fn role_of(
        &self,
        directory: &str,
    ) -> Option<ElectedRole> {
        self.directories.get(directory).map(|h| h.role())
    }

    /// Signals every directory to stop and waits for them.
    ///
    /// Leaders write their state back to the endpoint before stopping.
    pub async fn shutdown(&self) -> Result<()> {
        warn!("shutting down bus node");
        self.shutdown_tx.send_replace(());
        let tasks = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("directory stopped with error: {:?}", e),
                Err(e) => return Err(Error::Fatal(format!("directory task panicked: {e}"))),
            }
        }
        Ok(())
    }
}
