use tokio::sync::mpsc;
use tracing::warn;

use super::Packet;
use crate::LeaderState;

/// One inbound packet plus the channel its responses travel back on.
#[derive(Debug, Clone)]
pub struct PacketContext {
    pub packet: Packet,
    pub leader_state: LeaderState,
    replies: mpsc::UnboundedSender<Packet>,
}

impl PacketContext {
    pub fn new(
        packet: Packet,
        replies: mpsc::UnboundedSender<Packet>,
    ) -> Self {
        Self {
            packet,
            leader_state: LeaderState::default(),
            replies,
        }
    }

    /// Context whose replies can be read back from the returned receiver.
    pub fn channel(packet: Packet) -> (Self, mpsc::UnboundedReceiver<Packet>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(packet, tx), rx)
    }

    pub fn with_leader_state(
        mut self,
        leader_state: LeaderState,
    ) -> Self {
        self.leader_state = leader_state;
        self
    }

    pub fn reply(
        &self,
        packet: Packet,
    ) {
        if let Err(e) = self.replies.send(packet) {
            warn!(dst = %e.0.dst, "requester went away before its response was sent");
        }
    }
}

/// Fire-and-forget sender for notifications and collaborator-driven packets.
#[derive(Debug, Clone)]
pub struct Outbox {
    tx: mpsc::UnboundedSender<Packet>,
}

impl Outbox {
    pub fn new(tx: mpsc::UnboundedSender<Packet>) -> Self {
        Self { tx }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Packet>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn send(
        &self,
        packet: Packet,
    ) {
        if let Err(e) = self.tx.send(packet) {
            warn!(dst = %e.0.dst, "outbound channel closed, dropping packet");
        }
    }
}
