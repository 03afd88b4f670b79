use std::collections::VecDeque;

use tracing::debug;
use tracing::info;

use crate::PacketContext;
use crate::QUEUED_REQUESTS;

/// This replica's standing for one directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LeaderState {
    #[default]
    Member,
    /// Elected, still catching up before applying writes
    Transitioning,
    Leader,
}

/// Outcome of the external election, published on a watch channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ElectedRole {
    Leader,
    #[default]
    Member,
}

/// Actions that never mutate and are served in every state.
pub fn is_read_action(action: &str) -> bool {
    matches!(action, "get" | "watch" | "unwatch")
}

/// Gates writes on leadership.
///
/// Until this replica is `Leader`, writes wait in arrival order and are
/// handed back, still in that order, by [`LeaderCoordinator::become_leader`].
#[derive(Debug)]
pub struct LeaderCoordinator {
    api: String,
    state: LeaderState,
    queue: VecDeque<PacketContext>,
}

impl LeaderCoordinator {
    pub fn new(api: &str) -> Self {
        Self {
            api: api.to_string(),
            state: LeaderState::default(),
            queue: VecDeque::new(),
        }
    }

    pub fn state(&self) -> LeaderState {
        self.state
    }

    pub fn is_request_queueing(&self) -> bool {
        self.state != LeaderState::Leader
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Returns the context if it may be applied now, otherwise keeps it.
    pub fn admit(
        &mut self,
        ctx: PacketContext,
    ) -> Option<PacketContext> {
        let ctx = ctx.with_leader_state(self.state);
        if !self.is_request_queueing() || is_read_action(ctx.packet.action()) {
            return Some(ctx);
        }

        debug!(
            api = %self.api,
            state = ?self.state,
            msg_id = ctx.packet.msg_id,
            resource = %ctx.packet.resource(),
            "queueing write until leadership"
        );
        self.queue.push_back(ctx);
        QUEUED_REQUESTS.with_label_values(&[&self.api]).set(self.queue.len() as i64);
        None
    }

    pub fn begin_transition(&mut self) {
        info!(api = %self.api, from = ?self.state, "transitioning to leader");
        self.state = LeaderState::Transitioning;
    }

    /// Takes leadership and returns the queued writes in arrival order.
    pub fn become_leader(&mut self) -> Vec<PacketContext> {
        info!(api = %self.api, queued = self.queue.len(), "became leader");
        self.state = LeaderState::Leader;
        QUEUED_REQUESTS.with_label_values(&[&self.api]).set(0);
        self.queue
            .drain(..)
            .map(|ctx| ctx.with_leader_state(LeaderState::Leader))
            .collect()
    }

    pub fn step_down(&mut self) {
        if self.state != LeaderState::Member {
            info!(api = %self.api, from = ?self.state, "stepping down to member");
        }
        self.state = LeaderState::Member;
    }
}
