//! Replicated resource directories and intent resolution for a bus of
//! cooperating participants.
//!
//! A participant process runs three directories (`names.api`, `data.api`,
//! `intents.api`). Each one keeps versioned entities at resource paths,
//! notifies watchers of every change, maintains aggregate views, and only
//! applies writes while it holds leadership. See [`NodeBuilder`] for the
//! entry point.
mod aggregate;
mod config;
pub mod constants;
mod directory;
mod endpoint;
mod errors;
mod intents;
mod leader;
mod metrics;
mod node;
mod packet;
mod storage;
pub mod utils;
mod watch;

pub use aggregate::*;
pub use config::*;
pub use directory::*;
pub use endpoint::*;
pub use errors::*;
pub use intents::*;
pub use leader::*;
pub use metrics::*;
pub use node::*;
pub use packet::*;
pub use storage::*;
pub use utils::*;
pub use watch::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub(crate) mod test_utils;
