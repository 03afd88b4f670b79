//! Intent resolution: handler registration, invocation, and the lifecycle of
//! every in-flight invocation.
mod api;
mod collaborators;
mod state;

pub use api::*;
pub use collaborators::*;
pub use state::*;

#[cfg(test)]
mod state_test;
