//! One participant process: the names, data and intents directories, each in
//! its own task, behind a single routing handle.
mod builder;
mod node;

pub use builder::*;
pub use node::*;

#[cfg(test)]
mod node_test;
