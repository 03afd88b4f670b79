//! Resource directories.
//!
//! A [`Directory`] is one API's entity store plus the request pipeline in
//! front of it: alias rewrite, leader gating, resource validation, dispatch,
//! then exactly one response. What differs between APIs lives behind
//! [`DirectoryHandler`]; [`DirectoryRunner`] owns a directory inside a task.
mod core;
mod data;
mod directory;
mod handler;
mod names;
mod runner;
mod sweeper;

pub use self::core::*;
pub use data::*;
pub use directory::*;
pub use handler::*;
pub use names::*;
pub use runner::*;
pub use sweeper::*;

#[cfg(test)]
mod data_test;
#[cfg(test)]
mod directory_test;
#[cfg(test)]
mod runner_test;
#[cfg(test)]
mod sweeper_test;
