//! Externally persisted directory data.
//!
//! The backing service publishes a root link document (`_links`, `_embedded`);
//! a directory taking leadership loads the items it names and stores them as
//! pinned entities.
mod endpoint;
mod loader;
mod registry;

pub use endpoint::*;
pub use loader::*;
pub use registry::*;

#[cfg(test)]
mod registry_test;
