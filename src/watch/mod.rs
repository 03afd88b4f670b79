//! Watch registrations for one directory.
//!
//! Exact-path and pattern watches are kept apart: exact lookups are a map hit,
//! pattern watches are scanned on every notification. Delivery itself happens
//! through the directory's [`crate::Outbox`] and never blocks the mutating caller.
mod registry;

pub use registry::*;

#[cfg(test)]
mod registry_test;
