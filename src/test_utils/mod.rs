//! Fixtures shared by the unit tests of every directory.
mod fixture;

pub use fixture::*;
