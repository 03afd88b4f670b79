pub mod router;
pub mod time;

pub use router::*;
pub use time::*;

#[cfg(test)]
mod router_test;
