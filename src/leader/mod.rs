mod coordinator;

pub use coordinator::*;

#[cfg(test)]
mod coordinator_test;
