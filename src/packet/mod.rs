mod context;
mod packet;

pub use context::*;
pub use packet::*;
