mod dynamic_node;

pub use dynamic_node::*;
