mod entity;
mod entity_store;


pub use entity::*;
pub use entity_store::*;
