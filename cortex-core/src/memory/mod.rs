pub mod base;
pub mod link;
pub mod types;

pub use base::Memory;
pub use link::{Direction, Link, LinkedMemory, LinkRelation};
pub use types::MemoryType;
