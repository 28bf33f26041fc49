//! # cortex-core
//!
//! Foundation crate for the Cortex memory system.
//! Defines all types, traits, errors, config, and constants.
//! Every other crate in the workspace depends on this.

pub mod config;
pub mod constants;
pub mod errors;
pub mod memory;
pub mod session;
pub mod traits;

pub use config::CortexConfig;
pub use errors::{CortexError, CortexResult};
pub use memory::{Direction, Link, LinkedMemory, LinkRelation, Memory, MemoryType};
pub use session::{Checkpoint, Session, SessionStatus};
pub use traits::Embedder;
