//! Sprig Core
//!
//! Contains the runtime pieces of the ECS:
//! - Component registry, pooled storage and entity bookkeeping
//! - Deferred command queue and cached queries
//! - System groups with frame throttling
//! - World configuration and a fixed-step tick clock

pub mod config;
pub mod ecs;
pub mod pool;
pub mod time;

pub use config::{PoolSettings, WorldConfig};

/// Runtime version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
