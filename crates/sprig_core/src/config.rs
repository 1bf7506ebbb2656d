//! World configuration.
//!
//! Every tunable the runtime exposes lives here so hosts can load it from a
//! settings file instead of recompiling.

use serde::{Deserialize, Serialize};

/// Initial size and hard ceiling of one recycle pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSettings {
    pub initial: usize,
    pub ceiling: usize,
}

impl PoolSettings {
    pub const fn new(initial: usize, ceiling: usize) -> Self {
        Self { initial, ceiling }
    }
}

/// Settings consumed by [`crate::ecs::World::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub name: String,
    /// Dirty entities a query may accumulate between refreshes before it
    /// gives up on incremental patching and rebuilds from scratch.
    pub refresh_threshold: usize,
    /// Per-component-type instance pools.
    pub component_pool: PoolSettings,
    pub mask_pool: PoolSettings,
    pub entity_pool: PoolSettings,
}

impl WorldConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_refresh_threshold(mut self, threshold: usize) -> Self {
        self.refresh_threshold = threshold;
        self
    }

    /// Parse a config from JSON. Missing fields fall back to defaults.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            name: "world".to_string(),
            refresh_threshold: 100,
            component_pool: PoolSettings::new(16, 2048),
            mask_pool: PoolSettings::new(128, 4096),
            entity_pool: PoolSettings::new(128, 500_000),
        }
    }
}
