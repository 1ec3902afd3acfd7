//! World configuration
//!
//! Both limits are fixed when the world is constructed and never change.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Capacity limits for a [`World`](crate::World).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Maximum number of component types that may be registered.
    pub max_components: usize,
    /// Number of entity slots every per-entity array is sized to.
    pub max_entities: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            max_components: 128,
            max_entities: 10_000,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("max_components must be greater than zero")]
    ZeroMaxComponents,

    #[error("max_entities must be greater than zero")]
    ZeroMaxEntities,

    #[error("max_entities {max} does not fit in a 32-bit entity id")]
    EntityIdOverflow { max: usize },

    #[error("failed to parse world config: {0}")]
    Parse(#[from] serde_json::Error),
}

impl WorldConfig {
    pub fn new(max_components: usize, max_entities: usize) -> Self {
        Self {
            max_components,
            max_entities,
        }
    }

    /// Parse a JSON document. Missing keys keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_components == 0 {
            return Err(ConfigError::ZeroMaxComponents);
        }
        if self.max_entities == 0 {
            return Err(ConfigError::ZeroMaxEntities);
        }
        if u32::try_from(self.max_entities).is_err() {
            return Err(ConfigError::EntityIdOverflow {
                max: self.max_entities,
            });
        }
        Ok(())
    }
}
