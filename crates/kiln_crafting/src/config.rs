//! # Engine Configuration
//!
//! Loaded once at startup from TOML. Every field has a default, so an
//! empty file yields a working engine.
//!
//! ```toml
//! max_craft_amount = 255
//! random_words_per_request = 1
//! event_buffer_capacity = 1024
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CraftingError, CraftingResult};

/// Engine-wide tunables.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Largest batch a single craft may request.
    pub max_craft_amount: u8,
    /// Random words requested per probabilistic craft.
    pub random_words_per_request: u32,
    /// Initial capacity of the event buffer.
    pub event_buffer_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_craft_amount: u8::MAX,
            random_words_per_request: 1,
            event_buffer_capacity: 1024,
        }
    }
}

impl EngineConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` on parse failure or invalid values.
    pub fn from_toml_str(source: &str) -> CraftingResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| CraftingError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the file cannot be read or is invalid.
    pub fn from_file(path: impl AsRef<Path>) -> CraftingResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| CraftingError::InvalidConfig(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&source)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` naming the offending field.
    pub fn validate(&self) -> CraftingResult<()> {
        if self.max_craft_amount == 0 {
            return Err(CraftingError::InvalidConfig(
                "max_craft_amount must be at least 1".to_string(),
            ));
        }
        if self.random_words_per_request == 0 {
            return Err(CraftingError::InvalidConfig(
                "random_words_per_request must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
