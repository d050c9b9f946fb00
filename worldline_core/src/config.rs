//! Engine configuration.
//!
//! Every field has a default, so an empty TOML document is a valid config:
//!
//! ```toml
//! [layout]
//! column_spacing = 300.0
//! lane_gap = 2
//!
//! [import]
//! history_step_ms = 60000
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

use crate::error::ConfigError;

/// Namespace for ids synthesized during import. Changing it changes every
/// derived id, which breaks dedup against earlier imports.
pub const DEFAULT_ID_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2b7e_4d0a_5c39_9e51_a2d8_03b4_7f16);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub layout: LayoutConfig,
    pub import: ImportConfig,
}

impl EngineConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }
}

/// Configuration for the tidy-tree layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Horizontal distance between consecutive turns.
    pub column_spacing: f64,

    /// Vertical distance between consecutive leaf slots.
    pub row_spacing: f64,

    /// Empty slots between independent roots of one tree.
    pub lane_gap: u32,

    /// Empty slots between different trees.
    pub tree_gap: u32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            column_spacing: 260.0,
            row_spacing: 120.0,
            lane_gap: 1,
            tree_gap: 2,
        }
    }
}

/// Configuration for the import/merge engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Time step between synthesized history beats, counted back from the
    /// record's own timestamp.
    pub history_step_ms: i64,

    /// Namespace for ids derived from imported content.
    pub id_namespace: Uuid,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            history_step_ms: 1000,
            id_namespace: DEFAULT_ID_NAMESPACE,
        }
    }
}
