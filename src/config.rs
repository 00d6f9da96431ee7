//! Configuration for module tracking.
//!
//! All knobs live in plain serde structs with sensible defaults. Nothing is
//! discovered from the environment; callers build or load a [`ModuleConfig`]
//! and pass the relevant part explicitly.

use crate::error::{ModuleError, Result};
use crate::io::IoLimits;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Master configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleConfig {
    /// Limits applied when mapping artifacts.
    pub io: IoLimits,
    /// Code-section lookup settings.
    pub reader: ReaderConfig,
    /// Module table behavior.
    pub table: TableConfig,
}

impl ModuleConfig {
    /// Parse a configuration document. Missing keys take their defaults.
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| ModuleError::malformed("config", e))
    }

    /// Load a configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

/// Settings for locating the code section inside an artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// ELF sections whose name starts with this prefix count as code (default: ".text").
    pub code_section_prefix: String,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            code_section_prefix: ".text".to_string(),
        }
    }
}

/// Settings for [`crate::core::table::ModuleTable`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Reject modules whose code sections overlap (default: false).
    pub strict_overlap: bool,
    /// Indent width for pretty-printed JSON (default: 4).
    pub json_indent: usize,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            strict_overlap: false,
            json_indent: 4,
        }
    }
}
