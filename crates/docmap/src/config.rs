use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{OdmError, OdmResult};

/// Session behaviour knobs. Every key is optional in a config file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OdmConfig {
    /// Row cap for `get_all` when the caller gives none.
    pub default_limit: usize,
    /// Create a type's collection and identity index on first construction.
    pub provision_collections: bool,
    /// Give unsaved instances a UUIDv7 string identity on `save`.
    pub generate_identity: bool,
    /// Write timestamps as float epoch seconds in dumps.
    pub compact_dump_timestamps: bool,
}

impl OdmConfig {
    pub const DEFAULT_LIMIT: usize = 200;

    pub fn from_toml_str(text: &str) -> OdmResult<Self> {
        toml::from_str(text).map_err(|e| OdmError::Config(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> OdmResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| OdmError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> OdmResult<String> {
        toml::to_string(self).map_err(|e| OdmError::Config(e.to_string()))
    }
}

impl Default for OdmConfig {
    fn default() -> Self {
        Self {
            default_limit: Self::DEFAULT_LIMIT,
            provision_collections: true,
            generate_identity: true,
            compact_dump_timestamps: true,
        }
    }
}
