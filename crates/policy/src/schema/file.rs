//! YAML policy file holding a base layer and named environment overlays.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::RawConfig;
use crate::error::{PolicyError, Result};

/// Contents of `policy.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyFile {
    #[serde(default = "default_version")]
    pub version: u32,
    /// Base layer applied to every environment.
    #[serde(default)]
    pub defaults: RawConfig,
    /// Environment name → overlay.
    #[serde(default)]
    pub envs: BTreeMap<String, RawConfig>,
}

fn default_version() -> u32 {
    1
}

impl PolicyFile {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| PolicyError::io(path, e))?;
        Self::from_yaml(&contents)
    }

    /// Overlay names, sorted.
    pub fn environments(&self) -> Vec<String> {
        self.envs.keys().cloned().collect()
    }

    /// Look up an environment overlay by name.
    pub fn overlay(&self, env: &str) -> Result<&RawConfig> {
        self.envs
            .get(env)
            .ok_or_else(|| PolicyError::UnknownEnvironment {
                name: env.to_string(),
                available: self.environments(),
            })
    }
}
