use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{DepotError, Result};

/// Name of the per-project configuration file
pub const PROJECT_CONFIG_FILE: &str = "depot.json";

/// Represents the source of a configuration value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Default built-in value
    Default,
    /// From the global config (`<config dir>/depot/config.json` or `DEPOT_HOME`)
    Global,
    /// From the project `depot.json`
    Project,
    /// From environment variable
    Environment(String),
    /// Programmatically set
    Command,
}

impl ConfigSource {
    pub fn as_str(&self) -> &str {
        match self {
            ConfigSource::Default => "default",
            ConfigSource::Global => "global",
            ConfigSource::Project => "project",
            ConfigSource::Environment(var) => var,
            ConfigSource::Command => "command",
        }
    }
}

/// Raw key/value configuration as found in a JSON file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawConfig {
    #[serde(flatten)]
    pub values: HashMap<String, serde_json::Value>,
}

/// Loads configuration from various sources
#[derive(Debug)]
pub struct ConfigLoader {
    use_environment: bool,
}

impl ConfigLoader {
    pub fn new(use_environment: bool) -> Self {
        Self { use_environment }
    }

    /// Read a `DEPOT_*` variable; empty values count as unset.
    pub fn get_depot_env(&self, var: &str) -> Option<String> {
        if !self.use_environment {
            return None;
        }

        env::var(var).ok().filter(|s| !s.is_empty())
    }

    /// Directory holding the global `config.json`
    pub fn get_depot_home(&self) -> PathBuf {
        if let Some(home) = self.get_depot_env("DEPOT_HOME") {
            return PathBuf::from(home);
        }

        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "depot") {
            proj_dirs.config_dir().to_path_buf()
        } else if let Some(base_dirs) = directories::BaseDirs::new() {
            base_dirs.home_dir().join(".depot")
        } else {
            PathBuf::from(".depot")
        }
    }

    /// Load configuration from a JSON file; a missing file is empty.
    pub fn load_config_file<P: AsRef<Path>>(&self, path: P) -> Result<RawConfig> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(RawConfig::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| DepotError::Config(format!("Failed to read {}: {}", path.display(), e)))?;

        serde_json::from_str(&contents)
            .map_err(|e| DepotError::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    pub fn load_global_config(&self) -> Result<RawConfig> {
        self.load_config_file(self.get_depot_home().join("config.json"))
    }

    pub fn load_project_config<P: AsRef<Path>>(&self, project_dir: P) -> Result<RawConfig> {
        self.load_config_file(project_dir.as_ref().join(PROJECT_CONFIG_FILE))
    }

    /// Environment override of a key: "http-timeout" reads `DEPOT_HTTP_TIMEOUT`.
    pub fn get_env_config(&self, key: &str) -> Option<String> {
        self.get_depot_env(&env_var_name(key))
    }

    pub fn get_env_bool(&self, key: &str) -> Option<bool> {
        self.get_env_config(key)
            .map(|val| !matches!(val.to_lowercase().as_str(), "false" | "0" | "no" | "off"))
    }

    pub fn get_env_u64(&self, key: &str) -> Option<u64> {
        self.get_env_config(key).and_then(|val| val.parse().ok())
    }

    pub fn get_env_path(&self, key: &str) -> Option<PathBuf> {
        self.get_env_config(key).map(PathBuf::from)
    }

    /// Comma separated list, e.g. `DEPOT_REPOSITORIES=a,b`
    pub fn get_env_list(&self, key: &str) -> Option<Vec<String>> {
        self.get_env_config(key).map(|val| {
            val.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
    }
}

/// `DEPOT_` + upper-cased key with dashes turned into underscores
pub fn env_var_name(key: &str) -> String {
    format!("DEPOT_{}", key.replace('-', "_").to_uppercase())
}
