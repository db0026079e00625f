use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::source::{env_var_name, ConfigLoader, ConfigSource, RawConfig};
use crate::error::{DepotError, Result};
use crate::http::HttpClientConfig;
use crate::package::ScopeSet;

/// Maven Central
pub const DEFAULT_REPOSITORY: &str = "https://repo1.maven.org/maven2";

pub const DEFAULT_VCS_URL_TEMPLATE: &str = "https://github.com/{groupId}/{artifactId}.git";

const STATE_DIR_NAME: &str = ".depot";
const BACKUP_DIR_NAME: &str = ".backup";
const METADATA_DIR_NAME: &str = ".metadata";

fn default_package_root() -> PathBuf {
    PathBuf::from("packages")
}

fn default_repositories() -> Vec<String> {
    vec![DEFAULT_REPOSITORY.to_string()]
}

fn default_vcs_url_template() -> String {
    DEFAULT_VCS_URL_TEMPLATE.to_string()
}

fn default_http_timeout() -> u64 {
    30
}

fn default_http_retries() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

/// A single string or an array of strings
fn string_list(value: &serde_json::Value) -> Option<Vec<String>> {
    match value {
        serde_json::Value::String(s) => Some(vec![s.clone()]),
        serde_json::Value::Array(items) => items
            .iter()
            .map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => None,
    }
}

/// Resolver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Where packages are installed
    #[serde(default = "default_package_root")]
    pub package_root: PathBuf,

    /// Tag file directory; `<package-root>/.depot` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_dir: Option<PathBuf>,

    /// Maven repositories, tried in order (URLs or local paths)
    #[serde(default = "default_repositories")]
    pub repositories: Vec<String>,

    /// Dependency scopes followed from the roots
    #[serde(default)]
    pub scopes: ScopeSet,

    #[serde(default = "default_vcs_url_template")]
    pub vcs_url_template: String,

    /// HTTP timeout in seconds
    #[serde(default = "default_http_timeout")]
    pub http_timeout: u64,

    #[serde(default = "default_http_retries")]
    pub http_retries: u32,

    /// Proxy URL for all HTTP requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_proxy: Option<String>,

    /// Extra CA certificate (PEM) trusted for HTTPS
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cafile: Option<PathBuf>,

    /// Private key for SSH git remotes; the SSH agent is used when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_key: Option<PathBuf>,

    /// Merge module dependencies into aggregator packages
    #[serde(default = "default_true")]
    pub include_modules: bool,

    /// Verify artifacts against published checksum files
    #[serde(default = "default_true")]
    pub verify_checksums: bool,

    #[serde(skip)]
    base_dir: Option<PathBuf>,

    #[serde(skip)]
    sources: HashMap<String, ConfigSource>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            package_root: default_package_root(),
            state_dir: None,
            repositories: default_repositories(),
            scopes: ScopeSet::default(),
            vcs_url_template: default_vcs_url_template(),
            http_timeout: default_http_timeout(),
            http_retries: default_http_retries(),
            http_proxy: None,
            cafile: None,
            ssh_key: None,
            include_modules: true,
            verify_checksums: true,
            base_dir: None,
            sources: HashMap::new(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration rooted at `package_root`, everything else default.
    pub fn with_package_root<P: AsRef<Path>>(package_root: P) -> Self {
        let mut config = Self::default();
        config.set_package_root(package_root);
        config
    }

    /// Build configuration from all sources (defaults, global, project, env)
    pub fn build<P: AsRef<Path>>(project_dir: Option<P>, use_environment: bool) -> Result<Self> {
        let loader = ConfigLoader::new(use_environment);
        let mut config = Self::default();

        if let Some(dir) = &project_dir {
            config.base_dir = Some(dir.as_ref().to_path_buf());
        }

        for key in Self::config_keys() {
            config.sources.insert(key.to_string(), ConfigSource::Default);
        }

        let global_config = loader.load_global_config()?;
        config.merge_raw_config(global_config, ConfigSource::Global)?;

        if let Some(project_dir) = &project_dir {
            let project_config = loader.load_project_config(project_dir)?;
            config.merge_raw_config(project_config, ConfigSource::Project)?;
        }

        if use_environment {
            config.apply_env_overrides(&loader)?;
        }

        Ok(config)
    }

    pub fn set_base_dir<P: AsRef<Path>>(&mut self, base_dir: P) {
        self.base_dir = Some(base_dir.as_ref().to_path_buf());
    }

    pub fn base_dir(&self) -> Option<&Path> {
        self.base_dir.as_deref()
    }

    pub fn set_package_root<P: AsRef<Path>>(&mut self, package_root: P) {
        self.package_root = package_root.as_ref().to_path_buf();
        self.sources
            .insert("package-root".to_string(), ConfigSource::Command);
    }

    pub fn set_scopes(&mut self, scopes: ScopeSet) {
        self.scopes = scopes;
        self.sources.insert("scopes".to_string(), ConfigSource::Command);
    }

    /// Get the source of a configuration value
    pub fn get_source(&self, key: &str) -> Option<&ConfigSource> {
        self.sources.get(key)
    }

    /// Package root, expanded and made absolute against the base dir
    pub fn get_package_root(&self) -> PathBuf {
        self.resolve_path(&self.package_root)
    }

    pub fn get_state_dir(&self) -> PathBuf {
        match &self.state_dir {
            Some(dir) => self.resolve_path(dir),
            None => self.get_package_root().join(STATE_DIR_NAME),
        }
    }

    pub fn get_backup_dir(&self) -> PathBuf {
        self.get_package_root().join(BACKUP_DIR_NAME)
    }

    /// Cache of downloaded descriptor files
    pub fn get_metadata_dir(&self) -> PathBuf {
        self.get_package_root().join(METADATA_DIR_NAME)
    }

    /// Repositories with `~` and variables expanded; local paths made absolute.
    pub fn get_repositories(&self) -> Vec<String> {
        self.repositories
            .iter()
            .map(|repo| {
                if repo.contains("://") {
                    repo.trim_end_matches('/').to_string()
                } else {
                    self.resolve_path(Path::new(repo)).to_string_lossy().into_owned()
                }
            })
            .collect()
    }

    pub fn get_ssh_key(&self) -> Option<PathBuf> {
        self.ssh_key.as_deref().map(|key| self.resolve_path(key))
    }

    pub fn http_client_config(&self) -> HttpClientConfig {
        let mut http = HttpClientConfig::new()
            .with_timeout(Duration::from_secs(self.http_timeout))
            .with_max_retries(self.http_retries);
        if let Some(proxy) = &self.http_proxy {
            http = http.with_proxy(proxy.clone());
        }
        if let Some(cafile) = &self.cafile {
            http = http.with_cafile(self.resolve_path(cafile));
        }
        http
    }

    /// Expand `~`/`$VAR` and resolve relative paths against the base dir
    fn resolve_path(&self, path: &Path) -> PathBuf {
        let raw = path.to_string_lossy();
        let expanded = match shellexpand::full(&raw) {
            Ok(expanded) => PathBuf::from(expanded.as_ref()),
            Err(e) => {
                log::warn!("Could not expand {}: {}", raw, e);
                path.to_path_buf()
            }
        };

        if expanded.is_absolute() {
            expanded
        } else if let Some(base) = &self.base_dir {
            base.join(expanded)
        } else {
            expanded
        }
    }

    fn merge_raw_config(&mut self, raw: RawConfig, source: ConfigSource) -> Result<()> {
        for (key, value) in raw.values {
            self.merge_config_value(&key, value, source.clone())?;
        }
        Ok(())
    }

    fn merge_config_value(
        &mut self,
        key: &str,
        value: serde_json::Value,
        source: ConfigSource,
    ) -> Result<()> {
        let invalid = || {
            DepotError::Config(format!(
                "invalid value for '{}' in {} config",
                key,
                source.as_str()
            ))
        };

        match key {
            "package-root" => {
                let s = value.as_str().ok_or_else(invalid)?;
                self.package_root = PathBuf::from(s);
            }
            "state-dir" => {
                let s = value.as_str().ok_or_else(invalid)?;
                self.state_dir = Some(PathBuf::from(s));
            }
            "repositories" => {
                self.repositories = string_list(&value).ok_or_else(invalid)?;
            }
            "scopes" => {
                let list = string_list(&value).ok_or_else(invalid)?;
                self.scopes = ScopeSet::parse_list(&list.join(","))?;
            }
            "vcs-url-template" => {
                let s = value.as_str().ok_or_else(invalid)?;
                self.vcs_url_template = s.to_string();
            }
            "http-timeout" => {
                self.http_timeout = value.as_u64().ok_or_else(invalid)?;
            }
            "http-retries" => {
                let n = value.as_u64().ok_or_else(invalid)?;
                self.http_retries = u32::try_from(n).map_err(|_| invalid())?;
            }
            "http-proxy" => {
                let s = value.as_str().ok_or_else(invalid)?;
                self.http_proxy = Some(s.to_string());
            }
            "cafile" => {
                let s = value.as_str().ok_or_else(invalid)?;
                self.cafile = Some(PathBuf::from(s));
            }
            "ssh-key" => {
                let s = value.as_str().ok_or_else(invalid)?;
                self.ssh_key = Some(PathBuf::from(s));
            }
            "include-modules" => {
                self.include_modules = value.as_bool().ok_or_else(invalid)?;
            }
            "verify-checksums" => {
                self.verify_checksums = value.as_bool().ok_or_else(invalid)?;
            }
            _ => {
                log::debug!("Ignoring unknown config key '{}'", key);
                return Ok(());
            }
        }

        self.sources.insert(key.to_string(), source);
        Ok(())
    }

    fn apply_env_overrides(&mut self, loader: &ConfigLoader) -> Result<()> {
        let env_source = |key: &str| ConfigSource::Environment(env_var_name(key));

        if let Some(root) = loader.get_env_path("package-root") {
            self.package_root = root;
            self.sources.insert("package-root".to_string(), env_source("package-root"));
        }

        if let Some(dir) = loader.get_env_path("state-dir") {
            self.state_dir = Some(dir);
            self.sources.insert("state-dir".to_string(), env_source("state-dir"));
        }

        if let Some(repos) = loader.get_env_list("repositories") {
            self.repositories = repos;
            self.sources.insert("repositories".to_string(), env_source("repositories"));
        }

        if let Some(scopes) = loader.get_env_config("scopes") {
            self.scopes = ScopeSet::parse_list(&scopes)?;
            self.sources.insert("scopes".to_string(), env_source("scopes"));
        }

        if let Some(template) = loader.get_env_config("vcs-url-template") {
            self.vcs_url_template = template;
            self.sources
                .insert("vcs-url-template".to_string(), env_source("vcs-url-template"));
        }

        if let Some(timeout) = loader.get_env_u64("http-timeout") {
            self.http_timeout = timeout;
            self.sources.insert("http-timeout".to_string(), env_source("http-timeout"));
        }

        if let Some(retries) = loader.get_env_u64("http-retries") {
            self.http_retries = u32::try_from(retries).unwrap_or(u32::MAX);
            self.sources.insert("http-retries".to_string(), env_source("http-retries"));
        }

        if let Some(proxy) = loader.get_env_config("http-proxy") {
            self.http_proxy = Some(proxy);
            self.sources.insert("http-proxy".to_string(), env_source("http-proxy"));
        }

        if let Some(cafile) = loader.get_env_path("cafile") {
            self.cafile = Some(cafile);
            self.sources.insert("cafile".to_string(), env_source("cafile"));
        }

        if let Some(key) = loader.get_env_path("ssh-key") {
            self.ssh_key = Some(key);
            self.sources.insert("ssh-key".to_string(), env_source("ssh-key"));
        }

        if let Some(include) = loader.get_env_bool("include-modules") {
            self.include_modules = include;
            self.sources
                .insert("include-modules".to_string(), env_source("include-modules"));
        }

        if let Some(verify) = loader.get_env_bool("verify-checksums") {
            self.verify_checksums = verify;
            self.sources
                .insert("verify-checksums".to_string(), env_source("verify-checksums"));
        }

        Ok(())
    }

    fn config_keys() -> &'static [&'static str] {
        &[
            "package-root",
            "state-dir",
            "repositories",
            "scopes",
            "vcs-url-template",
            "http-timeout",
            "http-retries",
            "http-proxy",
            "cafile",
            "ssh-key",
            "include-modules",
            "verify-checksums",
        ]
    }
}
