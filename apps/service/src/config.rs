//! Service configuration.
//!
//! Read as TOML from `$CRAFTDEPLOY_CONFIG`, or `~/.config/craftdeploy/service.toml`
//! when unset. A missing file means all defaults. Environment variables are
//! applied on top of the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use craftdeploy_installer::InstallSettings;
use craftdeploy_protocol::constants::{DEFAULT_MODS_DIRECTORY, RESOLVER_TIMEOUT};
use serde::{Deserialize, Serialize};

/// Errors that keep the service from starting.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required setting `{0}`")]
    Missing(&'static str),

    #[error("invalid setting: {0}")]
    Invalid(String),

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base URL of the game panel, e.g. `https://panel.example.com`.
    #[serde(default)]
    pub panel_url: String,

    /// Client API key for the panel.
    #[serde(default)]
    pub panel_api_key: String,

    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Directory on each server where mods must end up.
    #[serde(default = "default_mods_directory")]
    pub mods_directory: String,

    /// Parent of the transient download directories (system temp dir if unset).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_dir: Option<PathBuf>,

    #[serde(default)]
    pub resolver: ResolverConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolverConfig {
    #[serde(default = "default_resolver_command")]
    pub command: String,

    /// Arguments placed before the per-package ones.
    #[serde(default = "default_resolver_args")]
    pub args: Vec<String>,

    /// Package catalog API key, passed as `--api-key`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_listen_port() -> u16 {
    8787
}

fn default_mods_directory() -> String {
    DEFAULT_MODS_DIRECTORY.into()
}

fn default_resolver_command() -> String {
    "python3".into()
}

fn default_resolver_args() -> Vec<String> {
    vec!["modrinth_installer.py".into()]
}

fn default_timeout_secs() -> u64 {
    RESOLVER_TIMEOUT.as_secs()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            panel_url: String::new(),
            panel_api_key: String::new(),
            listen_port: default_listen_port(),
            mods_directory: default_mods_directory(),
            work_dir: None,
            resolver: ResolverConfig::default(),
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            command: default_resolver_command(),
            args: default_resolver_args(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ServiceConfig {
    /// Loads the file, applies the process environment and validates.
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path();
        let mut config = Self::from_file(&path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        tracing::info!(path = %path.display(), panel = %config.panel_url, "configuration loaded");
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Overrides fields from environment variables looked up through `var`.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(v) = var("PANEL_URL") {
            self.panel_url = v;
        }
        if let Some(v) = var("PANEL_API_KEY") {
            self.panel_api_key = v;
        }
        if let Some(v) = var("RESOLVER_COMMAND") {
            self.resolver.command = v;
        }
        if let Some(v) = var("RESOLVER_ARGS") {
            self.resolver.args = v.split_whitespace().map(str::to_string).collect();
        }
        if let Some(v) = var("MODRINTH_API_KEY").filter(|v| !v.is_empty()) {
            self.resolver.api_key = Some(v);
        }
        if let Some(v) = var("MODS_DIRECTORY") {
            self.mods_directory = v;
        }
        if let Some(v) = var("LISTEN_PORT") {
            self.listen_port = v
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("LISTEN_PORT `{v}` is not a port")))?;
        }
        if let Some(v) = var("WORK_DIR") {
            self.work_dir = Some(PathBuf::from(v));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.panel_url.trim().is_empty() {
            return Err(ConfigError::Missing("panel_url"));
        }
        if self.panel_api_key.trim().is_empty() {
            return Err(ConfigError::Missing("panel_api_key"));
        }
        if self.resolver.timeout_secs == 0 {
            return Err(ConfigError::Invalid("resolver.timeout_secs must be positive".into()));
        }
        if self.mods_directory.trim_matches('/').is_empty() {
            return Err(ConfigError::Invalid("mods_directory must name a directory".into()));
        }
        Ok(())
    }

    pub fn install_settings(&self) -> InstallSettings {
        InstallSettings {
            timeout: Duration::from_secs(self.resolver.timeout_secs),
            api_key: self.resolver.api_key.clone(),
            work_root: self.work_dir.clone(),
        }
    }
}

fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("CRAFTDEPLOY_CONFIG") {
        return PathBuf::from(path);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
    PathBuf::from(home)
        .join(".config")
        .join("craftdeploy")
        .join("service.toml")
}
