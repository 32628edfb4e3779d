//! Gateway settings loader.
//!
//! Settings come from an optional file (YAML, TOML or JSON, picked by
//! extension) with `${VAR}` / `$VAR` substitution, overlaid by environment
//! variables of the form `TESSERA__PORT` or `TESSERA__ADMIN__SECRET`.

use crate::hook::HookConfig;
use crate::project::Project;
use config::{Config as Cfg, Environment, File, FileFormat};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "TESSERA";

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parsing error: {0}")]
    Parse(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

fn default_port() -> u16 {
    4122
}

fn default_cluster_id() -> String {
    "default-cluster".to_string()
}

fn default_node_id() -> String {
    "node-1".to_string()
}

fn default_max_projects() -> usize {
    1
}

fn default_request_timeout_secs() -> u64 {
    10
}

/// Admin manager settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminSettings {
    /// Shared secret expected as the admin bearer token.
    #[serde(default)]
    pub secret: String,
    /// Bearer token sent to integrations and webhooks; generated per node
    /// when empty.
    #[serde(default)]
    pub internal_token: String,
    /// Plan limit on concurrently registered projects.
    #[serde(default = "default_max_projects")]
    pub max_projects: usize,
}

impl Default for AdminSettings {
    fn default() -> Self {
        Self {
            secret: String::new(),
            internal_token: String::new(),
            max_projects: default_max_projects(),
        }
    }
}

/// Top-level settings of a gateway node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewaySettings {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_cluster_id")]
    pub cluster_id: String,
    #[serde(default = "default_node_id")]
    pub node_id: String,
    /// Deadline applied to admin and authorization calls.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub admin: AdminSettings,
    /// Integration hooks registered at startup.
    #[serde(default)]
    pub hooks: Vec<HookConfig>,
    /// Projects applied with the initial (best-effort) load.
    #[serde(default)]
    pub projects: Vec<Project>,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            port: default_port(),
            cluster_id: default_cluster_id(),
            node_id: default_node_id(),
            request_timeout_secs: default_request_timeout_secs(),
            admin: AdminSettings::default(),
            hooks: Vec::new(),
            projects: Vec::new(),
        }
    }
}

/// Detect the file format from the extension.
pub fn detect_format(path: &str) -> ConfigResult<FileFormat> {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| ConfigError::UnsupportedFormat("No file extension found".to_string()))?;

    match ext.to_lowercase().as_str() {
        "yaml" | "yml" => Ok(FileFormat::Yaml),
        "toml" => Ok(FileFormat::Toml),
        "json" => Ok(FileFormat::Json),
        _ => Err(ConfigError::UnsupportedFormat(ext.to_string())),
    }
}

/// Replace `${VAR}` and `$VAR` with the variable's value.  Unknown variables
/// are left as written.
pub fn substitute_env_vars(content: &str) -> String {
    let (Ok(re_braced), Ok(re_simple)) = (
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}"),
        Regex::new(r"\$([A-Za-z_][A-Za-z0-9_]*)\b"),
    ) else {
        return content.to_string();
    };

    let braced = re_braced.replace_all(content, |caps: &regex::Captures| {
        std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
    });
    re_simple
        .replace_all(&braced, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}

/// Parse settings from a string in the given format, without env overrides.
pub fn settings_from_str(content: &str, format: FileFormat) -> ConfigResult<GatewaySettings> {
    Cfg::builder()
        .add_source(File::from_str(&substitute_env_vars(content), format))
        .build()
        .map_err(|e| ConfigError::Parse(e.to_string()))?
        .try_deserialize()
        .map_err(|e| ConfigError::Serialization(e.to_string()))
}

/// Load settings from `path` (when it exists) plus `TESSERA__*` overrides.
/// A missing file yields the defaults.
pub fn load_settings(path: &str) -> ConfigResult<GatewaySettings> {
    let mut builder = Cfg::builder();

    if Path::new(path).exists() {
        let format = detect_format(path)?;
        let content = std::fs::read_to_string(path)?;
        builder = builder.add_source(File::from_str(&substitute_env_vars(&content), format));
    }

    builder
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .map_err(|e| ConfigError::Parse(e.to_string()))?
        .try_deserialize()
        .map_err(|e| ConfigError::Serialization(e.to_string()))
}
