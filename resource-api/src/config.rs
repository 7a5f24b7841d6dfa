//! Configuration management using Figment
//!
//! Configuration is loaded from multiple sources with the following precedence (highest to lowest):
//! 1. Environment variables (prefix: RESOURCE_API_, sections split on `__`)
//! 2. Current working directory: ./config.toml
//! 3. XDG config directory: ~/.config/resource-api/{service_name}/config.toml
//! 4. System directory: /etc/resource-api/{service_name}/config.toml
//! 5. Default values
//!
//! ```toml
//! [service]
//! name = "api"
//! log_level = "debug"
//!
//! [api]
//! version = "v3"
//! default_limit = 25
//! max_limit = 100
//! ```

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

const ENV_PREFIX: &str = "RESOURCE_API_";
const XDG_PREFIX: &str = "resource-api";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// Service configuration
    pub service: ServiceConfig,

    /// Rendering and pagination settings
    #[serde(default)]
    pub api: ApiConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Service name
    pub name: String,

    /// Log level (trace, debug, info, warn, error) or a full filter directive
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Environment (dev, staging, production)
    #[serde(default = "default_environment")]
    pub environment: String,
}

/// Settings the request core reads on every request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiConfig {
    /// First path segment of every `@href`
    #[serde(default = "default_version")]
    pub version: String,

    /// Anonymous callers see nothing
    #[serde(default)]
    pub private_api: bool,

    /// Page size when `limit` is missing or unusable
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    /// Largest page size a caller can ask for
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,

    /// Nested object levels rendered in full before falling back to `@href` stubs
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

impl ApiConfig {
    /// Prefix a path below the version: `repo/1` becomes `/v3/repo/1`
    #[must_use]
    pub fn href(&self, path: &str) -> String {
        format!("/{}/{}", self.version, path.trim_start_matches('/'))
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            private_api: false,
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            max_depth: default_max_depth(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_environment() -> String {
    "dev".to_string()
}

fn default_version() -> String {
    "v3".to_string()
}

fn default_limit() -> usize {
    25
}

fn default_max_limit() -> usize {
    100
}

fn default_max_depth() -> usize {
    4
}

impl Config {
    /// Load configuration from all sources
    ///
    /// The service name is taken from the binary name.
    pub fn load() -> Result<Self> {
        let service_name = std::env::current_exe()
            .ok()
            .and_then(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .unwrap_or_else(|| XDG_PREFIX.to_string());

        Self::load_for_service(&service_name)
    }

    /// Load configuration for a specific service name
    pub fn load_for_service(service_name: &str) -> Result<Self> {
        let config_paths = Self::find_config_paths(service_name);

        tracing::debug!("Searching for config files in order:");
        for path in &config_paths {
            tracing::debug!("  - {}", path.display());
        }

        let mut figment = Figment::new().merge(Serialized::defaults(Config::named(service_name)));

        // lowest priority first
        for path in config_paths.iter().rev() {
            if path.exists() {
                tracing::info!("Loading configuration from: {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config = figment.extract()?;
        Ok(config)
    }

    /// Load configuration from a specific file
    ///
    /// Bypasses the XDG and system directories. Environment variables still apply.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        Ok(config)
    }

    /// Default configuration for a named service
    #[must_use]
    pub fn named(service_name: &str) -> Self {
        let mut config = Self::default();
        config.service.name = service_name.to_string();
        config
    }

    /// Candidate config files, highest priority first
    fn find_config_paths(service_name: &str) -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        let xdg_dirs = xdg::BaseDirectories::with_prefix(XDG_PREFIX);
        let config_file_path = Path::new(service_name).join("config.toml");
        if let Some(path) = xdg_dirs.find_config_file(&config_file_path) {
            paths.push(path);
        }

        paths.push(
            PathBuf::from("/etc")
                .join(XDG_PREFIX)
                .join(service_name)
                .join("config.toml"),
        );

        paths
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                name: XDG_PREFIX.to_string(),
                log_level: default_log_level(),
                environment: default_environment(),
            },
            api: ApiConfig::default(),
        }
    }
}
