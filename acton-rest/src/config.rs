//! Configuration management using Figment
//!
//! Configuration is loaded from multiple sources with the following precedence (highest to lowest):
//! 1. Environment variables (prefix: `ACTON_REST_`, nested keys split on `__`)
//! 2. Current working directory: ./config.toml
//! 3. XDG config directory: ~/.config/acton-rest/config.toml
//! 4. System directory: /etc/acton-rest/config.toml
//! 5. Default values
//!
//! ```toml
//! [service]
//! name = "todo-api"
//! port = 3000
//!
//! [resources]
//! default_count = 25
//! update_method = "patch"
//! ```

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;

const APP_DIR: &str = "acton-rest";
const ENV_PREFIX: &str = "ACTON_REST_";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Service configuration
    #[serde(default)]
    pub service: ServiceConfig,

    /// Defaults applied to resources built with [`ResourceOptions::from_defaults`]
    ///
    /// [`ResourceOptions::from_defaults`]: crate::resource::ResourceOptions::from_defaults
    #[serde(default)]
    pub resources: ResourceDefaults,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name
    #[serde(default = "default_name")]
    pub name: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level (trace, debug, info, warn, error) or a full filter directive
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Maximum request body size in megabytes
    #[serde(default = "default_body_limit_mb")]
    pub body_limit_mb: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            port: default_port(),
            log_level: default_log_level(),
            timeout_secs: default_timeout(),
            body_limit_mb: default_body_limit_mb(),
        }
    }
}

impl ServiceConfig {
    /// Request timeout as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Body limit in bytes
    pub fn body_limit_bytes(&self) -> usize {
        self.body_limit_mb * 1024 * 1024
    }
}

/// Resource defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDefaults {
    /// Page size when a list request does not give one
    #[serde(default = "default_count")]
    pub default_count: i64,

    /// Apply a limit and report `Content-Range` on list
    #[serde(default = "default_true")]
    pub pagination: bool,

    /// Method of update routes, `put` or `patch`
    #[serde(default = "default_update_method")]
    pub update_method: String,

    /// Re-read records after writes
    #[serde(default = "default_true")]
    pub reload_instances: bool,

    /// Query parameter of the default free-text search
    #[serde(default = "default_search_param")]
    pub search_param: String,

    /// Query parameter carrying the sort list
    #[serde(default = "default_sort_param")]
    pub sort_param: String,
}

impl Default for ResourceDefaults {
    fn default() -> Self {
        Self {
            default_count: default_count(),
            pagination: true,
            update_method: default_update_method(),
            reload_instances: true,
            search_param: default_search_param(),
            sort_param: default_sort_param(),
        }
    }
}

fn default_name() -> String {
    APP_DIR.to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_body_limit_mb() -> usize {
    10
}

fn default_count() -> i64 {
    crate::resource::DEFAULT_COUNT
}

fn default_true() -> bool {
    true
}

fn default_update_method() -> String {
    "put".to_string()
}

fn default_search_param() -> String {
    "q".to_string()
}

fn default_sort_param() -> String {
    "sort".to_string()
}

impl Config {
    /// Load configuration from all sources
    ///
    /// Every config file that exists is merged, lowest priority first, and
    /// environment variables override all of them.
    pub fn load() -> Result<Self> {
        let config_paths = Self::find_config_paths();

        tracing::debug!("Searching for config files in order:");
        for path in &config_paths {
            tracing::debug!("  - {}", path.display());
        }

        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        // Lowest priority first so later files override earlier ones
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
    /// This bypasses the system and XDG directories. Environment variables
    /// still override the file.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        Ok(config)
    }

    /// Candidate config file paths, highest priority first
    fn find_config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        let xdg_dirs = xdg::BaseDirectories::with_prefix(APP_DIR);
        if let Some(path) = xdg_dirs.find_config_file("config.toml") {
            paths.push(path);
        }

        paths.push(PathBuf::from("/etc").join(APP_DIR).join("config.toml"));
        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.service.port, 8080);
        assert_eq!(config.service.log_level, "info");
        assert_eq!(config.service.body_limit_bytes(), 10 * 1024 * 1024);
        assert_eq!(config.resources.default_count, 100);
        assert_eq!(config.resources.update_method, "put");
        assert!(config.resources.pagination);
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[service]
name = "todo-api"
port = 3000

[resources]
default_count = 25
update_method = "patch"
"#
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.service.name, "todo-api");
        assert_eq!(config.service.port, 3000);
        assert_eq!(config.service.timeout(), Duration::from_secs(30));
        assert_eq!(config.resources.default_count, 25);
        assert_eq!(config.resources.update_method, "patch");
        assert_eq!(config.resources.sort_param, "sort");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.service.name, "acton-rest");
        assert_eq!(config.resources.search_param, "q");
    }

    #[test]
    fn test_invalid_value_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[service]\nport = \"not a number\"").unwrap();
        let err = Config::load_from(file.path()).unwrap_err();
        assert!(matches!(err, crate::error::Error::Config(_)));
    }
}
