//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::projects::{Project, ProjectCatalog, ProjectError, ProjectTable};
use crate::websocket::HubConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub hub: HubSettings,

    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub projects: Vec<Project>,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8012
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Broadcast hub configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HubSettings {
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    #[serde(default = "default_request_capacity")]
    pub request_capacity: usize,
}

fn default_queue_capacity() -> usize {
    256
}

fn default_request_capacity() -> usize {
    1024
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            request_capacity: default_request_capacity(),
        }
    }
}

impl From<&HubSettings> for HubConfig {
    fn from(settings: &HubSettings) -> Self {
        HubConfig {
            request_capacity: settings.request_capacity,
        }
    }
}

/// Event feed configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// File of newline-delimited JSON events; stdin when unset
    pub path: Option<PathBuf>,

    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

fn default_event_buffer() -> usize {
    1024
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            path: None,
            event_buffer: default_event_buffer(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// First existing config file among the default locations
    pub fn locate() -> Option<PathBuf> {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("mirror-map").join("config.toml")),
            Some(PathBuf::from("/etc/mirror-map/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        config_paths.into_iter().flatten().find(|path| path.exists())
    }

    /// Check that the project table would be accepted by the catalog
    pub fn validate(&self) -> Result<(), ConfigError> {
        ProjectTable::from_projects(0, self.projects.iter().cloned())?;
        Ok(())
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("MIRROR_MAP_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("MIRROR_MAP_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }

        if let Ok(capacity) = std::env::var("MIRROR_MAP_QUEUE_CAPACITY") {
            if let Ok(c) = capacity.parse() {
                self.hub.queue_capacity = c;
            }
        }

        if let Ok(path) = std::env::var("MIRROR_MAP_SOURCE") {
            self.source.path = Some(PathBuf::from(path));
        }

        if let Ok(level) = std::env::var("MIRROR_MAP_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("MIRROR_MAP_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Re-read `[[projects]]` from `path` and swap it into `catalog`
///
/// The live table is left untouched if the file cannot be read or the new
/// table is invalid. Returns the new table version.
pub fn reload_projects(path: &Path, catalog: &ProjectCatalog) -> Result<u64, ConfigError> {
    let config = Config::load(path)?;
    Ok(catalog.reload(config.projects)?)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Invalid project table: {0}")]
    Projects(#[from] ProjectError),
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r##"# Mirror Map Configuration
#
# Environment variables override these settings:
# - MIRROR_MAP_HOST
# - MIRROR_MAP_PORT
# - MIRROR_MAP_QUEUE_CAPACITY
# - MIRROR_MAP_SOURCE
# - MIRROR_MAP_LOG_LEVEL
# - MIRROR_MAP_LOG_FORMAT

[server]
# HTTP server host
host = "0.0.0.0"

# HTTP server port
port = 8012

[hub]
# Frames queued per viewer before it is dropped as unresponsive
queue_capacity = 256

# Requests queued in front of the hub
request_capacity = 1024

[source]
# Newline-delimited JSON events; read from stdin when unset
# path = "/var/run/mirror-map/events.jsonl"

# Events buffered between the reader and the batcher
event_buffer = 1024

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"

# Projects shown on the map. Send SIGHUP to reload this list.
# page is "distributions" or "software".
[[projects]]
short = "ubuntu"
id = 1
name = "Ubuntu"
page = "distributions"
color = "#E95420"

[[projects]]
short = "debian"
id = 2
name = "Debian"
page = "distributions"
color = "#A80030"
"##
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.addr(), "0.0.0.0:8012");
        assert_eq!(config.hub.queue_capacity, 256);
        assert_eq!(config.source.event_buffer, 1024);
        assert!(config.source.path.is_none());
        assert_eq!(config.logging.format, "pretty");
        assert!(config.projects.is_empty());
    }

    #[test]
    fn test_generated_config_parses() {
        let file = write_config(&generate_default_config());
        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.server.port, 8012);
        assert_eq!(config.projects.len(), 2);
        assert_eq!(config.projects[0].short, "ubuntu");
        assert_eq!(config.projects[1].id, 2);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let file = write_config(
            r#"
[hub]
queue_capacity = 8

[[projects]]
short = "arch"
id = 5
"#,
        );
        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.hub.queue_capacity, 8);
        assert_eq!(config.hub.request_capacity, 1024);
        assert_eq!(config.server.port, 8012);
        assert_eq!(config.projects[0].short, "arch");
        assert_eq!(config.projects[0].name, "");

        let hub: HubConfig = (&config.hub).into();
        assert_eq!(hub.request_capacity, 1024);
    }

    #[test]
    fn test_duplicate_project_ids_rejected() {
        let file = write_config(
            r#"
[[projects]]
short = "ubuntu"
id = 1

[[projects]]
short = "debian"
id = 1
"#,
        );
        let result = Config::load(file.path());
        assert!(matches!(result, Err(ConfigError::Projects(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = Config::load(Path::new("/nonexistent/mirror-map.toml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_invalid_toml() {
        let file = write_config("[server\nport = ");
        let result = Config::load(file.path());
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_reload_projects_swaps_table() {
        let catalog = ProjectCatalog::new(vec![Project::new("ubuntu", 1)]).unwrap();
        let file = write_config(
            r#"
[[projects]]
short = "ubuntu"
id = 1

[[projects]]
short = "fedora"
id = 7
"#,
        );

        let version = reload_projects(file.path(), &catalog).unwrap();

        assert_eq!(version, 2);
        assert_eq!(catalog.version(), 2);
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.subscribe().id_of("fedora"), Some(7));
    }

    #[test]
    fn test_reload_projects_keeps_table_on_error() {
        let catalog = ProjectCatalog::new(vec![Project::new("ubuntu", 1)]).unwrap();

        let duplicate = write_config(
            r#"
[[projects]]
short = "ubuntu"
id = 1

[[projects]]
short = "debian"
id = 1
"#,
        );
        let result = reload_projects(duplicate.path(), &catalog);
        assert!(matches!(result, Err(ConfigError::Projects(_))));

        let broken = write_config("[[projects]\nshort = ");
        let result = reload_projects(broken.path(), &catalog);
        assert!(matches!(result, Err(ConfigError::Parse { .. })));

        let result = reload_projects(Path::new("/nonexistent/mirror-map.toml"), &catalog);
        assert!(matches!(result, Err(ConfigError::Io { .. })));

        assert_eq!(catalog.version(), 1);
        assert_eq!(catalog.subscribe().id_of("ubuntu"), Some(1));
        assert_eq!(catalog.subscribe().id_of("debian"), None);
    }
}
