//! Configuration loading
//!
//! One `Config` value is loaded at process start and passed down to every
//! component that needs it. Nothing reads settings from ambient state after
//! startup.
//!
//! Config file resolution order:
//! 1. Command-line argument (highest priority)
//! 2. `AVQC_CONFIG` environment variable
//! 3. `<user config dir>/avqc/config.toml`
//! 4. `/etc/avqc/config.toml`
//!
//! Secrets may be supplied through the environment instead of the file
//! (see [`Config::apply_env_overrides`]).

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "AVQC_CONFIG";

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding one subdirectory per package awaiting review
    pub storage_root: PathBuf,

    /// Directory approved packages are moved into
    pub destination_root: PathBuf,

    /// SQLite database file
    pub database_path: PathBuf,

    pub archivesspace: ArchivesSpaceConfig,

    pub aquila: AquilaConfig,

    pub notifications: NotificationConfig,

    #[serde(default)]
    pub probe: ProbeConfig,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Archival metadata registry connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchivesSpaceConfig {
    pub baseurl: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub repository: String,
    /// Public UI base URL used to build record links
    #[serde(default)]
    pub public_url: Option<String>,
    #[serde(default = "default_remote_timeout_secs")]
    pub timeout_secs: u64,
}

/// Rights registry connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AquilaConfig {
    pub baseurl: String,
    #[serde(default = "default_remote_timeout_secs")]
    pub timeout_secs: u64,
}

/// Notification topic and AWS access
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default)]
    pub topic_arn: String,
    /// Role assumed before publishing, if set
    #[serde(default)]
    pub role_arn: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    /// Custom endpoint (LocalStack)
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Value of the `service` attribute on every message
    #[serde(default = "default_service_tag")]
    pub service: String,
}

/// External media probe utility
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    #[serde(default = "default_probe_program")]
    pub program: String,
    #[serde(default = "default_probe_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            program: default_probe_program(),
            timeout_secs: default_probe_timeout_secs(),
        }
    }
}

/// HTTP listener
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level() }
    }
}

fn default_remote_timeout_secs() -> u64 {
    30
}

fn default_service_tag() -> String {
    "digitized_av_qc".to_string()
}

fn default_probe_program() -> String {
    "ffprobe".to_string()
}

fn default_probe_timeout_secs() -> u64 {
    60
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Load configuration from a file, then apply environment overrides
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Read config {} failed: {}", path.display(), e))
        })?;
        let mut config = Self::from_toml_str(&content)?;
        config.apply_env_overrides();
        debug!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Resolve the config file location and load it
    pub fn resolve_and_load(cli_arg: Option<&Path>) -> Result<Self> {
        let path = resolve_config_path(cli_arg)?;
        Self::load(&path)
    }

    /// Override secrets from the environment
    ///
    /// - `AVQC_AS_USERNAME`, `AVQC_AS_PASSWORD`: registry credentials
    /// - `AVQC_SNS_TOPIC_ARN`: notification topic
    /// - `AVQC_AWS_ROLE_ARN`: role assumed for publishing
    pub fn apply_env_overrides(&mut self) {
        if let Ok(value) = std::env::var("AVQC_AS_USERNAME") {
            debug!("ArchivesSpace username taken from environment");
            self.archivesspace.username = value;
        }
        if let Ok(value) = std::env::var("AVQC_AS_PASSWORD") {
            debug!("ArchivesSpace password taken from environment");
            self.archivesspace.password = value;
        }
        if let Ok(value) = std::env::var("AVQC_SNS_TOPIC_ARN") {
            self.notifications.topic_arn = value;
        }
        if let Ok(value) = std::env::var("AVQC_AWS_ROLE_ARN") {
            self.notifications.role_arn = Some(value);
        }
    }

    /// Fail unless the storage root exists as a directory.
    ///
    /// Every task calls this before doing any work.
    pub fn require_storage_root(&self) -> Result<&Path> {
        if self.storage_root.is_dir() {
            Ok(&self.storage_root)
        } else {
            Err(Error::StorageRootMissing(self.storage_root.clone()))
        }
    }

    /// Storage directory of one package
    pub fn storage_dir(&self, refid: &str) -> PathBuf {
        self.storage_root.join(refid)
    }

    /// Destination directory of one approved package
    pub fn destination_dir(&self, refid: &str) -> PathBuf {
        self.destination_root.join(refid)
    }
}

/// Find the config file following the documented priority order
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Result<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Ok(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        return Ok(PathBuf::from(path));
    }

    // Priority 3: User config directory
    if let Some(path) = dirs::config_dir().map(|d| d.join("avqc").join("config.toml")) {
        if path.exists() {
            return Ok(path);
        }
    }

    // Priority 4: System-wide config
    let system_config = PathBuf::from("/etc/avqc/config.toml");
    if system_config.exists() {
        return Ok(system_config);
    }

    Err(Error::Config(format!(
        "No config file found. Pass --config, set {}, or create ~/.config/avqc/config.toml",
        CONFIG_ENV_VAR
    )))
}
