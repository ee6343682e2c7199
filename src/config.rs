//! Configuration module for mdde-web.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::file::is_plain_segment;
use crate::{MddeError, Result};

/// Name of the collections directory under the storage root.
pub const SCRIPTS_DIR: &str = "scripts";

/// Name of the scratch directory under the storage root.
pub const TEMP_DIR: &str = "temp";

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Web server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    /// Host address to bind.
    #[serde(default = "default_web_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_web_port")]
    pub port: u16,
    /// CORS allowed origins (empty allows any origin).
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Whether to serve static files for unmatched GET requests.
    #[serde(default = "default_serve_static")]
    pub serve_static: bool,
    /// Path to the static files directory (empty means the storage root).
    #[serde(default)]
    pub static_path: String,
}

fn default_web_host() -> String {
    "0.0.0.0".to_string()
}

fn default_web_port() -> u16 {
    3000
}

fn default_serve_static() -> bool {
    true
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_web_host(),
            port: default_web_port(),
            cors_origins: vec![],
            serve_static: default_serve_static(),
            static_path: String::new(),
        }
    }
}

/// Script storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Service root. Setup scripts live here, collections under `scripts/`,
    /// scratch files under `temp/`.
    #[serde(default = "default_storage_root")]
    pub root: String,
    /// Maximum upload size in megabytes.
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size_mb: u64,
    /// File names under the root that `/download/{name}` may serve.
    #[serde(default = "default_setup_scripts")]
    pub setup_scripts: Vec<String>,
}

fn default_storage_root() -> String {
    "data".to_string()
}

fn default_max_upload_size() -> u64 {
    10
}

fn default_setup_scripts() -> Vec<String> {
    vec!["env-build.ps1".to_string(), "env-build.sh".to_string()]
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
            max_upload_size_mb: default_max_upload_size(),
            setup_scripts: default_setup_scripts(),
        }
    }
}

impl StorageConfig {
    /// Directory holding the named collections.
    pub fn scripts_dir(&self) -> PathBuf {
        Path::new(&self.root).join(SCRIPTS_DIR)
    }

    /// Directory for temporary archives and staged uploads.
    pub fn temp_dir(&self) -> PathBuf {
        Path::new(&self.root).join(TEMP_DIR)
    }

    /// Maximum upload size in bytes, saturating at `u64::MAX`.
    pub fn max_upload_size_bytes(&self) -> u64 {
        self.max_upload_size_mb.saturating_mul(BYTES_PER_MB)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/mdde-web.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Web server configuration.
    #[serde(default)]
    pub web: WebConfig,
    /// Storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(MddeError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| MddeError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `PORT`: Override the listen port
    /// - `MDDE_WEB_ROOT`: Override the storage root
    pub fn apply_env_overrides(&mut self) {
        if let Ok(port) = std::env::var("PORT") {
            match port.parse() {
                Ok(port) => self.web.port = port,
                Err(_) => eprintln!("Ignoring invalid PORT value: {port}"),
            }
        }

        if let Ok(root) = std::env::var("MDDE_WEB_ROOT") {
            if !root.is_empty() {
                self.storage.root = root;
            }
        }
    }

    /// Directory served for static assets.
    pub fn static_dir(&self) -> PathBuf {
        if self.web.static_path.is_empty() {
            PathBuf::from(&self.storage.root)
        } else {
            PathBuf::from(&self.web.static_path)
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.storage.root.trim().is_empty() {
            return Err(MddeError::Config("storage.root must not be empty".to_string()));
        }

        if self.storage.max_upload_size_mb == 0 {
            return Err(MddeError::Config(
                "storage.max_upload_size_mb must be greater than zero".to_string(),
            ));
        }

        if self
            .storage
            .max_upload_size_mb
            .checked_mul(BYTES_PER_MB)
            .is_none()
        {
            return Err(MddeError::Config(format!(
                "storage.max_upload_size_mb {} is too large",
                self.storage.max_upload_size_mb
            )));
        }

        for name in &self.storage.setup_scripts {
            if !is_plain_segment(name) {
                return Err(MddeError::Config(format!(
                    "setup script '{name}' must be a plain file name"
                )));
            }
        }

        Ok(())
    }
}
