//! Configuration resolution
//!
//! Priority: environment variables override the TOML config file, which
//! overrides built-in defaults. The TOML path itself can be pointed at with
//! `SHELFSCORE_CONFIG`.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{Error, Result};

pub const DEFAULT_PORT: u16 = 5740;

/// On-disk TOML layout; every field optional so a partial file works
#[derive(Debug, Default, Deserialize)]
pub struct TomlConfig {
    pub port: Option<u16>,
    pub data_dir: Option<PathBuf>,
    pub provider_timeout_ms: Option<u64>,
    pub recall_deadline_ms: Option<u64>,
    pub retailer_base_url: Option<String>,
    pub user_agent: Option<String>,
}

/// Resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub port: u16,
    /// Root folder holding the cache database and image blobs
    pub data_dir: PathBuf,
    /// Per-provider call deadline
    pub provider_timeout_ms: u64,
    /// Deadline for the recall side channel
    pub recall_deadline_ms: u64,
    pub retailer_base_url: String,
    pub user_agent: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            data_dir: default_data_dir(),
            provider_timeout_ms: 8_000,
            recall_deadline_ms: 2_000,
            retailer_base_url: "https://api.retailer.example.com/v2".to_string(),
            user_agent: format!("shelfscore/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ServiceConfig {
    /// Resolve configuration from defaults, TOML, and environment
    pub fn load() -> Result<Self> {
        let toml_path = std::env::var("SHELFSCORE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_config_path());

        let mut config = Self::default();

        if toml_path.exists() {
            let toml = read_toml(&toml_path)?;
            info!(path = %toml_path.display(), "Loaded TOML config");
            config.apply_toml(toml);
        }

        config.apply_env();

        if config.provider_timeout_ms == 0 {
            return Err(Error::Config("provider_timeout_ms must be positive".to_string()));
        }

        Ok(config)
    }

    fn apply_toml(&mut self, toml: TomlConfig) {
        if let Some(port) = toml.port {
            self.port = port;
        }
        if let Some(data_dir) = toml.data_dir {
            self.data_dir = data_dir;
        }
        if let Some(timeout) = toml.provider_timeout_ms {
            self.provider_timeout_ms = timeout;
        }
        if let Some(deadline) = toml.recall_deadline_ms {
            self.recall_deadline_ms = deadline;
        }
        if let Some(url) = toml.retailer_base_url {
            self.retailer_base_url = url;
        }
        if let Some(agent) = toml.user_agent {
            self.user_agent = agent;
        }
    }

    fn apply_env(&mut self) {
        if let Ok(port) = std::env::var("SHELFSCORE_PORT") {
            match port.parse() {
                Ok(port) => self.port = port,
                Err(_) => warn!(value = %port, "Ignoring unparseable SHELFSCORE_PORT"),
            }
        }
        if let Ok(dir) = std::env::var("SHELFSCORE_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Ok(url) = std::env::var("SHELFSCORE_RETAILER_URL") {
            self.retailer_base_url = url;
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("shelfscore.db")
    }

    pub fn blob_dir(&self) -> PathBuf {
        self.data_dir.join("images")
    }

    /// Create the data directory if missing
    pub fn ensure_data_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)
            .map_err(|e| Error::Config(format!("Cannot create data dir: {e}")))?;
        Ok(())
    }
}

fn read_toml(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed: {e}")))?;
    toml::from_str(&content).map_err(|e| Error::Config(format!("Parse TOML failed: {e}")))
}

fn default_config_path() -> PathBuf {
    dirs_home()
        .join(".config")
        .join("shelfscore")
        .join("shelfscore.toml")
}

fn default_data_dir() -> PathBuf {
    dirs_home().join(".local").join("share").join("shelfscore")
}

fn dirs_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}
