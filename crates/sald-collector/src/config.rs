//! Collector configuration
//!
//! Environment-based configuration for the log ingestion engine.

use std::path::PathBuf;

/// Default path of the progress state file.
pub const DEFAULT_STATE_PATH: &str = "./log_state.json";

/// Collector configuration
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Directory containing the web-server access logs
    pub log_dir: PathBuf,
    /// Path of the JSON progress state file
    pub state_path: PathBuf,
    /// Path of the GeoLite2 country database; `None` disables enrichment
    pub geoip_db_path: Option<PathBuf>,
}

impl CollectorConfig {
    /// Create a configuration with the default state path
    pub fn new(log_dir: impl Into<PathBuf>, state_path: impl Into<PathBuf>) -> Self {
        Self {
            log_dir: log_dir.into(),
            state_path: state_path.into(),
            geoip_db_path: None,
        }
    }

    /// Load collector configuration from environment variables
    ///
    /// Environment variables:
    /// - `LOG_DIRECTORY`: directory containing the access logs (required)
    /// - `STATE_FILE_PATH`: progress state file (default `./log_state.json`)
    /// - `GEOIP_DATABASE_PATH`: GeoLite2 country database (optional)
    pub fn from_env() -> anyhow::Result<Self> {
        let log_dir = std::env::var("LOG_DIRECTORY")
            .map(PathBuf::from)
            .map_err(|_| anyhow::anyhow!("LOG_DIRECTORY must be set"))?;

        let state_path = std::env::var("STATE_FILE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_STATE_PATH));

        let geoip_db_path = std::env::var("GEOIP_DATABASE_PATH")
            .ok()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        let config = Self {
            log_dir,
            state_path,
            geoip_db_path,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.log_dir.as_os_str().is_empty() {
            anyhow::bail!("LOG_DIRECTORY cannot be empty");
        }
        if self.state_path.as_os_str().is_empty() {
            anyhow::bail!("STATE_FILE_PATH cannot be empty");
        }
        Ok(())
    }
}
