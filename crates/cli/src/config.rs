//! Application configuration: TOML file plus command-line overrides
//!
//! ```toml
//! [ari]
//! host = "pbx.local"
//! port = 8088
//! username = "asterisk"
//! password = "secret"
//! app_name = "rvoip-bridge"
//!
//! [orchestrator]
//! context = "sets"
//! poll_interval_ms = 100
//! answer_timeout_ms = 35000
//!
//! [logging]
//! level = "info"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use rvoip_ari_client::AriConfig;
use rvoip_bridge_core::OrchestratorConfig;

use crate::Cli;
use crate::logging::LoggingConfig;

/// Everything the binary needs to start
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub ari: AriConfig,
    pub orchestrator: OrchestratorConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Default config file location, `<config_dir>/rvoip-bridge/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("rvoip-bridge").join("config.toml"))
    }

    /// Load from `path`, or from the default location when it exists.
    /// Falls back to defaults when no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) if path.exists() => path,
                _ => return Ok(Self::default()),
            },
        };

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply command-line and environment overrides
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(host) = &cli.host {
            self.ari.host = host.clone();
        }
        if let Some(port) = cli.port {
            self.ari.port = port;
        }
        if let Some(username) = &cli.username {
            self.ari.username = username.clone();
        }
        if let Some(password) = &cli.password {
            self.ari.password = password.clone();
        }
        if let Some(app) = &cli.app {
            self.ari.app_name = app.clone();
        }
        if cli.secure {
            self.ari.secure = true;
        }
        if let Some(level) = &cli.log_level {
            self.logging.level = level.clone();
        }
        if cli.json_logs {
            self.logging.json = true;
        }

        // Channels must land in the application we subscribe to
        self.orchestrator.app_name = self.ari.app_name.clone();
    }

    pub fn validate(&self) -> Result<()> {
        self.ari.validate().context("Invalid [ari] settings")?;
        self.orchestrator
            .validate()
            .context("Invalid [orchestrator] settings")?;
        crate::logging::parse_log_level(&self.logging.level)?;
        Ok(())
    }
}
