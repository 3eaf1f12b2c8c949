//! Connection settings for the ARI server

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{AriError, AriResult};

/// Connection configuration for an ARI endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AriConfig {
    /// Host name or address of the call-control server
    pub host: String,
    /// HTTP port of the ARI listener
    pub port: u16,
    /// ARI user
    pub username: String,
    /// ARI password
    pub password: String,
    /// Stasis application name; events are delivered for this application
    pub app_name: String,
    /// Use https/wss instead of http/ws
    pub secure: bool,
    /// Per-request timeout for REST calls
    pub request_timeout_secs: u64,
}

impl Default for AriConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8088,
            username: String::new(),
            password: String::new(),
            app_name: "rvoip-bridge".to_string(),
            secure: false,
            request_timeout_secs: 10,
        }
    }
}

impl AriConfig {
    /// Create a configuration for the given server and credentials
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            password: password.into(),
            ..Default::default()
        }
    }

    /// Set the Stasis application name
    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = app_name.into();
        self
    }

    /// Base URL of the REST API, e.g. `http://localhost:8088/ari`
    pub fn base_url(&self) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        format!("{}://{}:{}/ari", scheme, self.host, self.port)
    }

    /// URL of the event WebSocket, credentials and application included
    pub fn events_url(&self) -> AriResult<String> {
        let scheme = if self.secure { "wss" } else { "ws" };
        let base = format!("{}://{}:{}/ari/events", scheme, self.host, self.port);
        let api_key = format!("{}:{}", self.username, self.password);
        let url = reqwest::Url::parse_with_params(
            &base,
            &[("app", self.app_name.as_str()), ("api_key", api_key.as_str())],
        )
        .map_err(|e| AriError::config(format!("invalid event URL {}: {}", base, e)))?;
        Ok(url.to_string())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> AriResult<()> {
        if self.host.trim().is_empty() {
            return Err(AriError::config("ARI host is required"));
        }
        if self.port == 0 {
            return Err(AriError::config("ARI port must be non-zero"));
        }
        if self.username.is_empty() {
            return Err(AriError::config("ARI username is required"));
        }
        if self.app_name.trim().is_empty() {
            return Err(AriError::config("Stasis application name is required"));
        }
        if self.request_timeout_secs == 0 {
            return Err(AriError::config("request timeout must be at least one second"));
        }
        Ok(())
    }
}
