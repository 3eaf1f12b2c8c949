//! Orchestration settings: dialing parameters and polling policy

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{BridgeError, BridgeResult};

/// Configuration for origination and bridging
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Channel technology prefixed to every address, e.g. `PJSIP` gives `PJSIP/100`
    pub endpoint_technology: String,
    /// Dialplan context used for originations
    pub context: String,
    /// Dialplan priority used for originations
    pub priority: u32,
    /// Stasis application that receives originated channels
    pub app_name: String,
    /// Seconds the control plane lets a channel ring before giving up
    pub originate_timeout_secs: u64,
    /// Interval between two channel state checks
    pub poll_interval_ms: u64,
    /// Overall budget, in milliseconds, for a channel to reach the answered state
    pub answer_timeout_ms: u64,
    /// Application arguments attached to channels originated by `dial`
    pub dial_app_args: Option<String>,
    /// Application arguments attached to channels originated by `join`
    pub join_app_args: Option<String>,
    /// Wait for joined channels to answer before adding them to the bridge
    pub join_awaits_answer: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            endpoint_technology: "PJSIP".to_string(),
            context: "sets".to_string(),
            priority: 1,
            app_name: "rvoip-bridge".to_string(),
            originate_timeout_secs: 30,
            poll_interval_ms: 100,
            answer_timeout_ms: 35_000,
            dial_app_args: Some("dial".to_string()),
            join_app_args: None,
            join_awaits_answer: false,
        }
    }
}

impl OrchestratorConfig {
    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = app_name.into();
        self
    }

    /// Shorten the polling policy, mostly useful in tests
    pub fn with_polling(mut self, interval: Duration, answer_timeout: Duration) -> Self {
        self.poll_interval_ms = interval.as_millis() as u64;
        self.answer_timeout_ms = answer_timeout.as_millis() as u64;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn answer_timeout(&self) -> Duration {
        Duration::from_millis(self.answer_timeout_ms)
    }

    /// Dial string for an address
    pub fn endpoint_for(&self, address: &str) -> String {
        format!("{}/{}", self.endpoint_technology, address)
    }

    /// Validate the configuration
    pub fn validate(&self) -> BridgeResult<()> {
        if self.endpoint_technology.trim().is_empty() {
            return Err(BridgeError::malformed("endpoint technology is required"));
        }
        if self.context.trim().is_empty() {
            return Err(BridgeError::malformed("dialplan context is required"));
        }
        if self.app_name.trim().is_empty() {
            return Err(BridgeError::malformed("Stasis application name is required"));
        }
        if self.poll_interval_ms == 0 {
            return Err(BridgeError::malformed("poll interval must be non-zero"));
        }
        if self.answer_timeout_ms < self.poll_interval_ms {
            return Err(BridgeError::malformed("answer timeout must cover at least one poll interval"));
        }
        Ok(())
    }
}
