//! Control-plane resources: channels, bridges and origination parameters
//!
//! These mirror the ARI JSON models closely enough to decode server responses,
//! keeping only the fields the orchestrator works with.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a channel, assigned by the control plane
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(pub String);

impl ChannelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ChannelId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Identifier of a bridge, assigned by the control plane
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BridgeId(pub String);

impl BridgeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BridgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for BridgeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Channel lifecycle state as reported by the control plane
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ChannelState {
    Down,
    Reserved,
    OffHook,
    Dialing,
    Ring,
    Ringing,
    /// Answered
    Up,
    Busy,
    DialingOffhook,
    PreRing,
    Unknown,
    /// A state name this client does not know about
    Other(String),
}

impl ChannelState {
    /// Whether the far end has answered
    pub fn is_answered(&self) -> bool {
        matches!(self, Self::Up)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Down => "Down",
            Self::Reserved => "Rsrvd",
            Self::OffHook => "OffHook",
            Self::Dialing => "Dialing",
            Self::Ring => "Ring",
            Self::Ringing => "Ringing",
            Self::Up => "Up",
            Self::Busy => "Busy",
            Self::DialingOffhook => "Dialing Offhook",
            Self::PreRing => "Pre-ring",
            Self::Unknown => "Unknown",
            Self::Other(state) => state,
        }
    }
}

impl From<&str> for ChannelState {
    fn from(state: &str) -> Self {
        match state {
            "Down" => Self::Down,
            "Rsrvd" => Self::Reserved,
            "OffHook" => Self::OffHook,
            "Dialing" => Self::Dialing,
            "Ring" => Self::Ring,
            "Ringing" => Self::Ringing,
            "Up" => Self::Up,
            "Busy" => Self::Busy,
            "Dialing Offhook" => Self::DialingOffhook,
            "Pre-ring" => Self::PreRing,
            "Unknown" => Self::Unknown,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for ChannelState {
    fn from(state: String) -> Self {
        Self::from(state.as_str())
    }
}

impl From<ChannelState> for String {
    fn from(state: ChannelState) -> Self {
        state.as_str().to_string()
    }
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One call leg as known to the control plane
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: ChannelId,
    #[serde(default)]
    pub name: String,
    pub state: ChannelState,
}

/// A mixing point for channels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bridge {
    pub id: BridgeId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub bridge_type: String,
    #[serde(default)]
    pub technology: String,
    /// Member channels, owned and reported by the control plane
    #[serde(default)]
    pub channels: Vec<ChannelId>,
}

impl Bridge {
    pub fn member_count(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

/// Bridge flavours offered by the control plane
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeType {
    Mixing,
    Holding,
    DtmfEvents,
    ProxyMedia,
}

impl BridgeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mixing => "mixing",
            Self::Holding => "holding",
            Self::DtmfEvents => "dtmf_events",
            Self::ProxyMedia => "proxy_media",
        }
    }
}

impl fmt::Display for BridgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role a channel plays inside a bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelRole {
    Participant,
    Announcer,
}

impl ChannelRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Participant => "participant",
            Self::Announcer => "announcer",
        }
    }
}

/// Parameters of an outbound channel origination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginateParams {
    /// Dial string, e.g. `PJSIP/100`
    pub endpoint: String,
    /// Dialplan extension
    pub extension: String,
    /// Dialplan context
    pub context: String,
    /// Dialplan priority
    pub priority: u32,
    /// Caller id presented to the callee
    pub caller_id: String,
    /// Seconds the control plane waits for the far end before giving up
    pub timeout_secs: u64,
    /// Stasis application receiving the channel
    pub app: String,
    /// Arguments handed to the Stasis application
    pub app_args: Option<String>,
}

impl OriginateParams {
    /// Query parameters in the order the REST API documents them
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("endpoint", self.endpoint.clone()),
            ("extension", self.extension.clone()),
            ("context", self.context.clone()),
            ("priority", self.priority.to_string()),
            ("callerId", self.caller_id.clone()),
            ("timeout", self.timeout_secs.to_string()),
            ("app", self.app.clone()),
        ];
        if let Some(args) = &self.app_args {
            query.push(("appArgs", args.clone()));
        }
        query
    }
}
