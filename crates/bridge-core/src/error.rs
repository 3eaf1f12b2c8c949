//! Error types for bridge orchestration

use std::time::Duration;
use thiserror::Error;

use rvoip_ari_client::{AriError, BridgeId, ChannelId};

/// Result type for orchestration operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Errors surfaced by dial, join, list and the event reactor
#[derive(Debug, Error)]
pub enum BridgeError {
    /// A control-plane call failed outside of a per-participant step
    #[error("control plane unavailable: {0}")]
    ControlPlaneUnavailable(#[from] AriError),

    /// The bridge could not be created; no channels were originated
    #[error("failed to create bridge: {reason}")]
    BridgeCreationFailed { reason: String },

    /// The control plane refused to originate a channel
    #[error("failed to create channel for extension {address}: {reason}")]
    ChannelCreationFailed { address: String, reason: String },

    /// The channel did not answer within the polling window
    #[error("extension {address} did not answer within {waited:?} (channel {channel_id})")]
    AnswerTimeout {
        address: String,
        channel_id: ChannelId,
        waited: Duration,
    },

    /// The channel went away before it answered
    #[error("channel {channel_id} for extension {address} ended before answering: {reason}")]
    ChannelTerminated {
        address: String,
        channel_id: ChannelId,
        reason: String,
    },

    /// The answered channel could not be added to the bridge
    #[error("failed to add channel {channel_id} to bridge {bridge_id}: {reason}")]
    ChannelAttachFailed {
        address: String,
        channel_id: ChannelId,
        bridge_id: BridgeId,
        reason: String,
    },

    /// The control plane does not know the bridge
    #[error("bridge {bridge_id} not found")]
    BridgeNotFound { bridge_id: BridgeId },

    /// The request itself is invalid
    #[error("{message}")]
    MalformedInput { message: String },
}

impl BridgeError {
    /// Create a malformed input error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedInput {
            message: message.into(),
        }
    }

    /// Participant address the error belongs to, for per-leg failures
    pub fn address(&self) -> Option<&str> {
        match self {
            Self::ChannelCreationFailed { address, .. }
            | Self::AnswerTimeout { address, .. }
            | Self::ChannelTerminated { address, .. }
            | Self::ChannelAttachFailed { address, .. } => Some(address),
            _ => None,
        }
    }
}
