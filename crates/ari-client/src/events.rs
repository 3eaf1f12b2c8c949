//! Lifecycle notifications delivered by the control plane

use serde::Deserialize;
use tokio::sync::mpsc;

use crate::error::AriResult;
use crate::model::{BridgeId, ChannelId, ChannelState};

/// Ordered, unbounded stream of lifecycle notifications.
///
/// The stream cannot be restarted: once it yields `None` a new
/// subscription is required.
pub type LifecycleEvents = mpsc::UnboundedReceiver<LifecycleEvent>;

/// Asynchronous state-change notification for channels and bridges
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// A channel no longer exists on the control plane
    ChannelDestroyed {
        channel_id: ChannelId,
        cause: Option<i32>,
        cause_txt: Option<String>,
    },
    /// A channel changed state
    ChannelStateChange {
        channel_id: ChannelId,
        state: ChannelState,
    },
    /// A channel was added to a bridge
    ChannelEnteredBridge {
        bridge_id: BridgeId,
        channel_id: ChannelId,
    },
    /// A channel left a bridge
    ChannelLeftBridge {
        bridge_id: BridgeId,
        channel_id: ChannelId,
    },
    /// A channel entered the Stasis application
    StasisStart {
        channel_id: ChannelId,
        args: Vec<String>,
    },
    /// A channel left the Stasis application
    StasisEnd { channel_id: ChannelId },
    /// A bridge was destroyed
    BridgeDestroyed { bridge_id: BridgeId },
    /// Any event type not modeled above
    Other { event_type: String },
}

impl LifecycleEvent {
    /// Event type name as used on the wire
    pub fn event_type(&self) -> &str {
        match self {
            Self::ChannelDestroyed { .. } => "ChannelDestroyed",
            Self::ChannelStateChange { .. } => "ChannelStateChange",
            Self::ChannelEnteredBridge { .. } => "ChannelEnteredBridge",
            Self::ChannelLeftBridge { .. } => "ChannelLeftBridge",
            Self::StasisStart { .. } => "StasisStart",
            Self::StasisEnd { .. } => "StasisEnd",
            Self::BridgeDestroyed { .. } => "BridgeDestroyed",
            Self::Other { event_type } => event_type,
        }
    }

    pub fn is_channel_destroyed(&self) -> bool {
        matches!(self, Self::ChannelDestroyed { .. })
    }

    /// Decode one JSON event frame
    pub fn from_json(text: &str) -> AriResult<Self> {
        let raw: RawEvent = serde_json::from_str(text)?;
        Ok(raw.into_event())
    }
}

#[derive(Debug, Deserialize)]
struct RawChannel {
    id: ChannelId,
    #[serde(default)]
    state: Option<ChannelState>,
}

#[derive(Debug, Deserialize)]
struct RawBridge {
    id: BridgeId,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    channel: Option<RawChannel>,
    #[serde(default)]
    bridge: Option<RawBridge>,
    #[serde(default)]
    cause: Option<i32>,
    #[serde(default)]
    cause_txt: Option<String>,
    #[serde(default)]
    args: Vec<String>,
}

impl RawEvent {
    fn into_event(self) -> LifecycleEvent {
        let RawEvent {
            event_type,
            channel,
            bridge,
            cause,
            cause_txt,
            args,
        } = self;

        match (event_type.as_str(), channel, bridge) {
            ("ChannelDestroyed", Some(channel), _) => LifecycleEvent::ChannelDestroyed {
                channel_id: channel.id,
                cause,
                cause_txt,
            },
            ("ChannelStateChange", Some(channel), _) => LifecycleEvent::ChannelStateChange {
                channel_id: channel.id,
                state: channel.state.unwrap_or(ChannelState::Unknown),
            },
            ("ChannelEnteredBridge", Some(channel), Some(bridge)) => {
                LifecycleEvent::ChannelEnteredBridge {
                    bridge_id: bridge.id,
                    channel_id: channel.id,
                }
            }
            ("ChannelLeftBridge", Some(channel), Some(bridge)) => {
                LifecycleEvent::ChannelLeftBridge {
                    bridge_id: bridge.id,
                    channel_id: channel.id,
                }
            }
            ("StasisStart", Some(channel), _) => LifecycleEvent::StasisStart {
                channel_id: channel.id,
                args,
            },
            ("StasisEnd", Some(channel), _) => LifecycleEvent::StasisEnd {
                channel_id: channel.id,
            },
            ("BridgeDestroyed", _, Some(bridge)) => {
                LifecycleEvent::BridgeDestroyed { bridge_id: bridge.id }
            }
            _ => LifecycleEvent::Other { event_type },
        }
    }
}
