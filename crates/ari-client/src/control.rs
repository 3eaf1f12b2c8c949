//! The control-plane capability set consumed by the orchestrator

use async_trait::async_trait;

use crate::error::AriResult;
use crate::events::LifecycleEvents;
use crate::model::{Bridge, BridgeId, BridgeType, Channel, ChannelId, ChannelRole, OriginateParams};

/// Imperative operations against the call-control server plus its
/// lifecycle notification feed.
///
/// The control plane is the source of truth for channel and bridge state;
/// implementors never cache it.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Create a bridge of the given type
    async fn create_bridge(&self, bridge_type: BridgeType, name: &str) -> AriResult<Bridge>;

    /// Fetch one bridge
    async fn get_bridge(&self, bridge_id: &BridgeId) -> AriResult<Bridge>;

    /// Destroy a bridge; member channels are left alive
    async fn destroy_bridge(&self, bridge_id: &BridgeId) -> AriResult<()>;

    /// List every bridge the server knows about
    async fn list_bridges(&self) -> AriResult<Vec<Bridge>>;

    /// Originate an outbound channel
    async fn create_channel(&self, params: &OriginateParams) -> AriResult<Channel>;

    /// Fetch the current state of a channel
    async fn get_channel(&self, channel_id: &ChannelId) -> AriResult<Channel>;

    /// Hang up a channel
    async fn hangup_channel(&self, channel_id: &ChannelId) -> AriResult<()>;

    /// Add a channel to a bridge
    async fn add_channel_to_bridge(
        &self,
        bridge_id: &BridgeId,
        channel_id: &ChannelId,
        role: ChannelRole,
    ) -> AriResult<()>;

    /// Open the lifecycle notification stream
    async fn subscribe_events(&self) -> AriResult<LifecycleEvents>;
}
