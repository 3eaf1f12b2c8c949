//! # rvoip-ari-client
//!
//! Control-plane client for call-control servers that speak the Asterisk REST
//! Interface (ARI).
//!
//! The crate exposes the capability set the bridge orchestrator consumes as the
//! [`ControlPlane`] trait, and two implementations of it:
//!
//! - [`AriClient`]: REST calls over HTTP with basic auth, lifecycle events over
//!   the ARI event WebSocket
//! - `FakeControlPlane` (feature `testing`): scriptable in-memory server for tests
//!
//! ```text
//! ┌──────────────────┐   REST (reqwest)    ┌──────────────┐
//! │    AriClient     │ ──────────────────▶ │  ARI server  │
//! │                  │ ◀────────────────── │              │
//! └──────────────────┘  events (WebSocket) └──────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use rvoip_ari_client::{AriClient, AriConfig, BridgeType, ControlPlane};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = AriClient::new(AriConfig::new("localhost", 8088, "main", "pass"))?;
//! client.check_connection().await?;
//!
//! let bridge = client.create_bridge(BridgeType::Mixing, "Call_demo").await?;
//! println!("bridge {} has {} members", bridge.id, bridge.member_count());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod control;
pub mod error;
pub mod events;
pub mod model;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use client::AriClient;
pub use config::AriConfig;
pub use control::ControlPlane;
pub use error::{AriError, AriResult};
pub use events::{LifecycleEvent, LifecycleEvents};
pub use model::{
    Bridge, BridgeId, BridgeType, Channel, ChannelId, ChannelRole, ChannelState, OriginateParams,
};
