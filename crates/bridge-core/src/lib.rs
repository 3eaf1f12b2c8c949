//! # RVOIP Bridge Core
//!
//! Multi-party bridge orchestration on top of an ARI call-control server.
//!
//! ```text
//!  CommandSurface ──▶ BridgeOrchestrator ──▶ ControlPlane
//!                        │        │               │
//!                        │        ▼               │ lifecycle events
//!                        │  ChannelOriginator     ▼
//!                        ▼                   EventReactor
//!                  BridgeRegistry ◀──────────────┘
//! ```
//!
//! - [`ChannelOriginator`] places one leg and polls it until answered
//! - [`BridgeOrchestrator`] creates bridges and brings participants in concurrently
//! - [`BridgeRegistry`] remembers whether a bridge is a call or a conference
//! - [`EventReactor`] tears down bridges that no longer serve a purpose
//! - [`CommandSurface`] maps `dial`, `join` and `list` onto the orchestrator
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use rvoip_ari_client::{AriClient, AriConfig, ControlPlane};
//! use rvoip_bridge_core::{BridgeOrchestrator, EventReactor, OrchestratorConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = AriClient::new(AriConfig::new("localhost", 8088, "asterisk", "secret"))?;
//! let control: Arc<dyn ControlPlane> = Arc::new(client);
//!
//! let orchestrator = BridgeOrchestrator::new(control.clone(), OrchestratorConfig::default());
//! let events = control.subscribe_events().await?;
//! EventReactor::new(control, orchestrator.registry()).spawn(events);
//!
//! let outcome = orchestrator.dial(&["100".to_string(), "101".to_string()]).await?;
//! println!("bridge {} with {} legs", outcome.bridge_id, outcome.attached.len());
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod originator;
pub mod reactor;
pub mod registry;

pub use command::{Command, CommandSurface, USAGE};
pub use config::OrchestratorConfig;
pub use error::{BridgeError, BridgeResult};
pub use orchestrator::{
    AttachedLeg, BridgeOrchestrator, BridgeOutcome, BridgeSummary, LegFailure, is_bridge_id,
};
pub use originator::ChannelOriginator;
pub use reactor::{EventReactor, SweepReport};
pub use registry::{BridgeKind, BridgeRegistry};
