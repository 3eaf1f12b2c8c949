//! Event Reactor
//!
//! Consumes lifecycle notifications and applies the cleanup policy whenever a
//! channel is destroyed:
//!
//! - a bridge with no members is destroyed
//! - a bridge tagged as a call with a single member left has that member hung
//!   up and is destroyed
//! - everything else, conferences and bridges this process did not create,
//!   is left alone
//!
//! Every notification re-evaluates all bridges. Failures are logged and the
//! reactor moves on to the next notification.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use rvoip_ari_client::{BridgeId, ChannelId, ControlPlane, LifecycleEvent, LifecycleEvents};

use crate::error::BridgeResult;
use crate::registry::{BridgeKind, BridgeRegistry};

/// What a single sweep tore down
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub destroyed_bridges: Vec<BridgeId>,
    pub hung_up_channels: Vec<ChannelId>,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.destroyed_bridges.is_empty() && self.hung_up_channels.is_empty()
    }
}

/// Applies bridge cleanup in response to channel lifecycle events
#[derive(Clone)]
pub struct EventReactor {
    control: Arc<dyn ControlPlane>,
    registry: Arc<BridgeRegistry>,
}

impl EventReactor {
    pub fn new(control: Arc<dyn ControlPlane>, registry: Arc<BridgeRegistry>) -> Self {
        Self { control, registry }
    }

    /// Run the reactor on its own task until the event stream ends
    pub fn spawn(self, events: LifecycleEvents) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(events).await })
    }

    pub async fn run(&self, mut events: LifecycleEvents) {
        info!("Event reactor started");
        while let Some(event) = events.recv().await {
            self.handle_event(&event).await;
        }
        warn!("Event stream closed, bridge cleanup has stopped");
    }

    /// React to one notification. Returns the sweep report when a sweep ran.
    pub async fn handle_event(&self, event: &LifecycleEvent) -> Option<SweepReport> {
        let LifecycleEvent::ChannelDestroyed {
            channel_id,
            cause_txt,
            ..
        } = event
        else {
            trace!("Ignoring {} event", event.event_type());
            return None;
        };

        debug!(
            "Channel {} destroyed ({}), sweeping bridges",
            channel_id,
            cause_txt.as_deref().unwrap_or("no cause")
        );
        match self.sweep().await {
            Ok(report) => Some(report),
            Err(e) => {
                warn!("Bridge sweep after channel {} destroyed failed: {}", channel_id, e);
                None
            }
        }
    }

    /// Re-evaluate every bridge against the cleanup policy
    pub async fn sweep(&self) -> BridgeResult<SweepReport> {
        let bridges = self.control.list_bridges().await?;
        let mut report = SweepReport::default();

        for bridge in bridges {
            match bridge.member_count() {
                0 => {
                    if self.destroy(&bridge.id).await {
                        info!("Destroyed empty bridge {}", bridge.id);
                        report.destroyed_bridges.push(bridge.id);
                    }
                }
                1 if self.registry.get(&bridge.id) == Some(BridgeKind::Call) => {
                    let remaining = bridge.channels[0].clone();
                    match self.control.hangup_channel(&remaining).await {
                        Ok(()) => report.hung_up_channels.push(remaining.clone()),
                        Err(e) if e.is_not_found() => {}
                        Err(e) => {
                            warn!(
                                "Failed to hang up channel {} left in call bridge {}: {}",
                                remaining, bridge.id, e
                            );
                            continue;
                        }
                    }
                    if self.destroy(&bridge.id).await {
                        info!(
                            "Call bridge {} torn down, remaining channel {} hung up",
                            bridge.id, remaining
                        );
                        report.destroyed_bridges.push(bridge.id);
                    }
                }
                _ => {}
            }
        }

        Ok(report)
    }

    async fn destroy(&self, bridge_id: &BridgeId) -> bool {
        match self.control.destroy_bridge(bridge_id).await {
            Ok(()) => true,
            Err(e) if e.is_not_found() => false,
            Err(e) => {
                warn!("Failed to destroy bridge {}: {}", bridge_id, e);
                false
            }
        }
    }
}
