//! # Bridge Orchestrator
//!
//! Builds multi-party bridges out of independently progressing channels.
//!
//! ## Dial
//!
//! ```text
//!              create bridge
//!                   │
//!      ┌────────────┼────────────┐        one task per address,
//!      ▼            ▼            ▼        failures stay local
//!  originate    originate    originate
//!  + attach     + attach     + attach
//!      └────────────┼────────────┘
//!                   ▼
//!        join ─▶ tag kind in registry ─▶ outcome
//! ```
//!
//! Each leg is attached as soon as it answers; the join point only collects
//! results. The registry tag is written after the join so the event reactor
//! never tears down a call whose legs are still being set up.
//!
//! ## Join
//!
//! Adds participants to an existing bridge. Joined channels are attached as
//! soon as they exist unless `join_awaits_answer` is set, and a joined bridge
//! is tagged as a conference.
//!
//! ## List
//!
//! Reports bridges with their member counts and destroys empty ones on the way.

use futures::future::join_all;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, warn};

use rvoip_ari_client::{BridgeId, BridgeType, Channel, ChannelId, ChannelRole, ControlPlane};

use crate::config::OrchestratorConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::originator::ChannelOriginator;
use crate::registry::{BridgeKind, BridgeRegistry};

/// Minimum number of addresses for `dial`
pub const MIN_DIAL_PARTICIPANTS: usize = 2;

/// Returns true when `input` looks like a bridge identifier rather than a
/// channel identifier.
///
/// Channel ids are numeric (`1700000000.12`) while bridge ids carry at least
/// one letter. This is a heuristic: ids made of letters only in both domains
/// would collide.
pub fn is_bridge_id(input: &str) -> bool {
    input.chars().any(char::is_alphabetic)
}

/// A participant leg that ended up in the bridge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachedLeg {
    pub address: String,
    pub channel_id: ChannelId,
    pub bridge_id: BridgeId,
}

/// A participant that could not be brought into the bridge.
///
/// An attach rejected as not found usually means the event reactor swept the
/// bridge while it was still empty; the answered channel is then left up
/// outside any bridge.
#[derive(Debug)]
pub struct LegFailure {
    pub address: String,
    pub error: BridgeError,
}

/// Per-participant result of a dial or join
#[derive(Debug)]
pub struct BridgeOutcome {
    pub bridge_id: BridgeId,
    /// Registry tag after the operation; `None` for an untagged bridge nobody joined
    pub kind: Option<BridgeKind>,
    /// Attached legs, in input order
    pub attached: Vec<AttachedLeg>,
    /// Failed participants, in input order
    pub failed: Vec<LegFailure>,
}

impl BridgeOutcome {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn attached_addresses(&self) -> Vec<&str> {
        self.attached.iter().map(|leg| leg.address.as_str()).collect()
    }

    pub fn failed_addresses(&self) -> Vec<&str> {
        self.failed.iter().map(|f| f.address.as_str()).collect()
    }
}

/// A bridge as reported by `list`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeSummary {
    pub bridge_id: BridgeId,
    pub member_count: usize,
    pub kind: Option<BridgeKind>,
}

impl fmt::Display for BridgeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = self
            .kind
            .map(|k| k.to_string())
            .unwrap_or_else(|| "external".to_string());
        write!(
            f,
            "{} ({}, {} member{})",
            self.bridge_id,
            kind,
            self.member_count,
            if self.member_count == 1 { "" } else { "s" }
        )
    }
}

/// How a participant's channel is brought up before attaching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LegMode {
    /// Originate and wait for answer
    Answered,
    /// Attach as soon as the channel exists
    Immediate,
}

/// Coordinates bridges, participant legs and the bridge registry
pub struct BridgeOrchestrator {
    control: Arc<dyn ControlPlane>,
    originator: Arc<ChannelOriginator>,
    registry: Arc<BridgeRegistry>,
}

impl BridgeOrchestrator {
    /// Create an orchestrator with a fresh registry
    pub fn new(control: Arc<dyn ControlPlane>, config: OrchestratorConfig) -> Self {
        Self::with_registry(control, config, Arc::new(BridgeRegistry::new()))
    }

    pub fn with_registry(
        control: Arc<dyn ControlPlane>,
        config: OrchestratorConfig,
        registry: Arc<BridgeRegistry>,
    ) -> Self {
        let originator = Arc::new(ChannelOriginator::new(control.clone(), config));
        Self {
            control,
            originator,
            registry,
        }
    }

    /// Registry shared with the event reactor
    pub fn registry(&self) -> Arc<BridgeRegistry> {
        self.registry.clone()
    }

    pub fn control(&self) -> Arc<dyn ControlPlane> {
        self.control.clone()
    }

    pub fn config(&self) -> &OrchestratorConfig {
        self.originator.config()
    }

    /// Create a bridge and bring every address into it
    pub async fn dial(&self, addresses: &[String]) -> BridgeResult<BridgeOutcome> {
        validate_addresses(addresses, MIN_DIAL_PARTICIPANTS)?;

        let kind = BridgeKind::for_participants(addresses.len());
        let name = format!("{}_{}", kind.name_prefix(), short_suffix());
        let bridge = self
            .control
            .create_bridge(BridgeType::Mixing, &name)
            .await
            .map_err(|e| BridgeError::BridgeCreationFailed {
                reason: e.to_string(),
            })?;
        info!(
            "Created {} bridge {} for extensions {:?}",
            kind, bridge.id, addresses
        );

        let (attached, failed) = self
            .bring_up_legs(&bridge.id, addresses, LegMode::Answered, None)
            .await;

        // Written only after every leg has resolved
        self.registry.set(bridge.id.clone(), kind);

        if failed.is_empty() {
            info!("Bridge {} ready with {} legs", bridge.id, attached.len());
        } else {
            warn!(
                "Bridge {} up with {} of {} legs",
                bridge.id,
                attached.len(),
                addresses.len()
            );
        }

        Ok(BridgeOutcome {
            bridge_id: bridge.id,
            kind: Some(kind),
            attached,
            failed,
        })
    }

    /// Add participants to an existing bridge
    pub async fn join(&self, bridge_id: &str, addresses: &[String]) -> BridgeResult<BridgeOutcome> {
        if !is_bridge_id(bridge_id) {
            return Err(BridgeError::malformed(format!(
                "'{}' is not a bridge identifier",
                bridge_id
            )));
        }
        validate_addresses(addresses, 1)?;

        let bridge_id = BridgeId::new(bridge_id);
        let bridge = self.control.get_bridge(&bridge_id).await.map_err(|e| {
            if e.is_not_found() {
                BridgeError::BridgeNotFound {
                    bridge_id: bridge_id.clone(),
                }
            } else {
                BridgeError::ControlPlaneUnavailable(e)
            }
        })?;

        let mode = if self.config().join_awaits_answer {
            LegMode::Answered
        } else {
            LegMode::Immediate
        };
        let (attached, failed) = self
            .bring_up_legs(&bridge.id, addresses, mode, Some(self.registry.clone()))
            .await;

        if !attached.is_empty() {
            info!(
                "Extensions {:?} added to bridge {}",
                attached.iter().map(|l| l.address.as_str()).collect::<Vec<_>>(),
                bridge.id
            );
        }

        Ok(BridgeOutcome {
            kind: self.registry.get(&bridge.id),
            bridge_id: bridge.id,
            attached,
            failed,
        })
    }

    /// List bridges, destroying those without members
    pub async fn list(&self) -> BridgeResult<Vec<BridgeSummary>> {
        let bridges = self.control.list_bridges().await?;
        let mut summaries = Vec::with_capacity(bridges.len());

        for bridge in bridges {
            if bridge.is_empty() {
                match self.control.destroy_bridge(&bridge.id).await {
                    Ok(()) => info!("Pruned empty bridge {}", bridge.id),
                    Err(e) if e.is_not_found() => {}
                    Err(e) => warn!("Failed to prune empty bridge {}: {}", bridge.id, e),
                }
                continue;
            }
            summaries.push(BridgeSummary {
                kind: self.registry.get(&bridge.id),
                member_count: bridge.member_count(),
                bridge_id: bridge.id,
            });
        }

        Ok(summaries)
    }

    /// Run one task per address and collect results in input order.
    ///
    /// When `promote` is given, the bridge is tagged as a conference on the
    /// first successful attach.
    async fn bring_up_legs(
        &self,
        bridge_id: &BridgeId,
        addresses: &[String],
        mode: LegMode,
        promote: Option<Arc<BridgeRegistry>>,
    ) -> (Vec<AttachedLeg>, Vec<LegFailure>) {
        let handles: Vec<_> = addresses
            .iter()
            .map(|address| {
                let originator = self.originator.clone();
                let control = self.control.clone();
                let bridge_id = bridge_id.clone();
                let address = address.clone();
                let promote = promote.clone();
                tokio::spawn(async move {
                    let channel = match mode {
                        LegMode::Answered => originator.originate(&address).await?,
                        LegMode::Immediate => {
                            let args = originator.config().join_app_args.clone();
                            originator.create(&address, args.as_deref()).await?
                        }
                    };
                    let leg = attach(control.as_ref(), &bridge_id, &address, channel).await?;
                    if let Some(registry) = promote {
                        registry.promote_to_conference(&bridge_id);
                    }
                    Ok::<_, BridgeError>(leg)
                })
            })
            .collect();

        let mut attached = Vec::new();
        let mut failed = Vec::new();
        for (address, result) in addresses.iter().zip(join_all(handles).await) {
            match result {
                Ok(Ok(leg)) => attached.push(leg),
                Ok(Err(error)) => {
                    warn!("Extension {} not bridged: {}", address, error);
                    failed.push(LegFailure {
                        address: address.clone(),
                        error,
                    });
                }
                Err(join_error) => {
                    error!("Leg task for extension {} aborted: {}", address, join_error);
                    failed.push(LegFailure {
                        address: address.clone(),
                        error: BridgeError::ChannelCreationFailed {
                            address: address.clone(),
                            reason: format!("leg task aborted: {}", join_error),
                        },
                    });
                }
            }
        }
        (attached, failed)
    }
}

async fn attach(
    control: &dyn ControlPlane,
    bridge_id: &BridgeId,
    address: &str,
    channel: Channel,
) -> BridgeResult<AttachedLeg> {
    control
        .add_channel_to_bridge(bridge_id, &channel.id, ChannelRole::Participant)
        .await
        .map_err(|e| BridgeError::ChannelAttachFailed {
            address: address.to_string(),
            channel_id: channel.id.clone(),
            bridge_id: bridge_id.clone(),
            reason: if e.is_not_found() {
                format!("{} (bridge or channel no longer exists)", e)
            } else {
                e.to_string()
            },
        })?;
    info!(
        "Channel {} ({}) added to bridge {}",
        channel.id, address, bridge_id
    );
    Ok(AttachedLeg {
        address: address.to_string(),
        channel_id: channel.id,
        bridge_id: bridge_id.clone(),
    })
}

fn validate_addresses(addresses: &[String], minimum: usize) -> BridgeResult<()> {
    if addresses.len() < minimum {
        return Err(BridgeError::malformed(format!(
            "at least {} extension{} required, got {}",
            minimum,
            if minimum == 1 { " is" } else { "s are" },
            addresses.len()
        )));
    }

    let mut seen = HashSet::new();
    for address in addresses {
        if address.trim().is_empty() {
            return Err(BridgeError::malformed("extensions must not be empty"));
        }
        if !seen.insert(address.as_str()) {
            return Err(BridgeError::malformed(format!(
                "extension {} given more than once",
                address
            )));
        }
    }
    Ok(())
}

fn short_suffix() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}
