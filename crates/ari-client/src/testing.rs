//! In-memory control plane for tests
//!
//! [`FakeControlPlane`] keeps bridges and channels in a map, lets a test script
//! how each endpoint behaves and emits `ChannelDestroyed` notifications to every
//! subscriber when a channel goes away.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;

use crate::control::ControlPlane;
use crate::error::{AriError, AriResult};
use crate::events::{LifecycleEvent, LifecycleEvents};
use crate::model::{Bridge, BridgeId, BridgeType, Channel, ChannelId, ChannelRole, ChannelState, OriginateParams};

/// How an endpoint reacts to an origination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointBehavior {
    /// Answer once the channel has been polled this many times
    AnswerAfterPolls(u32),
    /// Channel creation is refused
    RejectOrigination,
    /// Rings forever
    NeverAnswer,
    /// Hangs up while ringing, on the given poll
    HangUpAfterPolls(u32),
}

impl Default for EndpointBehavior {
    fn default() -> Self {
        Self::AnswerAfterPolls(1)
    }
}

/// Counters of operations issued against the fake
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationCounts {
    pub create_bridge: usize,
    pub get_bridge: usize,
    pub destroy_bridge: usize,
    pub list_bridges: usize,
    pub create_channel: usize,
    pub get_channel: usize,
    pub hangup_channel: usize,
    pub add_channel_to_bridge: usize,
}

impl OperationCounts {
    pub fn total(&self) -> usize {
        self.create_bridge
            + self.get_bridge
            + self.destroy_bridge
            + self.list_bridges
            + self.create_channel
            + self.get_channel
            + self.hangup_channel
            + self.add_channel_to_bridge
    }
}

#[derive(Debug)]
struct FakeChannel {
    channel: Channel,
    endpoint: String,
    behavior: EndpointBehavior,
    polls: u32,
    bridge: Option<BridgeId>,
}

#[derive(Default)]
struct FakeState {
    bridges: BTreeMap<BridgeId, Bridge>,
    channels: HashMap<ChannelId, FakeChannel>,
    behaviors: HashMap<String, EndpointBehavior>,
    originations: Vec<OriginateParams>,
    hung_up: Vec<ChannelId>,
    counts: OperationCounts,
    unavailable: HashSet<&'static str>,
    subscribers: Vec<mpsc::UnboundedSender<LifecycleEvent>>,
    next_bridge: u64,
    next_channel: u64,
}

impl FakeState {
    fn check(&self, operation: &'static str) -> AriResult<()> {
        if self.unavailable.contains(operation) {
            return Err(AriError::unavailable(format!("{} is failing", operation)));
        }
        Ok(())
    }

    fn emit(&mut self, event: LifecycleEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn destroy_channel(&mut self, channel_id: &ChannelId) -> bool {
        let Some(removed) = self.channels.remove(channel_id) else {
            return false;
        };
        if let Some(bridge_id) = &removed.bridge {
            if let Some(bridge) = self.bridges.get_mut(bridge_id) {
                bridge.channels.retain(|id| id != channel_id);
            }
        }
        self.emit(LifecycleEvent::ChannelDestroyed {
            channel_id: channel_id.clone(),
            cause: Some(16),
            cause_txt: Some("Normal Clearing".to_string()),
        });
        true
    }
}

/// Scriptable in-memory [`ControlPlane`]
#[derive(Clone, Default)]
pub struct FakeControlPlane {
    state: Arc<Mutex<FakeState>>,
}

impl FakeControlPlane {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Script the behaviour of an endpoint dial string such as `PJSIP/100`
    pub fn set_behavior(&self, endpoint: impl Into<String>, behavior: EndpointBehavior) {
        self.lock().behaviors.insert(endpoint.into(), behavior);
    }

    /// Make an operation (named like the trait method) fail with `Unavailable`
    pub fn fail_operation(&self, operation: &'static str) {
        self.lock().unavailable.insert(operation);
    }

    pub fn restore_operation(&self, operation: &'static str) {
        self.lock().unavailable.remove(operation);
    }

    /// Create a bridge as if someone else had made it
    pub fn insert_bridge(&self, id: impl Into<String>, channels: Vec<ChannelId>) -> BridgeId {
        let bridge_id = BridgeId::new(id);
        let mut state = self.lock();
        for channel_id in &channels {
            state.channels.insert(
                channel_id.clone(),
                FakeChannel {
                    channel: Channel {
                        id: channel_id.clone(),
                        name: format!("External/{}", channel_id),
                        state: ChannelState::Up,
                    },
                    endpoint: String::new(),
                    behavior: EndpointBehavior::AnswerAfterPolls(0),
                    polls: 0,
                    bridge: Some(bridge_id.clone()),
                },
            );
        }
        state.bridges.insert(
            bridge_id.clone(),
            Bridge {
                id: bridge_id.clone(),
                name: "external".to_string(),
                bridge_type: "mixing".to_string(),
                technology: "simple_bridge".to_string(),
                channels,
            },
        );
        bridge_id
    }

    /// Simulate the far end hanging up a channel
    pub fn remote_hangup(&self, channel_id: &ChannelId) -> bool {
        self.lock().destroy_channel(channel_id)
    }

    /// Push an arbitrary event to every subscriber
    pub fn emit(&self, event: LifecycleEvent) {
        self.lock().emit(event);
    }

    pub fn bridge(&self, bridge_id: &BridgeId) -> Option<Bridge> {
        self.lock().bridges.get(bridge_id).cloned()
    }

    pub fn bridges(&self) -> Vec<Bridge> {
        self.lock().bridges.values().cloned().collect()
    }

    pub fn channel_exists(&self, channel_id: &ChannelId) -> bool {
        self.lock().channels.contains_key(channel_id)
    }

    /// Endpoint dial string the channel was originated towards
    pub fn endpoint_of(&self, channel_id: &ChannelId) -> Option<String> {
        self.lock().channels.get(channel_id).map(|c| c.endpoint.clone())
    }

    pub fn originations(&self) -> Vec<OriginateParams> {
        self.lock().originations.clone()
    }

    /// Channels hung up through the control-plane API
    pub fn hung_up(&self) -> Vec<ChannelId> {
        self.lock().hung_up.clone()
    }

    pub fn counts(&self) -> OperationCounts {
        self.lock().counts.clone()
    }
}

#[async_trait]
impl ControlPlane for FakeControlPlane {
    async fn create_bridge(&self, bridge_type: BridgeType, name: &str) -> AriResult<Bridge> {
        let mut state = self.lock();
        state.counts.create_bridge += 1;
        state.check("create_bridge")?;

        state.next_bridge += 1;
        let bridge = Bridge {
            id: BridgeId::new(format!("bridge-{}", state.next_bridge)),
            name: name.to_string(),
            bridge_type: bridge_type.as_str().to_string(),
            technology: "simple_bridge".to_string(),
            channels: Vec::new(),
        };
        state.bridges.insert(bridge.id.clone(), bridge.clone());
        Ok(bridge)
    }

    async fn get_bridge(&self, bridge_id: &BridgeId) -> AriResult<Bridge> {
        let mut state = self.lock();
        state.counts.get_bridge += 1;
        state.check("get_bridge")?;
        state
            .bridges
            .get(bridge_id)
            .cloned()
            .ok_or_else(|| AriError::not_found(format!("bridge {}", bridge_id)))
    }

    async fn destroy_bridge(&self, bridge_id: &BridgeId) -> AriResult<()> {
        let mut state = self.lock();
        state.counts.destroy_bridge += 1;
        state.check("destroy_bridge")?;

        let bridge = state
            .bridges
            .remove(bridge_id)
            .ok_or_else(|| AriError::not_found(format!("bridge {}", bridge_id)))?;
        for channel_id in &bridge.channels {
            if let Some(channel) = state.channels.get_mut(channel_id) {
                channel.bridge = None;
            }
        }
        state.emit(LifecycleEvent::BridgeDestroyed {
            bridge_id: bridge_id.clone(),
        });
        Ok(())
    }

    async fn list_bridges(&self) -> AriResult<Vec<Bridge>> {
        let mut state = self.lock();
        state.counts.list_bridges += 1;
        state.check("list_bridges")?;
        Ok(state.bridges.values().cloned().collect())
    }

    async fn create_channel(&self, params: &OriginateParams) -> AriResult<Channel> {
        let mut state = self.lock();
        state.counts.create_channel += 1;
        state.check("create_channel")?;
        state.originations.push(params.clone());

        let behavior = state
            .behaviors
            .get(&params.endpoint)
            .copied()
            .unwrap_or_default();
        if behavior == EndpointBehavior::RejectOrigination {
            return Err(AriError::Status {
                status: 500,
                body: format!("Allocation failed for {}", params.endpoint),
            });
        }

        state.next_channel += 1;
        let channel = Channel {
            id: ChannelId::new(format!("1700000000.{}", state.next_channel)),
            name: format!("{}-{:08x}", params.endpoint, state.next_channel),
            state: ChannelState::Down,
        };
        state.channels.insert(
            channel.id.clone(),
            FakeChannel {
                channel: channel.clone(),
                endpoint: params.endpoint.clone(),
                behavior,
                polls: 0,
                bridge: None,
            },
        );
        Ok(channel)
    }

    async fn get_channel(&self, channel_id: &ChannelId) -> AriResult<Channel> {
        let mut state = self.lock();
        state.counts.get_channel += 1;
        state.check("get_channel")?;

        let Some(fake) = state.channels.get_mut(channel_id) else {
            return Err(AriError::not_found(format!("channel {}", channel_id)));
        };
        fake.polls += 1;
        let polls = fake.polls;
        let behavior = fake.behavior;
        match behavior {
            EndpointBehavior::AnswerAfterPolls(n) if polls > n => fake.channel.state = ChannelState::Up,
            EndpointBehavior::HangUpAfterPolls(n) if polls > n => {
                state.destroy_channel(channel_id);
                return Err(AriError::not_found(format!("channel {}", channel_id)));
            }
            _ => fake.channel.state = ChannelState::Ringing,
        }
        Ok(fake.channel.clone())
    }

    async fn hangup_channel(&self, channel_id: &ChannelId) -> AriResult<()> {
        let mut state = self.lock();
        state.counts.hangup_channel += 1;
        state.check("hangup_channel")?;

        if state.destroy_channel(channel_id) {
            state.hung_up.push(channel_id.clone());
            Ok(())
        } else {
            Err(AriError::not_found(format!("channel {}", channel_id)))
        }
    }

    async fn add_channel_to_bridge(
        &self,
        bridge_id: &BridgeId,
        channel_id: &ChannelId,
        _role: ChannelRole,
    ) -> AriResult<()> {
        let mut state = self.lock();
        state.counts.add_channel_to_bridge += 1;
        state.check("add_channel_to_bridge")?;

        if !state.bridges.contains_key(bridge_id) {
            return Err(AriError::not_found(format!("bridge {}", bridge_id)));
        }
        let previous = match state.channels.get_mut(channel_id) {
            Some(channel) => channel.bridge.replace(bridge_id.clone()),
            None => return Err(AriError::not_found(format!("channel {}", channel_id))),
        };
        if let Some(previous) = previous {
            if let Some(bridge) = state.bridges.get_mut(&previous) {
                bridge.channels.retain(|id| id != channel_id);
            }
        }
        if let Some(bridge) = state.bridges.get_mut(bridge_id) {
            bridge.channels.push(channel_id.clone());
        }
        Ok(())
    }

    async fn subscribe_events(&self) -> AriResult<LifecycleEvents> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().subscribers.push(tx);
        Ok(rx)
    }
}
