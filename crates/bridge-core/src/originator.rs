//! Channel Originator
//!
//! Places one outbound leg towards a participant address and waits for it to
//! answer. Answer detection is a bounded polling loop: the control plane is
//! asked for the channel state every `poll_interval` until the channel is `Up`,
//! disappears, or `answer_timeout` runs out.
//!
//! A channel that fails to answer is *not* hung up here. It is left to the
//! control plane's own ring timeout and to the event reactor's bridge cleanup.

use std::sync::Arc;
use tokio::time::{Instant, sleep};
use tracing::{Instrument, debug, info, info_span, trace};

use rvoip_ari_client::{Channel, ControlPlane, OriginateParams};

use crate::config::OrchestratorConfig;
use crate::error::{BridgeError, BridgeResult};

/// Originates channels and polls them until answered
pub struct ChannelOriginator {
    control: Arc<dyn ControlPlane>,
    config: OrchestratorConfig,
}

impl ChannelOriginator {
    pub fn new(control: Arc<dyn ControlPlane>, config: OrchestratorConfig) -> Self {
        Self { control, config }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    fn originate_params(&self, address: &str, app_args: Option<&str>) -> OriginateParams {
        OriginateParams {
            endpoint: self.config.endpoint_for(address),
            extension: address.to_string(),
            context: self.config.context.clone(),
            priority: self.config.priority,
            caller_id: address.to_string(),
            timeout_secs: self.config.originate_timeout_secs,
            app: self.config.app_name.clone(),
            app_args: app_args.map(str::to_string),
        }
    }

    /// Create a channel towards `address` without waiting for it to answer
    pub async fn create(&self, address: &str, app_args: Option<&str>) -> BridgeResult<Channel> {
        let params = self.originate_params(address, app_args);
        let channel = self
            .control
            .create_channel(&params)
            .await
            .map_err(|e| BridgeError::ChannelCreationFailed {
                address: address.to_string(),
                reason: e.to_string(),
            })?;
        debug!("Channel {} created for extension {}", channel.id, address);
        Ok(channel)
    }

    /// Create a channel towards `address` and wait until it answers
    pub async fn originate(&self, address: &str) -> BridgeResult<Channel> {
        let span = info_span!("originate", extension = %address);
        async {
            let channel = self
                .create(address, self.config.dial_app_args.as_deref())
                .await?;
            self.await_answer(address, channel).await
        }
        .instrument(span)
        .await
    }

    /// Poll `channel` until it reaches the answered state
    pub async fn await_answer(&self, address: &str, channel: Channel) -> BridgeResult<Channel> {
        let started = Instant::now();
        let deadline = started + self.config.answer_timeout();
        let interval = self.config.poll_interval();

        loop {
            match self.control.get_channel(&channel.id).await {
                Ok(current) if current.state.is_answered() => {
                    info!(
                        "Extension {} answered on channel {} after {:?}",
                        address,
                        current.id,
                        started.elapsed()
                    );
                    return Ok(current);
                }
                Ok(current) => {
                    trace!("Channel {} is {}", current.id, current.state);
                }
                Err(e) => {
                    let reason = if e.is_not_found() {
                        "channel destroyed".to_string()
                    } else {
                        e.to_string()
                    };
                    return Err(BridgeError::ChannelTerminated {
                        address: address.to_string(),
                        channel_id: channel.id,
                        reason,
                    });
                }
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(BridgeError::AnswerTimeout {
                    address: address.to_string(),
                    channel_id: channel.id,
                    waited: now - started,
                });
            }
            sleep(interval.min(deadline - now)).await;
        }
    }
}
