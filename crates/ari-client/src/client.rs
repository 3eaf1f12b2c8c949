//! REST + WebSocket implementation of [`ControlPlane`] for ARI servers

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, trace, warn};

use crate::config::AriConfig;
use crate::control::ControlPlane;
use crate::error::{AriError, AriResult};
use crate::events::{LifecycleEvent, LifecycleEvents};
use crate::model::{Bridge, BridgeId, BridgeType, Channel, ChannelId, ChannelRole, OriginateParams};

/// Client for the Asterisk REST Interface
#[derive(Clone)]
pub struct AriClient {
    http: reqwest::Client,
    config: AriConfig,
    base_url: String,
}

impl AriClient {
    /// Create a client; no request is made until the first operation
    pub fn new(config: AriConfig) -> AriResult<Self> {
        config.validate()?;

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| AriError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.base_url(),
            http,
            config,
        })
    }

    pub fn config(&self) -> &AriConfig {
        &self.config
    }

    /// Probe the server; used at startup to fail fast on bad credentials or an unreachable host
    pub async fn check_connection(&self) -> AriResult<()> {
        let _: serde_json::Value = self
            .send_json(self.request(Method::GET, "/asterisk/info"), "asterisk info")
            .await?;
        info!("Connected to ARI at {}", self.base_url);
        Ok(())
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.base_url, path))
            .basic_auth(&self.config.username, Some(&self.config.password))
    }

    async fn send(&self, request: RequestBuilder, resource: &str) -> AriResult<reqwest::Response> {
        let response = request.send().await?;
        let status = response.status();
        trace!("{} -> {}", resource, status);

        if status == StatusCode::NOT_FOUND {
            return Err(AriError::not_found(resource));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AriError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        resource: &str,
    ) -> AriResult<T> {
        let response = self.send(request, resource).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn send_empty(&self, request: RequestBuilder, resource: &str) -> AriResult<()> {
        self.send(request, resource).await.map(|_| ())
    }
}

#[async_trait]
impl ControlPlane for AriClient {
    async fn create_bridge(&self, bridge_type: BridgeType, name: &str) -> AriResult<Bridge> {
        let request = self
            .request(Method::POST, "/bridges")
            .query(&[("type", bridge_type.as_str()), ("name", name)]);
        let bridge: Bridge = self.send_json(request, "bridges").await?;
        debug!("Created {} bridge {} ({})", bridge_type, bridge.id, name);
        Ok(bridge)
    }

    async fn get_bridge(&self, bridge_id: &BridgeId) -> AriResult<Bridge> {
        let request = self.request(Method::GET, &format!("/bridges/{}", bridge_id));
        self.send_json(request, &format!("bridge {}", bridge_id)).await
    }

    async fn destroy_bridge(&self, bridge_id: &BridgeId) -> AriResult<()> {
        let request = self.request(Method::DELETE, &format!("/bridges/{}", bridge_id));
        self.send_empty(request, &format!("bridge {}", bridge_id)).await
    }

    async fn list_bridges(&self) -> AriResult<Vec<Bridge>> {
        let request = self.request(Method::GET, "/bridges");
        self.send_json(request, "bridges").await
    }

    async fn create_channel(&self, params: &OriginateParams) -> AriResult<Channel> {
        let request = self
            .request(Method::POST, "/channels")
            .query(&params.to_query());
        let channel: Channel = self.send_json(request, "channels").await?;
        debug!("Originated channel {} towards {}", channel.id, params.endpoint);
        Ok(channel)
    }

    async fn get_channel(&self, channel_id: &ChannelId) -> AriResult<Channel> {
        let request = self.request(Method::GET, &format!("/channels/{}", channel_id));
        self.send_json(request, &format!("channel {}", channel_id)).await
    }

    async fn hangup_channel(&self, channel_id: &ChannelId) -> AriResult<()> {
        let request = self.request(Method::DELETE, &format!("/channels/{}", channel_id));
        self.send_empty(request, &format!("channel {}", channel_id)).await
    }

    async fn add_channel_to_bridge(
        &self,
        bridge_id: &BridgeId,
        channel_id: &ChannelId,
        role: ChannelRole,
    ) -> AriResult<()> {
        let request = self
            .request(Method::POST, &format!("/bridges/{}/addChannel", bridge_id))
            .query(&[("channel", channel_id.as_str()), ("role", role.as_str())]);
        self.send_empty(request, &format!("bridge {}", bridge_id)).await
    }

    async fn subscribe_events(&self) -> AriResult<LifecycleEvents> {
        let url = self.config.events_url()?;
        let (ws_stream, _) = connect_async(url.as_str()).await?;
        let (mut write, mut read) = ws_stream.split();
        let (tx, rx) = mpsc::unbounded_channel();

        info!("Subscribed to ARI events for application {}", self.config.app_name);

        tokio::spawn(async move {
            while let Some(message) = read.next().await {
                let text = match message {
                    Ok(Message::Text(text)) => text,
                    Ok(Message::Ping(payload)) => {
                        if let Err(e) = write.send(Message::Pong(payload)).await {
                            warn!("Failed to answer event stream ping: {}", e);
                        }
                        continue;
                    }
                    Ok(Message::Close(frame)) => {
                        info!("Event stream closed by server: {:?}", frame);
                        break;
                    }
                    Ok(_) => continue,
                    Err(e) => {
                        warn!("Event stream failed: {}", e);
                        break;
                    }
                };

                match LifecycleEvent::from_json(text.as_str()) {
                    Ok(event) => {
                        if tx.send(event).is_err() {
                            debug!("Event consumer dropped, closing event stream");
                            break;
                        }
                    }
                    Err(e) => warn!("Skipping undecodable event frame: {}", e),
                }
            }
        });

        Ok(rx)
    }
}
