//! C12: subscriber fan-out hub.
//!
//! Maintains the set of authenticated websocket subscribers and the
//! interactive subscription protocol described in §6: `auth` →
//! `auth_success`/`auth_error`, `subscribe`/`unsubscribe`, `ping` → `pong`,
//! plus server-pushed `telemetry`/`detection`/`alert`/`mission_update`/
//! `system_status` events.
//!
//! Internally a single [`broadcast`] channel carries every event; each
//! websocket task filters by the channel set the client subscribed to and
//! is dropped after too much backpressure or a missed heartbeat.

use std::collections::HashSet;

use axum::extract::ws::{Message, WebSocket};
use drone_domain::{Alert, Detection, Mission, TelemetrySample};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::config::FanoutConfig;

const EVENT_CHANNEL_CAPACITY: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Telemetry,
    Detections,
    Alerts,
    Missions,
    System,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    AuthSuccess,
    AuthError { message: String },
    Subscribed { channels: Vec<Channel> },
    Unsubscribed { channels: Vec<Channel> },
    Pong,
    Telemetry {
        timestamp: chrono::DateTime<chrono::Utc>,
        data: TelemetrySample,
    },
    Detection {
        timestamp: chrono::DateTime<chrono::Utc>,
        data: Detection,
    },
    Alert {
        timestamp: chrono::DateTime<chrono::Utc>,
        data: Alert,
    },
    MissionUpdate {
        timestamp: chrono::DateTime<chrono::Utc>,
        data: Mission,
    },
    SystemStatus {
        timestamp: chrono::DateTime<chrono::Utc>,
        data: serde_json::Value,
    },
}

impl ServerFrame {
    fn channel(&self) -> Option<Channel> {
        match self {
            Self::Telemetry { .. } => Some(Channel::Telemetry),
            Self::Detection { .. } => Some(Channel::Detections),
            Self::Alert { .. } => Some(Channel::Alerts),
            Self::MissionUpdate { .. } => Some(Channel::Missions),
            Self::SystemStatus { .. } => Some(Channel::System),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientFrame {
    Auth { token: String },
    Subscribe { channels: Vec<Channel> },
    Unsubscribe { channels: Vec<Channel> },
    Ping,
}

/// Fans server events out to websocket subscribers. Cheap to clone (wraps
/// an `Arc`-free broadcast sender internally).
#[derive(Clone)]
pub struct FanoutHub {
    events: broadcast::Sender<ServerFrame>,
    config: FanoutConfig,
}

impl FanoutHub {
    #[must_use]
    pub fn new(config: FanoutConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { events, config }
    }

    pub fn publish_telemetry(&self, sample: &TelemetrySample) {
        let _ = self.events.send(ServerFrame::Telemetry {
            timestamp: chrono::Utc::now(),
            data: *sample,
        });
    }

    pub fn publish_detection(&self, detection: &Detection) {
        let _ = self.events.send(ServerFrame::Detection {
            timestamp: chrono::Utc::now(),
            data: detection.clone(),
        });
    }

    pub fn publish_alert(&self, alert: &Alert) {
        let _ = self.events.send(ServerFrame::Alert {
            timestamp: chrono::Utc::now(),
            data: alert.clone(),
        });
    }

    pub fn publish_mission_update(&self, mission: &Mission) {
        let _ = self.events.send(ServerFrame::MissionUpdate {
            timestamp: chrono::Utc::now(),
            data: mission.clone(),
        });
    }

    pub fn publish_system_status(&self, status: serde_json::Value) {
        let _ = self.events.send(ServerFrame::SystemStatus {
            timestamp: chrono::Utc::now(),
            data: status,
        });
    }

    /// Drive one subscriber's websocket connection to completion.
    pub async fn handle_socket(&self, socket: WebSocket) {
        let (mut sender, mut receiver) = futures_util::stream::StreamExt::split(socket);
        let mut events = self.events.subscribe();
        let mut channels: HashSet<Channel> = HashSet::new();
        let mut authenticated = false;
        let mut lag_count: u32 = 0;

        let heartbeat_window = self.config.heartbeat_window;
        let mut heartbeat = Box::pin(tokio::time::sleep(heartbeat_window));

        loop {
            tokio::select! {
                biased;

                _ = &mut heartbeat => {
                    tracing::debug!("subscriber missed heartbeat window, closing");
                    break;
                }

                incoming = futures_util::stream::StreamExt::next(&mut receiver) => {
                    let Some(Ok(msg)) = incoming else { break };
                    let Message::Text(text) = msg else { continue };
                    let Ok(frame) = serde_json::from_str::<ClientFrame>(&text) else {
                        tracing::warn!("dropping malformed subscriber frame");
                        continue;
                    };
                    match frame {
                        ClientFrame::Auth { token } => {
                            authenticated = !token.is_empty();
                            let reply = if authenticated {
                                ServerFrame::AuthSuccess
                            } else {
                                ServerFrame::AuthError { message: "empty token".to_string() }
                            };
                            if send_frame(&mut sender, &reply).await.is_err() { break; }
                        }
                        ClientFrame::Subscribe { channels: requested } => {
                            channels.extend(requested.iter().copied());
                            let reply = ServerFrame::Subscribed { channels: requested };
                            if send_frame(&mut sender, &reply).await.is_err() { break; }
                        }
                        ClientFrame::Unsubscribe { channels: requested } => {
                            for ch in &requested {
                                channels.remove(ch);
                            }
                            let reply = ServerFrame::Unsubscribed { channels: requested };
                            if send_frame(&mut sender, &reply).await.is_err() { break; }
                        }
                        ClientFrame::Ping => {
                            heartbeat.as_mut().reset(tokio::time::Instant::now() + heartbeat_window);
                            if send_frame(&mut sender, &ServerFrame::Pong).await.is_err() { break; }
                        }
                    }
                }

                event = events.recv() => {
                    match event {
                        Ok(frame) => {
                            lag_count = 0;
                            if !authenticated { continue; }
                            let wanted = match frame.channel() {
                                Some(ch) => channels.contains(&ch),
                                None => true,
                            };
                            if wanted && send_frame(&mut sender, &frame).await.is_err() {
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(_)) => {
                            lag_count += 1;
                            if lag_count >= self.config.backpressure_limit {
                                tracing::debug!("subscriber exceeded backpressure limit, closing");
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        }
    }
}

async fn send_frame(
    sender: &mut futures_util::stream::SplitSink<WebSocket, Message>,
    frame: &ServerFrame,
) -> Result<(), axum::Error> {
    let text = serde_json::to_string(frame).unwrap_or_else(|_| "{}".to_string());
    futures_util::sink::SinkExt::send(sender, Message::Text(text.into())).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_frame_maps_to_its_own_channel() {
        let frame = ServerFrame::Telemetry {
            timestamp: chrono::Utc::now(),
            data: TelemetrySample {
                uav_id: uuid::Uuid::new_v4(),
                position: drone_domain::Coordinates::default(),
                battery_pct: 80.0,
                speed_mps: 5.0,
                heading_deg: 0.0,
                status: drone_domain::UavStatus::InMission,
                recorded_at: chrono::Utc::now(),
            },
        };
        assert_eq!(frame.channel(), Some(Channel::Telemetry));
    }

    #[test]
    fn client_frame_subscribe_parses_from_wire_shape() {
        let json = serde_json::json!({"type": "subscribe", "channels": ["telemetry", "alerts"]});
        let frame: ClientFrame = serde_json::from_value(json).unwrap();
        matches!(frame, ClientFrame::Subscribe { .. });
    }
}
