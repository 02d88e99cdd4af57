// ============================
// crates/client-lib/src/gateway.rs
// ============================
//! Client side of the real-time channel.
//!
//! The gateway handle is an explicitly owned, injectable value passed to
//! whatever component needs it; there is no shared module-level connection
//! object, and tests substitute their own double.

use crate::error::ClientError;
use async_trait::async_trait;
use convoy_common::{ClientEvent, ServerEvent};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};

#[async_trait]
pub trait GatewayHandle: Send + Sync {
    /// Join a journey room; replaces any prior room association
    async fn join_journey(&self, code: &str) -> Result<(), ClientError>;

    /// Submit one position sample for the current journey
    async fn send_location(
        &self,
        code: &str,
        latitude: f64,
        longitude: f64,
    ) -> Result<(), ClientError>;

    /// Broadcast a named message to the current journey room
    async fn send_message(
        &self,
        code: &str,
        message_type: &str,
        data: serde_json::Value,
    ) -> Result<(), ClientError>;
}

/// WebSocket-backed gateway. Outbound events funnel through a channel so
/// the socket is written from exactly one task; inbound events arrive on
/// the receiver returned by [`connect`](SocketGateway::connect).
pub struct SocketGateway {
    out_tx: mpsc::UnboundedSender<ClientEvent>,
    read_task: JoinHandle<()>,
    write_task: JoinHandle<()>,
}

impl SocketGateway {
    /// Connect and authenticate. The bearer credential travels in the
    /// handshake; a rejected handshake surfaces here, before any room
    /// operation is possible.
    pub async fn connect(
        url: &str,
        token: &str,
    ) -> Result<(Self, mpsc::Receiver<ServerEvent>), ClientError> {
        let request = format!("{url}?token={token}");
        let (socket, _response) = connect_async(request.as_str())
            .await
            .map_err(|err| ClientError::Gateway(err.to_string()))?;

        let (mut sink, mut stream) = socket.split();

        let (event_tx, event_rx) = mpsc::channel::<ServerEvent>(32);
        let read_task = tokio::spawn(async move {
            while let Some(Ok(message)) = stream.next().await {
                if let Message::Text(text) = message {
                    match serde_json::from_str::<ServerEvent>(text.as_str()) {
                        Ok(event) => {
                            if event_tx.send(event).await.is_err() {
                                break;
                            }
                        }
                        Err(err) => {
                            tracing::warn!(error = %err, "unparseable server event");
                        }
                    }
                }
            }
        });

        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ClientEvent>();
        let write_task = tokio::spawn(async move {
            while let Some(event) = out_rx.recv().await {
                let json = match serde_json::to_string(&event) {
                    Ok(json) => json,
                    Err(err) => {
                        tracing::error!(error = %err, "failed to serialize client event");
                        continue;
                    }
                };
                if sink.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
        });

        Ok((
            Self {
                out_tx,
                read_task,
                write_task,
            },
            event_rx,
        ))
    }

    fn send(&self, event: ClientEvent) -> Result<(), ClientError> {
        self.out_tx
            .send(event)
            .map_err(|_| ClientError::Gateway("connection closed".to_string()))
    }

    /// Tear the connection down; both pump tasks stop immediately.
    pub fn close(&self) {
        self.read_task.abort();
        self.write_task.abort();
    }
}

impl Drop for SocketGateway {
    fn drop(&mut self) {
        self.close();
    }
}

#[async_trait]
impl GatewayHandle for SocketGateway {
    async fn join_journey(&self, code: &str) -> Result<(), ClientError> {
        self.send(ClientEvent::JoinJourney {
            code: code.to_string(),
        })
    }

    async fn send_location(
        &self,
        code: &str,
        latitude: f64,
        longitude: f64,
    ) -> Result<(), ClientError> {
        self.send(ClientEvent::LocationUpdate {
            journey_code: code.to_string(),
            latitude,
            longitude,
        })
    }

    async fn send_message(
        &self,
        code: &str,
        message_type: &str,
        data: serde_json::Value,
    ) -> Result<(), ClientError> {
        self.send(ClientEvent::JourneyMessage {
            journey_code: code.to_string(),
            message_type: message_type.to_string(),
            data,
        })
    }
}
