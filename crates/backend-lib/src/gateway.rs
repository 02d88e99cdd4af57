// ============================
// crates/backend-lib/src/gateway.rs
// ============================
//! Connection gateway: turns each authenticated real-time connection into a
//! room-scoped participant and routes its events.
//!
//! Each connection owns a [`ConnCtx`] (identity + current room) that is
//! passed explicitly into every handler; no state hangs off the socket
//! itself. Handlers for a single connection run sequentially in arrival
//! order; connections run concurrently with each other.

use crate::error::AppError;
use crate::rooms::ConnId;
use crate::store::Store;
use crate::AppState;
use chrono::Utc;
use convoy_common::{ClientEvent, GeoPoint, LocationRecord, ServerEvent, UserIdentity};
use metrics::counter;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Connection-scoped context: who this connection is and which room it is
/// currently in. A connection belongs to at most one room; joining another
/// room replaces the association.
pub struct ConnCtx {
    pub conn_id: ConnId,
    pub user: UserIdentity,
    pub current_journey: Option<String>,
    pub tx: mpsc::Sender<ServerEvent>,
}

impl ConnCtx {
    pub fn new(user: UserIdentity, tx: mpsc::Sender<ServerEvent>) -> Self {
        Self {
            conn_id: Uuid::new_v4(),
            user,
            current_journey: None,
            tx,
        }
    }
}

/// Event handlers shared by all connections
pub struct Gateway<S> {
    state: Arc<AppState<S>>,
}

impl<S: Store + Clone + Send + Sync + 'static> Gateway<S> {
    pub fn new(state: Arc<AppState<S>>) -> Self {
        Self { state }
    }

    /// Route one inbound event. Failures are terminal for the offending
    /// action only: the connection gets an `error` event and stays joined.
    pub async fn handle_event(&self, ctx: &mut ConnCtx, event: ClientEvent) {
        let result = match event {
            ClientEvent::JoinJourney { code } => self.join_journey(ctx, &code).await,
            ClientEvent::LocationUpdate {
                journey_code,
                latitude,
                longitude,
            } => {
                self.location_update(ctx, &journey_code, latitude, longitude)
                    .await
            }
            ClientEvent::JourneyMessage {
                journey_code,
                message_type,
                data,
            } => {
                self.journey_message(ctx, &journey_code, message_type, data)
                    .await
            }
        };

        if let Err(err) = result {
            tracing::debug!(user = %ctx.user.username, error = %err, "event rejected");
            let _ = ctx
                .tx
                .send(ServerEvent::Error {
                    message: err.client_message(),
                })
                .await;
        }
    }

    async fn join_journey(&self, ctx: &mut ConnCtx, code: &str) -> Result<(), AppError> {
        let journey = self.state.registry.find_by_code(code).await?;

        // Singular room membership: a second join supersedes the first.
        if let Some(prev) = ctx.current_journey.take() {
            if prev != journey.code {
                self.state.rooms.leave(&prev, ctx.conn_id);
            }
        }

        self.state
            .rooms
            .join(&journey.code, ctx.conn_id, ctx.tx.clone());
        ctx.current_journey = Some(journey.code.clone());

        tracing::info!(user = %ctx.user.username, code = %journey.code, "joined journey room");

        let participants = journey.participants();
        ctx.tx
            .send(ServerEvent::JourneyJoined {
                journey: journey.clone(),
                participants,
            })
            .await?;

        self.state
            .rooms
            .broadcast_except(
                &journey.code,
                ctx.conn_id,
                ServerEvent::UserJoined {
                    user: ctx.user.clone(),
                    message: format!("{} joined the journey", ctx.user.username),
                },
            )
            .await;

        Ok(())
    }

    async fn location_update(
        &self,
        ctx: &ConnCtx,
        journey_code: &str,
        latitude: f64,
        longitude: f64,
    ) -> Result<(), AppError> {
        if ctx.current_journey.as_deref() != Some(journey_code) {
            return Err(AppError::Forbidden("Not in this journey".to_string()));
        }

        let journey = self.state.registry.find_by_code(journey_code).await?;

        let record = LocationRecord {
            journey_id: journey.id,
            user_id: ctx.user.id,
            location: GeoPoint::new(longitude, latitude),
            recorded_at: Utc::now(),
        };

        // Live coordination outranks the audit trail: a failed write is
        // logged and the broadcast still goes out.
        if let Err(err) = self.state.store.append_location(&journey.code, &record).await {
            counter!(crate::metric_keys::LOCATION_PERSIST_FAILED).increment(1);
            tracing::warn!(code = %journey.code, error = %err, "failed to persist location sample");
        }

        // The whole room, sender included, so clients can treat the update
        // stream as the single source of truth.
        self.state
            .rooms
            .broadcast(
                &journey.code,
                ServerEvent::LocationUpdate {
                    user_id: ctx.user.id,
                    username: ctx.user.username.clone(),
                    role: ctx.user.role,
                    latitude,
                    longitude,
                    timestamp: record.recorded_at,
                },
            )
            .await;

        counter!(crate::metric_keys::LOCATION_ACCEPTED).increment(1);
        Ok(())
    }

    async fn journey_message(
        &self,
        ctx: &ConnCtx,
        journey_code: &str,
        message_type: String,
        data: serde_json::Value,
    ) -> Result<(), AppError> {
        if ctx.current_journey.as_deref() != Some(journey_code) {
            return Err(AppError::Forbidden(
                "Not authorized for this journey".to_string(),
            ));
        }

        tracing::debug!(user = %ctx.user.username, code = journey_code, message_type, "journey message");

        self.state
            .rooms
            .broadcast(
                journey_code,
                ServerEvent::JourneyMessage { message_type, data },
            )
            .await;

        Ok(())
    }

    /// Tear down a connection's presence. Durable membership is untouched.
    pub async fn handle_disconnect(&self, ctx: &ConnCtx) {
        if let Some(code) = &ctx.current_journey {
            self.state.rooms.leave(code, ctx.conn_id);
            self.state
                .rooms
                .broadcast(
                    code,
                    ServerEvent::UserLeft {
                        user: ctx.user.clone(),
                        message: format!("{} left the journey", ctx.user.username),
                    },
                )
                .await;
            tracing::info!(user = %ctx.user.username, code, "left journey room");
        }
    }
}
