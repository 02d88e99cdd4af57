// ============================
// crates/backend-lib/src/ws_router.rs
// ============================
//! Axum router and WebSocket connection handling.
use crate::error::AppError;
use crate::gateway::{ConnCtx, Gateway};
use crate::routes;
use crate::store::Store;
use crate::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::{header::AUTHORIZATION, HeaderMap},
    response::Response,
    routing::{get, post, put},
    Router,
};
use convoy_common::{ClientEvent, ServerEvent, UserIdentity};
use futures_util::{SinkExt, StreamExt};
use metrics::{counter, gauge};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Create the application router: REST surface plus the real-time channel
pub fn create_router<S: Store + Clone + Send + Sync + 'static>(
    state: Arc<AppState<S>>,
) -> Router {
    Router::new()
        .route("/journeys", post(routes::create_journey::<S>))
        .route("/journeys/{code}", get(routes::join_journey::<S>))
        .route(
            "/journeys/{journey_id}/destination",
            put(routes::update_destination::<S>),
        )
        .route("/ws", get(ws_handler::<S>))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    token: Option<String>,
}

/// Handler for WebSocket connections. The bearer credential is verified
/// before the upgrade; a bad or missing credential closes the handshake
/// with 401 and no room operation is ever possible.
pub async fn ws_handler<S: Store + Clone + Send + Sync + 'static>(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    headers: HeaderMap,
    State(state): State<Arc<AppState<S>>>,
) -> Result<Response, AppError> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string)
        .or(query.token)
        .ok_or_else(|| AppError::Auth("no token provided".to_string()))?;

    let user = state
        .auth
        .verify(&token)
        .await
        .ok_or_else(|| AppError::Auth("invalid or expired token".to_string()))?;

    Ok(ws.on_upgrade(move |socket| handle_connection(socket, state, user)))
}

async fn handle_connection<S: Store + Clone + Send + Sync + 'static>(
    socket: WebSocket,
    state: Arc<AppState<S>>,
    user: UserIdentity,
) {
    counter!(crate::metric_keys::WS_CONNECTION).increment(1);
    gauge!(crate::metric_keys::WS_ACTIVE).increment(1.0);
    tracing::info!(user = %user.username, "connected");

    let (mut sink, mut stream) = socket.split();

    // Outbound channel: room broadcasts and replies funnel through here so
    // the socket is written from exactly one task.
    let (tx, mut rx) = mpsc::channel::<ServerEvent>(32);

    let send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(err) => {
                    tracing::error!(error = %err, "failed to serialize server event");
                    continue;
                }
            };
            if sink.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let gateway = Gateway::new(state);
    let mut ctx = ConnCtx::new(user, tx.clone());

    // Events for this connection are handled one at a time, in arrival order.
    while let Some(Ok(message)) = stream.next().await {
        match message {
            Message::Text(text) => match serde_json::from_str::<ClientEvent>(&text) {
                Ok(event) => gateway.handle_event(&mut ctx, event).await,
                Err(err) => {
                    let _ = tx
                        .send(ServerEvent::Error {
                            message: format!("malformed event: {err}"),
                        })
                        .await;
                }
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    gateway.handle_disconnect(&ctx).await;
    tracing::info!(user = %ctx.user.username, "disconnected");

    counter!(crate::metric_keys::WS_DISCONNECTION).increment(1);
    gauge!(crate::metric_keys::WS_ACTIVE).decrement(1.0);

    send_task.abort();
}
