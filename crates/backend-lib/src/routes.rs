// ============================
// crates/backend-lib/src/routes.rs
// ============================
//! REST surface for journey sessions.
use crate::error::AppError;
use crate::store::Store;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    Json,
};
use convoy_common::{GeoPoint, JourneySession, UserIdentity};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreateJourneyRequest {
    pub destination: GeoPoint,
}

#[derive(Debug, Deserialize)]
pub struct UpdateDestinationRequest {
    pub destination: GeoPoint,
}

/// Resolve the bearer credential on a REST request to an identity.
pub async fn bearer_identity<S: Store + Clone + Send + Sync + 'static>(
    state: &AppState<S>,
    headers: &HeaderMap,
) -> Result<UserIdentity, AppError> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Auth("missing bearer token".to_string()))?;

    state
        .auth
        .verify(token)
        .await
        .ok_or_else(|| AppError::Auth("invalid or expired token".to_string()))
}

/// `POST /journeys` - start a journey as its leader
pub async fn create_journey<S: Store + Clone + Send + Sync + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(body): Json<CreateJourneyRequest>,
) -> Result<(StatusCode, Json<JourneySession>), AppError> {
    let user = bearer_identity(&state, &headers).await?;
    let journey = state.registry.create(user, body.destination).await?;
    Ok((StatusCode::CREATED, Json(journey)))
}

/// `GET /journeys/{code}` - join by code (idempotent membership add)
pub async fn join_journey<S: Store + Clone + Send + Sync + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(code): Path<String>,
) -> Result<Json<JourneySession>, AppError> {
    let user = bearer_identity(&state, &headers).await?;
    let journey = state.registry.join_by_code(&code, user).await?;
    Ok(Json(journey))
}

/// `PUT /journeys/{journeyId}/destination` - leader-only destination change.
/// The change is persisted here; propagation to the room happens over the
/// messaging channel, driven by the caller.
pub async fn update_destination<S: Store + Clone + Send + Sync + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(journey_id): Path<Uuid>,
    Json(body): Json<UpdateDestinationRequest>,
) -> Result<Json<JourneySession>, AppError> {
    let user = bearer_identity(&state, &headers).await?;
    let journey = state
        .registry
        .update_destination(journey_id, &user, body.destination)
        .await?;
    Ok(Json(journey))
}
