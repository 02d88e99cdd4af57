// ============================
// crates/client-lib/src/rest.rs
// ============================
//! REST client for the journey-session endpoints.

use convoy_common::{GeoPoint, JourneySession};
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(String),
    #[error("not authenticated")]
    Unauthorized,
    #[error("journey not found")]
    NotFound,
    #[error("only group leaders can update destination")]
    Forbidden,
    #[error("server rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("malformed response body: {0}")]
    Malformed(String),
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

pub struct JourneyApi {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl JourneyApi {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            token: token.into(),
        }
    }

    /// `POST /journeys` - start a journey with this client as leader
    pub async fn create_journey(&self, destination: GeoPoint) -> Result<JourneySession, ApiError> {
        let response = self
            .client
            .post(format!("{}/journeys", self.base_url))
            .bearer_auth(&self.token)
            .json(&serde_json::json!({ "destination": destination }))
            .send()
            .await
            .map_err(|err| ApiError::Network(err.to_string()))?;
        Self::parse(response).await
    }

    /// `GET /journeys/{code}` - join by code (idempotent membership add)
    pub async fn join_journey(&self, code: &str) -> Result<JourneySession, ApiError> {
        let response = self
            .client
            .get(format!("{}/journeys/{code}", self.base_url))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|err| ApiError::Network(err.to_string()))?;
        Self::parse(response).await
    }

    /// `PUT /journeys/{journeyId}/destination` - leader-only.
    /// Propagation to the room is the caller's responsibility, over the
    /// messaging channel.
    pub async fn update_destination(
        &self,
        journey_id: Uuid,
        destination: GeoPoint,
    ) -> Result<JourneySession, ApiError> {
        let response = self
            .client
            .put(format!(
                "{}/journeys/{journey_id}/destination",
                self.base_url
            ))
            .bearer_auth(&self.token)
            .json(&serde_json::json!({ "destination": destination }))
            .send()
            .await
            .map_err(|err| ApiError::Network(err.to_string()))?;
        Self::parse(response).await
    }

    async fn parse(response: reqwest::Response) -> Result<JourneySession, ApiError> {
        let status = response.status();
        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|err| ApiError::Malformed(err.to_string()));
        }

        match status.as_u16() {
            401 => Err(ApiError::Unauthorized),
            403 => Err(ApiError::Forbidden),
            404 => Err(ApiError::NotFound),
            code => {
                let message = response
                    .json::<ErrorBody>()
                    .await
                    .map(|body| body.message)
                    .unwrap_or_else(|_| status.to_string());
                Err(ApiError::Rejected {
                    status: code,
                    message,
                })
            }
        }
    }
}
