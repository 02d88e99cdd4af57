// ============================
// crates/client-lib/src/error.rs
// ============================
//! Client-side error taxonomy.
use crate::position::PositionError;
use crate::rest::ApiError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("api error: {0}")]
    Api(#[from] ApiError),

    #[error("gateway error: {0}")]
    Gateway(String),

    #[error(transparent)]
    Position(#[from] PositionError),

    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),
}
