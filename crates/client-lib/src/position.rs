// ============================
// crates/client-lib/src/position.rs
// ============================
//! Device position access behind a trait so platforms and tests can plug in
//! their own source.

use crate::geo::LatLng;
use async_trait::async_trait;
use thiserror::Error;

/// Where the map centers when the device position cannot be read
pub const DEFAULT_POSITION: LatLng = LatLng {
    lat: 40.730610,
    lng: -73.935242,
};

#[derive(Error, Debug)]
pub enum PositionError {
    #[error("position unavailable: {0}")]
    Unavailable(String),
    #[error("positioning not supported on this device")]
    Unsupported,
}

#[async_trait]
pub trait PositionSource: Send + Sync {
    /// Read the device's current position
    async fn current(&self) -> Result<LatLng, PositionError>;
}

/// A source pinned to one coordinate; doubles as the simplest test source
pub struct FixedPosition(pub LatLng);

#[async_trait]
impl PositionSource for FixedPosition {
    async fn current(&self) -> Result<LatLng, PositionError> {
        Ok(self.0)
    }
}

/// A source that always fails, for exercising the default-position path
pub struct UnavailablePosition;

#[async_trait]
impl PositionSource for UnavailablePosition {
    async fn current(&self) -> Result<LatLng, PositionError> {
        Err(PositionError::Unsupported)
    }
}
