// ============================
// crates/client-lib/src/lib.rs
// ============================
//! Client-side coordination for convoy journeys: the reconciler that folds
//! the inbound event stream into a consistent view, the route-resolution
//! fallback chain, the periodic location push loop, and the session
//! controller that ties them together for a presentation layer to drive.

pub mod controller;
pub mod error;
pub mod gateway;
pub mod geo;
pub mod position;
pub mod push_loop;
pub mod reconciler;
pub mod rest;
pub mod routing;

pub use controller::{Notice, Phase, SessionController};
pub use error::ClientError;
pub use gateway::{GatewayHandle, SocketGateway};
pub use geo::{LatLng, TransportMode, TravelEstimate};
pub use position::{PositionSource, DEFAULT_POSITION};
pub use push_loop::{PushLoopHandle, PUSH_INTERVAL};
pub use reconciler::{Applied, ParticipantTrack, Reconciler};
pub use rest::{ApiError, JourneyApi};
pub use routing::{
    OpenRouteStrategy, Route, RouteError, RouteResolver, RouteSlot, RouteSource, RouteStrategy,
    StraightLineStrategy, ROUTE_TIMEOUT,
};
