// ==============
// crates/backend-lib/src/metric_keys.rs

//! Central place for Prometheus metric keys
pub const WS_CONNECTION: &str = "ws.connection";
pub const WS_DISCONNECTION: &str = "ws.disconnection";
pub const WS_ACTIVE: &str = "ws.active";
pub const JOURNEY_CREATED: &str = "journey.created";
pub const JOURNEY_JOINED: &str = "journey.joined";
pub const LOCATION_ACCEPTED: &str = "location.accepted";
pub const LOCATION_PERSIST_FAILED: &str = "location.persist_failed";
pub const ROOM_BROADCAST: &str = "room.broadcast";
pub const ROOM_SEND_FAILED: &str = "room.send_failed";
pub const TOKEN_ISSUED: &str = "token.issued";
pub const TOKEN_ACTIVE: &str = "token.active";
