// ================
// crates/common/src/lib.rs
// ================
//! Common types and structures
//! used for communication between the convoy client and server.
//! This module defines the real-time channel events and the shared
//! journey data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Message type used on the room channel to announce a destination change.
pub const DESTINATION_UPDATED: &str = "destination_updated";

/// A GeoJSON-style point: `{ "type": "Point", "coordinates": [lng, lat] }`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    #[serde(rename = "type")]
    pub kind: PointKind,
    /// `[longitude, latitude]`, GeoJSON axis order
    pub coordinates: [f64; 2],
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointKind {
    Point,
}

impl GeoPoint {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        GeoPoint {
            kind: PointKind::Point,
            coordinates: [longitude, latitude],
        }
    }

    pub fn longitude(&self) -> f64 {
        self.coordinates[0]
    }

    pub fn latitude(&self) -> f64 {
        self.coordinates[1]
    }
}

/// Role of a participant within a journey
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    #[serde(rename = "Group Leader")]
    GroupLeader,
    Member,
}

/// Authenticated participant identity as carried on the wire
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
}

/// Lifecycle state of a journey session
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum JourneyStatus {
    #[default]
    Active,
    Completed,
}

/// Durable record of a coordinated trip
/// # Fields
/// * `code` - short shareable identifier, generated at creation, immutable
/// * `leader` - the creating participant; sole owner of destination mutation
/// * `members` - joined participants; grows monotonically, never shrunk by
///   disconnects (presence is a separate, ephemeral concept)
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JourneySession {
    pub id: Uuid,
    pub code: String,
    pub leader: UserIdentity,
    pub members: Vec<UserIdentity>,
    pub destination: Option<GeoPoint>,
    pub status: JourneyStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JourneySession {
    /// Ordered participant list: leader first, then members.
    pub fn participants(&self) -> Vec<UserIdentity> {
        let mut out = Vec::with_capacity(self.members.len() + 1);
        out.push(self.leader.clone());
        out.extend(self.members.iter().cloned());
        out
    }
}

/// One persisted position sample, append-only
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LocationRecord {
    pub journey_id: Uuid,
    pub user_id: Uuid,
    pub location: GeoPoint,
    pub recorded_at: DateTime<Utc>,
}

/// Events sent from client to server over the real-time channel
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Join the room for a journey; replaces any prior room association
    JoinJourney { code: String },
    /// A position sample; rejected unless `journey_code` matches the
    /// connection's current room
    #[serde(rename_all = "camelCase")]
    LocationUpdate {
        journey_code: String,
        latitude: f64,
        longitude: f64,
    },
    /// Generic named broadcast to the room (e.g. destination changes)
    #[serde(rename_all = "camelCase")]
    JourneyMessage {
        journey_code: String,
        message_type: String,
        data: serde_json::Value,
    },
}

/// Events sent from server to client
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// Reply to a successful room join: the session plus the ordered
    /// participant list (leader first, then members)
    JourneyJoined {
        journey: JourneySession,
        participants: Vec<UserIdentity>,
    },
    /// To other room occupants when a participant arrives
    UserJoined { user: UserIdentity, message: String },
    /// To remaining room occupants when a participant disconnects
    UserLeft { user: UserIdentity, message: String },
    /// A position broadcast; delivered to the whole room including the sender
    #[serde(rename_all = "camelCase")]
    LocationUpdate {
        user_id: Uuid,
        username: String,
        role: Role,
        latitude: f64,
        longitude: f64,
        timestamp: DateTime<Utc>,
    },
    /// Room-scoped named message fan-out; consumers dispatch on `message_type`
    #[serde(rename_all = "camelCase")]
    JourneyMessage {
        message_type: String,
        data: serde_json::Value,
    },
    /// Terminal for the offending action, never for the connection's room
    Error { message: String },
}

/// Payload carried by a `destination_updated` journey message
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DestinationUpdated {
    pub destination: GeoPoint,
    pub updated_by: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(name: &str, role: Role) -> UserIdentity {
        UserIdentity {
            id: Uuid::new_v4(),
            username: name.to_string(),
            role,
        }
    }

    #[test]
    fn test_client_event_wire_format() {
        let event = ClientEvent::LocationUpdate {
            journey_code: "ABC123".to_string(),
            latitude: 19.10,
            longitude: 72.90,
        };

        let json = serde_json::to_string(&event).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["event"], "location-update");
        assert_eq!(parsed["journeyCode"], "ABC123");
        assert_eq!(parsed["latitude"], 19.10);
        assert_eq!(parsed["longitude"], 72.90);

        let back: ClientEvent = serde_json::from_str(&json).unwrap();
        match back {
            ClientEvent::LocationUpdate { journey_code, .. } => {
                assert_eq!(journey_code, "ABC123");
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn test_server_event_wire_format() {
        let event = ServerEvent::LocationUpdate {
            user_id: Uuid::new_v4(),
            username: "asha".to_string(),
            role: Role::GroupLeader,
            latitude: 19.0760,
            longitude: 72.8777,
            timestamp: Utc::now(),
        };

        let parsed: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&event).unwrap()).unwrap();
        assert_eq!(parsed["event"], "location-update");
        assert_eq!(parsed["username"], "asha");
        assert_eq!(parsed["role"], "Group Leader");
        assert!(parsed["userId"].is_string());
        assert!(parsed["timestamp"].is_string());
    }

    #[test]
    fn test_destination_serializes_as_geojson() {
        let point = GeoPoint::new(72.8777, 19.0760);
        let parsed: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&point).unwrap()).unwrap();
        assert_eq!(parsed["type"], "Point");
        assert_eq!(parsed["coordinates"][0], 72.8777);
        assert_eq!(parsed["coordinates"][1], 19.0760);
    }

    #[test]
    fn test_participants_leader_first() {
        let leader = identity("lead", Role::GroupLeader);
        let m1 = identity("m1", Role::Member);
        let m2 = identity("m2", Role::Member);
        let session = JourneySession {
            id: Uuid::new_v4(),
            code: "XY42QP".to_string(),
            leader: leader.clone(),
            members: vec![m1.clone(), m2.clone()],
            destination: Some(GeoPoint::new(72.8777, 19.0760)),
            status: JourneyStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let participants = session.participants();
        assert_eq!(participants.len(), 3);
        assert_eq!(participants[0], leader);
        assert_eq!(participants[1], m1);
        assert_eq!(participants[2], m2);
    }
}
