// ============================
// crates/client-lib/src/reconciler.rs
// ============================
//! Turns the inbound event stream into a consistent local view: the
//! participant list, each participant's last known position, and the
//! current destination.
//!
//! Tracks are last-writer-wins per participant and never expire; the view
//! always shows "last known", however old. A `user-left` event only stops
//! future updates, it does not erase what was last seen.

use crate::geo::{estimate_travel, haversine_km, LatLng, TransportMode, TravelEstimate};
use chrono::{DateTime, Utc};
use convoy_common::{
    DestinationUpdated, JourneySession, Role, ServerEvent, UserIdentity, DESTINATION_UPDATED,
};
use std::collections::HashMap;
use uuid::Uuid;

/// Last known position of one participant
#[derive(Debug, Clone, PartialEq)]
pub struct ParticipantTrack {
    pub username: String,
    pub role: Role,
    pub position: LatLng,
    pub updated_at: DateTime<Utc>,
}

/// What applying one event changed, so the caller can react
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    /// Session snapshot and participant list replaced
    Joined,
    /// One participant's track moved
    Track(Uuid),
    /// Destination replaced via the messaging channel
    DestinationChanged {
        destination: LatLng,
        updated_by: String,
    },
    /// Human-readable presence note for the UI
    Info(String),
    /// The server rejected an action of ours
    ServerError(String),
    /// Nothing the caller needs to react to
    Nothing,
}

pub struct Reconciler {
    mode: TransportMode,
    journey: Option<JourneySession>,
    participants: Vec<UserIdentity>,
    tracks: HashMap<Uuid, ParticipantTrack>,
    travel_times: HashMap<Uuid, TravelEstimate>,
}

impl Reconciler {
    pub fn new(mode: TransportMode) -> Self {
        Self {
            mode,
            journey: None,
            participants: Vec::new(),
            tracks: HashMap::new(),
            travel_times: HashMap::new(),
        }
    }

    pub fn journey(&self) -> Option<&JourneySession> {
        self.journey.as_ref()
    }

    pub fn destination(&self) -> Option<LatLng> {
        self.journey
            .as_ref()
            .and_then(|journey| journey.destination)
            .map(LatLng::from)
    }

    pub fn participants(&self) -> &[UserIdentity] {
        &self.participants
    }

    pub fn track(&self, user_id: &Uuid) -> Option<&ParticipantTrack> {
        self.tracks.get(user_id)
    }

    pub fn travel_time(&self, user_id: &Uuid) -> Option<&TravelEstimate> {
        self.travel_times.get(user_id)
    }

    /// Fold one inbound event into the view.
    pub fn apply(&mut self, event: ServerEvent) -> Applied {
        match event {
            ServerEvent::JourneyJoined {
                journey,
                participants,
            } => {
                self.journey = Some(journey);
                self.participants = participants;
                Applied::Joined
            }

            ServerEvent::UserJoined { user, message } => {
                if !self.participants.iter().any(|p| p.id == user.id) {
                    self.participants.push(user);
                }
                Applied::Info(message)
            }

            // Presence only: the last known track is retained.
            ServerEvent::UserLeft { message, .. } => Applied::Info(message),

            ServerEvent::LocationUpdate {
                user_id,
                username,
                role,
                latitude,
                longitude,
                timestamp,
            } => {
                let position = LatLng::new(latitude, longitude);
                self.tracks.insert(
                    user_id,
                    ParticipantTrack {
                        username,
                        role,
                        position,
                        updated_at: timestamp,
                    },
                );
                if let Some(destination) = self.destination() {
                    let km = haversine_km(position, destination);
                    self.travel_times
                        .insert(user_id, estimate_travel(km, self.mode));
                }
                Applied::Track(user_id)
            }

            ServerEvent::JourneyMessage { message_type, data } => {
                if message_type != DESTINATION_UPDATED {
                    return Applied::Nothing;
                }
                match serde_json::from_value::<DestinationUpdated>(data) {
                    Ok(update) => {
                        if let Some(journey) = self.journey.as_mut() {
                            journey.destination = Some(update.destination);
                        }
                        Applied::DestinationChanged {
                            destination: LatLng::from(update.destination),
                            updated_by: update.updated_by,
                        }
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "malformed destination update");
                        Applied::Nothing
                    }
                }
            }

            ServerEvent::Error { message } => Applied::ServerError(message),
        }
    }
}
