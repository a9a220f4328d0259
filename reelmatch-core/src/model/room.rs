use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Match, Movie, MovieId, ParticipantId, Pin};

/// The shared room document, keyed by its PIN in the room store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomData {
    pub pin: Pin,
    /// The participant who created the room
    pub host_id: ParticipantId,
    /// Insertion ordered, without duplicates
    pub members: Vec<ParticipantId>,
    /// Fixed once populated
    pub catalog: Vec<Movie>,
    /// Derived from the swipe log, always overwritten as a whole
    pub matches: Vec<Match>,
    /// Only ever goes from false to true
    pub started: bool,
    pub created_at: DateTime<Utc>,
}

impl RoomData {
    /// Creates the initial document of a room, with the host as its only member
    pub fn new(pin: Pin, host_id: ParticipantId, catalog: Vec<Movie>) -> Self {
        Self {
            pin,
            members: vec![host_id.clone()],
            host_id,
            catalog,
            matches: vec![],
            started: false,
            created_at: Utc::now(),
        }
    }

    pub fn is_host(&self, participant: &ParticipantId) -> bool {
        &self.host_id == participant
    }

    pub fn is_member(&self, participant: &ParticipantId) -> bool {
        self.members.contains(participant)
    }

    /// Adds a member with set-union semantics. Returns false if it was already present.
    pub fn add_member(&mut self, participant: ParticipantId) -> bool {
        if self.is_member(&participant) {
            return false;
        }

        self.members.push(participant);
        true
    }

    pub fn movie(&self, movie_id: &MovieId) -> Option<&Movie> {
        self.catalog.iter().find(|m| &m.id == movie_id)
    }

    pub fn has_catalog(&self) -> bool {
        !self.catalog.is_empty()
    }

    /// Whether both documents belong to the same room, and not to two rooms that held the PIN
    /// one after the other
    pub fn is_same_room(&self, other: &RoomData) -> bool {
        self.pin == other.pin && self.host_id == other.host_id && self.created_at == other.created_at
    }
}
