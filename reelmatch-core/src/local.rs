use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{ParticipantId, RoomData, Swipe};

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("Could not access local state: {0}")]
    Io(#[from] std::io::Error),
    #[error("Local state is corrupt: {0}")]
    Format(String),
}

/// State remembered on the device between launches. The shared store always wins over it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LocalState {
    pub participant_id: Option<ParticipantId>,
    /// The last known swipes of this device in the current room
    pub swipes: Vec<Swipe>,
    /// The last known snapshot of the current room
    pub room: Option<RoomData>,
    /// Position in the room's catalog
    pub movie_index: usize,
}

impl LocalState {
    /// Forgets everything about the current room, keeping the identity
    pub fn clear_room(&mut self) {
        self.swipes.clear();
        self.room = None;
        self.movie_index = 0;
    }
}

/// Represents device local persistence
#[async_trait]
pub trait LocalStore: Send + Sync + 'static {
    /// Loads the saved state, or the default state if nothing was saved yet
    async fn load(&self) -> Result<LocalState, PersistError>;

    async fn save(&self, state: &LocalState) -> Result<(), PersistError>;
}
