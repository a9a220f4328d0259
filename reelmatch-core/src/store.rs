use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::watch;

use crate::{Match, Movie, ParticipantId, Pin, RoomData, Swipe};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store could not be reached, the write or read did not happen
    #[error("Store is unavailable")]
    Unavailable,
    /// A resource in the store doesn't exist
    #[error("{resource}:{identifier} doesn't exist")]
    NotFound {
        resource: &'static str,
        identifier: String,
    },
    /// A resource already exists
    #[error("{resource} with {field} of value {value} already exists")]
    Conflict {
        resource: &'static str,
        field: &'static str,
        value: String,
    },
    #[error("Internal store error: {0}")]
    Internal(String),
}

impl StoreError {
    pub fn room_not_found(pin: &Pin) -> Self {
        Self::NotFound {
            resource: "room",
            identifier: pin.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// A push subscription that always yields the full current value.
///
/// The subscription ends when the store drops it, after which it has to be reopened.
#[derive(Debug)]
pub struct Subscription<T> {
    receiver: watch::Receiver<T>,
}

impl<T> Subscription<T>
where
    T: Clone,
{
    pub fn new(receiver: watch::Receiver<T>) -> Self {
        Self { receiver }
    }

    /// Returns the current value and marks it as seen
    pub fn current(&mut self) -> T {
        self.receiver.borrow_and_update().clone()
    }

    /// Waits for the next change, returning [None] once the subscription has ended.
    pub async fn changed(&mut self) -> Option<T> {
        self.receiver.changed().await.ok()?;
        Some(self.current())
    }
}

/// Represents the shared document store holding rooms, keyed by PIN
#[async_trait]
pub trait RoomStore: Send + Sync + 'static {
    async fn room_by_pin(&self, pin: &Pin) -> StoreResult<RoomData>;

    /// Writes a new room document. Fails with a conflict if a room created at or after
    /// `stale_before` already holds the PIN. Older rooms are replaced along with their swipe log.
    async fn create_room(&self, room: RoomData, stale_before: DateTime<Utc>) -> StoreResult<()>;

    /// Adds a member with set-union semantics, returning the updated document
    async fn add_member(&self, pin: &Pin, participant: &ParticipantId) -> StoreResult<RoomData>;

    /// Populates the catalog. Returns false, without writing, if it was already populated.
    async fn set_catalog(&self, pin: &Pin, catalog: Vec<Movie>) -> StoreResult<bool>;

    /// Flips the started flag. Returns false if the room had already started.
    async fn set_started(&self, pin: &Pin) -> StoreResult<bool>;

    /// Overwrites the match set
    async fn set_matches(&self, pin: &Pin, matches: Vec<Match>) -> StoreResult<()>;

    async fn watch_room(&self, pin: &Pin) -> StoreResult<Subscription<RoomData>>;
}

/// Represents the per-room append-only swipe log
#[async_trait]
pub trait SwipeLog: Send + Sync + 'static {
    async fn append_swipe(&self, pin: &Pin, swipe: Swipe) -> StoreResult<()>;

    async fn swipes(&self, pin: &Pin) -> StoreResult<Vec<Swipe>>;

    async fn watch_swipes(&self, pin: &Pin) -> StoreResult<Subscription<Vec<Swipe>>>;
}

/// A backend providing both the room store and the swipe log
pub trait Backend: RoomStore + SwipeLog {}

impl<T> Backend for T where T: RoomStore + SwipeLog {}
