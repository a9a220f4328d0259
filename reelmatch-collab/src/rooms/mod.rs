mod authority;
mod session;
mod sync;

use std::collections::HashSet;

use chrono::Utc;
use log::{info, warn};
use parking_lot::Mutex;
use reelmatch_core::{
    Backend, CatalogProvider, GenreId, LocalState, Match, Movie, MovieId, ParticipantId, Pin,
    PinError, RoomData, StoreError, Swipe, SwipeStats,
};
use thiserror::Error;
use tokio::sync::watch;

pub use authority::*;
pub use session::*;

use crate::{CatalogAdapter, CollabContext, CollabEvent, IdentityProvider, SwipeLogWriter};

#[derive(Debug, Error)]
pub enum RoomError {
    #[error(transparent)]
    InvalidPin(#[from] PinError),
    #[error("Room {0} does not exist")]
    RoomNotFound(Pin),
    #[error("Could not find a free PIN after {0} attempts")]
    PinsExhausted(usize),
    #[error("Not in a room")]
    NoActiveRoom,
    #[error("Only the host of the room can do this")]
    NotHost,
    #[error("The room has no catalog yet")]
    CatalogNotReady,
    #[error("Movie {0} is not in the room's catalog")]
    UnknownMovie(MovieId),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RoomError {
    fn from_store(error: StoreError, pin: &Pin) -> Self {
        if error.is_not_found() {
            Self::RoomNotFound(pin.clone())
        } else {
            Self::Store(error)
        }
    }
}

/// When the catalog of a new room is fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogFetch {
    /// Before the room is written, so it is created with its catalog
    Eager,
    /// Later, through [RoomManager::populate_catalog]
    Deferred,
}

/// Creates, joins, starts, and leaves rooms. Holds at most one open room session at a time.
pub struct RoomManager<Db, Cp> {
    context: CollabContext<Db, Cp>,
    identity: IdentityProvider,
    catalog: CatalogAdapter<Cp>,
    swipes: SwipeLogWriter<Db>,
    session: Mutex<Option<RoomSession>>,
}

impl<Db, Cp> RoomManager<Db, Cp>
where
    Db: Backend,
    Cp: CatalogProvider,
{
    pub fn new(context: &CollabContext<Db, Cp>) -> Self {
        Self {
            context: context.clone(),
            identity: IdentityProvider::new(&context.local),
            catalog: CatalogAdapter::new(context),
            swipes: SwipeLogWriter::new(context),
            session: Mutex::new(None),
        }
    }

    /// Creates a room hosted by this client and opens a session for it.
    pub async fn create_room(
        &self,
        genre_filter: &[GenreId],
        fetch: CatalogFetch,
    ) -> Result<Pin, RoomError> {
        let host = self.identity.get_or_create_participant_id().await;

        let catalog = match fetch {
            CatalogFetch::Eager => self.catalog.fetch_catalog(genre_filter).await,
            CatalogFetch::Deferred => vec![],
        };

        let pin = self.allocate_room(&host, catalog).await?;
        info!("{} created room {}", host, pin);

        self.enter(pin.clone()).await?;
        self.context.emit(CollabEvent::RoomCreated { pin: pin.clone() });

        Ok(pin)
    }

    /// Writes a new room under a random PIN, retrying on collisions with live rooms
    async fn allocate_room(
        &self,
        host: &ParticipantId,
        catalog: Vec<Movie>,
    ) -> Result<Pin, RoomError> {
        let attempts = self.context.config.pin_attempts.max(1);

        for attempt in 1..=attempts {
            let room = RoomData::new(Pin::random(), host.clone(), catalog.clone());
            let pin = room.pin.clone();
            let stale_before = self.context.config.stale_before(Utc::now());

            match self.context.store.create_room(room, stale_before).await {
                Ok(()) => return Ok(pin),
                Err(e) if e.is_conflict() => {
                    warn!("PIN {} is taken ({}/{})", pin, attempt, attempts);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(RoomError::PinsExhausted(attempts))
    }

    /// Fetches and writes the catalog of the current room, for rooms created with
    /// [CatalogFetch::Deferred]. Returns false if the room already had a catalog, or if the room
    /// was left before the fetch completed, in which case the result is discarded.
    pub async fn populate_catalog(&self, genre_filter: &[GenreId]) -> Result<bool, RoomError> {
        let (session_id, pin) = self.current()?;
        let participant = self.identity.get_or_create_participant_id().await;

        let room = self
            .context
            .store
            .room_by_pin(&pin)
            .await
            .map_err(|e| RoomError::from_store(e, &pin))?;

        if !room.is_host(&participant) {
            return Err(RoomError::NotHost);
        }

        if room.has_catalog() {
            return Ok(false);
        }

        let catalog = self.catalog.fetch_catalog(genre_filter).await;

        if !self.is_current(session_id) {
            info!("Discarding catalog fetched for room {} after leaving it", pin);
            return Ok(false);
        }

        let written = self
            .context
            .store
            .set_catalog(&pin, catalog)
            .await
            .map_err(|e| RoomError::from_store(e, &pin))?;

        Ok(written)
    }

    /// Joins an existing room and opens a session for it, leaving the current room if any.
    pub async fn join_room(&self, pin: &str) -> Result<RoomData, RoomError> {
        let pin = Pin::parse(pin)?;
        let participant = self.identity.get_or_create_participant_id().await;

        self.context
            .store
            .add_member(&pin, &participant)
            .await
            .map_err(|e| RoomError::from_store(e, &pin))?;

        let room = self.enter(pin).await?;
        info!("{} joined room {}", participant, room.pin);

        Ok(room)
    }

    /// Starts the game of the current room. Returns false if it had already started.
    pub async fn start_game(&self) -> Result<bool, RoomError> {
        let (_, pin) = self.current()?;
        let participant = self.identity.get_or_create_participant_id().await;

        let room = self
            .context
            .store
            .room_by_pin(&pin)
            .await
            .map_err(|e| RoomError::from_store(e, &pin))?;

        if !room.is_host(&participant) {
            return Err(RoomError::NotHost);
        }

        if !room.has_catalog() {
            return Err(RoomError::CatalogNotReady);
        }

        let started = self
            .context
            .store
            .set_started(&pin)
            .await
            .map_err(|e| RoomError::from_store(e, &pin))?;

        if started {
            info!("Room {} started", pin);
        }

        Ok(started)
    }

    /// Closes the current session and forgets the room locally. The room itself is untouched.
    pub async fn leave_room(&self) {
        let session = self.session.lock().take();

        if let Some(session) = session {
            info!("Leaving room {}", session.pin());
            self.close(session);
        }

        self.context.local.update(LocalState::clear_room).await;
    }

    /// Reopens the room remembered on this device, if it still exists and still has this
    /// participant as a member. Forgets it otherwise.
    pub async fn resume(&self) -> Result<Option<RoomData>, RoomError> {
        let Some(saved) = self.context.local.state().await.room else {
            return Ok(None);
        };

        let participant = self.identity.get_or_create_participant_id().await;

        match self.context.store.room_by_pin(&saved.pin).await {
            Ok(room) if room.is_member(&participant) => self.enter(room.pin).await.map(Some),
            Ok(_) => {
                info!("No longer a member of room {}, forgetting it", saved.pin);
                self.context.local.update(LocalState::clear_room).await;
                Ok(None)
            }
            Err(e) if e.is_not_found() => {
                info!("Room {} is gone, forgetting it", saved.pin);
                self.context.local.update(LocalState::clear_room).await;
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Records a swipe of this client on a movie of the current room's catalog
    pub async fn swipe(&self, movie_id: &MovieId, liked: bool) -> Result<Swipe, RoomError> {
        let view = self.view().ok_or(RoomError::NoActiveRoom)?;

        if let Some(room) = &view.room {
            if room.has_catalog() && room.movie(movie_id).is_none() {
                return Err(RoomError::UnknownMovie(movie_id.clone()));
            }
        }

        let participant = self.identity.get_or_create_participant_id().await;
        let swipe = self
            .swipes
            .record_swipe(&view.pin, &participant, movie_id, liked)
            .await?;

        self.context
            .local
            .update(|state| state.swipes.push(swipe.clone()))
            .await;

        Ok(swipe)
    }

    /// The movie this client is currently deciding on
    pub async fn current_movie(&self) -> Option<Movie> {
        let room = self.view()?.room?;
        let index = self.context.local.state().await.movie_index;

        room.catalog.get(index).cloned()
    }

    /// Advances to the next movie of the catalog, returning [None] past the end.
    pub async fn next_movie(&self) -> Option<Movie> {
        let room = self.view()?.room?;
        let length = room.catalog.len();

        let index = self
            .context
            .local
            .update(|state| {
                state.movie_index = (state.movie_index + 1).min(length);
                state.movie_index
            })
            .await;

        room.catalog.get(index).cloned()
    }

    /// Starts over at the first movie and forgets the swipes of this device.
    /// The shared swipe log is append-only and keeps them.
    pub async fn reset_swipes(&self) {
        self.context
            .local
            .update(|state| {
                state.swipes.clear();
                state.movie_index = 0;
            })
            .await;
    }

    pub async fn swipe_stats(&self) -> SwipeStats {
        SwipeStats::from_swipes(&self.context.local.state().await.swipes)
    }

    /// The movies this device liked, in catalog order
    pub async fn liked_movies(&self) -> Vec<Movie> {
        let Some(room) = self.view().and_then(|v| v.room) else {
            return vec![];
        };

        let liked: HashSet<_> = self
            .context
            .local
            .state()
            .await
            .swipes
            .into_iter()
            .filter(|s| s.liked)
            .map(|s| s.movie_id)
            .collect();

        room.catalog
            .into_iter()
            .filter(|m| liked.contains(&m.id))
            .collect()
    }

    /// The matches of the current room, as last pushed by the store
    pub fn matches(&self) -> Vec<Match> {
        self.view()
            .map(|v| v.matches().to_vec())
            .unwrap_or_default()
    }

    /// A snapshot of the current room session, if any
    pub fn view(&self) -> Option<RoomView> {
        self.with_session(|s| s.view())
    }

    /// Returns a receiver notified on every change of the current room session
    pub fn subscribe(&self) -> Option<watch::Receiver<RoomView>> {
        self.with_session(|s| s.subscribe())
    }

    pub fn pin(&self) -> Option<Pin> {
        self.with_session(|s| s.pin().clone())
    }

    /// Runs `f` on the current session, unless it has closed itself
    fn with_session<T>(&self, f: impl FnOnce(&RoomSession) -> T) -> Option<T> {
        self.session.lock().as_ref().filter(|s| s.is_open()).map(f)
    }

    /// Opens a session for a room, replacing the current one
    async fn enter(&self, pin: Pin) -> Result<RoomData, RoomError> {
        let participant = self.identity.get_or_create_participant_id().await;

        let session = RoomSession::open(
            &self.context.store,
            &self.context.config,
            Some(self.context.event_sender()),
            pin.clone(),
            Some(participant),
            self.context.config.clients_write_matches(),
        )
        .await
        .map_err(|e| RoomError::from_store(e, &pin))?;

        let room = session
            .view()
            .room
            .ok_or_else(|| RoomError::RoomNotFound(pin.clone()))?;

        let previous = self.session.lock().replace(session);
        if let Some(previous) = previous {
            self.close(previous);
        }

        self.context
            .local
            .update(|state| {
                // Progress in an earlier room under the same PIN does not carry over
                if !state.room.as_ref().is_some_and(|r| r.is_same_room(&room)) {
                    state.clear_room();
                }

                state.room = Some(room.clone());
            })
            .await;

        Ok(room)
    }

    fn close(&self, session: RoomSession) {
        session.close();
        self.context.emit(CollabEvent::SessionClosed {
            pin: session.pin().clone(),
        });
    }

    fn current(&self) -> Result<(SessionId, Pin), RoomError> {
        self.with_session(|s| (s.id(), s.pin().clone()))
            .ok_or(RoomError::NoActiveRoom)
    }

    fn is_current(&self, id: SessionId) -> bool {
        self.session
            .lock()
            .as_ref()
            .is_some_and(|s| s.id() == id && s.is_open())
    }
}
