use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crossbeam::atomic::AtomicCell;
use dashmap::{mapref::entry::Entry, DashMap};
use log::debug;
use reelmatch_core::{
    Match, Movie, ParticipantId, Pin, RoomData, RoomStore, StoreError, StoreResult, Subscription,
    Swipe, SwipeLog,
};
use tokio::sync::watch;

/// An in-process replicated store. Every write is pushed to all subscribers as a full snapshot.
#[derive(Default)]
pub struct MemoryStore {
    rooms: DashMap<Pin, RoomChannels>,
    unavailable: AtomicCell<bool>,
}

struct RoomChannels {
    room: watch::Sender<RoomData>,
    swipes: watch::Sender<Vec<Swipe>>,
}

impl RoomChannels {
    fn new(room: RoomData) -> Self {
        Self {
            room: watch::Sender::new(room),
            swipes: watch::Sender::new(vec![]),
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following operation fail with [StoreError::Unavailable] until restored.
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available);
    }

    /// Ends all current subscriptions of a room while keeping its data, like a dropped connection.
    pub fn sever_subscriptions(&self, pin: &Pin) {
        if let Some(mut channels) = self.rooms.get_mut(pin) {
            let room = channels.room.borrow().clone();
            let swipes = channels.swipes.borrow().clone();

            channels.room = watch::Sender::new(room);
            channels.swipes = watch::Sender::new(swipes);

            debug!("Severed subscriptions of room {}", pin);
        }
    }

    /// How many live subscriptions a room has, across both feeds
    pub fn subscriber_count(&self, pin: &Pin) -> usize {
        self.rooms
            .get(pin)
            .map(|c| c.room.receiver_count() + c.swipes.receiver_count())
            .unwrap_or_default()
    }

    fn ensure_available(&self) -> StoreResult<()> {
        if self.unavailable.load() {
            return Err(StoreError::Unavailable);
        }

        Ok(())
    }

    /// Runs a modification on a room document and pushes it
    fn modify_room<T>(&self, pin: &Pin, modify: impl FnOnce(&mut RoomData) -> T) -> StoreResult<T> {
        self.ensure_available()?;

        let channels = self
            .rooms
            .get(pin)
            .ok_or_else(|| StoreError::room_not_found(pin))?;

        let mut result = None;
        channels.room.send_modify(|room| result = Some(modify(room)));

        result.ok_or_else(|| StoreError::Internal("room modification did not run".to_string()))
    }
}

#[async_trait]
impl RoomStore for MemoryStore {
    async fn room_by_pin(&self, pin: &Pin) -> StoreResult<RoomData> {
        self.ensure_available()?;

        self.rooms
            .get(pin)
            .map(|c| c.room.borrow().clone())
            .ok_or_else(|| StoreError::room_not_found(pin))
    }

    async fn create_room(&self, room: RoomData, stale_before: DateTime<Utc>) -> StoreResult<()> {
        self.ensure_available()?;

        match self.rooms.entry(room.pin.clone()) {
            Entry::Occupied(mut entry) => {
                let existing_created_at = entry.get().room.borrow().created_at;

                if existing_created_at >= stale_before {
                    return Err(StoreError::Conflict {
                        resource: "room",
                        field: "pin",
                        value: room.pin.to_string(),
                    });
                }

                debug!("Replacing stale room {}", room.pin);
                // Dropping the old senders ends subscriptions to the stale room
                entry.insert(RoomChannels::new(room));
            }
            Entry::Vacant(entry) => {
                entry.insert(RoomChannels::new(room));
            }
        }

        Ok(())
    }

    async fn add_member(&self, pin: &Pin, participant: &ParticipantId) -> StoreResult<RoomData> {
        self.modify_room(pin, |room| {
            room.add_member(participant.clone());
            room.clone()
        })
    }

    async fn set_catalog(&self, pin: &Pin, catalog: Vec<Movie>) -> StoreResult<bool> {
        self.ensure_available()?;

        let channels = self
            .rooms
            .get(pin)
            .ok_or_else(|| StoreError::room_not_found(pin))?;

        // Only notify subscribers when something was written
        Ok(channels.room.send_if_modified(|room| {
            if room.has_catalog() {
                return false;
            }

            room.catalog = catalog;
            true
        }))
    }

    async fn set_started(&self, pin: &Pin) -> StoreResult<bool> {
        self.ensure_available()?;

        let channels = self
            .rooms
            .get(pin)
            .ok_or_else(|| StoreError::room_not_found(pin))?;

        Ok(channels.room.send_if_modified(|room| {
            let flipped = !room.started;
            room.started = true;
            flipped
        }))
    }

    async fn set_matches(&self, pin: &Pin, matches: Vec<Match>) -> StoreResult<()> {
        self.modify_room(pin, |room| room.matches = matches)
    }

    async fn watch_room(&self, pin: &Pin) -> StoreResult<Subscription<RoomData>> {
        self.ensure_available()?;

        self.rooms
            .get(pin)
            .map(|c| Subscription::new(c.room.subscribe()))
            .ok_or_else(|| StoreError::room_not_found(pin))
    }
}

#[async_trait]
impl SwipeLog for MemoryStore {
    async fn append_swipe(&self, pin: &Pin, swipe: Swipe) -> StoreResult<()> {
        self.ensure_available()?;

        let channels = self
            .rooms
            .get(pin)
            .ok_or_else(|| StoreError::room_not_found(pin))?;

        channels.swipes.send_modify(|swipes| swipes.push(swipe));
        Ok(())
    }

    async fn swipes(&self, pin: &Pin) -> StoreResult<Vec<Swipe>> {
        self.ensure_available()?;

        self.rooms
            .get(pin)
            .map(|c| c.swipes.borrow().clone())
            .ok_or_else(|| StoreError::room_not_found(pin))
    }

    async fn watch_swipes(&self, pin: &Pin) -> StoreResult<Subscription<Vec<Swipe>>> {
        self.ensure_available()?;

        self.rooms
            .get(pin)
            .map(|c| Subscription::new(c.swipes.subscribe()))
            .ok_or_else(|| StoreError::room_not_found(pin))
    }
}

#[cfg(test)]
mod test {
    use chrono::Duration;
    use reelmatch_core::MovieId;

    use super::*;

    fn pin() -> Pin {
        Pin::parse("4242").unwrap()
    }

    fn room(host: &str) -> RoomData {
        RoomData::new(pin(), ParticipantId::new(host), vec![])
    }

    #[tokio::test]
    async fn test_active_pins_conflict() {
        let store = MemoryStore::new();
        let stale_before = Utc::now() - Duration::hours(24);

        store.create_room(room("first"), stale_before).await.unwrap();
        let error = store
            .create_room(room("second"), stale_before)
            .await
            .unwrap_err();

        assert!(error.is_conflict());
        assert_eq!(
            store.room_by_pin(&pin()).await.unwrap().host_id,
            ParticipantId::new("first")
        );
    }

    #[tokio::test]
    async fn test_stale_rooms_are_replaced() {
        let store = MemoryStore::new();
        let mut old = room("first");
        old.created_at = Utc::now() - Duration::hours(48);

        store.create_room(old, Utc::now()).await.unwrap();
        store
            .append_swipe(
                &pin(),
                Swipe::new(ParticipantId::new("first"), MovieId::from("1"), true),
            )
            .await
            .unwrap();

        let stale_before = Utc::now() - Duration::hours(24);
        store.create_room(room("second"), stale_before).await.unwrap();

        let replaced = store.room_by_pin(&pin()).await.unwrap();
        assert_eq!(replaced.host_id, ParticipantId::new("second"));
        assert!(store.swipes(&pin()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_writes_are_pushed_as_snapshots() {
        let store = MemoryStore::new();
        store.create_room(room("host"), Utc::now()).await.unwrap();

        let mut rooms = store.watch_room(&pin()).await.unwrap();
        let mut swipes = store.watch_swipes(&pin()).await.unwrap();
        assert_eq!(rooms.current().members.len(), 1);

        store
            .add_member(&pin(), &ParticipantId::new("guest"))
            .await
            .unwrap();
        let pushed = rooms.changed().await.unwrap();
        assert_eq!(pushed.members.len(), 2);

        for movie in ["1", "2"] {
            store
                .append_swipe(
                    &pin(),
                    Swipe::new(ParticipantId::new("guest"), MovieId::from(movie), true),
                )
                .await
                .unwrap();
        }

        // Both appends are visible in a single snapshot
        assert_eq!(swipes.changed().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_catalog_and_started_are_write_once() {
        let store = MemoryStore::new();
        store.create_room(room("host"), Utc::now()).await.unwrap();

        let catalog = crate::fallback_catalog();
        assert!(store.set_catalog(&pin(), catalog.clone()).await.unwrap());
        assert!(!store.set_catalog(&pin(), vec![]).await.unwrap());
        assert_eq!(store.room_by_pin(&pin()).await.unwrap().catalog, catalog);

        assert!(store.set_started(&pin()).await.unwrap());
        assert!(!store.set_started(&pin()).await.unwrap());
    }

    #[tokio::test]
    async fn test_unavailable_and_severed() {
        let store = MemoryStore::new();
        store.create_room(room("host"), Utc::now()).await.unwrap();

        let mut rooms = store.watch_room(&pin()).await.unwrap();
        store.sever_subscriptions(&pin());
        assert!(rooms.changed().await.is_none());
        assert_eq!(store.subscriber_count(&pin()), 0);

        store.set_available(false);
        assert_eq!(
            store.room_by_pin(&pin()).await.unwrap_err(),
            StoreError::Unavailable
        );

        store.set_available(true);
        assert!(store.room_by_pin(&pin()).await.is_ok());

        let missing = Pin::parse("1111").unwrap();
        assert!(store.watch_room(&missing).await.unwrap_err().is_not_found());
    }
}
