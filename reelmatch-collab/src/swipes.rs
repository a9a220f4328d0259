use std::sync::Arc;

use log::debug;
use reelmatch_core::{Backend, MovieId, ParticipantId, Pin, StoreError, Swipe};

use crate::CollabContext;

/// Appends swipes to a room's log. Matching is left to the synchronizers observing the log.
pub struct SwipeLogWriter<Db> {
    store: Arc<Db>,
}

impl<Db> SwipeLogWriter<Db>
where
    Db: Backend,
{
    pub fn new<Cp>(context: &CollabContext<Db, Cp>) -> Self {
        Self {
            store: context.store.clone(),
        }
    }

    /// Appends a swipe stamped with the current time.
    ///
    /// There is no deduplication, a participant swiping a movie twice appends twice.
    pub async fn record_swipe(
        &self,
        pin: &Pin,
        participant_id: &ParticipantId,
        movie_id: &MovieId,
        liked: bool,
    ) -> Result<Swipe, StoreError> {
        let swipe = Swipe::new(participant_id.clone(), movie_id.clone(), liked);
        self.store.append_swipe(pin, swipe.clone()).await?;

        debug!(
            "{} {} {} in room {}",
            participant_id,
            if liked { "liked" } else { "passed" },
            movie_id,
            pin
        );

        Ok(swipe)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use reelmatch_core::{RoomData, RoomStore, SwipeLog};
    use reelmatch_impls::MemoryStore;

    use super::*;

    #[tokio::test]
    async fn test_swipes_are_appended_in_order() {
        let store = Arc::new(MemoryStore::new());
        let writer = SwipeLogWriter { store: store.clone() };
        let pin = Pin::parse("4821").unwrap();
        let host = ParticipantId::new("H");

        store
            .create_room(RoomData::new(pin.clone(), host.clone(), vec![]), Utc::now())
            .await
            .unwrap();

        writer.record_swipe(&pin, &host, &MovieId::from(1), true).await.unwrap();
        writer.record_swipe(&pin, &host, &MovieId::from(1), true).await.unwrap();
        writer.record_swipe(&pin, &host, &MovieId::from(2), false).await.unwrap();

        let log = store.swipes(&pin).await.unwrap();
        assert_eq!(log.len(), 3);
        assert_eq!(log[2].movie_id, MovieId::from(2));
        assert!(!log[2].liked);
    }

    #[tokio::test]
    async fn test_unavailable_store_is_reported() {
        let store = Arc::new(MemoryStore::new());
        let writer = SwipeLogWriter { store: store.clone() };
        let pin = Pin::parse("4821").unwrap();

        store.set_available(false);

        let result = writer
            .record_swipe(&pin, &ParticipantId::new("H"), &MovieId::from(1), true)
            .await;

        assert_eq!(result, Err(StoreError::Unavailable));
    }
}
