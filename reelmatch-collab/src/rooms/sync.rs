use std::sync::Arc;

use chrono::Utc;
use crossbeam::atomic::AtomicCell;
use log::{debug, info, warn};
use reelmatch_core::{
    compute_room_matches, covers, new_matches, Backend, Config, ParticipantId, Pin, RoomData,
    Subscription, Swipe,
};
use tokio::sync::watch;

use crate::{CollabEvent, EventSender, Feed};

use super::RoomView;

enum Update {
    Room(Option<RoomData>),
    Swipes(Option<Vec<Swipe>>),
}

/// Keeps a [RoomView] in sync with the store and recomputes matches when the inputs change.
pub(crate) struct Synchronizer<Db> {
    pub store: Arc<Db>,
    pub config: Config,
    /// Observers of this replica, if any
    pub events: Option<EventSender>,
    pub pin: Pin,
    /// The participant this replica belongs to. The session ends once they are not a member.
    pub member: Option<ParticipantId>,
    /// Whether recomputed matches are written back to the room
    pub writes_matches: bool,
    pub room: Option<RoomData>,
    pub swipes: Vec<Swipe>,
    pub publisher: watch::Sender<RoomView>,
    pub closed: Arc<AtomicCell<bool>>,
    /// Feeds whose subscription ended and has not been restored yet
    pub lost: Vec<Feed>,
}

impl<Db> Synchronizer<Db>
where
    Db: Backend,
{
    pub async fn run(
        mut self,
        mut room_feed: Subscription<RoomData>,
        mut swipe_feed: Subscription<Vec<Swipe>>,
    ) {
        self.recompute().await;

        loop {
            let update = tokio::select! {
                room = room_feed.changed() => Update::Room(room),
                swipes = swipe_feed.changed() => Update::Swipes(swipes),
            };

            if self.is_closed() {
                break;
            }

            match update {
                Update::Room(Some(room)) => {
                    self.apply_room(room).await;

                    if self.is_closed() {
                        break;
                    }
                }
                Update::Swipes(Some(swipes)) => self.apply_swipes(swipes).await,
                Update::Room(None) => match self.resubscribe_room().await {
                    Some(feed) => room_feed = feed,
                    None => break,
                },
                Update::Swipes(None) => match self.resubscribe_swipes().await {
                    Some(feed) => swipe_feed = feed,
                    None => break,
                },
            }
        }

        debug!("Synchronizer for room {} stopped", self.pin);
    }

    fn is_closed(&self) -> bool {
        self.closed.load()
    }

    fn emit(&self, event: CollabEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }

    fn publish(&self) {
        if self.is_closed() {
            return;
        }

        self.publisher.send_replace(RoomView {
            pin: self.pin.clone(),
            room: self.room.clone(),
            swipes: self.swipes.clone(),
            stale: !self.lost.is_empty(),
        });
    }

    /// Whether a pushed document can no longer be adopted by this session
    fn is_replaced_by(&self, room: &RoomData) -> bool {
        let reused = self
            .room
            .as_ref()
            .is_some_and(|current| !current.is_same_room(room));
        let removed = self.member.as_ref().is_some_and(|m| !room.is_member(m));

        reused || removed
    }

    /// Ends the session without publishing the foreign document
    fn end_replaced(&self) {
        warn!("Room {} was replaced, closing the session", self.pin);

        self.emit(CollabEvent::RoomReplaced {
            pin: self.pin.clone(),
        });
        self.closed.store(true);
    }

    /// Replaces the local room wholesale
    async fn apply_room(&mut self, room: RoomData) {
        if self.is_replaced_by(&room) {
            self.end_replaced();
            return;
        }

        let previous = self.room.replace(room.clone());

        let recompute = match &previous {
            Some(previous) => {
                self.announce_changes(previous, &room);
                previous.started != room.started || previous.members != room.members
            }
            None => true,
        };

        self.publish();

        if recompute {
            self.recompute().await;
        }
    }

    async fn apply_swipes(&mut self, swipes: Vec<Swipe>) {
        self.swipes = swipes;
        self.publish();
        self.recompute().await;
    }

    fn announce_changes(&self, previous: &RoomData, current: &RoomData) {
        let pin = &self.pin;

        for member in current.members.iter().filter(|m| !previous.is_member(m)) {
            self.emit(CollabEvent::MemberJoined {
                pin: pin.clone(),
                participant_id: member.clone(),
            });
        }

        if !previous.has_catalog() && current.has_catalog() {
            self.emit(CollabEvent::CatalogReady {
                pin: pin.clone(),
                size: current.catalog.len(),
            });
        }

        if !previous.started && current.started {
            self.emit(CollabEvent::GameStarted { pin: pin.clone() });
        }

        let found = new_matches(&previous.matches, &current.matches);
        if !found.is_empty() {
            self.emit(CollabEvent::MatchesFound {
                pin: pin.clone(),
                matches: found,
            });
        }
    }

    /// Recomputes matches from the replica, writing them if the room does not have them yet.
    /// Nothing is written while a feed is lost, the other feed may already point elsewhere.
    async fn recompute(&self) {
        if !self.writes_matches || self.is_closed() || !self.lost.is_empty() {
            return;
        }

        let Some(room) = &self.room else {
            return;
        };

        let matches = compute_room_matches(room, &self.swipes, Utc::now());

        // A replica behind the store computes a subset of what is stored
        if covers(&room.matches, &matches) {
            return;
        }

        debug!(
            "Writing {} matches for room {}",
            matches.len(),
            self.pin
        );

        if let Err(e) = self.store.set_matches(&self.pin, matches).await {
            warn!("Could not write matches for room {}: {}", self.pin, e);
        }
    }

    fn mark_lost(&mut self, feed: Feed) {
        warn!("Lost {} subscription of room {}", feed, self.pin);

        if !self.lost.contains(&feed) {
            self.lost.push(feed);
        }

        self.publish();
        self.emit(CollabEvent::SubscriptionLost {
            pin: self.pin.clone(),
            feed,
        });
    }

    fn mark_restored(&mut self, feed: Feed) {
        info!("Restored {} subscription of room {}", feed, self.pin);

        self.lost.retain(|f| *f != feed);
        self.emit(CollabEvent::SubscriptionRestored {
            pin: self.pin.clone(),
            feed,
        });
    }

    /// Reopens the room feed with backoff. Returns [None] if the session closed meanwhile.
    async fn resubscribe_room(&mut self) -> Option<Subscription<RoomData>> {
        self.mark_lost(Feed::Room);

        let mut attempt = 0;
        loop {
            tokio::time::sleep(self.config.resubscribe_backoff(attempt)).await;

            if self.is_closed() {
                return None;
            }

            match self.store.watch_room(&self.pin).await {
                Ok(mut feed) => {
                    let room = feed.current();

                    if self.is_replaced_by(&room) {
                        self.end_replaced();
                        return None;
                    }

                    self.mark_restored(Feed::Room);
                    self.apply_room(room).await;
                    self.recompute().await;
                    return Some(feed);
                }
                Err(e) => debug!("Resubscribing to room {} failed: {}", self.pin, e),
            }

            attempt += 1;
        }
    }

    /// Reopens the swipe feed with backoff. Returns [None] if the session closed meanwhile.
    async fn resubscribe_swipes(&mut self) -> Option<Subscription<Vec<Swipe>>> {
        self.mark_lost(Feed::Swipes);

        let mut attempt = 0;
        loop {
            tokio::time::sleep(self.config.resubscribe_backoff(attempt)).await;

            if self.is_closed() {
                return None;
            }

            // The swipe log of another room under the same PIN must not be adopted
            match self.store.room_by_pin(&self.pin).await {
                Ok(room) if self.is_replaced_by(&room) => {
                    self.end_replaced();
                    return None;
                }
                Ok(_) => {}
                Err(e) => {
                    debug!("Checking room {} before resubscribing failed: {}", self.pin, e);
                    attempt += 1;
                    continue;
                }
            }

            match self.store.watch_swipes(&self.pin).await {
                Ok(mut feed) => {
                    self.mark_restored(Feed::Swipes);
                    self.apply_swipes(feed.current()).await;
                    return Some(feed);
                }
                Err(e) => debug!("Resubscribing to swipes of room {} failed: {}", self.pin, e),
            }

            attempt += 1;
        }
    }
}
