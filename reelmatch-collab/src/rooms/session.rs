use std::sync::Arc;

use crossbeam::atomic::AtomicCell;
use log::info;
use reelmatch_core::{Backend, Config, Match, ParticipantId, Pin, RoomData, StoreResult, Swipe};
use tokio::{sync::watch, task::JoinHandle};

use crate::EventSender;

use super::sync::Synchronizer;

pub type SessionId = u64;

static SESSION_COUNTER: AtomicCell<SessionId> = AtomicCell::new(1);

/// The local replica of a room, as last pushed by the store
#[derive(Debug, Clone)]
pub struct RoomView {
    pub pin: Pin,
    pub room: Option<RoomData>,
    pub swipes: Vec<Swipe>,
    /// True while a subscription is being reestablished, the view may lag behind the store
    pub stale: bool,
}

impl RoomView {
    pub fn matches(&self) -> &[Match] {
        self.room.as_ref().map(|r| r.matches.as_slice()).unwrap_or_default()
    }

    pub fn is_started(&self) -> bool {
        self.room.as_ref().is_some_and(|r| r.started)
    }

    pub fn members(&self) -> &[ParticipantId] {
        self.room.as_ref().map(|r| r.members.as_slice()).unwrap_or_default()
    }

    /// The swipes of one participant, in log order
    pub fn swipes_of<'a>(&'a self, participant: &'a ParticipantId) -> impl Iterator<Item = &'a Swipe> {
        self.swipes
            .iter()
            .filter(move |s| &s.participant_id == participant)
    }
}

/// An open pair of subscriptions to one room, kept in sync by a background task.
///
/// Closing the session, or dropping it, stops the task. Nothing is published or written for the
/// room afterwards. The session also closes itself when the PIN is taken over by another room.
pub struct RoomSession {
    id: SessionId,
    pin: Pin,
    view: watch::Receiver<RoomView>,
    closed: Arc<AtomicCell<bool>>,
    task: JoinHandle<()>,
}

impl RoomSession {
    pub(crate) async fn open<Db: Backend>(
        store: &Arc<Db>,
        config: &Config,
        events: Option<EventSender>,
        pin: Pin,
        member: Option<ParticipantId>,
        writes_matches: bool,
    ) -> StoreResult<Self> {
        let mut room_feed = store.watch_room(&pin).await?;
        let mut swipe_feed = store.watch_swipes(&pin).await?;

        let room = room_feed.current();
        let swipes = swipe_feed.current();

        let (publisher, view) = watch::channel(RoomView {
            pin: pin.clone(),
            room: Some(room.clone()),
            swipes: swipes.clone(),
            stale: false,
        });

        let closed = Arc::new(AtomicCell::new(false));
        let synchronizer = Synchronizer {
            store: store.clone(),
            config: config.clone(),
            events,
            pin: pin.clone(),
            member,
            writes_matches,
            room: Some(room),
            swipes,
            publisher,
            closed: closed.clone(),
            lost: vec![],
        };

        let task = tokio::spawn(synchronizer.run(room_feed, swipe_feed));
        let id = SESSION_COUNTER.fetch_add(1);

        info!("Opened session {} for room {}", id, pin);

        Ok(Self {
            id,
            pin,
            view,
            closed,
            task,
        })
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn pin(&self) -> &Pin {
        &self.pin
    }

    pub fn is_open(&self) -> bool {
        !self.closed.load()
    }

    /// A snapshot of the current view
    pub fn view(&self) -> RoomView {
        self.view.borrow().clone()
    }

    /// Returns a receiver that is notified whenever the view changes
    pub fn subscribe(&self) -> watch::Receiver<RoomView> {
        self.view.clone()
    }

    pub fn close(&self) {
        if self.closed.swap(true) {
            return;
        }

        self.task.abort();
        info!("Closed session {} for room {}", self.id, self.pin);
    }
}

impl Drop for RoomSession {
    fn drop(&mut self) {
        self.close();
    }
}
