mod catalog;
mod events;
mod identity;
mod local;
mod rooms;
mod swipes;

use std::sync::Arc;

pub use catalog::*;
pub use events::*;
pub use identity::*;
pub use local::*;
pub use rooms::*;
pub use swipes::*;

use crossbeam::channel::unbounded;
use reelmatch_core::{Backend, CatalogProvider, Config, LocalStore, ParticipantId};

/// The reelmatch client core, facilitating identity, catalogs, rooms, and match synchronization.
pub struct Collab<Db, Cp> {
    context: CollabContext<Db, Cp>,
    event_receiver: EventReceiver,

    pub identity: IdentityProvider,
    pub catalog: CatalogAdapter<Cp>,
    pub rooms: RoomManager<Db, Cp>,
}

/// A type passed to various components of the collab system, to access state and emit events.
pub struct CollabContext<Db, Cp> {
    pub config: Config,
    pub store: Arc<Db>,
    pub provider: Arc<Cp>,
    pub local: Arc<LocalPersistence>,

    event_sender: EventSender,
}

impl<Db, Cp> Collab<Db, Cp>
where
    Db: Backend,
    Cp: CatalogProvider,
{
    pub fn new(
        config: Config,
        store: Arc<Db>,
        provider: Arc<Cp>,
        local: Arc<dyn LocalStore>,
    ) -> Self {
        let (event_sender, event_receiver) = unbounded();

        let context = CollabContext {
            config,
            store,
            provider,
            local: Arc::new(LocalPersistence::new(local)),
            event_sender,
        };

        Self {
            identity: IdentityProvider::new(&context.local),
            catalog: CatalogAdapter::new(&context),
            rooms: RoomManager::new(&context),
            event_receiver,
            context,
        }
    }

    pub fn config(&self) -> &Config {
        &self.context.config
    }

    /// Shorthand for the identity of this client
    pub async fn participant_id(&self) -> ParticipantId {
        self.identity.get_or_create_participant_id().await
    }

    /// Blocks until the next event is received.
    pub fn wait_for_event(&self) -> Option<CollabEvent> {
        self.event_receiver.recv().ok()
    }

    /// Returns all events that were emitted since the last call, without blocking.
    pub fn drain_events(&self) -> Vec<CollabEvent> {
        self.event_receiver.try_iter().collect()
    }

    /// Returns a receiver that can be moved to another thread
    pub fn events(&self) -> EventReceiver {
        self.event_receiver.clone()
    }
}

impl<Db, Cp> CollabContext<Db, Cp> {
    pub fn emit(&self, event: CollabEvent) {
        // Nobody listening is fine
        let _ = self.event_sender.send(event);
    }

    pub fn event_sender(&self) -> EventSender {
        self.event_sender.clone()
    }
}

impl<Db, Cp> Clone for CollabContext<Db, Cp> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            store: self.store.clone(),
            provider: self.provider.clone(),
            local: self.local.clone(),
            event_sender: self.event_sender.clone(),
        }
    }
}
