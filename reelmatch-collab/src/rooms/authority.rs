use std::sync::Arc;

use dashmap::DashMap;
use log::info;
use reelmatch_core::{Backend, Config, Pin, StoreResult};

use super::{RoomSession, RoomView};

/// The single writer of matches, for deployments where clients only observe.
///
/// Every attached room gets its own session that recomputes and persists matches whenever the
/// swipe log, the member list, or the started flag changes.
pub struct MatchAuthority<Db> {
    store: Arc<Db>,
    config: Config,
    sessions: DashMap<Pin, RoomSession>,
}

impl<Db> MatchAuthority<Db>
where
    Db: Backend,
{
    pub fn new(store: Arc<Db>, config: Config) -> Self {
        Self {
            store,
            config,
            sessions: DashMap::new(),
        }
    }

    /// Starts writing matches for a room. Attaching twice is a no-op, unless the PIN has since
    /// been taken over by another room.
    pub async fn attach(&self, pin: &Pin) -> StoreResult<()> {
        if self.sessions.get(pin).is_some_and(|s| s.is_open()) {
            return Ok(());
        }

        let session =
            RoomSession::open(&self.store, &self.config, None, pin.clone(), None, true).await?;
        self.sessions.insert(pin.clone(), session);

        info!("Match authority attached to room {}", pin);
        Ok(())
    }

    /// Stops writing matches for a room
    pub fn detach(&self, pin: &Pin) {
        if let Some((_, session)) = self.sessions.remove(pin) {
            session.close();
            info!("Match authority detached from room {}", pin);
        }
    }

    pub fn view(&self, pin: &Pin) -> Option<RoomView> {
        self.sessions.get(pin).map(|s| s.view())
    }

    pub fn rooms(&self) -> Vec<Pin> {
        self.sessions.iter().map(|s| s.key().clone()).collect()
    }
}
