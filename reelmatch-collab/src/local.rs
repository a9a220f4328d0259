use std::sync::Arc;

use log::warn;
use reelmatch_core::{LocalState, LocalStore};
use tokio::sync::Mutex;

/// Loads local state lazily and writes it back after every change.
///
/// Persistence failures are logged and otherwise ignored, the in-memory copy stays authoritative
/// for the rest of the process.
pub struct LocalPersistence {
    store: Arc<dyn LocalStore>,
    state: Mutex<Option<LocalState>>,
}

impl LocalPersistence {
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self {
            store,
            state: Default::default(),
        }
    }

    /// Returns a copy of the current state
    pub async fn state(&self) -> LocalState {
        let mut guard = self.state.lock().await;
        let state = self.ensure_loaded(&mut guard).await;

        state.clone()
    }

    /// Modifies the state and persists it
    pub async fn update<T>(&self, modify: impl FnOnce(&mut LocalState) -> T) -> T {
        let mut guard = self.state.lock().await;
        let state = self.ensure_loaded(&mut guard).await;

        let result = modify(state);

        if let Err(e) = self.store.save(state).await {
            warn!("Could not persist local state: {}", e);
        }

        result
    }

    async fn ensure_loaded<'a>(&self, slot: &'a mut Option<LocalState>) -> &'a mut LocalState {
        if slot.is_none() {
            let loaded = self.store.load().await.unwrap_or_else(|e| {
                warn!("Could not load local state, starting fresh: {}", e);
                LocalState::default()
            });

            *slot = Some(loaded);
        }

        slot.get_or_insert_with(LocalState::default)
    }
}
