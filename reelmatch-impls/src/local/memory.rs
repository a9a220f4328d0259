use async_trait::async_trait;
use parking_lot::Mutex;
use reelmatch_core::{LocalState, LocalStore, PersistError};

/// Keeps local state in memory, for simulated devices and tests
#[derive(Default)]
pub struct MemoryLocalStore {
    state: Mutex<LocalState>,
}

impl MemoryLocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from a previously saved state, like an app that is launched again
    pub fn with_state(state: LocalState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    pub fn snapshot(&self) -> LocalState {
        self.state.lock().clone()
    }
}

#[async_trait]
impl LocalStore for MemoryLocalStore {
    async fn load(&self) -> Result<LocalState, PersistError> {
        Ok(self.snapshot())
    }

    async fn save(&self, state: &LocalState) -> Result<(), PersistError> {
        *self.state.lock() = state.clone();
        Ok(())
    }
}
