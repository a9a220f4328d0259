use std::sync::Arc;

use log::info;
use reelmatch_core::ParticipantId;

use crate::LocalPersistence;

/// Hands out the stable identifier of this device
pub struct IdentityProvider {
    local: Arc<LocalPersistence>,
}

impl IdentityProvider {
    pub fn new(local: &Arc<LocalPersistence>) -> Self {
        Self {
            local: local.clone(),
        }
    }

    /// Returns the persisted participant id, generating and persisting one on first use.
    ///
    /// If persistence fails, a fresh id is used for the rest of the process.
    pub async fn get_or_create_participant_id(&self) -> ParticipantId {
        if let Some(id) = self.local.state().await.participant_id {
            return id;
        }

        self.local
            .update(|state| {
                state
                    .participant_id
                    .get_or_insert_with(|| {
                        let id = ParticipantId::generate();
                        info!("Generated participant id {}", id);
                        id
                    })
                    .clone()
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use reelmatch_core::{LocalState, LocalStore, PersistError};
    use reelmatch_impls::MemoryLocalStore;

    use super::*;

    struct BrokenLocalStore;

    #[async_trait]
    impl LocalStore for BrokenLocalStore {
        async fn load(&self) -> Result<LocalState, PersistError> {
            Err(PersistError::Format("garbage".to_string()))
        }

        async fn save(&self, _state: &LocalState) -> Result<(), PersistError> {
            Err(PersistError::Io(std::io::Error::other("disk full")))
        }
    }

    fn provider(store: Arc<dyn LocalStore>) -> IdentityProvider {
        IdentityProvider::new(&Arc::new(LocalPersistence::new(store)))
    }

    #[tokio::test]
    async fn test_id_is_persisted() {
        let store = Arc::new(MemoryLocalStore::new());

        let first = provider(store.clone()).get_or_create_participant_id().await;
        let again = provider(store.clone()).get_or_create_participant_id().await;

        assert_eq!(first, again);
        assert_eq!(store.snapshot().participant_id, Some(first));
    }

    #[tokio::test]
    async fn test_persistence_failure_fails_open() {
        let identity = provider(Arc::new(BrokenLocalStore));

        let first = identity.get_or_create_participant_id().await;
        let second = identity.get_or_create_participant_id().await;

        assert!(first.as_str().starts_with("user_"));
        assert_eq!(first, second);
    }
}
