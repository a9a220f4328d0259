use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use reelmatch_core::{LocalState, LocalStore, PersistError};
use tokio::fs;

/// Persists local state as a JSON file
pub struct FileLocalStore {
    path: PathBuf,
}

impl FileLocalStore {
    pub const FILE_NAME: &'static str = "reelmatch-state.json";

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Stores the state in the default file inside the given directory
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(Self::FILE_NAME))
    }
}

#[async_trait]
impl LocalStore for FileLocalStore {
    async fn load(&self) -> Result<LocalState, PersistError> {
        let text = match fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(LocalState::default()),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&text).map_err(|e| PersistError::Format(e.to_string()))
    }

    async fn save(&self, state: &LocalState) -> Result<(), PersistError> {
        let text =
            serde_json::to_string_pretty(state).map_err(|e| PersistError::Format(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write to a sibling first so a crash never leaves half a file behind
        let temporary = self.path.with_extension("json.tmp");
        fs::write(&temporary, text).await?;
        fs::rename(&temporary, &self.path).await?;

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use reelmatch_core::{MovieId, ParticipantId, Swipe};

    use super::*;

    #[tokio::test]
    async fn test_missing_file_is_default_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileLocalStore::in_dir(dir.path());

        assert_eq!(store.load().await.unwrap(), LocalState::default());
    }

    #[tokio::test]
    async fn test_state_survives_a_restart() {
        let dir = tempfile::tempdir().unwrap();
        let participant = ParticipantId::new("user_abc");

        let state = LocalState {
            participant_id: Some(participant.clone()),
            swipes: vec![Swipe::new(participant, MovieId::from("603"), true)],
            room: None,
            movie_index: 3,
        };

        FileLocalStore::in_dir(dir.path().join("nested"))
            .save(&state)
            .await
            .unwrap();

        let restored = FileLocalStore::in_dir(dir.path().join("nested"))
            .load()
            .await
            .unwrap();

        assert_eq!(restored, state);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileLocalStore::in_dir(dir.path());

        fs::write(dir.path().join(FileLocalStore::FILE_NAME), "{ nope")
            .await
            .unwrap();

        assert!(matches!(
            store.load().await,
            Err(PersistError::Format(_))
        ));
    }
}
