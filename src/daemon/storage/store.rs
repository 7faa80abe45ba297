use std::{future::Future, io::ErrorKind, path::PathBuf};

use anyhow::Result;
use fs4::tokio::AsyncFileExt;
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncWriteExt},
};
use tracing::{debug, warn};

use super::state::StoreState;

/// Interface for abstracting persistence of [StoreState].
pub trait StateStore: Send + Sync {
    fn load(&self) -> impl Future<Output = Result<StoreState>> + Send;

    fn save(&self, state: &StoreState) -> impl Future<Output = Result<()>> + Send;
}

/// The main realization of [StateStore]. One JSON file, shared lock for
/// reads, exclusive lock for writes.
pub struct JsonStateStore {
    path: PathBuf,
}

const STATE_FILE_NAME: &str = "usage.json";

impl JsonStateStore {
    pub fn new(app_dir: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&app_dir)?;

        Ok(Self {
            path: app_dir.join(STATE_FILE_NAME),
        })
    }
}

impl StateStore for JsonStateStore {
    async fn load(&self) -> Result<StoreState> {
        let mut file = match File::open(&self.path).await {
            Ok(v) => v,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(StoreState::default()),
            Err(e) => return Err(e.into()),
        };

        file.lock_shared()?;
        let mut contents = String::new();
        let read = file.read_to_string(&mut contents).await;
        file.unlock_async().await?;
        read?;

        if contents.trim().is_empty() {
            return Ok(StoreState::default());
        }

        match serde_json::from_str(&contents) {
            Ok(v) => Ok(v),
            Err(e) => {
                // Might happen after a shutdown cut a write short. Starting
                // from an empty day beats refusing to start at all.
                warn!("State file {:?} was corrupted, starting fresh: {e}", self.path);
                Ok(StoreState::default())
            }
        }
    }

    async fn save(&self, state: &StoreState) -> Result<()> {
        let mut file = File::options()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .await?;

        let buffer = serde_json::to_vec(state)?;

        // Semi-safe acquire-release for a file
        file.lock_exclusive()?;
        let result = async {
            file.write_all(&buffer).await?;
            file.set_len(buffer.len() as u64).await?;
            file.flush().await?;
            Ok::<_, anyhow::Error>(())
        }
        .await;
        file.unlock_async().await?;
        debug!("Saved state into {:?}", self.path);
        result
    }
}

/// In-memory store used by unit tests across the daemon modules.
#[cfg(test)]
pub mod testing {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    pub struct MemoryStateStore {
        state: Mutex<StoreState>,
    }

    impl MemoryStateStore {
        pub fn with_state(state: StoreState) -> Self {
            Self {
                state: Mutex::new(state),
            }
        }

        pub fn current(&self) -> StoreState {
            self.state.lock().unwrap().clone()
        }
    }

    impl StateStore for MemoryStateStore {
        async fn load(&self) -> Result<StoreState> {
            Ok(self.state.lock().unwrap().clone())
        }

        async fn save(&self, state: &StoreState) -> Result<()> {
            *self.state.lock().unwrap() = state.clone();
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::Utc;
    use tempfile::tempdir;

    use super::*;

    #[tokio::test]
    async fn missing_file_loads_as_default() -> Result<()> {
        let dir = tempdir()?;
        let store = JsonStateStore::new(dir.path().to_path_buf())?;

        assert_eq!(store.load().await?, StoreState::default());
        Ok(())
    }

    #[tokio::test]
    async fn save_then_load_round_trips() -> Result<()> {
        let dir = tempdir()?;
        let store = JsonStateStore::new(dir.path().to_path_buf())?;

        let mut state = StoreState::default();
        state.usage.insert("a.com".into(), 70_000);
        state.limits.insert("a.com".into(), 60_000);
        state.cooldowns.insert("a.com".into(), Utc::now());

        store.save(&state).await?;
        assert_eq!(store.load().await?, state);
        Ok(())
    }

    #[tokio::test]
    async fn shorter_state_overwrites_longer_one() -> Result<()> {
        let dir = tempdir()?;
        let store = JsonStateStore::new(dir.path().to_path_buf())?;

        let mut state = StoreState::default();
        for i in 0..50 {
            state.usage.insert(format!("domain-{i}.com"), 1000);
        }
        store.save(&state).await?;

        let small = StoreState::default();
        store.save(&small).await?;
        assert_eq!(store.load().await?, small);
        Ok(())
    }

    #[tokio::test]
    async fn corrupted_file_loads_as_default() -> Result<()> {
        let dir = tempdir()?;
        let store = JsonStateStore::new(dir.path().to_path_buf())?;
        std::fs::write(dir.path().join(STATE_FILE_NAME), "{\"usage\": {\"a.c")?;

        assert_eq!(store.load().await?, StoreState::default());
        Ok(())
    }
}
