//! JSON file persistence for the block record.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tollgate_shared::{BlockState, BlockStore, StoreError};

/// Keeps the block record in a JSON file so a restarted client resumes its wait.
///
/// Writes go to a sibling temp file that is then renamed over the target, so
/// the record on disk is always a complete one.
#[derive(Debug, Clone)]
pub struct FileBlockStore {
    path: PathBuf,
}

impl FileBlockStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

impl BlockStore for FileBlockStore {
    fn load(&self) -> Result<BlockState, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BlockState::default()),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Block record unreadable, starting idle");
                return Ok(BlockState::default());
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(state) => Ok(state),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Block record corrupt, starting idle");
                Ok(BlockState::default())
            }
        }
    }

    fn save(&self, state: &BlockState) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let temp = self.temp_path();
        fs::write(&temp, serde_json::to_vec_pretty(state)?)?;
        fs::rename(&temp, &self.path)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tollgate_shared::{BackoffMachine, BackoffPhase};

    const NOW: u64 = 1_700_000_000_000;

    fn temp_store(name: &str) -> FileBlockStore {
        let path = std::env::temp_dir().join(format!(
            "tollgate-{}-{name}/block.json",
            std::process::id()
        ));
        let _ = fs::remove_file(&path);
        FileBlockStore::new(path)
    }

    #[test]
    fn test_missing_file_loads_idle() {
        let store = temp_store("missing");
        assert_eq!(store.load().unwrap(), BlockState::default());
        store.clear().unwrap();
    }

    #[test]
    fn test_save_then_load() {
        let store = temp_store("roundtrip");
        let state = BlockState {
            attempts: 3,
            blocked: false,
            unblock_at_epoch_ms: NOW + 4_000,
        };

        store.save(&state).unwrap();
        assert_eq!(store.load().unwrap(), state);
        assert!(!store.temp_path().exists());

        let raw: serde_json::Value = serde_json::from_slice(&fs::read(store.path()).unwrap()).unwrap();
        assert_eq!(raw["unblockAtEpochMs"], NOW + 4_000);

        store.clear().unwrap();
        assert!(!store.path().exists());
    }

    #[test]
    fn test_corrupt_file_loads_idle() {
        let store = temp_store("corrupt");
        store.save(&BlockState::default()).unwrap();
        fs::write(store.path(), b"{ not json").unwrap();

        assert_eq!(store.load().unwrap(), BlockState::default());
        store.clear().unwrap();
    }

    #[test]
    fn test_lockout_survives_restart() {
        let store = temp_store("restart");
        store
            .save(&BlockState {
                attempts: 5,
                blocked: true,
                unblock_at_epoch_ms: NOW + 10_000,
            })
            .unwrap();

        let machine = BackoffMachine::restore(store.clone(), NOW).unwrap();
        assert_eq!(machine.phase(NOW), BackoffPhase::Locked { remaining_secs: 10 });

        let machine = BackoffMachine::restore(store.clone(), NOW + 10_000).unwrap();
        assert_eq!(machine.phase(NOW + 10_000), BackoffPhase::Idle);
        assert!(!store.path().exists());
    }
}
