//! Durable client-side storage for the block record.

use std::sync::Mutex;

use crate::backoff::BlockState;

/// Storage for a client's [`BlockState`].
///
/// Implementations write the record as a single unit so a reader never sees
/// `attempts`, `blocked` and the deadline out of step with each other.
pub trait BlockStore {
    /// Load the stored record, or the idle default when nothing is stored.
    fn load(&self) -> Result<BlockState, StoreError>;

    fn save(&self, state: &BlockState) -> Result<(), StoreError>;

    fn clear(&self) -> Result<(), StoreError>;
}

/// Block store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// In-memory block store. Lost when the process exits.
#[derive(Debug, Default)]
pub struct InMemoryBlockStore {
    slot: Mutex<Option<BlockState>>,
}

impl InMemoryBlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: BlockState) -> Self {
        Self {
            slot: Mutex::new(Some(state)),
        }
    }

    /// The stored record, if any, without defaulting.
    pub fn stored(&self) -> Option<BlockState> {
        *self.slot.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl BlockStore for InMemoryBlockStore {
    fn load(&self) -> Result<BlockState, StoreError> {
        Ok(self.stored().unwrap_or_default())
    }

    fn save(&self, state: &BlockState) -> Result<(), StoreError> {
        *self.slot.lock().unwrap_or_else(|p| p.into_inner()) = Some(*state);
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        *self.slot.lock().unwrap_or_else(|p| p.into_inner()) = None;
        Ok(())
    }
}

impl<S: BlockStore + ?Sized> BlockStore for &S {
    fn load(&self) -> Result<BlockState, StoreError> {
        (**self).load()
    }

    fn save(&self, state: &BlockState) -> Result<(), StoreError> {
        (**self).save(state)
    }

    fn clear(&self) -> Result<(), StoreError> {
        (**self).clear()
    }
}
