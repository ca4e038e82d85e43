//! Client-side backoff: turns observed 429s into a wait, then a lockout.
//!
//! The persisted [`BlockState`] is the only source of truth. Phases and
//! countdown values are derived from it and the current time, so a client that
//! restarts mid-lockout picks up exactly where it left off.

use serde::{Deserialize, Serialize};

use crate::store::{BlockStore, StoreError};

/// Consecutive denials after which the client is locked out.
pub const LOCKOUT_THRESHOLD: u32 = 5;

/// Persisted block record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockState {
    pub attempts: u32,
    pub blocked: bool,
    pub unblock_at_epoch_ms: u64,
}

/// Derived view of a [`BlockState`] at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffPhase {
    Idle,
    /// Denied fewer than [`LOCKOUT_THRESHOLD`] times; `remaining_secs` may be zero
    /// once the latest wait has run out.
    Cooling { remaining_secs: u64 },
    Locked { remaining_secs: u64 },
}

impl BackoffPhase {
    pub fn remaining_secs(&self) -> u64 {
        match self {
            BackoffPhase::Idle => 0,
            BackoffPhase::Cooling { remaining_secs } | BackoffPhase::Locked { remaining_secs } => {
                *remaining_secs
            }
        }
    }

    /// Whether the client should hold off issuing requests.
    pub fn is_waiting(&self) -> bool {
        self.remaining_secs() > 0
    }
}

impl BlockState {
    /// A lockout whose deadline has passed reads as `Idle` even before the
    /// record is cleared.
    pub fn phase(&self, now_ms: u64) -> BackoffPhase {
        if self.lockout_expired(now_ms) {
            BackoffPhase::Idle
        } else if self.blocked {
            BackoffPhase::Locked {
                remaining_secs: self.remaining_secs(now_ms),
            }
        } else if self.attempts == 0 {
            BackoffPhase::Idle
        } else {
            BackoffPhase::Cooling {
                remaining_secs: self.remaining_secs(now_ms),
            }
        }
    }

    /// Whole seconds until the deadline, rounded up and clamped at zero.
    pub fn remaining_secs(&self, now_ms: u64) -> u64 {
        self.unblock_at_epoch_ms.saturating_sub(now_ms).div_ceil(1000)
    }

    /// Apply one observed 429. The deadline always moves to `now + retry_after`.
    /// An expired lockout is cleared first, so counting starts over.
    pub fn record_denial(&mut self, retry_after_secs: u64, now_ms: u64) {
        if self.lockout_expired(now_ms) {
            *self = BlockState::default();
        }
        self.attempts = self.attempts.saturating_add(1);
        self.unblock_at_epoch_ms = now_ms.saturating_add(retry_after_secs.saturating_mul(1000));
        if self.attempts >= LOCKOUT_THRESHOLD {
            self.blocked = true;
        }
    }

    /// Whether a lockout has run out and the record must go back to idle.
    pub fn lockout_expired(&self, now_ms: u64) -> bool {
        self.blocked && now_ms >= self.unblock_at_epoch_ms
    }
}

/// One countdown step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub remaining_secs: u64,
    /// The lockout ended on this tick and the record was reset.
    pub unlocked: bool,
}

/// Backoff state machine bound to the store that persists it.
///
/// Every transition is written to the store before it takes effect in memory,
/// so a failed write leaves both views on the previous state.
#[derive(Debug)]
pub struct BackoffMachine<S> {
    store: S,
    state: BlockState,
}

impl<S: BlockStore> BackoffMachine<S> {
    /// Rebuild the machine from storage, expiring a lockout whose deadline passed.
    pub fn restore(store: S, now_ms: u64) -> Result<Self, StoreError> {
        let state = store.load()?;
        let mut machine = Self { store, state };
        if machine.state.lockout_expired(now_ms) {
            machine.reset()?;
        }
        Ok(machine)
    }

    pub fn state(&self) -> BlockState {
        self.state
    }

    pub fn phase(&self, now_ms: u64) -> BackoffPhase {
        self.state.phase(now_ms)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Record a 429 carrying `retry_after_secs`.
    pub fn observe_denial(
        &mut self,
        retry_after_secs: u64,
        now_ms: u64,
    ) -> Result<BackoffPhase, StoreError> {
        let mut next = self.state;
        next.record_denial(retry_after_secs, now_ms);
        self.store.save(&next)?;
        self.state = next;
        Ok(self.state.phase(now_ms))
    }

    /// Advance the countdown; ends a lockout once its deadline has passed.
    pub fn tick(&mut self, now_ms: u64) -> Result<Tick, StoreError> {
        if self.state.lockout_expired(now_ms) {
            self.reset()?;
            return Ok(Tick {
                remaining_secs: 0,
                unlocked: true,
            });
        }
        Ok(Tick {
            remaining_secs: self.state.remaining_secs(now_ms),
            unlocked: false,
        })
    }

    fn reset(&mut self) -> Result<(), StoreError> {
        self.store.clear()?;
        self.state = BlockState::default();
        Ok(())
    }
}
