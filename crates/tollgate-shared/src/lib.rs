//! # Tollgate Shared
//!
//! The contract between the gate and the clients it throttles: header names,
//! response bodies, and the client-side backoff machine that reads them.
//! Nothing here depends on a runtime, so the crate also builds for WASM front-ends.

pub mod backoff;
pub mod dto;
pub mod headers;
pub mod response;
pub mod store;

pub use backoff::{BackoffMachine, BackoffPhase, BlockState, LOCKOUT_THRESHOLD, Tick};
pub use response::{DenialBody, ErrorBody, LocalDenialBody};
pub use store::{BlockStore, InMemoryBlockStore, StoreError};
