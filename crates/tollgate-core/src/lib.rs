//! # Tollgate Core
//!
//! The domain layer of Tollgate.
//! This crate contains the admission vocabulary (identities, verdicts, decisions)
//! and the ports that rate-limit backends implement. No infrastructure dependencies.

pub mod domain;
pub mod error;
pub mod ports;

pub use error::DomainError;
