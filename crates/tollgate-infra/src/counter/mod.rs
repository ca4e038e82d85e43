//! Request counters backing the count endpoint.

mod local;

pub use local::LocalRequestCounter;

#[cfg(feature = "remote")]
mod remote;
#[cfg(feature = "remote")]
pub use self::remote::{RemoteCountConfig, RemoteRequestCounter};
