//! Header names that make up the wire contract between the gate, the
//! decision service and clients. Lowercase so they can be used with
//! `HeaderName::from_static`.

/// Seconds the caller should wait before retrying.
pub const RETRY_AFTER: &str = "retry-after";
/// Requests allowed per window.
pub const RATE_LIMIT_LIMIT: &str = "x-ratelimit-limit";
/// Requests left in the current window.
pub const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";
/// Unix epoch seconds at which the window resets.
pub const RATE_LIMIT_RESET: &str = "x-ratelimit-reset";

/// Proxy header carrying the original client address chain.
pub const FORWARDED_FOR: &str = "x-forwarded-for";

// Forwarded to the decision and count services.
pub const CLIENT_IP: &str = "x-client-ip";
pub const ORIGINAL_METHOD: &str = "x-method";
pub const ORIGINAL_PATH: &str = "x-path";
