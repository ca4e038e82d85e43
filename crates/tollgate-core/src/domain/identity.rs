//! Client identity - the normalized key every rate-limit decision is made against.

use std::fmt;
use std::net::Ipv6Addr;

/// Sentinel identity used when a request carries no usable origin.
pub const UNKNOWN_IDENTITY: &str = "0.0.0.0";

/// Normalized client key derived from a request's network origin.
///
/// Computed fresh per request and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientIdentity(String);

impl ClientIdentity {
    /// Resolve the identity from the `X-Forwarded-For` value and the socket peer.
    ///
    /// The leftmost forwarded entry wins; the peer address is only consulted when
    /// the header is missing or blank.
    pub fn resolve(forwarded_for: Option<&str>, peer: Option<&str>) -> Self {
        let forwarded = forwarded_for
            .and_then(|xff| xff.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty());

        Self::normalize(forwarded.or(peer).unwrap_or_default())
    }

    /// Normalize a raw address string.
    ///
    /// `::1` becomes `127.0.0.1`, IPv4-mapped IPv6 is unwrapped, and an empty
    /// input maps to [`UNKNOWN_IDENTITY`].
    pub fn normalize(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() {
            return Self(UNKNOWN_IDENTITY.to_string());
        }

        if let Ok(v6) = raw.parse::<Ipv6Addr>() {
            if v6 == Ipv6Addr::LOCALHOST {
                return Self("127.0.0.1".to_string());
            }
            if let Some(v4) = v6.to_ipv4_mapped() {
                return Self(v4.to_string());
            }
        }

        Self(raw.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_unknown(&self) -> bool {
        self.0 == UNKNOWN_IDENTITY
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
