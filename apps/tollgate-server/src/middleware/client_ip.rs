//! Client IP resolution and extractor.

use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload};
use std::future::{Ready, ready};

use tollgate_core::domain::ClientIdentity;
use tollgate_shared::headers::FORWARDED_FOR;

/// Resolve the normalized client identity of a request.
///
/// The leftmost `X-Forwarded-For` entry wins over the socket peer address.
pub fn resolve_identity(req: &HttpRequest) -> ClientIdentity {
    let forwarded = req
        .headers()
        .get(FORWARDED_FOR)
        .and_then(|v| v.to_str().ok());
    let peer = req.peer_addr().map(|addr| addr.ip().to_string());

    ClientIdentity::resolve(forwarded, peer.as_deref())
}

/// Client identity extractor.
///
/// Reuses the identity the rate-limit gate resolved, so a handler and the gate
/// always agree on who is asking.
#[derive(Debug, Clone)]
pub struct ClientIp(pub ClientIdentity);

impl FromRequest for ClientIp {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let identity = req
            .extensions()
            .get::<ClientIp>()
            .cloned()
            .unwrap_or_else(|| ClientIp(resolve_identity(req)));

        ready(Ok(identity))
    }
}
