use std::net::{IpAddr, SocketAddr};
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{Extensions, HeaderMap},
    middleware::Next,
    response::Response,
};
use shared::protocol::FORWARDED_FOR_HEADER;
use crate::api::error::ApiError;
use crate::api::routes::AppState;

/// Address of the client that sent the request, as resolved by [`ban_gate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIp(pub IpAddr);

/// The originating client address: the last X-Forwarded-For hop when
/// trusted, otherwise the TCP peer.
///
/// Only the last hop is appended by the proxy in front of us; anything
/// before it came from the client and may be forged.
pub fn resolve(headers: &HeaderMap, extensions: &Extensions, trust_forwarded_for: bool) -> Option<IpAddr> {
    let forwarded = trust_forwarded_for
        .then(|| headers.get_all(FORWARDED_FOR_HEADER).iter().last())
        .flatten()
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.rsplit(',').next())
        .and_then(|hop| hop.trim().parse::<IpAddr>().ok());

    forwarded
        .or_else(|| {
            extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip())
        })
        .map(|ip| ip.to_canonical())
}

/// Rejects banned clients before any handler runs and records the client
/// address for the handlers that need it.
pub async fn ban_gate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let ip = resolve(req.headers(), req.extensions(), state.trust_forwarded_for)
        .ok_or(ApiError::NoClientAddress)?;

    if state.ban_list.contains_addr(ip) {
        tracing::warn!("Rejected request from banned address {} to {}", ip, req.uri().path());
        return Err(ApiError::Banned);
    }

    req.extensions_mut().insert(ClientIp(ip));
    Ok(next.run(req).await)
}
