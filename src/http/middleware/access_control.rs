//! Access guard middleware.
//! Enforces the IP allow-list.
//!
//! The guard looks only at the peer address. It never reads the token or the
//! path, so it can sit in front of any route independently of token checks.
//!
//! Both guards also pin the configuration snapshot for the request: the
//! handler behind them reads the same `Arc<Settings>` the guard evaluated.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::IpRestrictionConfig;
use crate::http::error::RelayError;
use crate::http::server::{AppState, Settings};
use crate::observability::metrics;
use crate::security::cidr;

/// Outcome of the guard for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    /// No peer address could be determined.
    DenyUnknownAddress,
    /// Address outside every configured range.
    DenyAddress(IpAddr),
}

/// Decide whether `client` may proceed under `config`.
///
/// IPv4-mapped IPv6 peers (dual-stack listeners) are compared as IPv4.
pub fn evaluate(config: &IpRestrictionConfig, client: Option<IpAddr>) -> GuardDecision {
    if !config.enabled {
        return GuardDecision::Allow;
    }

    let address = match client {
        Some(ip) => ip.to_canonical(),
        None => return GuardDecision::DenyUnknownAddress,
    };

    if cidr::is_allowed(address, &config.allowed_ranges) {
        GuardDecision::Allow
    } else {
        GuardDecision::DenyAddress(address)
    }
}

fn client_address(req: &Request<Body>) -> Option<IpAddr> {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
}

/// Load the snapshot once and attach it to the request.
fn pin_snapshot(state: &AppState, req: &mut Request<Body>) -> Arc<Settings> {
    let settings = state.snapshot();
    req.extensions_mut().insert(settings.clone());
    settings
}

async fn enforce(settings: &Settings, req: Request<Body>, next: Next) -> Response {
    match evaluate(&settings.config.ip_restriction, client_address(&req)) {
        GuardDecision::Allow => next.run(req).await,
        GuardDecision::DenyUnknownAddress => {
            tracing::warn!("Unable to determine client IP address");
            metrics::record_access_denied("unknown_address");
            RelayError::Forbidden.into_response()
        }
        GuardDecision::DenyAddress(ip) => {
            tracing::warn!(ip = %ip, path = %req.uri().path(), "Unauthorized access attempt");
            metrics::record_access_denied("ip_not_allowed");
            RelayError::Forbidden.into_response()
        }
    }
}

/// Guard for link / manifest routes: applies whenever the allow-list is on.
pub async fn guard_companion(State(state): State<AppState>, mut req: Request<Body>, next: Next) -> Response {
    let settings = pin_snapshot(&state, &mut req);
    enforce(&settings, req, next).await
}

/// Guard for the stream route: applies only with `guard_stream` set.
pub async fn guard_stream(State(state): State<AppState>, mut req: Request<Body>, next: Next) -> Response {
    let settings = pin_snapshot(&state, &mut req);
    if !settings.config.ip_restriction.guard_stream {
        return next.run(req).await;
    }
    enforce(&settings, req, next).await
}
