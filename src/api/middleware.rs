use axum::extract::{ConnectInfo, Request};
use axum::http::header::{HOST, ORIGIN};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::net::SocketAddr;
use tracing::warn;

use crate::error::AppError;

/// Host part (`host[:port]`) of an `Origin` header; empty for `null` and
/// other opaque origins.
fn origin_authority(origin: &str) -> &str {
    origin
        .split_once("://")
        .and_then(|(_, rest)| rest.split('/').next())
        .unwrap_or("")
}

/// Rejects `/api/` calls whose `Origin` names another host than the one the
/// request was sent to. Requests without an `Origin` header pass.
pub async fn check_origin(req: Request, next: Next) -> Response {
    if req.uri().path().starts_with("/api/") {
        if let Some(origin) = req.headers().get(ORIGIN) {
            let origin = origin.to_str().unwrap_or("");
            let host = req
                .headers()
                .get(HOST)
                .and_then(|h| h.to_str().ok())
                .unwrap_or("");
            if origin_authority(origin) != host {
                warn!(%origin, %host, path = %req.uri().path(), "Blocked cross-origin request");
                return AppError::Forbidden.into_response();
            }
        }
    }
    next.run(req).await
}

/// Caller identity for rate limiting and session quotas.
pub fn client_ip(connect_info: Option<ConnectInfo<SocketAddr>>) -> String {
    connect_info
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
