use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Query, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use tracing::{debug, warn};

use crate::api_error::ApiError;
use crate::audit::{AuditFile, AuditLog};

/// Header accepted as an alternative to the `token` query parameter
pub const TOKEN_HEADER: &str = "x-access-token";

/// Decides whether a presented credential may use the API.
///
/// Endpoints never look at tokens themselves, so per-client credentials can
/// replace the shared secret by swapping the implementation.
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, token: Option<&str>) -> bool;
}

/// One static shared secret for every caller
pub struct StaticTokenAuthenticator {
    token: String,
}

impl StaticTokenAuthenticator {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl Authenticator for StaticTokenAuthenticator {
    fn authenticate(&self, token: Option<&str>) -> bool {
        matches!(token, Some(presented) if !self.token.is_empty() && presented == self.token)
    }
}

/// Caller address as seen by the listener, "unknown" when not served over TCP
#[derive(Debug, Clone)]
pub struct ClientAddr(pub String);

/// Middleware state: the authenticator plus where rejections are recorded
#[derive(Clone)]
pub struct TokenGuard {
    authenticator: Arc<dyn Authenticator>,
    audit_log: AuditLog,
}

impl TokenGuard {
    pub fn new(authenticator: Arc<dyn Authenticator>, audit_log: AuditLog) -> Self {
        Self {
            authenticator,
            audit_log,
        }
    }
}

/// Query parameter wins over the header; the first `token` pair is used
pub fn presented_token(request: &Request) -> Option<String> {
    let from_query = Query::<Vec<(String, String)>>::try_from_uri(request.uri())
        .ok()
        .and_then(|Query(pairs)| {
            pairs
                .into_iter()
                .find(|(key, _)| key == "token")
                .map(|(_, value)| value)
        });

    from_query.or_else(|| {
        request
            .headers()
            .get(TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    })
}

fn client_addr(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn require_token(
    State(guard): State<TokenGuard>,
    mut request: Request,
    next: Next,
) -> Response {
    let addr = client_addr(&request);
    let token = presented_token(&request);

    if !guard.authenticator.authenticate(token.as_deref()) {
        let line = format!(
            "[AUTH_FAIL] IP={} Token={} Time={}",
            addr,
            token.as_deref().unwrap_or("none"),
            Utc::now().to_rfc3339()
        );
        warn!("{}", line);
        guard.audit_log.append(AuditFile::Error, &line).await;
        return ApiError::Forbidden.into_response();
    }

    debug!("Token accepted for {}", addr);
    request.extensions_mut().insert(ClientAddr(addr));
    next.run(request).await
}
