//! Axum middleware resolving the session cookie.
//!
//! For every request carrying the session cookie, the middleware asks the
//! [`SessionBackend`] for the session and:
//!
//! - on success, re-issues the cookie with the returned key and inserts
//!   [`Session`] and [`SessionUser`] into the request extensions
//! - on `session_not_found`, clears the cookie
//! - on any other failure, leaves the cookie alone
//!
//! The request always reaches the handler; session-service failures never
//! block it.
//!
//! # Example
//!
//! ```ignore
//! use axum::{middleware, routing::get, Router};
//! use luno_client::session::{session_middleware, MaybeSession, SessionConfig, SessionResolver};
//! use luno_client::{Client, Config};
//!
//! async fn whoami(MaybeSession(session): MaybeSession) -> String {
//!     session.map(|s| s.key).unwrap_or_default()
//! }
//!
//! let client = Client::new(Config::new("key", "secret"))?;
//! let resolver = SessionResolver::new(client, SessionConfig::new());
//! let app = Router::new()
//!     .route("/whoami", get(whoami))
//!     .layer(middleware::from_fn_with_state(resolver, session_middleware::<Client>));
//! ```

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use cookie::Cookie;
use http::header::{SET_COOKIE, USER_AGENT};
use tracing::{debug, warn};

use super::backend::{Session, SessionAccess, SessionBackend, SessionUser, SESSION_NOT_FOUND};
use super::cookies::SessionConfig;

/// Header set by Cloudflare with the original client address.
pub const CF_CONNECTING_IP: &str = "cf-connecting-ip";

/// Standard proxy header with the client address chain.
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

// =============================================================================
// Resolver State
// =============================================================================

/// Middleware state: the session backend and cookie configuration.
pub struct SessionResolver<B> {
    backend: Arc<B>,
    config: Arc<SessionConfig>,
}

impl<B> Clone for SessionResolver<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            config: Arc::clone(&self.config),
        }
    }
}

impl<B: SessionBackend> SessionResolver<B> {
    pub fn new(backend: B, config: SessionConfig) -> Self {
        Self::from_arc(Arc::new(backend), config)
    }

    /// Share an existing backend.
    pub fn from_arc(backend: Arc<B>, config: SessionConfig) -> Self {
        Self {
            backend,
            config: Arc::new(config),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}

// =============================================================================
// Axum Middleware
// =============================================================================

/// Resolve the session cookie for an inbound request.
pub async fn session_middleware<B>(
    State(resolver): State<SessionResolver<B>>,
    mut request: Request,
    next: Next,
) -> Response
where
    B: SessionBackend + 'static,
{
    let config = resolver.config();

    let Some(key) = config.read_key(request.headers()) else {
        return next.run(request).await;
    };

    let access = SessionAccess {
        key,
        ip: client_ip(&request),
        user_agent: header_string(request.headers(), USER_AGENT.as_str()),
    };

    match resolver.backend().access_session(&access).await {
        Ok(session) => {
            debug!(rotated = session.key != access.key, "Session resolved");

            let cookie = config.session_cookie(session.key.clone());
            if let Some(user) = session.user.clone() {
                request.extensions_mut().insert(SessionUser(user));
            }
            request.extensions_mut().insert(session);

            let mut response = next.run(request).await;
            append_cookie(&mut response, &cookie);
            response
        }
        Err(err) if err.is_code(SESSION_NOT_FOUND) => {
            debug!(cookie = %config.cookie_name, "Session not found, clearing cookie");

            let mut response = next.run(request).await;
            append_cookie(&mut response, &config.removal_cookie());
            response
        }
        Err(err) => {
            warn!(
                error = %err,
                code = err.code().unwrap_or("none"),
                status = err.status(),
                "Session lookup failed, continuing without session"
            );
            next.run(request).await
        }
    }
}

/// Best-effort client address: `cf-connecting-ip`, then `x-forwarded-for`,
/// then the connection's peer address (requires `ConnectInfo`).
pub fn client_ip<T>(request: &http::Request<T>) -> Option<String> {
    header_string(request.headers(), CF_CONNECTING_IP)
        .or_else(|| header_string(request.headers(), X_FORWARDED_FOR))
        .or_else(|| {
            request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn append_cookie(response: &mut Response, cookie: &Cookie<'_>) {
    match HeaderValue::from_str(&cookie.encoded().to_string()) {
        Ok(value) => {
            response.headers_mut().append(SET_COOKIE, value);
        }
        Err(err) => {
            warn!(cookie = cookie.name(), error = %err, "Dropping invalid Set-Cookie header");
        }
    }
}

// =============================================================================
// Extractor
// =============================================================================

/// Axum extractor for the session resolved by [`session_middleware`].
///
/// Never rejects: handlers see `None` when there is no session.
#[derive(Debug, Clone)]
pub struct MaybeSession(pub Option<Session>);

impl<S> FromRequestParts<S> for MaybeSession
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeSession(parts.extensions.get::<Session>().cloned()))
    }
}

// =============================================================================
// Tests
// =============================================================================
