//! Session-cookie middleware.
//!
//! Exchanges a session cookie for a session and user record through the API,
//! for use in axum applications.
//!
//! ```text
//! ┌────────────┐  cookie   ┌───────────────────┐  POST /v1/sessions/access  ┌─────┐
//! │  request   │ ────────▶ │ session_middleware │ ─────────────────────────▶ │ API │
//! └────────────┘           └───────────────────┘ ◀───────────────────────── └─────┘
//!                              │  Session + SessionUser in extensions
//!                              │  Set-Cookie (re-issued or cleared)
//!                              ▼
//!                           handler
//! ```

pub mod backend;
pub mod cookies;
pub mod middleware;

pub use backend::{
    Session, SessionAccess, SessionBackend, SessionUser, SESSION_ACCESS_ROUTE, SESSION_NOT_FOUND,
};
pub use cookie::SameSite;
pub use cookies::{SessionConfig, DEFAULT_COOKIE_NAME, DEFAULT_MAX_AGE_MS};
pub use middleware::{client_ip, session_middleware, MaybeSession, SessionResolver};
