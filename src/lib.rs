//! # Luno Client
//!
//! A client for the Luno HTTP API.
//!
//! Every request is signed with HMAC-SHA512 over a canonical form of the
//! method, versioned route, query parameters and JSON body. Responses are
//! mapped into a single [`Error`] type that distinguishes caller mistakes,
//! transport failures and API errors.
//!
//! ## Features
//!
//! - **Signed requests**: `key`, `timestamp` and `sign` are added to every request
//! - **Verb helpers**: `get`, `post`, `put`, `patch` and `delete` over a single `request`
//! - **Sandbox routing**: optional `sandbox=true` on every request
//! - **Session middleware**: axum middleware resolving a session cookie through the API
//!
//! ## Architecture
//!
//! - [`client`] - Client, request signer and canonical query encoding
//! - [`session`] - Session-cookie middleware for axum
//! - [`error`] - Error taxonomy and normalization
//! - [`config`] - Client configuration and CLI arguments
//!
//! ## Example
//!
//! ```rust,no_run
//! use luno_client::{Client, Config, Params};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), luno_client::Error> {
//!     let client = Client::new(Config::new("my-key", "my-secret").with_sandbox(true))?;
//!
//!     let user = client
//!         .post("/users", &Params::new(), Some(&json!({"email": "ada@example.com"})))
//!         .await?;
//!
//!     match client.get("/users/unknown", &Params::new()).await {
//!         Err(err) if err.is_code("not_found") => println!("no such user"),
//!         other => println!("{:?}", other),
//!     }
//!     println!("{}", user);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod session;

// Re-export commonly used types
pub use client::{
    Client, Method, Params, SignatureError, SignedRequest, Signer, USER_AGENT,
};
pub use config::{
    Cli, Command, Config, ConnectionArgs, RequestArgs, RequestConfig, SignConfig,
    SignOutputFormat,
};
pub use error::{invalid_argument, normalize, ApiError, Error, ORIGIN};
pub use session::{
    session_middleware, MaybeSession, Session, SessionAccess, SessionBackend, SessionConfig,
    SessionResolver, SessionUser,
};
