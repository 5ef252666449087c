//! HTTP client layer for the Luno API.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                           Client                                │
//! │        get / post / put / patch / delete  →  request            │
//! │                                                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────────┐  │
//! │  │   method    │  │   signer    │  │         query           │  │
//! │  │  (verbs)    │  │ (HMAC-512)  │  │  (canonical encoding)   │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod method;
pub mod query;
pub mod signer;

pub use api::{Client, USER_AGENT};
pub use method::Method;
pub use query::Params;
pub use signer::{
    canonical_string, format_timestamp, SignatureError, SignedRequest, Signer, KEY_PARAM,
    SANDBOX_PARAM, SIGN_PARAM, TIMESTAMP_PARAM,
};
