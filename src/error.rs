//! Error types for the Luno client.
//!
//! Every failure reaches the caller as an [`Error`]. Errors the client detects
//! itself (bad arguments, empty responses, structured API errors) are stamped
//! with the [`ORIGIN`] provenance marker. Transport failures and unrecognized
//! error bodies are handed back unchanged.

use std::fmt;

use serde_json::{Map, Value};
use thiserror::Error;

/// Provenance marker for errors produced by this client.
pub const ORIGIN: &str = "luno";

/// Code carried by argument-validation errors.
pub const INVALID_ARGUMENT: &str = "invalid_argument";

/// Code carried by responses without a body.
pub const EMPTY_RESPONSE: &str = "empty_response";

/// Structured error returned by the API in a non-2xx response.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    /// Human-readable message
    pub message: String,

    /// Server-assigned error code (e.g. "not_found")
    pub code: Option<String>,

    /// Server-reported HTTP status
    pub status: Option<u16>,

    /// Free-form details attached by the server
    pub extra: Option<Value>,

    /// Any other fields present in the error body
    pub fields: Map<String, Value>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Errors returned by the client and the session middleware.
#[derive(Debug, Error)]
pub enum Error {
    /// A caller-supplied argument is malformed
    #[error("Invalid argument: {argument} must be {must_be}")]
    InvalidArgument {
        argument: &'static str,
        value: Value,
        must_be: &'static str,
    },

    /// Network or timeout failure from the HTTP layer, passed through verbatim
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    /// The server answered without a body
    #[error("Empty response")]
    EmptyResponse { status: u16 },

    /// Non-2xx response carrying a structured error
    #[error("{0}")]
    Api(ApiError),

    /// Non-2xx response whose body has no `message` field
    #[error("Unrecognized error response (HTTP {status}): {body}")]
    Unrecognized { status: u16, body: Value },

    /// A successful response could not be decoded into the expected type
    #[error("Unexpected response shape: {0}")]
    Decode(#[from] serde_json::Error),
}

impl Error {
    /// Error code, when the error kind has one.
    pub fn code(&self) -> Option<&str> {
        match self {
            Error::InvalidArgument { .. } => Some(INVALID_ARGUMENT),
            Error::EmptyResponse { .. } => Some(EMPTY_RESPONSE),
            Error::Api(api) => api.code.as_deref(),
            Error::Transport(_) | Error::Unrecognized { .. } | Error::Decode(_) => None,
        }
    }

    /// HTTP status associated with the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::InvalidArgument { .. } | Error::Decode(_) => None,
            Error::Transport(err) => err.status().map(|s| s.as_u16()),
            Error::EmptyResponse { status } | Error::Unrecognized { status, .. } => Some(*status),
            Error::Api(api) => api.status,
        }
    }

    /// Server-supplied details for API errors.
    pub fn extra(&self) -> Option<&Value> {
        match self {
            Error::Api(api) => api.extra.as_ref(),
            _ => None,
        }
    }

    /// Provenance marker. `None` for errors passed through unchanged.
    pub fn origin(&self) -> Option<&'static str> {
        match self {
            Error::Transport(_) | Error::Unrecognized { .. } => None,
            _ => Some(ORIGIN),
        }
    }

    /// Name of the offending argument for validation failures.
    pub fn argument(&self) -> Option<&'static str> {
        match self {
            Error::InvalidArgument { argument, .. } => Some(*argument),
            _ => None,
        }
    }

    /// Returns true if this is an API error with the given code.
    pub fn is_code(&self, code: &str) -> bool {
        self.code() == Some(code)
    }
}

/// Build an argument-validation error.
///
/// The message reads `Invalid argument: {name} must be {must_be}`.
pub fn invalid_argument(
    name: &'static str,
    value: impl Into<Value>,
    must_be: &'static str,
) -> Error {
    Error::InvalidArgument {
        argument: name,
        value: value.into(),
        must_be,
    }
}

/// Convert a raw error body into an [`ApiError`].
///
/// The message is taken from `message` when it is a string; otherwise the raw
/// value itself is rendered. `code`, `status` and `extra` are lifted into
/// their typed fields and everything else is kept in `fields`.
pub fn normalize(raw: Value) -> ApiError {
    match raw {
        Value::Object(mut map) => {
            let message = match map.remove("message") {
                Some(Value::String(message)) => message,
                Some(Value::Null) | None => Value::Object(map.clone()).to_string(),
                Some(other) => other.to_string(),
            };
            let code = match map.remove("code") {
                Some(Value::String(code)) => Some(code),
                Some(Value::Null) | None => None,
                Some(other) => Some(other.to_string()),
            };
            let status = map
                .remove("status")
                .and_then(|s| s.as_u64())
                .and_then(|s| u16::try_from(s).ok());
            let extra = map.remove("extra").filter(|e| !e.is_null());

            ApiError {
                message,
                code,
                status,
                extra,
                fields: map,
            }
        }
        Value::String(message) => ApiError {
            message,
            code: None,
            status: None,
            extra: None,
            fields: Map::new(),
        },
        other => ApiError {
            message: other.to_string(),
            code: None,
            status: None,
            extra: None,
            fields: Map::new(),
        },
    }
}

// =============================================================================
// Tests
// =============================================================================
