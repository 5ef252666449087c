//! Session lookup against the API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::client::{Client, Params};
use crate::error::Error;

/// Route exchanging a session key for a session record.
pub const SESSION_ACCESS_ROUTE: &str = "/sessions/access";

/// Error code returned when the session key is unknown or expired.
pub const SESSION_NOT_FOUND: &str = "session_not_found";

/// A session record as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Session key; may differ from the cookie value if the server rotated it
    pub key: String,

    /// The expanded user record, when requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Value>,

    /// Any other server-defined fields
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// The user embedded in a resolved session, as a request extension.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionUser(pub Value);

/// Details sent when accessing a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionAccess {
    /// Session key from the cookie
    pub key: String,

    /// Client IP address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,

    /// Client user agent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

/// Resolves session keys into session records.
///
/// Implemented by [`Client`]; tests and alternative stores can provide their
/// own implementation.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    /// Exchange a session key for the session and its user.
    async fn access_session(&self, access: &SessionAccess) -> Result<Session, Error>;
}

#[async_trait]
impl SessionBackend for Client {
    async fn access_session(&self, access: &SessionAccess) -> Result<Session, Error> {
        let params = Params::new().with("expand", "user");
        let body = serde_json::to_value(access)?;

        let value = self.post(SESSION_ACCESS_ROUTE, &params, Some(&body)).await?;
        Ok(serde_json::from_value(value)?)
    }
}
