//! Request signing for the Luno API.
//!
//! Every request carries the caller's `key`, a `timestamp`, and a `sign`
//! parameter holding an HMAC-SHA512 over the canonical string:
//!
//! ```text
//! canonical = "{METHOD}:{/v{version}{route}}?{canonical_query}"   (no body)
//! canonical = "{METHOD}:{/v{version}{route}}?{canonical_query}:{json_body}"
//! sign      = hex(HMAC-SHA512(secret, canonical))
//! ```
//!
//! The canonical query includes `key`, `timestamp` and (in sandbox mode)
//! `sandbox`, but not `sign` itself. See [`super::query`] for the encoding.
//!
//! # Example
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use luno_client::client::{Method, Params, Signer};
//!
//! let signer = Signer::new("my-key", "my-secret", 1);
//! let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
//! let signed = signer.sign_at(Method::Get, "/users", &Params::new(), None, at);
//!
//! assert_eq!(
//!     signed.canonical,
//!     "GET:/v1/users?key=my-key&timestamp=2024-01-02T03%3A04%3A05.000Z"
//! );
//! assert_eq!(signed.signature.len(), 128);
//! ```

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha512;
use subtle::ConstantTimeEq;

use super::method::Method;
use super::query::Params;
use crate::config::Config;

/// HMAC-SHA512 type alias
type HmacSha512 = Hmac<Sha512>;

/// Query parameter carrying the signature.
pub const SIGN_PARAM: &str = "sign";

/// Query parameter carrying the API key.
pub const KEY_PARAM: &str = "key";

/// Query parameter carrying the request instant.
pub const TIMESTAMP_PARAM: &str = "timestamp";

/// Query parameter routing a request to the sandbox environment.
pub const SANDBOX_PARAM: &str = "sandbox";

// =============================================================================
// Types
// =============================================================================

/// Signature verification failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    /// The `sign` parameter is absent
    MissingSignature,

    /// The `sign` parameter is not valid hex or appears more than once
    InvalidSignatureFormat,

    /// The signature does not match the request
    InvalidSignature,
}

impl fmt::Display for SignatureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignatureError::MissingSignature => write!(f, "Missing sign parameter"),
            SignatureError::InvalidSignatureFormat => write!(f, "Invalid signature format"),
            SignatureError::InvalidSignature => write!(f, "Invalid signature"),
        }
    }
}

impl std::error::Error for SignatureError {}

/// A request ready to be sent: the signed envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedRequest {
    /// HTTP method
    pub method: Method,

    /// Route including the version prefix (e.g. "/v1/users")
    pub route: String,

    /// Caller params plus `key`, `timestamp`, `sign` and optionally `sandbox`
    pub params: Params,

    /// JSON body exactly as it was signed
    pub body: Option<String>,

    /// The string the signature was computed over
    pub canonical: String,

    /// Hex-encoded HMAC-SHA512
    pub signature: String,
}

impl SignedRequest {
    /// Encoded query string including the signature.
    pub fn query_string(&self) -> String {
        self.params.encode()
    }

    /// Path and query, e.g. `/v1/users?key=...&sign=...&timestamp=...`.
    pub fn path_and_query(&self) -> String {
        format!("{}?{}", self.route, self.query_string())
    }
}

// =============================================================================
// Signer
// =============================================================================

/// Computes and verifies request signatures.
#[derive(Clone)]
pub struct Signer {
    key: String,
    secret: Vec<u8>,
    version: u32,
    sandbox: bool,
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("key", &self.key)
            .field("secret", &"<redacted>")
            .field("version", &self.version)
            .field("sandbox", &self.sandbox)
            .finish()
    }
}

impl Signer {
    /// Create a signer for the given credentials and API version.
    pub fn new(key: impl Into<String>, secret: impl AsRef<[u8]>, version: u32) -> Self {
        Self {
            key: key.into(),
            secret: secret.as_ref().to_vec(),
            version,
            sandbox: false,
        }
    }

    /// Create a signer from a client configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.key, &config.secret, config.version).with_sandbox(config.sandbox)
    }

    /// Inject `sandbox=true` into requests that don't set it explicitly.
    pub fn with_sandbox(mut self, sandbox: bool) -> Self {
        self.sandbox = sandbox;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn sandbox(&self) -> bool {
        self.sandbox
    }

    /// The version segment, e.g. "/v1".
    pub fn version_prefix(&self) -> String {
        format!("/v{}", self.version)
    }

    /// Prefix `route` with the version segment unless it already carries it.
    pub fn versioned_route(&self, route: &str) -> String {
        let prefix = self.version_prefix();
        match route.strip_prefix(prefix.as_str()) {
            Some(rest) if rest.is_empty() || rest.starts_with('/') => route.to_string(),
            _ => format!("{}{}", prefix, route),
        }
    }

    /// Sign a request at the current instant.
    pub fn sign(
        &self,
        method: Method,
        route: &str,
        params: &Params,
        body: Option<&Value>,
    ) -> SignedRequest {
        self.sign_at(method, route, params, body, Utc::now())
    }

    /// Sign a request at a given instant.
    ///
    /// Pure: the same inputs and instant always produce the same signature.
    pub fn sign_at(
        &self,
        method: Method,
        route: &str,
        params: &Params,
        body: Option<&Value>,
        at: DateTime<Utc>,
    ) -> SignedRequest {
        let mut params = params.clone();
        params.insert(KEY_PARAM, self.key.as_str());
        params.insert(TIMESTAMP_PARAM, format_timestamp(at));
        if self.sandbox && !params.contains_key(SANDBOX_PARAM) {
            params.insert(SANDBOX_PARAM, true);
        }

        let route = self.versioned_route(route);
        let body = body.map(|b| b.to_string());
        let canonical = canonical_string(method.as_str(), &route, &params, body.as_deref());
        let signature = self.compute_signature(&canonical);

        params.insert(SIGN_PARAM, signature.as_str());

        SignedRequest {
            method,
            route,
            params,
            body,
            canonical,
            signature,
        }
    }

    /// Verify a received request the way the server does.
    ///
    /// `path` is the full request path (including the version segment),
    /// `query` the decoded query pairs, and `body` the raw body text.
    pub fn verify<K, V>(
        &self,
        method: &str,
        path: &str,
        query: &[(K, V)],
        body: Option<&str>,
    ) -> Result<(), SignatureError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut signature: Option<&str> = None;
        let mut rest: Vec<(&str, &str)> = Vec::with_capacity(query.len());

        for (key, value) in query {
            let (key, value) = (key.as_ref(), value.as_ref());
            if key == SIGN_PARAM {
                if signature.is_some() {
                    return Err(SignatureError::InvalidSignatureFormat);
                }
                signature = Some(value);
                continue;
            }
            rest.push((key, value));
        }

        let signature = signature.ok_or(SignatureError::MissingSignature)?;
        let provided =
            hex::decode(signature).map_err(|_| SignatureError::InvalidSignatureFormat)?;

        let params = Params::from_pairs(rest);
        let body = body.filter(|b| !b.is_empty());
        let canonical = canonical_string(method, path, &params, body);
        let expected = self.digest(&canonical);

        if provided.ct_eq(&expected).into() {
            Ok(())
        } else {
            Err(SignatureError::InvalidSignature)
        }
    }

    /// Hex-encoded HMAC-SHA512 over a canonical string.
    pub fn compute_signature(&self, canonical: &str) -> String {
        hex::encode(self.digest(canonical))
    }

    fn digest(&self, canonical: &str) -> Vec<u8> {
        let mut mac =
            HmacSha512::new_from_slice(&self.secret).expect("HMAC can take key of any size");
        mac.update(canonical.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}

/// ISO-8601 with millisecond precision and a `Z` suffix.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Build the string the signature is computed over.
pub fn canonical_string(method: &str, route: &str, params: &Params, body: Option<&str>) -> String {
    let mut canonical = format!("{}:{}?{}", method, route, params.encode());
    if let Some(body) = body {
        canonical.push(':');
        canonical.push_str(body);
    }
    canonical
}

// =============================================================================
// Tests
// =============================================================================
