//! The Luno API client.

use std::sync::Arc;

use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use tracing::debug;

use super::method::Method;
use super::query::Params;
use super::signer::{SignedRequest, Signer};
use crate::config::Config;
use crate::error::{invalid_argument, normalize, Error};

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("luno-rust/", env!("CARGO_PKG_VERSION"));

/// Client for the Luno API.
///
/// Cloning is cheap: clones share the configuration and the connection pool.
///
/// # Example
///
/// ```rust,no_run
/// use luno_client::{Client, Config, Params};
///
/// # async fn run() -> Result<(), luno_client::Error> {
/// let client = Client::new(Config::new("my-key", "my-secret"))?;
///
/// let users = client.get("/users", &Params::new().with("limit", 10)).await?;
/// println!("{}", users);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Client {
    config: Arc<Config>,
    signer: Signer,
    http: reqwest::Client,
}

impl Client {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns an `invalid_argument` error if the key or secret is empty, the
    /// version is zero or the host is not an absolute URL, and a transport
    /// error if the HTTP client cannot be built.
    pub fn new(config: Config) -> Result<Self, Error> {
        config.validate()?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            signer: Signer::from_config(&config),
            config: Arc::new(config),
            http,
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the request signer.
    pub fn signer(&self) -> &Signer {
        &self.signer
    }

    /// Full URL for a route, without query string.
    pub fn url_for(&self, route: &str) -> String {
        format!(
            "{}{}",
            self.config.host.trim_end_matches('/'),
            self.signer.versioned_route(route)
        )
    }

    /// Send a signed request.
    ///
    /// `method` must be one of GET, POST, PUT, PATCH or DELETE. `route` must be
    /// empty or start with `/`. A `body` of JSON `null` is the same as no body;
    /// any other body must be a JSON object or array. Violations are returned
    /// as `invalid_argument` errors.
    pub async fn request(
        &self,
        method: &str,
        route: &str,
        params: &Params,
        body: Option<&Value>,
    ) -> Result<Value, Error> {
        let method: Method = method.parse()?;
        validate_route(route)?;
        let body = body.filter(|b| !b.is_null());
        if let Some(body) = body {
            if !(body.is_object() || body.is_array()) {
                return Err(invalid_argument("body", body.clone(), "null or an object"));
            }
        }

        let signed = self.signer.sign(method, route, params, body);
        self.send(signed).await
    }

    /// GET `route`.
    pub async fn get(&self, route: &str, params: &Params) -> Result<Value, Error> {
        self.request(Method::Get.as_str(), route, params, None).await
    }

    /// POST `route` with an optional JSON body.
    pub async fn post(
        &self,
        route: &str,
        params: &Params,
        body: Option<&Value>,
    ) -> Result<Value, Error> {
        self.request(Method::Post.as_str(), route, params, body).await
    }

    /// PUT `route` with an optional JSON body.
    pub async fn put(
        &self,
        route: &str,
        params: &Params,
        body: Option<&Value>,
    ) -> Result<Value, Error> {
        self.request(Method::Put.as_str(), route, params, body).await
    }

    /// PATCH `route` with an optional JSON body.
    pub async fn patch(
        &self,
        route: &str,
        params: &Params,
        body: Option<&Value>,
    ) -> Result<Value, Error> {
        self.request(Method::Patch.as_str(), route, params, body).await
    }

    /// DELETE `route`.
    pub async fn delete(&self, route: &str, params: &Params) -> Result<Value, Error> {
        self.request(Method::Delete.as_str(), route, params, None).await
    }

    /// Send an already signed request.
    pub async fn send(&self, signed: SignedRequest) -> Result<Value, Error> {
        let url = format!(
            "{}{}",
            self.config.host.trim_end_matches('/'),
            signed.path_and_query()
        );

        debug!(
            method = %signed.method,
            route = %signed.route,
            sandbox = self.config.sandbox,
            "Sending request"
        );

        let mut request = self.http.request(signed.method.into(), &url);
        if let Some(body) = signed.body {
            request = request.header(CONTENT_TYPE, "application/json").body(body);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;

        debug!(
            method = %signed.method,
            route = %signed.route,
            status = status,
            bytes = text.len(),
            "Received response"
        );

        interpret_response(status, &text)
    }
}

fn validate_route(route: &str) -> Result<(), Error> {
    if route.is_empty() || route.starts_with('/') {
        Ok(())
    } else {
        Err(invalid_argument("route", route, "empty or a path starting with '/'"))
    }
}

/// Map a status code and body text to the request outcome.
///
/// - empty or falsy body (`null`, `false`, `0`, `""`): `empty_response`
///   error with the status
/// - non-2xx with a `message`: normalized API error
/// - non-2xx without one: the raw body, unchanged
/// - 2xx: the parsed body
///
/// Bodies that are not JSON are kept as a JSON string.
pub(crate) fn interpret_response(status: u16, text: &str) -> Result<Value, Error> {
    if text.trim().is_empty() {
        return Err(Error::EmptyResponse { status });
    }

    let body: Value =
        serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()));
    if !is_truthy(&body) {
        return Err(Error::EmptyResponse { status });
    }

    if !(200..300).contains(&status) {
        let has_message = body.get("message").map(is_truthy).unwrap_or(false);

        if !has_message {
            return Err(Error::Unrecognized { status, body });
        }
        return Err(Error::Api(normalize(body)));
    }

    Ok(body)
}

/// Whether a JSON value counts as present: not `null`, `false`, zero or `""`.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => false,
        Value::Number(n) => n.as_f64() != Some(0.0),
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

// =============================================================================
// Tests
// =============================================================================
