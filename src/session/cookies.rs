//! Session cookie configuration.

use std::time::Duration;

use cookie::time::{Duration as CookieDuration, OffsetDateTime};
use cookie::{Cookie, CookieBuilder, SameSite};
use http::header::COOKIE;
use http::HeaderMap;

/// Default session cookie name.
pub const DEFAULT_COOKIE_NAME: &str = "session";

/// Default cookie lifetime in milliseconds (14 days).
pub const DEFAULT_MAX_AGE_MS: u64 = 1_209_600_000;

/// How the session cookie is read and written.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Name of the cookie carrying the session key
    pub cookie_name: String,

    /// Cookie lifetime
    pub max_age: Duration,

    /// Hide the cookie from client-side scripts
    pub http_only: bool,

    /// Only send the cookie over HTTPS
    pub secure: bool,

    /// Cookie path
    pub path: String,

    /// Cookie domain (None = host-only)
    pub domain: Option<String>,

    /// SameSite attribute (None = not set)
    pub same_site: Option<SameSite>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            max_age: Duration::from_millis(DEFAULT_MAX_AGE_MS),
            http_only: true,
            secure: false,
            path: "/".to_string(),
            domain: None,
            same_site: None,
        }
    }
}

impl SessionConfig {
    /// Create a configuration with the defaults: cookie `session`, 14 day
    /// lifetime, `HttpOnly`, path `/`.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = Some(same_site);
        self
    }

    /// Read the session key from the request's `Cookie` headers.
    ///
    /// Returns `None` if the cookie is absent or empty. The first occurrence
    /// wins when the cookie appears more than once.
    pub fn read_key(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(Cookie::split_parse_encoded)
            .filter_map(Result::ok)
            .find(|cookie| cookie.name() == self.cookie_name)
            .map(|cookie| cookie.value().to_string())
            .filter(|value| !value.is_empty())
    }

    /// Cookie carrying a (possibly rotated) session key.
    pub fn session_cookie(&self, key: impl Into<String>) -> Cookie<'static> {
        let seconds = i64::try_from(self.max_age.as_secs()).unwrap_or(i64::MAX);
        let max_age = CookieDuration::seconds(seconds);

        let mut builder = self.builder(key.into()).max_age(max_age);
        if let Some(expires) = OffsetDateTime::now_utc().checked_add(max_age) {
            builder = builder.expires(expires);
        }
        builder.build()
    }

    /// Cookie instructing the browser to drop the session cookie.
    pub fn removal_cookie(&self) -> Cookie<'static> {
        let mut cookie = self.builder(String::new()).build();
        cookie.make_removal();
        cookie
    }

    fn builder(&self, value: String) -> CookieBuilder<'static> {
        let mut builder = Cookie::build((self.cookie_name.clone(), value))
            .path(self.path.clone())
            .http_only(self.http_only)
            .secure(self.secure);
        if let Some(domain) = &self.domain {
            builder = builder.domain(domain.clone());
        }
        if let Some(same_site) = self.same_site {
            builder = builder.same_site(same_site);
        }
        builder
    }
}

// =============================================================================
// Tests
// =============================================================================
