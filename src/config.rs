//! Configuration for the Luno client.
//!
//! [`Config`] is the library-level configuration passed to
//! [`Client::new`](crate::client::Client::new). It is built from a key and a
//! secret plus builder methods for everything that has a default:
//!
//! ```rust
//! use std::time::Duration;
//! use luno_client::Config;
//!
//! let config = Config::new("my-key", "my-secret")
//!     .with_timeout(Duration::from_secs(5))
//!     .with_sandbox(true);
//!
//! assert_eq!(config.host, "https://api.luno.io");
//! assert_eq!(config.version, 1);
//! ```
//!
//! The `luno` binary builds the same configuration from [`Cli`], which reads
//! command-line flags with `LUNO_`-prefixed environment variable fallbacks:
//!
//! - `LUNO_HOST` - API host (default: https://api.luno.io)
//! - `LUNO_API_VERSION` - API version (default: 1)
//! - `LUNO_KEY` - API key (required)
//! - `LUNO_SECRET` - API secret (required)
//! - `LUNO_TIMEOUT_MS` - Request timeout in milliseconds (default: 10000)
//! - `LUNO_SANDBOX` - Route requests to the sandbox (default: false)

use std::time::Duration;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::Value;
use url::Url;

use crate::client::{Method, Params};
use crate::error::{invalid_argument, Error};

// =============================================================================
// Default Values
// =============================================================================

/// Default API host.
pub const DEFAULT_HOST: &str = "https://api.luno.io";

/// Default API version.
pub const DEFAULT_VERSION: u32 = 1;

/// Default request timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

// =============================================================================
// Client Configuration
// =============================================================================

/// Configuration for [`Client`](crate::client::Client).
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    /// Base URL of the API (scheme and host, no version segment)
    pub host: String,

    /// API version, used as the `/v{version}` route prefix
    pub version: u32,

    /// API key, sent with every request
    pub key: String,

    /// API secret, used as the HMAC key
    pub secret: String,

    /// Per-request timeout
    pub timeout: Duration,

    /// Route requests to the sandbox environment
    pub sandbox: bool,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("version", &self.version)
            .field("key", &self.key)
            .field("secret", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("sandbox", &self.sandbox)
            .finish()
    }
}

impl Config {
    /// Create a configuration with the given credentials.
    ///
    /// By default:
    /// - Host is `https://api.luno.io`
    /// - API version is 1
    /// - Timeout is 10 seconds
    /// - Sandbox is off
    pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            version: DEFAULT_VERSION,
            key: key.into(),
            secret: secret.into(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            sandbox: false,
        }
    }

    /// Set the API host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the API version.
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enable or disable the sandbox environment.
    pub fn with_sandbox(mut self, sandbox: bool) -> Self {
        self.sandbox = sandbox;
        self
    }

    /// Validate the configuration.
    ///
    /// Fails with an `invalid_argument` error naming the offending field.
    pub fn validate(&self) -> Result<(), Error> {
        if self.key.is_empty() {
            return Err(invalid_argument("key", self.key.as_str(), "a non-empty string"));
        }
        if self.secret.is_empty() {
            return Err(invalid_argument("secret", "", "a non-empty string"));
        }
        if self.version == 0 {
            return Err(invalid_argument("version", self.version, "a positive integer"));
        }

        let host_ok = Url::parse(&self.host)
            .map(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
            .unwrap_or(false);
        if !host_ok {
            return Err(invalid_argument(
                "host",
                self.host.as_str(),
                "an absolute http(s) URL",
            ));
        }

        Ok(())
    }
}

// =============================================================================
// CLI Arguments
// =============================================================================

/// Luno API command-line client.
///
/// Sends signed requests to the Luno API, or prints the signature for a
/// request without sending it.
#[derive(Parser, Debug, Clone)]
#[command(name = "luno")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Send a signed request and print the JSON response.
    Request(RequestConfig),

    /// Sign a request and print the signature without sending it.
    Sign(SignConfig),
}

/// Connection and credential options shared by all subcommands.
#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// API host.
    #[arg(long, default_value = DEFAULT_HOST, env = "LUNO_HOST")]
    pub host: String,

    /// API version.
    #[arg(long, default_value_t = DEFAULT_VERSION, env = "LUNO_API_VERSION")]
    pub api_version: u32,

    /// API key.
    #[arg(long, env = "LUNO_KEY")]
    pub key: Option<String>,

    /// API secret.
    #[arg(long, env = "LUNO_SECRET", hide_env_values = true)]
    pub secret: Option<String>,

    /// Request timeout in milliseconds.
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_MS, env = "LUNO_TIMEOUT_MS")]
    pub timeout_ms: u64,

    /// Route requests to the sandbox environment.
    #[arg(long, default_value_t = false, env = "LUNO_SANDBOX")]
    pub sandbox: bool,
}

impl ConnectionArgs {
    /// Validate the arguments and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.key.as_deref().unwrap_or("").is_empty() {
            return Err("API key is required. Set --key or LUNO_KEY".to_string());
        }
        if self.secret.as_deref().unwrap_or("").is_empty() {
            return Err("API secret is required. Set --secret or LUNO_SECRET".to_string());
        }
        if self.timeout_ms == 0 {
            return Err("timeout_ms must be greater than 0".to_string());
        }
        self.to_config().validate().map_err(|e| e.to_string())
    }

    /// Build the client configuration (call validate() first).
    pub fn to_config(&self) -> Config {
        Config::new(
            self.key.clone().unwrap_or_default(),
            self.secret.clone().unwrap_or_default(),
        )
        .with_host(self.host.clone())
        .with_version(self.api_version)
        .with_timeout(Duration::from_millis(self.timeout_ms))
        .with_sandbox(self.sandbox)
    }
}

/// Arguments describing a single request.
#[derive(Args, Debug, Clone)]
pub struct RequestArgs {
    /// HTTP method (GET, POST, PUT, PATCH or DELETE).
    pub method: String,

    /// Route, with or without the version prefix (e.g. /users).
    pub route: String,

    /// Query parameter as key=value. Repeat a key to send an array.
    #[arg(short = 'p', long = "param", value_name = "KEY=VALUE")]
    pub params: Vec<String>,

    /// JSON request body.
    #[arg(long)]
    pub body: Option<String>,
}

impl RequestArgs {
    /// Parse the method name.
    pub fn method(&self) -> Result<Method, String> {
        self.method
            .to_ascii_uppercase()
            .parse()
            .map_err(|e: Error| e.to_string())
    }

    /// Parse `key=value` parameters.
    pub fn parse_params(&self) -> Result<Params, String> {
        let mut pairs = Vec::with_capacity(self.params.len());
        for param in &self.params {
            let (key, value) = param
                .split_once('=')
                .ok_or_else(|| format!("Invalid parameter '{}': expected KEY=VALUE", param))?;
            if key.is_empty() {
                return Err(format!("Invalid parameter '{}': empty key", param));
            }
            pairs.push((key.to_string(), value.to_string()));
        }
        Ok(Params::from_pairs(pairs))
    }

    /// Parse the JSON body, if any.
    pub fn parse_body(&self) -> Result<Option<Value>, String> {
        self.body
            .as_deref()
            .map(|body| {
                serde_json::from_str(body).map_err(|e| format!("Invalid JSON body: {}", e))
            })
            .transpose()
    }
}

/// Configuration for the `request` subcommand.
#[derive(Args, Debug, Clone)]
pub struct RequestConfig {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(flatten)]
    pub request: RequestArgs,
}

impl RequestConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        self.connection.validate()?;
        self.request.method()?;
        self.request.parse_params()?;
        self.request.parse_body()?;
        Ok(())
    }
}

/// Output format for the `sign` subcommand.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignOutputFormat {
    /// Only the hex signature
    Signature,
    /// Canonical string, signature and URL as JSON
    #[default]
    Json,
    /// The full signed URL
    Url,
}

/// Configuration for the `sign` subcommand.
#[derive(Args, Debug, Clone)]
pub struct SignConfig {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(flatten)]
    pub request: RequestArgs,

    /// Sign at this instant (RFC 3339) instead of now.
    #[arg(long)]
    pub timestamp: Option<String>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = SignOutputFormat::Json)]
    pub format: SignOutputFormat,
}

impl SignConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        self.connection.validate()?;
        self.request.method()?;
        self.request.parse_params()?;
        self.request.parse_body()?;
        self.parse_timestamp()?;
        Ok(())
    }

    /// The signing instant: `--timestamp` if given, otherwise now.
    pub fn parse_timestamp(&self) -> Result<DateTime<Utc>, String> {
        match &self.timestamp {
            Some(ts) => DateTime::parse_from_rfc3339(ts)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| format!("Invalid timestamp '{}': {}", ts, e)),
            None => Ok(Utc::now()),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
