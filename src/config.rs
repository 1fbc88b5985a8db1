//! Connection configuration and credential resolution.

use std::fmt;
use std::time::Duration;

use crate::error::{Error, Result};

/// Default REST API version spoken to the array.
pub const DEFAULT_REST_VERSION: &str = "1.19";

/// Default number of queries in flight at once.
pub const DEFAULT_MAX_CONCURRENCY: usize = 5;

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// =============================================================================
// Array Configuration
// =============================================================================

/// Configuration for talking to one array
#[derive(Debug, Clone)]
pub struct ArrayConfig {
    /// Base URL of the array, e.g. `https://array01.example.com`
    pub endpoint: String,

    /// REST API version used in request paths
    pub rest_version: String,

    /// Per-request timeout enforced by the HTTP client
    pub request_timeout: Duration,

    /// Skip TLS certificate verification
    pub accept_invalid_certs: bool,

    /// Maximum number of queries issued concurrently
    pub max_concurrency: usize,
}

impl Default for ArrayConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://localhost".to_string(),
            rest_version: DEFAULT_REST_VERSION.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            accept_invalid_certs: false,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

impl ArrayConfig {
    /// Build a configuration for the array at `address` with default settings.
    pub fn for_address(address: &str) -> Result<Self> {
        Ok(Self {
            endpoint: endpoint_from_address(address)?,
            ..Default::default()
        })
    }

    /// Reject settings that cannot work.
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrency == 0 {
            return Err(Error::Config("max concurrency must be at least 1".into()));
        }
        if self.request_timeout.is_zero() {
            return Err(Error::Config("request timeout must be non-zero".into()));
        }
        if self.rest_version.trim().is_empty() {
            return Err(Error::Config("REST version must not be empty".into()));
        }
        Ok(())
    }

    /// Full URL of an API path such as `pgroup`.
    pub fn api_url(&self, path: &str) -> String {
        format!("{}/api/{}/{}", self.endpoint, self.rest_version, path)
    }
}

/// Turn the user-facing array address into a base URL.
///
/// Bare hostnames and `host:port` pairs get an `https://` scheme; full URLs
/// are kept as given.
pub fn endpoint_from_address(address: &str) -> Result<String> {
    let address = address.trim().trim_end_matches('/');
    if address.is_empty() {
        return Err(Error::Usage("Array address must not be empty.".into()));
    }

    if address.contains("://") {
        Ok(address.to_string())
    } else {
        Ok(format!("https://{}", address))
    }
}

// =============================================================================
// Credentials
// =============================================================================

/// How to authenticate against the array
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Pre-issued API token
    ApiToken(String),

    /// Username and password, exchanged for an API token at login
    UserPassword { username: String, password: String },
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::ApiToken(_) => f.debug_tuple("ApiToken").field(&"<redacted>").finish(),
            Credentials::UserPassword { username, .. } => f
                .debug_struct("UserPassword")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
        }
    }
}

impl Credentials {
    /// Resolve exactly one authentication method from the command line.
    ///
    /// `prompt` is only called when a username was given without a password.
    pub fn resolve<F>(
        api_token: Option<String>,
        username: Option<String>,
        password: Option<String>,
        prompt: F,
    ) -> Result<Self>
    where
        F: FnOnce(&str) -> Result<String>,
    {
        let api_token = api_token.filter(|t| !t.is_empty());
        let username = username.filter(|u| !u.is_empty());

        match (api_token, username) {
            (Some(_), Some(_)) => Err(Error::Usage(
                "Provide either an api-token or a username, not both.".into(),
            )),
            (Some(_), None) if password.is_some() => Err(Error::Usage(
                "--pass cannot be combined with --api-token.".into(),
            )),
            (Some(token), None) => Ok(Credentials::ApiToken(token)),
            (None, Some(username)) => {
                let password = match password {
                    Some(password) => password,
                    None => prompt(&username)?,
                };
                Ok(Credentials::UserPassword { username, password })
            }
            (None, None) => Err(Error::Usage(
                "Must provide either an api-token or username.".into(),
            )),
        }
    }
}
