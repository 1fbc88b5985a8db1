//! FlashArray REST Adapter
//!
//! Implements the `ArraySource` port against the Purity REST 1.x API.
//! Login exchanges credentials for a session cookie that the shared
//! `reqwest::Client` replays on every query.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use crate::config::{ArrayConfig, Credentials};
use crate::domain::model::{HostGroup, ProtectionGroup, ProtectionSchedule, Volume};
use crate::domain::ports::ArraySource;
use crate::error::{Error, Result};

// =============================================================================
// REST Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct ApiTokenResponse {
    #[serde(default)]
    api_token: Option<String>,
}

// =============================================================================
// FlashArray Client
// =============================================================================

/// Authenticated REST client for one FlashArray
pub struct FlashArrayClient {
    config: ArrayConfig,
    client: Client,
}

impl FlashArrayClient {
    /// Create an unauthenticated client
    pub fn new(config: ArrayConfig) -> Result<Self> {
        config.validate()?;

        if config.accept_invalid_certs {
            warn!(
                endpoint = %config.endpoint,
                "TLS certificate verification is disabled for this array"
            );
        }

        let client = Client::builder()
            .timeout(config.request_timeout)
            .cookie_store(true)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Create a client and open a session with the given credentials
    pub async fn connect(config: ArrayConfig, credentials: &Credentials) -> Result<Self> {
        let client = Self::new(config)?;
        client.login(credentials).await?;
        Ok(client)
    }

    /// Open a REST session
    #[instrument(skip(self, credentials), fields(endpoint = %self.config.endpoint))]
    pub async fn login(&self, credentials: &Credentials) -> Result<()> {
        let api_token = match credentials {
            Credentials::ApiToken(token) => token.clone(),
            Credentials::UserPassword { username, password } => {
                self.obtain_api_token(username, password).await?
            }
        };

        self.start_session(&api_token).await?;
        info!("REST session established");
        Ok(())
    }

    /// Close the REST session
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<()> {
        let endpoint = self.endpoint("auth/session", &[]);
        let response = self
            .client
            .delete(self.config.api_url("auth/session"))
            .send()
            .await
            .map_err(Error::Connection)?;

        check_status(&endpoint, response.status(), false)?;
        debug!("REST session closed");
        Ok(())
    }

    async fn obtain_api_token(&self, username: &str, password: &str) -> Result<String> {
        let endpoint = self.endpoint("auth/apitoken", &[]);
        debug!("Requesting API token for user {}", username);

        let response = self
            .client
            .post(self.config.api_url("auth/apitoken"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .map_err(Error::Connection)?;

        check_status(&endpoint, response.status(), true)?;

        let body: ApiTokenResponse = decode(&endpoint, response).await?;
        body.api_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::Authentication(format!("no API token issued for {}", username)))
    }

    async fn start_session(&self, api_token: &str) -> Result<()> {
        let endpoint = self.endpoint("auth/session", &[]);

        let response = self
            .client
            .post(self.config.api_url("auth/session"))
            .json(&json!({ "api_token": api_token }))
            .send()
            .await
            .map_err(Error::Connection)?;

        check_status(&endpoint, response.status(), true)
    }

    /// Issue a GET and decode the JSON body
    #[instrument(skip(self))]
    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let endpoint = self.endpoint(path, query);
        let url = format!("{}{}", self.config.endpoint, endpoint);

        debug!("Querying array: {}", endpoint);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(Error::Connection)?;

        check_status(&endpoint, response.status(), false)?;
        decode(&endpoint, response).await
    }

    /// Request path plus query string, used both for the URL and in errors
    fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> String {
        let mut endpoint = format!("/api/{}/{}", self.config.rest_version, path);
        for (i, (key, value)) in query.iter().enumerate() {
            endpoint.push(if i == 0 { '?' } else { '&' });
            endpoint.push_str(&urlencoding::encode(key));
            endpoint.push('=');
            endpoint.push_str(&urlencoding::encode(value));
        }
        endpoint
    }
}

impl std::fmt::Debug for FlashArrayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlashArrayClient")
            .field("endpoint", &self.config.endpoint)
            .field("rest_version", &self.config.rest_version)
            .finish()
    }
}

/// Map an HTTP status to the error taxonomy.
///
/// On the login endpoints a 400 also means rejected credentials.
fn check_status(endpoint: &str, status: StatusCode, login: bool) -> Result<()> {
    if status.is_success() {
        return Ok(());
    }

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(Error::Authentication(format!(
            "{} returned {}",
            endpoint, status
        ))),
        StatusCode::BAD_REQUEST if login => Err(Error::Authentication(format!(
            "credentials rejected by {}",
            endpoint
        ))),
        _ => Err(Error::ApiStatus {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
        }),
    }
}

/// Read the body and decode it, keeping transport and shape failures apart.
async fn decode<T: DeserializeOwned>(endpoint: &str, response: Response) -> Result<T> {
    let bytes = response.bytes().await.map_err(Error::Connection)?;
    serde_json::from_slice(&bytes).map_err(|e| Error::ResponseShape {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })
}

#[async_trait]
impl ArraySource for FlashArrayClient {
    async fn list_protection_groups(&self) -> Result<Vec<ProtectionGroup>> {
        self.get("pgroup", &[]).await
    }

    async fn list_schedules(&self) -> Result<Vec<ProtectionSchedule>> {
        self.get("pgroup", &[("schedule", "true")]).await
    }

    async fn list_host_groups(&self) -> Result<Vec<HostGroup>> {
        self.get("hgroup", &[]).await
    }

    async fn list_connected_volumes(&self) -> Result<Vec<Volume>> {
        self.get("volume", &[("connect", "true")]).await
    }

    async fn list_protected_volumes(&self) -> Result<Vec<Volume>> {
        self.get("volume", &[("protect", "true")]).await
    }

    async fn list_volumes(&self) -> Result<Vec<Volume>> {
        self.get("volume", &[]).await
    }
}
