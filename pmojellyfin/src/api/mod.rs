//! Low-level access to the Jellyfin REST API
//!
//! This module provides the HTTP plumbing shared by all endpoint wrappers:
//! server address normalization, the `MediaBrowser` authorization header,
//! and JSON request/response handling.

pub mod auth;
pub mod items;

use crate::error::{JellyfinError, Result};
use reqwest::{Client, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

/// Client name reported to the server
pub const CLIENT_NAME: &str = "PMOFlix";

/// Client version reported to the server
pub const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default device name reported to the server
pub const DEFAULT_DEVICE_NAME: &str = "PMOFlix";

/// Default timeout for HTTP requests (30 seconds)
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Device identity sent with every request
///
/// Jellyfin ties access tokens to a device identifier, so the same
/// `device_id` should be reused across sessions of one installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceProfile {
    /// Client application name
    pub client: String,
    /// Client application version
    pub version: String,
    /// Human-readable device name
    pub device_name: String,
    /// Stable unique device identifier
    pub device_id: String,
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self {
            client: CLIENT_NAME.to_string(),
            version: CLIENT_VERSION.to_string(),
            device_name: DEFAULT_DEVICE_NAME.to_string(),
            device_id: Uuid::new_v4().to_string(),
        }
    }
}

impl DeviceProfile {
    /// Create a profile reusing a previously issued device identifier
    pub fn with_device_id(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            ..Self::default()
        }
    }

    /// Build the `Authorization: MediaBrowser ...` header value
    pub(crate) fn authorization_value(&self, token: Option<&str>) -> String {
        let mut value = format!(
            "MediaBrowser Client=\"{}\", Device=\"{}\", DeviceId=\"{}\", Version=\"{}\"",
            self.client, self.device_name, self.device_id, self.version
        );
        if let Some(token) = token {
            value.push_str(&format!(", Token=\"{}\"", token));
        }
        value
    }
}

/// Normalize a user-entered server address into a base URL
///
/// Adds `http://` when no scheme was given, and rejects addresses that
/// are empty, have no host, or use a scheme other than HTTP(S).
pub fn normalize_server_url(input: &str) -> Result<Url> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(JellyfinError::InvalidServer(
            "server address is empty".to_string(),
        ));
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    };

    let url = Url::parse(&candidate)?;
    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(JellyfinError::InvalidServer(format!(
                "unsupported scheme '{}' in '{}'",
                other, trimmed
            )));
        }
    }
    if url.host_str().is_none() {
        return Err(JellyfinError::InvalidServer(format!(
            "no host in '{}'",
            trimmed
        )));
    }

    Ok(url)
}

/// Low-level client for one Jellyfin server
#[derive(Debug, Clone)]
pub struct JellyfinClient {
    /// HTTP client
    http: Client,
    /// Server base URL (may include a sub-path)
    base_url: Url,
    /// Access token, once authenticated
    access_token: Option<String>,
    /// Device identity sent with every request
    device: DeviceProfile,
    /// Per-request timeout
    timeout: Duration,
}

impl JellyfinClient {
    /// Create an unauthenticated client for the given server address
    pub fn new(server: &str) -> Result<Self> {
        Self::builder().server(server).build()
    }

    /// Create a builder for configuring the client
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Assemble a client from an already-validated base URL and token
    pub fn from_parts(base_url: Url, access_token: Option<String>, device: DeviceProfile) -> Self {
        Self {
            http: Client::new(),
            base_url,
            access_token,
            device,
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    /// Return the server base URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Return the device identity
    pub fn device(&self) -> &DeviceProfile {
        &self.device
    }

    /// Return the access token if available
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    /// Install an access token on this client
    pub fn set_access_token(&mut self, token: String) {
        self.access_token = Some(token);
    }

    /// Remove the access token from this client
    pub fn clear_access_token(&mut self) {
        self.access_token = None;
    }

    /// Whether an access token is installed
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    /// Resolve an endpoint path against the server base URL
    fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url.as_str().trim_end_matches('/'), endpoint)
    }

    /// Perform a GET request with query parameters
    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        let url = self.endpoint_url(endpoint);

        debug!("GET {} with {} params", url, params.len());

        let response = self
            .http
            .get(&url)
            .header(
                "Authorization",
                self.device.authorization_value(self.access_token()),
            )
            .query(params)
            .timeout(self.timeout)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Perform a POST request with a JSON body
    pub(crate) async fn post<T, B>(&self, endpoint: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.endpoint_url(endpoint);

        debug!("POST {}", url);

        let response = self
            .http
            .post(&url)
            .header(
                "Authorization",
                self.device.authorization_value(self.access_token()),
            )
            .json(body)
            .timeout(self.timeout)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Process an HTTP response
    async fn handle_response<T: DeserializeOwned>(&self, response: Response) -> Result<T> {
        let status = response.status();
        let status_code = status.as_u16();

        debug!("Response status: {}", status);

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!("API error ({}): {}", status_code, error_text);
            return Err(JellyfinError::from_status_code(status_code, error_text));
        }

        let text = response.text().await?;

        serde_json::from_str(&text).map_err(|e| {
            warn!("Failed to parse response: {}", e);
            JellyfinError::JsonParse(e)
        })
    }
}

/// Builder for [`JellyfinClient`]
pub struct ClientBuilder {
    http: Option<Client>,
    server: Option<String>,
    device: Option<DeviceProfile>,
    access_token: Option<String>,
    timeout: Duration,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            http: None,
            server: None,
            device: None,
            access_token: None,
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl ClientBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a custom HTTP client
    pub fn http_client(mut self, client: Client) -> Self {
        self.http = Some(client);
        self
    }

    /// Set the server address (required)
    pub fn server(mut self, server: impl Into<String>) -> Self {
        self.server = Some(server.into());
        self
    }

    /// Set the device identity
    pub fn device(mut self, device: DeviceProfile) -> Self {
        self.device = Some(device);
        self
    }

    /// Set an access token obtained earlier
    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the client
    pub fn build(self) -> Result<JellyfinClient> {
        let server = self.server.ok_or_else(|| {
            JellyfinError::InvalidServer("no server address configured".to_string())
        })?;
        let base_url = normalize_server_url(&server)?;

        let http = match self.http {
            Some(client) => client,
            None => Client::builder()
                .user_agent(format!("{}/{}", CLIENT_NAME, CLIENT_VERSION))
                .build()?,
        };

        Ok(JellyfinClient {
            http,
            base_url,
            access_token: self.access_token,
            device: self.device.unwrap_or_default(),
            timeout: self.timeout,
        })
    }
}
