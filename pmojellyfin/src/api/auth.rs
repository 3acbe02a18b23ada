//! Authentication against the Jellyfin API

use super::JellyfinClient;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Response of the /Users/AuthenticateByName endpoint
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AuthenticateResponse {
    user: AuthenticatedUser,
    access_token: String,
}

/// User record embedded in the authentication response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AuthenticatedUser {
    id: String,
    #[serde(default)]
    name: Option<String>,
}

/// Result of a successful authentication
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthSession {
    /// Access token issued by the server
    pub access_token: String,
    /// Identifier of the authenticated user
    pub user_id: String,
    /// Display name of the authenticated user
    pub user_name: Option<String>,
}

impl JellyfinClient {
    /// Authenticate with username and password
    ///
    /// # Arguments
    ///
    /// * `username` - Jellyfin username
    /// * `password` - Password (sent as-is, the server does the hashing)
    ///
    /// # Returns
    ///
    /// The issued token and user identity. The token is also installed on
    /// this client, so subsequent requests are authenticated.
    ///
    /// # Errors
    ///
    /// * `JellyfinError::Unauthorized` - Invalid credentials
    /// * `JellyfinError::Http` - Server unreachable
    pub async fn authenticate_by_name(
        &mut self,
        username: &str,
        password: &str,
    ) -> Result<AuthSession> {
        info!("Authenticating against {} as {}", self.base_url(), username);

        let body = serde_json::json!({
            "Username": username,
            "Pw": password,
        });

        let response: AuthenticateResponse =
            self.post("/Users/AuthenticateByName", &body).await?;

        debug!("Authentication successful - User ID: {}", response.user.id);

        self.set_access_token(response.access_token.clone());

        Ok(AuthSession {
            access_token: response.access_token,
            user_id: response.user.id,
            user_name: response.user.name,
        })
    }
}
