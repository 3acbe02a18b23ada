//! Session lifecycle and persistence
//!
//! [`SessionManager`] owns the signed-in state: which server, which user,
//! which access token. Every state change is written through to an injected
//! [`CredentialStore`] before it becomes visible, so a crash never leaves
//! memory and disk disagreeing. Restoring at startup tolerates a missing or
//! corrupt record and simply starts signed out.
//!
//! The saved password is encrypted with a machine-bound key (see
//! [`pmovault::encryption`]) and only ever used to prefill the sign-in form.

use crate::api::auth::AuthSession;
use crate::api::{DeviceProfile, JellyfinClient, normalize_server_url};
use crate::error::JellyfinError;
use chrono::{DateTime, Utc};
use pmovault::{CredentialStore, encryption};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

/// Store key under which the session record is persisted
pub const SESSION_KEY: &str = "session";

/// Errors surfaced by sign-in and sign-out
#[derive(Debug, Error)]
pub enum AuthError {
    /// The server address is empty or not a valid HTTP(S) URL
    #[error("invalid server address: {0}")]
    InvalidServer(String),

    /// Username or password was empty
    #[error("username and password are required")]
    MissingCredentials,

    /// The server answered but refused the credentials
    #[error("sign-in rejected: {0}")]
    Rejected(String),

    /// The server could not be reached or sent an unreadable response
    #[error("could not reach the server: {0}")]
    Network(#[source] JellyfinError),

    /// The credential store failed to persist the change
    #[error("credential store failure: {0}")]
    Store(#[source] anyhow::Error),
}

/// Classify an API failure for the sign-in flow
fn map_api_error(err: JellyfinError) -> AuthError {
    if matches!(
        err,
        JellyfinError::InvalidServer(_) | JellyfinError::InvalidUrl(_)
    ) {
        return AuthError::InvalidServer(err.to_string());
    }
    if err.is_auth_error() || matches!(err, JellyfinError::NotFound(_) | JellyfinError::Api { .. })
    {
        let message = match err.server_message() {
            Some(message) if !message.is_empty() => message.to_string(),
            _ => err.to_string(),
        };
        return AuthError::Rejected(message);
    }
    AuthError::Network(err)
}

/// Persisted session record (YAML in the credential store)
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub(crate) struct SessionRecord {
    /// Normalized server base URL, kept after sign-out for prefill
    pub server: String,
    /// Access token, empty when signed out
    pub access_token: String,
    /// Identifier of the signed-in user
    pub user_id: String,
    /// Username, kept after sign-out for prefill
    pub username: String,
    /// Password encrypted with the machine-bound key, may be empty
    pub password: String,
    /// Device identifier the token was issued to
    pub device_id: String,
    /// When this record was last written
    pub saved_at: Option<DateTime<Utc>>,
}

/// In-memory session state
#[derive(Debug, Default)]
struct SessionState {
    record: SessionRecord,
    /// Parsed form of `record.server`, present when the address is valid
    server_url: Option<Url>,
}

/// Owner of the signed-in state
///
/// All methods take `&self`; the state sits behind a lock so the manager
/// can be shared across tasks.
pub struct SessionManager {
    store: Arc<dyn CredentialStore>,
    state: RwLock<SessionState>,
}

impl SessionManager {
    /// Create a signed-out manager on top of the given store
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self {
            store,
            state: RwLock::new(SessionState::default()),
        }
    }

    /// Create a manager and rehydrate the saved session, if any
    ///
    /// Never fails: a missing, unreadable or corrupt record logs a warning
    /// and yields a signed-out manager.
    pub async fn restore(store: Arc<dyn CredentialStore>) -> Self {
        let manager = Self::new(store);

        let text = match manager.store.get(SESSION_KEY).await {
            Ok(Some(text)) => text,
            Ok(None) => {
                debug!("No saved session");
                return manager;
            }
            Err(e) => {
                warn!("Could not read saved session: {}", e);
                return manager;
            }
        };

        let mut record: SessionRecord = match serde_yaml::from_str(&text) {
            Ok(record) => record,
            Err(e) => {
                warn!("Ignoring corrupt session record: {}", e);
                return manager;
            }
        };

        if record.device_id.is_empty() {
            record.device_id = Uuid::new_v4().to_string();
        }

        let server_url = if record.server.is_empty() {
            None
        } else {
            match normalize_server_url(&record.server) {
                Ok(url) => Some(url),
                Err(e) => {
                    warn!("Saved session has an unusable server address: {}", e);
                    record.server.clear();
                    record.access_token.clear();
                    record.user_id.clear();
                    None
                }
            }
        };

        if !record.access_token.is_empty() {
            info!("Restored session for {} on {}", record.username, record.server);
        }

        *manager.state.write().unwrap() = SessionState { record, server_url };
        manager
    }

    /// Sign in against a server
    ///
    /// On success the new session is persisted to the store and then
    /// installed in memory. On any failure the previous state is left
    /// exactly as it was, both in memory and in the store.
    pub async fn authenticate(
        &self,
        server: &str,
        username: &str,
        password: &str,
    ) -> Result<AuthSession, AuthError> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        let url = normalize_server_url(server)
            .map_err(|e| AuthError::InvalidServer(e.to_string()))?;

        // Reuse the device identifier so the server sees one device per
        // installation instead of one per sign-in
        let device_id = {
            let state = self.state.read().unwrap();
            if state.record.device_id.is_empty() {
                Uuid::new_v4().to_string()
            } else {
                state.record.device_id.clone()
            }
        };

        let mut client = JellyfinClient::from_parts(
            url.clone(),
            None,
            DeviceProfile::with_device_id(device_id.clone()),
        );
        let session = client
            .authenticate_by_name(username, password)
            .await
            .map_err(map_api_error)?;

        let stored_password = match encryption::encrypt_password(password) {
            Ok(ciphertext) => ciphertext,
            Err(e) => {
                warn!("Could not encrypt password for storage: {}", e);
                String::new()
            }
        };

        let record = SessionRecord {
            server: url.to_string(),
            access_token: session.access_token.clone(),
            user_id: session.user_id.clone(),
            username: username.to_string(),
            password: stored_password,
            device_id,
            saved_at: Some(Utc::now()),
        };

        // Persist before installing so a store failure changes nothing
        let yaml = serde_yaml::to_string(&record).map_err(|e| AuthError::Store(e.into()))?;
        self.store
            .set(SESSION_KEY, &yaml)
            .await
            .map_err(AuthError::Store)?;

        info!("Signed in as {} on {}", record.username, record.server);

        *self.state.write().unwrap() = SessionState {
            record,
            server_url: Some(url),
        };

        Ok(session)
    }

    /// Sign out
    ///
    /// Clears the token, user id and saved password; the server address and
    /// username are kept so the sign-in form can be prefilled. The cleared
    /// record is written through to the store; when that write fails the
    /// stored record is deleted instead, so an authenticated record never
    /// outlives the sign-out (the prefill data is lost in that case).
    pub async fn logout(&self) -> Result<(), AuthError> {
        let record = {
            let mut state = self.state.write().unwrap();
            state.record.access_token.clear();
            state.record.user_id.clear();
            state.record.password.clear();
            state.record.saved_at = Some(Utc::now());
            state.record.clone()
        };

        info!("Signed out from {}", record.server);

        let written = match serde_yaml::to_string(&record) {
            Ok(yaml) => self.store.set(SESSION_KEY, &yaml).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = written {
            // The cleared record could not be written; remove the stored
            // one so the old token cannot come back on the next restore
            warn!("Could not persist sign-out ({}), removing the stored session", e);
            self.store
                .delete(SESSION_KEY)
                .await
                .map_err(AuthError::Store)?;
        }
        Ok(())
    }

    /// Whether a server and an access token are both present
    pub fn is_authenticated(&self) -> bool {
        let state = self.state.read().unwrap();
        !state.record.server.is_empty() && !state.record.access_token.is_empty()
    }

    /// Client bound to the current session
    ///
    /// Returns `None` when signed out. The client snapshots the token at
    /// call time, so keep it short-lived and ask again for the next batch
    /// of requests.
    pub fn client(&self) -> Option<JellyfinClient> {
        let state = self.state.read().unwrap();
        if state.record.access_token.is_empty() {
            return None;
        }
        let url = state.server_url.clone()?;
        Some(JellyfinClient::from_parts(
            url,
            Some(state.record.access_token.clone()),
            DeviceProfile::with_device_id(state.record.device_id.clone()),
        ))
    }

    /// Server address of the current or last session
    pub fn server(&self) -> Option<String> {
        let state = self.state.read().unwrap();
        if state.record.server.is_empty() {
            None
        } else {
            Some(state.record.server.clone())
        }
    }

    /// Username of the current or last session
    pub fn username(&self) -> Option<String> {
        let state = self.state.read().unwrap();
        if state.record.username.is_empty() {
            None
        } else {
            Some(state.record.username.clone())
        }
    }

    /// Identifier of the signed-in user
    pub fn user_id(&self) -> Option<String> {
        let state = self.state.read().unwrap();
        if state.record.user_id.is_empty() {
            None
        } else {
            Some(state.record.user_id.clone())
        }
    }

    /// Decrypted saved password, for prefilling the sign-in form
    pub fn saved_password(&self) -> Option<String> {
        let state = self.state.read().unwrap();
        if state.record.password.is_empty() {
            return None;
        }
        match encryption::reveal_password(&state.record.password) {
            Ok(password) => Some(password),
            Err(e) => {
                warn!("Could not decrypt saved password: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pmovault::MemoryVault;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn record(server: &str, token: &str) -> SessionRecord {
        SessionRecord {
            server: server.to_string(),
            access_token: token.to_string(),
            user_id: "u1".to_string(),
            username: "alice".to_string(),
            device_id: "dev-1".to_string(),
            ..Default::default()
        }
    }

    /// Store whose writes can be made to fail on demand
    struct FlakyVault {
        inner: MemoryVault,
        fail_set: AtomicBool,
    }

    impl FlakyVault {
        fn new() -> Self {
            Self {
                inner: MemoryVault::new(),
                fail_set: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl CredentialStore for FlakyVault {
        async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
            if self.fail_set.load(Ordering::SeqCst) {
                anyhow::bail!("store unavailable");
            }
            self.inner.set(key, value).await
        }

        async fn delete(&self, key: &str) -> anyhow::Result<()> {
            self.inner.delete(key).await
        }
    }

    #[test]
    fn test_new_manager_is_signed_out() {
        let manager = SessionManager::new(Arc::new(MemoryVault::new()));
        assert!(!manager.is_authenticated());
        assert!(manager.client().is_none());
        assert!(manager.server().is_none());
    }

    #[test]
    fn test_record_yaml_roundtrip() {
        let record = record("http://media.local:8096/", "tok");
        let yaml = serde_yaml::to_string(&record).unwrap();
        let back: SessionRecord = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_map_api_error() {
        assert!(matches!(
            map_api_error(JellyfinError::Unauthorized("nope".to_string())),
            AuthError::Rejected(_)
        ));
        assert!(matches!(
            map_api_error(JellyfinError::Api {
                status: 500,
                message: "boom".to_string()
            }),
            AuthError::Rejected(_)
        ));
        assert!(matches!(
            map_api_error(JellyfinError::InvalidServer("bad".to_string())),
            AuthError::InvalidServer(_)
        ));
    }

    #[tokio::test]
    async fn test_empty_credentials_rejected_before_any_io() {
        let vault = Arc::new(MemoryVault::new());
        let manager = SessionManager::new(vault.clone());

        let err = manager
            .authenticate("http://media.local:8096", "  ", "pw")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::MissingCredentials));

        let err = manager
            .authenticate("http://media.local:8096", "alice", "")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::MissingCredentials));

        assert!(!manager.is_authenticated());
        assert!(vault.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_server_rejected_before_any_io() {
        let vault = Arc::new(MemoryVault::new());
        let manager = SessionManager::new(vault.clone());

        let err = manager
            .authenticate("ftp://media.local", "alice", "pw")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidServer(_)));
        assert!(vault.is_empty());
    }

    #[tokio::test]
    async fn test_restore_without_record_is_signed_out() {
        let manager = SessionManager::restore(Arc::new(MemoryVault::new())).await;
        assert!(!manager.is_authenticated());
    }

    #[tokio::test]
    async fn test_restore_tolerates_corrupt_record() {
        let vault = Arc::new(MemoryVault::new());
        vault.set(SESSION_KEY, "{not yaml: [").await.unwrap();

        let manager = SessionManager::restore(vault).await;
        assert!(!manager.is_authenticated());
        assert!(manager.client().is_none());
    }

    #[tokio::test]
    async fn test_restore_recovers_saved_session() {
        let vault = Arc::new(MemoryVault::new());
        let yaml = serde_yaml::to_string(&record("http://media.local:8096/", "tok")).unwrap();
        vault.set(SESSION_KEY, &yaml).await.unwrap();

        let manager = SessionManager::restore(vault.clone()).await;
        assert!(manager.is_authenticated());
        assert_eq!(manager.server().as_deref(), Some("http://media.local:8096/"));
        assert_eq!(manager.username().as_deref(), Some("alice"));
        assert_eq!(manager.user_id().as_deref(), Some("u1"));

        let client = manager.client().unwrap();
        assert_eq!(client.access_token(), Some("tok"));
        assert_eq!(client.device().device_id, "dev-1");

        // Restoring never writes, so a second restore from the same store
        // lands in the same state
        let again = SessionManager::restore(vault).await;
        assert!(again.is_authenticated());
        assert_eq!(again.server(), manager.server());
        assert_eq!(again.username(), manager.username());
        assert_eq!(again.user_id(), manager.user_id());
        assert_eq!(
            again.client().unwrap().access_token(),
            client.access_token()
        );
    }

    #[tokio::test]
    async fn test_restore_discards_token_with_unusable_server() {
        let vault = Arc::new(MemoryVault::new());
        let yaml = serde_yaml::to_string(&record("ftp://media.local", "tok")).unwrap();
        vault.set(SESSION_KEY, &yaml).await.unwrap();

        let manager = SessionManager::restore(vault).await;
        assert!(!manager.is_authenticated());
        assert!(manager.client().is_none());
        // Username survives for the sign-in form
        assert_eq!(manager.username().as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn test_logout_clears_token_keeps_server_and_username() {
        let vault = Arc::new(MemoryVault::new());
        let yaml = serde_yaml::to_string(&record("http://media.local:8096/", "tok")).unwrap();
        vault.set(SESSION_KEY, &yaml).await.unwrap();

        let manager = SessionManager::restore(vault.clone()).await;
        assert!(manager.is_authenticated());

        manager.logout().await.unwrap();
        assert!(!manager.is_authenticated());
        assert!(manager.client().is_none());
        assert_eq!(manager.server().as_deref(), Some("http://media.local:8096/"));
        assert_eq!(manager.username().as_deref(), Some("alice"));

        // The cleared record was written through
        let stored = vault.get(SESSION_KEY).await.unwrap().unwrap();
        let stored: SessionRecord = serde_yaml::from_str(&stored).unwrap();
        assert!(stored.access_token.is_empty());
        assert_eq!(stored.server, "http://media.local:8096/");
    }

    #[tokio::test]
    async fn test_logout_with_failing_store_still_removes_the_record() {
        let vault = Arc::new(FlakyVault::new());
        let yaml = serde_yaml::to_string(&record("http://media.local:8096/", "tok")).unwrap();
        vault.set(SESSION_KEY, &yaml).await.unwrap();

        let manager = SessionManager::restore(vault.clone()).await;
        assert!(manager.is_authenticated());

        vault.fail_set.store(true, Ordering::SeqCst);
        manager.logout().await.unwrap();
        assert!(!manager.is_authenticated());

        // The authenticated record must not outlive the sign-out
        assert!(vault.get(SESSION_KEY).await.unwrap().is_none());
    }
}
