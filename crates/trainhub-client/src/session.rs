//! The authenticated session.
//!
//! A `Session` owns the HTTP client, the durable token store, the current
//! user and the capability set derived from the user's role. Every gated
//! operation goes through [`Session::authorized`], which checks the
//! capability before any request is sent and logs the session out when the
//! backend rejects the token.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use trainhub_core::capability::{Capability, CapabilitySet};
use trainhub_core::model::{Credentials, NewUser, User};
use trainhub_core::traits::TrainingApi;

use crate::config::TrainhubConfig;
use crate::error::{ApiError, SessionError, ValidationError};
use crate::http::HttpClient;

/// Contents of the token file.
///
/// Note: Custom Debug impl masks the token to keep it out of logs.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    #[serde(default)]
    pub username: String,
}

impl std::fmt::Debug for StoredToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredToken")
            .field("access_token", &"***")
            .field("username", &self.username)
            .finish()
    }
}

/// JSON file holding the bearer token between invocations.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn display(&self) -> String {
        self.path.display().to_string()
    }

    /// `None` when no token has been saved.
    pub fn load(&self) -> Result<Option<StoredToken>, SessionError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(SessionError::Store {
                    path: self.display(),
                    source,
                })
            }
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| SessionError::Corrupt {
                path: self.display(),
                source,
            })
    }

    pub fn save(&self, token: &StoredToken) -> Result<(), SessionError> {
        let store_err = |source| SessionError::Store {
            path: self.display(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(store_err)?;
        }
        let json = serde_json::to_string_pretty(token).map_err(|source| SessionError::Corrupt {
            path: self.display(),
            source,
        })?;
        std::fs::write(&self.path, json).map_err(store_err)?;
        restrict_permissions(&self.path).map_err(store_err)
    }

    /// Remove the token file. Missing files are fine.
    pub fn clear(&self) -> Result<(), SessionError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(SessionError::Store {
                path: self.display(),
                source,
            }),
        }
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

/// Current user, token and capabilities.
pub struct Session {
    client: Arc<HttpClient>,
    store: TokenStore,
    user: Option<User>,
    capabilities: CapabilitySet,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("client", &self.client)
            .field("store", &self.store)
            .field("user", &self.user.as_ref().map(|u| &u.username))
            .finish()
    }
}

impl Session {
    /// An anonymous session. Call [`Session::restore`] to pick up a saved token.
    pub fn new(client: Arc<HttpClient>, store: TokenStore) -> Self {
        Self {
            client,
            store,
            user: None,
            capabilities: CapabilitySet::anonymous(),
        }
    }

    pub fn from_config(config: &TrainhubConfig) -> Result<Self, SessionError> {
        let client = HttpClient::new(&config.base_url, config.timeout_secs)?;
        Ok(Self::new(
            Arc::new(client),
            TokenStore::new(config.token_path.clone()),
        ))
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    /// The backend, for callers that already passed a capability check.
    pub fn api(&self) -> Arc<dyn TrainingApi> {
        self.client.clone()
    }

    pub fn require(&self, capability: Capability) -> Result<(), ApiError> {
        self.capabilities.require(capability)
    }

    fn establish(&mut self, user: User) -> &User {
        tracing::debug!(username = %user.username, role = %user.role, "session established");
        self.capabilities = CapabilitySet::for_role(user.role);
        self.user.insert(user)
    }

    fn teardown(&mut self) {
        self.client.set_token(None);
        self.user = None;
        self.capabilities = CapabilitySet::anonymous();
    }

    /// Validate a previously saved token with `GET /api/me`.
    ///
    /// Returns whether a user is now logged in. A rejected token is removed
    /// from the store; a network failure leaves it for the next attempt.
    pub async fn restore(&mut self) -> Result<bool, SessionError> {
        let Some(stored) = self.store.load()? else {
            return Ok(false);
        };
        self.client.set_token(Some(stored.access_token));

        match self.client.me().await {
            Ok(user) => {
                self.establish(user);
                Ok(true)
            }
            Err(e) if e.is_auth_failure() => {
                tracing::warn!("stored token rejected, logging out: {e}");
                self.logout()?;
                Ok(false)
            }
            Err(e) => {
                self.teardown();
                Err(e.into())
            }
        }
    }

    /// Log in and persist the token.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<&User, SessionError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(ApiError::from(ValidationError::MissingField("username")).into());
        }
        if password.is_empty() {
            return Err(ApiError::from(ValidationError::MissingField("password")).into());
        }

        self.teardown();
        let response = self
            .client
            .login(&Credentials {
                username: username.to_string(),
                password: password.to_string(),
            })
            .await?;

        self.store.save(&StoredToken {
            access_token: response.access_token.clone(),
            username: response.user.username.clone(),
        })?;
        self.client.set_token(Some(response.access_token));
        tracing::info!(username, "logged in");
        Ok(self.establish(response.user))
    }

    /// Create an account. Does not log in.
    pub async fn register(&self, user: &NewUser) -> Result<User, SessionError> {
        let required = [
            ("username", &user.username),
            ("email", &user.email),
            ("password", &user.password),
            ("full_name", &user.full_name),
        ];
        if let Some((field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(ApiError::from(ValidationError::MissingField(*field)).into());
        }
        Ok(self.client.register(user).await?)
    }

    /// Clear the token, the user and every capability.
    pub fn logout(&mut self) -> Result<(), SessionError> {
        if let Some(user) = &self.user {
            tracing::info!(username = %user.username, "logged out");
        }
        self.teardown();
        self.store.clear()
    }

    /// Log out if `result` is an authentication failure, then pass it on.
    pub fn guard<T>(&mut self, result: Result<T, ApiError>) -> Result<T, ApiError> {
        if let Err(e) = &result {
            if e.is_auth_failure() {
                tracing::warn!("authentication failed, logging out: {e}");
                if let Err(clear) = self.logout() {
                    tracing::warn!("could not clear token store: {clear}");
                }
            }
        }
        result
    }

    /// Run `op` against the backend once `capability` is granted.
    pub async fn authorized<T, F, Fut>(&mut self, capability: Capability, op: F) -> Result<T, ApiError>
    where
        F: FnOnce(Arc<dyn TrainingApi>) -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        self.require(capability)?;
        let result = op(self.api()).await;
        self.guard(result)
    }
}
