//! Session store: the single owner of auth state.
//!
//! ARCHITECTURE
//! ============
//! [`SessionStore`] is an explicit context object (create, hydrate, mutate,
//! clear) shared by the HTTP wrapper, the navigator guard and the pages.
//! Every mutation writes through to the injected [`KeyValueStore`] under the
//! same keys the web client used, so a session written by one process is
//! rehydrated by the next.
//!
//! INVARIANT
//! =========
//! `profile` is only ever set while a token is held. Hydration drops a
//! persisted profile that has no token next to it.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::api;
use crate::api::types::LoginData;
use crate::error::ApiError;
use crate::http::HttpClient;
use crate::storage::{KeyValueStore, MemoryStore, StorageError, load_json, lock, save_json};

pub const TOKEN_KEY: &str = "token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
pub const USER_ID_KEY: &str = "user_id";
pub const PROFILE_KEY: &str = "userInfo";

/// Avatar shown when the user has none or still has the server default.
pub const DEFAULT_AVATAR: &str = "/src/assets/images/default.jpg";
const SERVER_DEFAULT_AVATAR: &str = "http://localhost:8080/avatars/default.jpg";

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("rejected profile update without a valid user id")]
    InvalidProfile,
    #[error("cannot store a profile without an active session")]
    NotLoggedIn,
    #[error("login response carried no token or user id")]
    IncompleteLogin,
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Server-sourced user profile.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub username: String,
    #[serde(default, alias = "avatar", skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl Profile {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.id > 0
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.username.is_empty() { "未知用户" } else { &self.username }
    }

    #[must_use]
    pub fn display_avatar(&self) -> &str {
        match self.avatar_url.as_deref() {
            None | Some("" | SERVER_DEFAULT_AVATAR) => DEFAULT_AVATAR,
            Some(url) => url,
        }
    }
}

/// Snapshot of the authenticated user as seen by this client.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Session {
    pub token: Option<String>,
    pub refresh_token: Option<String>,
    pub user_id: Option<i64>,
    pub profile: Option<Profile>,
}

impl Session {
    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.token.is_some()
    }
}

/// Username/password pair submitted to the auth endpoints.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Shared, persisted session state.
#[derive(Clone)]
pub struct SessionStore {
    state: Arc<Mutex<Session>>,
    storage: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let session = self.snapshot();
        f.debug_struct("SessionStore")
            .field("logged_in", &session.is_logged_in())
            .field("user_id", &session.user_id)
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Rebuild the in-memory session from `storage`. Absent keys yield the
    /// empty session.
    #[must_use]
    pub fn hydrate(storage: Arc<dyn KeyValueStore>) -> Self {
        let token = storage.get(TOKEN_KEY).filter(|t| !t.is_empty());
        let refresh_token = storage.get(REFRESH_TOKEN_KEY).filter(|t| !t.is_empty());
        let user_id = storage.get(USER_ID_KEY).and_then(|raw| raw.trim().parse::<i64>().ok());
        let mut profile = load_json::<Profile>(storage.as_ref(), PROFILE_KEY);

        if token.is_none() && profile.is_some() {
            tracing::warn!("dropping persisted profile without a token");
            profile = None;
        }

        tracing::debug!(logged_in = token.is_some(), ?user_id, "session hydrated");
        Self {
            state: Arc::new(Mutex::new(Session {
                token,
                refresh_token,
                user_id,
                profile,
            })),
            storage,
        }
    }

    /// Empty session backed by a [`MemoryStore`].
    #[must_use]
    pub fn in_memory() -> Self {
        Self::hydrate(Arc::new(MemoryStore::new()))
    }

    #[must_use]
    pub fn snapshot(&self) -> Session {
        lock(&self.state).clone()
    }

    #[must_use]
    pub fn token(&self) -> Option<String> {
        lock(&self.state).token.clone()
    }

    #[must_use]
    pub fn user_id(&self) -> Option<i64> {
        lock(&self.state).user_id
    }

    #[must_use]
    pub fn profile(&self) -> Option<Profile> {
        lock(&self.state).profile.clone()
    }

    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        lock(&self.state).is_logged_in()
    }

    /// Store the credentials returned by login or registration.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Storage`] if persisting fails; the in-memory
    /// session is updated regardless.
    pub fn set_credentials(
        &self,
        token: &str,
        refresh_token: Option<&str>,
        user_id: i64,
    ) -> Result<(), SessionError> {
        {
            let mut state = lock(&self.state);
            state.token = Some(token.to_owned());
            state.refresh_token = refresh_token.map(ToOwned::to_owned);
            state.user_id = Some(user_id);
        }

        self.storage.set(TOKEN_KEY, token)?;
        match refresh_token {
            Some(refresh) => self.storage.set(REFRESH_TOKEN_KEY, refresh)?,
            None => self.storage.remove(REFRESH_TOKEN_KEY)?,
        }
        self.storage.set(USER_ID_KEY, &user_id.to_string())?;
        tracing::info!(user_id, "session credentials stored");
        Ok(())
    }

    /// Overwrite the cached profile.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidProfile`] for a profile without a valid
    /// id and [`SessionError::NotLoggedIn`] when no token is held; the session
    /// is left unchanged in both cases.
    pub fn set_profile(&self, profile: Profile) -> Result<(), SessionError> {
        if !profile.is_valid() {
            tracing::warn!(id = profile.id, "rejecting profile update");
            return Err(SessionError::InvalidProfile);
        }
        {
            let mut state = lock(&self.state);
            if state.token.is_none() {
                tracing::warn!(id = profile.id, "rejecting profile update without session");
                return Err(SessionError::NotLoggedIn);
            }
            state.profile = Some(profile.clone());
        }
        save_json(self.storage.as_ref(), PROFILE_KEY, &profile)?;
        Ok(())
    }

    /// Clear every session field in memory and storage.
    ///
    /// # Errors
    ///
    /// Returns the first storage failure after attempting every removal; the
    /// in-memory session is always cleared.
    pub fn logout(&self) -> Result<(), SessionError> {
        *lock(&self.state) = Session::default();

        let mut first_error = None;
        for key in [TOKEN_KEY, REFRESH_TOKEN_KEY, USER_ID_KEY, PROFILE_KEY] {
            if let Err(error) = self.storage.remove(key) {
                tracing::warn!(key, %error, "failed to clear persisted session key");
                if first_error.is_none() {
                    first_error = Some(error);
                }
            }
        }
        tracing::info!("session cleared");

        match first_error {
            Some(error) => Err(error.into()),
            None => Ok(()),
        }
    }

    /// Exchange credentials for a token, then fetch and cache the profile.
    ///
    /// The profile request only starts after the credential exchange has
    /// resolved. On any failure the session is cleared before the error is
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns the failing API or storage error.
    pub async fn login(&self, http: &HttpClient, credentials: &Credentials) -> Result<LoginData, SessionError> {
        tracing::info!(username = %credentials.username, "logging in");
        let result = self.login_steps(http, credentials).await;
        if let Err(error) = &result {
            tracing::warn!(%error, "login failed; clearing session");
            if let Err(clear_error) = self.logout() {
                tracing::warn!(error = %clear_error, "failed to clear session after login failure");
            }
        }
        result
    }

    async fn login_steps(&self, http: &HttpClient, credentials: &Credentials) -> Result<LoginData, SessionError> {
        let login = api::user::login(http, credentials).await?;
        if login.token.trim().is_empty() || login.user_id <= 0 {
            return Err(SessionError::IncompleteLogin);
        }
        self.set_credentials(&login.token, login.refresh_token.as_deref(), login.user_id)?;

        let profile = api::user::get_user_info(http, login.user_id).await?;
        if profile.is_valid() {
            self.set_profile(profile)?;
        } else {
            tracing::warn!(user_id = login.user_id, "user info response carried no id");
        }
        Ok(login)
    }
}
