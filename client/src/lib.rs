//! Native client SDK for the videohub video/social backend.
//!
//! SYSTEM CONTEXT
//! ==============
//! Command handlers (`pages`) call typed endpoints (`api`), which go through
//! the envelope-aware [`http::HttpClient`]. The [`session::SessionStore`] is
//! the single owner of auth state and is injected into the HTTP wrapper and
//! the [`router::Navigator`] guard. Chat traffic uses the
//! [`realtime::RealtimeClient`] state machine.

pub mod api;
pub mod config;
pub mod error;
pub mod format;
pub mod http;
pub mod notify;
pub mod pages;
pub mod realtime;
pub mod router;
pub mod session;
pub mod storage;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

pub use config::ClientConfig;
pub use error::{ApiError, ClientError, ErrorKind};

use http::HttpClient;
use notify::NotificationCenter;
use realtime::RealtimeClient;
use router::Navigator;
use session::SessionStore;
use storage::{FileStore, KeyValueStore};

/// Fully wired client: session, navigation, HTTP, realtime and notices.
#[derive(Clone)]
pub struct Client {
    pub config: ClientConfig,
    pub session: SessionStore,
    pub navigator: Navigator,
    pub http: HttpClient,
    pub realtime: RealtimeClient,
    pub notices: NotificationCenter,
}

impl Client {
    /// Wire a client around an arbitrary key-value store.
    ///
    /// # Errors
    ///
    /// Returns an error if the websocket base URL cannot be derived or the
    /// HTTP client cannot be built.
    pub fn new(config: ClientConfig, storage: Arc<dyn KeyValueStore>) -> Result<Self, ClientError> {
        let session = SessionStore::hydrate(storage);
        let navigator = Navigator::new(session.clone());
        let http = HttpClient::new(&config, session.clone(), navigator.clone())?;
        let realtime = RealtimeClient::with_handshake_timeout(config.ws_base()?, config.timeout);
        Ok(Self {
            config,
            session,
            navigator,
            http,
            realtime,
            notices: NotificationCenter::default(),
        })
    }

    /// Wire a client whose session persists to `<state_dir>/session.json`.
    ///
    /// # Errors
    ///
    /// Returns an error if the session file exists but cannot be read, or if
    /// [`Client::new`] fails.
    pub fn open(config: ClientConfig) -> Result<Self, ClientError> {
        let storage = FileStore::open(config.session_file())?;
        Self::new(config, Arc::new(storage))
    }

    /// Bound every HTTP call made through this client, and through page
    /// handlers built from it, by `cancel`.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.http = self.http.with_cancel(cancel);
        self
    }
}
