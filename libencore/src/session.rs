//! Session store: the single owner of the bearer token
//!
//! Lifecycle is `Uninitialized -> Restoring -> Ready(token | none)`. The only
//! suspension point before `Ready` is the one read from durable storage in
//! [`SessionStore::restore`]. After that, [`SessionStore::log_in`] and
//! [`SessionStore::log_out`] move between the two `Ready` variants, always
//! writing durable storage first so the in-memory state never claims a token
//! that failed to persist.
//!
//! Consumers get a cheap clone of the store and either read
//! [`SessionStore::current`] or follow changes through
//! [`SessionStore::subscribe`].

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use zeroize::Zeroize;

use crate::error::{EncoreError, Result, StorageError};
use crate::storage::{TokenStore, TOKEN_KEY};

/// Opaque bearer credential
///
/// `Debug` never prints the value and the buffer is zeroed on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    /// Wrap a token, rejecting blank input
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(EncoreError::InvalidInput("token must not be empty".to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The raw token, for the `Authorization` header only
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken(***)")
    }
}

impl Drop for BearerToken {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// Snapshot of the session lifecycle
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Uninitialized,
    Restoring,
    Ready { token: Option<BearerToken> },
}

impl SessionState {
    pub fn is_ready(&self) -> bool {
        matches!(self, SessionState::Ready { .. })
    }

    pub fn token(&self) -> Option<&BearerToken> {
        match self {
            SessionState::Ready { token } => token.as_ref(),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }
}

/// Process-scoped session store
///
/// Clones share the same state and storage backend.
#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<dyn TokenStore>,
    state: Arc<watch::Sender<SessionState>>,
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("backend", &self.storage.backend_name())
            .field("state", &*self.state.borrow())
            .finish()
    }
}

impl SessionStore {
    pub fn new(storage: Arc<dyn TokenStore>) -> Self {
        let (state, _) = watch::channel(SessionState::Uninitialized);
        Self {
            storage,
            state: Arc::new(state),
        }
    }

    /// Current in-memory snapshot
    pub fn current(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn token(&self) -> Option<BearerToken> {
        self.state.borrow().token().cloned()
    }

    pub fn is_ready(&self) -> bool {
        self.state.borrow().is_ready()
    }

    /// Follow state transitions
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Resolve once the store reaches `Ready`
    pub async fn wait_ready(&self) -> SessionState {
        let mut rx = self.subscribe();
        let state = match rx.wait_for(SessionState::is_ready).await {
            Ok(state) => state.clone(),
            // The sender lives in `self`, so the channel cannot close here
            Err(_) => self.current(),
        };
        state
    }

    /// Read the persisted token once
    ///
    /// Storage failures are logged and treated as "no session" so startup
    /// never hangs on a broken keyring. Only the first call does any work.
    pub async fn restore(&self) -> SessionState {
        let started = self.state.send_if_modified(|state| {
            if *state == SessionState::Uninitialized {
                *state = SessionState::Restoring;
                true
            } else {
                false
            }
        });

        if !started {
            tracing::debug!("Session restore already performed");
            return self.wait_ready().await;
        }

        let storage = Arc::clone(&self.storage);
        let loaded = tokio::task::spawn_blocking(move || storage.retrieve(TOKEN_KEY)).await;

        let token = match loaded {
            Ok(Ok(raw)) => match BearerToken::new(raw) {
                Ok(token) => Some(token),
                Err(_) => {
                    tracing::warn!("Persisted token is blank, starting logged out");
                    None
                }
            },
            Ok(Err(EncoreError::Storage(StorageError::NotFound(_)))) => None,
            Ok(Err(e)) => {
                tracing::warn!("Failed to restore session, starting logged out: {}", e);
                None
            }
            Err(e) => {
                tracing::warn!("Session restore task failed, starting logged out: {}", e);
                None
            }
        };

        tracing::debug!(
            authenticated = token.is_some(),
            backend = self.storage.backend_name(),
            "Session restored"
        );

        let state = SessionState::Ready { token };
        self.state.send_replace(state.clone());
        state
    }

    /// Persist `token`, then publish it
    ///
    /// On a storage failure the error is returned and the in-memory state is
    /// left as it was.
    pub async fn log_in(&self, token: BearerToken) -> Result<()> {
        let storage = Arc::clone(&self.storage);
        let raw = token.expose().to_string();
        tokio::task::spawn_blocking(move || {
            let mut raw = raw;
            let result = storage.store(TOKEN_KEY, &raw);
            raw.zeroize();
            result
        })
        .await
        .map_err(|e| StorageError::Io(std::io::Error::other(e.to_string())))??;

        self.state.send_replace(SessionState::Ready { token: Some(token) });
        tracing::info!("Logged in");
        Ok(())
    }

    /// Remove the persisted token, then publish the logged-out state
    pub async fn log_out(&self) -> Result<()> {
        let storage = Arc::clone(&self.storage);
        tokio::task::spawn_blocking(move || storage.delete(TOKEN_KEY))
            .await
            .map_err(|e| StorageError::Io(std::io::Error::other(e.to_string())))??;

        self.state.send_replace(SessionState::Ready { token: None });
        tracing::info!("Logged out");
        Ok(())
    }
}
