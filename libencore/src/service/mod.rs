//! Service layer for Encore
//!
//! This module provides the API that front-ends (the `encore-*` tools, or
//! any other UI) drive. Each screen of the app is a small service owning a
//! [`RemoteList`](crate::loader::RemoteList) plus the actions that screen
//! offers.
//!
//! # Architecture
//!
//! `EncoreService` is the facade and the single owner of shared state:
//!
//! - `SessionStore`: the bearer token and its lifecycle
//! - `ApiClient`: typed access to the REST API
//! - `EventBus`: session changes and alerts
//!
//! Screens are handed out on demand and share those instances:
//!
//! - `AuthService`: login, registration, logout
//! - `PostsScreen`: latest posts feed
//! - `ConcertsScreen`: catalogue, search, buying, favorites
//! - `TicketsScreen`: purchased tickets
//! - `FavoritesScreen`: favorite concerts
//! - `ProfileScreen`: current user
//!
//! # Example
//!
//! ```no_run
//! use libencore::service::EncoreService;
//!
//! # async fn example() -> libencore::Result<()> {
//! let service = EncoreService::new()?;
//! service.restore().await;
//!
//! let concerts = service.concerts();
//! concerts.load().await?;
//! println!("{:?}", concerts.state());
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod concerts;
pub mod events;
pub mod favorites;
pub mod posts;
pub mod profile;
pub mod tickets;

use std::sync::Arc;

pub use self::auth::AuthService;
pub use self::concerts::ConcertsScreen;
pub use self::events::{Event, EventBus, EventReceiver};
pub use self::favorites::FavoritesScreen;
pub use self::posts::PostsScreen;
pub use self::profile::ProfileScreen;
pub use self::tickets::TicketsScreen;

use crate::api::{ApiClient, Transport};
use crate::config::Config;
use crate::router::{self, Route};
use crate::session::{SessionState, SessionStore};
use crate::storage::{StorageManager, TokenStore};
use crate::Result;

/// Page of a paged listing (1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u32,
    pub take: u32,
}

impl Page {
    pub fn first(take: u32) -> Self {
        Self { page: 1, take }
    }
}

/// Shared handles every screen needs
#[derive(Clone)]
pub(crate) struct ScreenContext {
    pub api: ApiClient,
    pub session: SessionStore,
    pub events: EventBus,
    pub config: Arc<Config>,
}

impl ScreenContext {
    pub fn first_page(&self) -> Page {
        Page::first(self.config.api.page_size)
    }
}

/// Main service facade
pub struct EncoreService {
    ctx: ScreenContext,
}

impl EncoreService {
    /// Create a service from the default configuration file
    pub fn new() -> Result<Self> {
        let config = Config::load()?;
        Self::from_config(config)
    }

    /// Create a service talking HTTP to `config.api.base_url`, storing the
    /// token in the configured backend
    pub fn from_config(config: Config) -> Result<Self> {
        let storage = StorageManager::new(config.storage.clone())?;
        let api = ApiClient::from_config(&config.api)?;
        Ok(Self::with_parts(config, Arc::new(storage), api))
    }

    /// Create a service over a custom transport, for tests and offline runs
    pub fn with_transport(
        config: Config,
        storage: Arc<dyn TokenStore>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let api = ApiClient::new(transport).with_timeout(config.api.timeout()?);
        Ok(Self::with_parts(config, storage, api))
    }

    fn with_parts(config: Config, storage: Arc<dyn TokenStore>, api: ApiClient) -> Self {
        let session = SessionStore::new(storage);
        Self {
            ctx: ScreenContext {
                api,
                session,
                events: EventBus::default(),
                config: Arc::new(config),
            },
        }
    }

    pub fn config(&self) -> &Config {
        &self.ctx.config
    }

    pub fn session(&self) -> &SessionStore {
        &self.ctx.session
    }

    pub fn api(&self) -> &ApiClient {
        &self.ctx.api
    }

    /// Restore the persisted session (first call only)
    pub async fn restore(&self) -> SessionState {
        self.ctx.session.restore().await
    }

    /// Where the guard sends the user right now
    pub fn route(&self) -> Route {
        router::guard(&self.ctx.session.current())
    }

    pub fn auth(&self) -> AuthService {
        AuthService::new(self.ctx.clone())
    }

    pub fn posts(&self) -> PostsScreen {
        PostsScreen::new(self.ctx.clone())
    }

    pub fn concerts(&self) -> ConcertsScreen {
        ConcertsScreen::new(self.ctx.clone())
    }

    pub fn tickets(&self) -> TicketsScreen {
        TicketsScreen::new(self.ctx.clone())
    }

    pub fn favorites(&self) -> FavoritesScreen {
        FavoritesScreen::new(self.ctx.clone())
    }

    pub fn profile(&self) -> ProfileScreen {
        ProfileScreen::new(self.ctx.clone())
    }

    /// Subscribe to service events
    ///
    /// Returns a receiver for alerts and state-change notices from every
    /// screen. Multiple subscribers are supported.
    pub fn subscribe(&self) -> EventReceiver {
        self.ctx.events.subscribe()
    }
}
