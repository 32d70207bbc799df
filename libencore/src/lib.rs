//! Encore - client library for the concert ticketing service
//!
//! This library holds everything the Encore front-ends share: the persisted
//! session, the typed REST client, list loading with stale-response
//! protection, and one service per app screen.

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod loader;
pub mod logging;
pub mod normalize;
pub mod router;
pub mod service;
pub mod session;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use api::{ApiClient, Endpoint, Method};
pub use config::Config;
pub use error::{ApiError, EncoreError, Result};
pub use loader::{ListState, RemoteList, View};
pub use normalize::Shape;
pub use router::{Route, Tab};
pub use service::EncoreService;
pub use session::{BearerToken, SessionState, SessionStore};
pub use storage::{StorageBackend, StorageConfig, StorageManager, TokenStore};
pub use types::{Concert, Favorite, Post, Ticket, UserProfile};
