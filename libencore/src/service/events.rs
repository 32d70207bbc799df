//! Notifications from screens to whatever draws them
//!
//! List contents travel through each loader's `watch` channel. Everything
//! else (session flips, purchases, favorite changes, alert dialogs) goes
//! over this broadcast bus. Emitting never waits: with no subscriber the
//! event is gone, and a slow subscriber sees `Lagged` instead of stalling
//! the screen.
//!
//! ```no_run
//! use libencore::service::events::{Event, EventBus};
//!
//! # async fn example() {
//! let bus = EventBus::default();
//! let mut alerts = bus.subscribe();
//!
//! bus.alert("Error", "Couldn't buy ticket");
//!
//! while let Ok(event) = alerts.recv().await {
//!     if let Event::Alert { title, message } = event {
//!         eprintln!("{}: {}", title, message);
//!     }
//! }
//! # }
//! ```

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

pub type EventReceiver = broadcast::Receiver<Event>;

/// Default per-subscriber buffer
pub const DEFAULT_CAPACITY: usize = 100;

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventBus {
    /// Bus buffering `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events emitted after this call
    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: Event) {
        if self.sender.send(event).is_err() {
            tracing::trace!("Event dropped, no subscribers");
        }
    }

    /// Publish a user-facing alert
    pub fn alert(&self, title: impl Into<String>, message: impl Into<String>) {
        self.emit(Event::Alert {
            title: title.into(),
            message: message.into(),
        });
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Events emitted by the screen services
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Logged in or out
    SessionChanged { authenticated: bool },

    TicketPurchased { concert_id: String },

    /// A concert's favorite flag was confirmed by the server
    FavoriteChanged { concert_id: String, is_favorite: bool },

    FavoriteRemoved { favorite_id: String },

    /// Something the user should see in a dialog
    Alert { title: String, message: String },
}
