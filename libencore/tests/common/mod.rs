//! Shared fixtures for libencore integration tests

#![allow(dead_code)]

use std::sync::Arc;

use libencore::api::mock::{MockResponse, MockTransport};
use libencore::api::{Endpoint, Method};
use libencore::config::Config;
use libencore::storage::{MemoryStore, TokenStore, TOKEN_KEY};
use libencore::EncoreService;
use serde_json::{json, Value};

pub const TOKEN: &str = "test-token";

pub struct Fixture {
    pub service: EncoreService,
    pub mock: Arc<MockTransport>,
    pub storage: Arc<MemoryStore>,
}

/// Service over a mock transport, not yet restored
pub fn fixture_with(config: Config, token: Option<&str>) -> Fixture {
    let mock = Arc::new(MockTransport::new());
    let storage = Arc::new(MemoryStore::new());
    if let Some(token) = token {
        storage.store(TOKEN_KEY, token).unwrap();
    }
    let service =
        EncoreService::with_transport(config, storage.clone(), mock.clone()).unwrap();
    Fixture {
        service,
        mock,
        storage,
    }
}

/// Restored, logged-in service with default configuration
pub async fn logged_in() -> Fixture {
    let fixture = fixture_with(Config::default(), Some(TOKEN));
    fixture.service.restore().await;
    fixture
}

pub fn first_concert_page() -> Endpoint {
    Endpoint::ConcertsPaged {
        page: 1,
        take: 25,
        name: None,
    }
}

pub fn concert_json(id: &str, available: i64) -> Value {
    json!({
        "id": id,
        "name": format!("Concert {}", id),
        "startedAt": "2025-06-01T19:30:00",
        "ticketPrice": 1500,
        "availableTicketAmount": available,
        "image": null
    })
}

pub fn favorite_json(id: &str, concert_id: &str) -> Value {
    json!({
        "id": id,
        "concertId": concert_id,
        "concert": {
            "id": concert_id,
            "name": format!("Concert {}", concert_id),
            "startedAt": "2025-06-01T19:30:00",
            "ticketPrice": 1500
        }
    })
}

pub fn post_json(id: &str) -> Value {
    json!({
        "id": id,
        "text": format!("Post {}", id),
        "createdAt": "2025-05-01T10:00:00",
        "userId": "u1"
    })
}

/// Script the concerts screen's initial load
pub fn script_concerts(mock: &MockTransport, concerts: Value, favorites: Value) {
    mock.on(Method::Get, first_concert_page(), MockResponse::ok(concerts));
    mock.on(Method::Get, Endpoint::Favorites, MockResponse::ok(favorites));
}
