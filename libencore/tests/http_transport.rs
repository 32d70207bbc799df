//! HTTP transport against a local axum server

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use libencore::api::http::HttpTransport;
use libencore::api::ApiClient;
use libencore::config::Config;
use libencore::error::ApiError;
use libencore::storage::StorageBackend;
use libencore::{BearerToken, EncoreService, ListState};
use serde::Deserialize;
use serde_json::{json, Value};

const TOKEN: &str = "http-token";

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {}", TOKEN))
        .unwrap_or(false)
}

#[derive(Deserialize)]
struct Paging {
    page: u32,
    take: u32,
    name: Option<String>,
}

fn concert(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "startedAt": "2025-06-01T19:30:00.1234567",
        "ticketPrice": 2500.5,
        "availableTicketAmount": 3,
        "image": ""
    })
}

async fn concerts_paged(headers: HeaderMap, Query(paging): Query<Paging>) -> impl IntoResponse {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({"message": "Unauthorized"})));
    }
    let name = paging.name.unwrap_or_else(|| format!("p{}t{}", paging.page, paging.take));
    (
        StatusCode::OK,
        Json(json!({"items": [concert("c1", &name)], "totalCount": 1})),
    )
}

async fn concert_by_name(Path(name): Path<String>) -> Json<Value> {
    Json(concert("n1", &name))
}

async fn login(Json(body): Json<Value>) -> impl IntoResponse {
    if body["password"] == "secret" {
        (StatusCode::OK, Json(json!({"token": TOKEN})))
    } else {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({"message": "Wrong user name or password"})),
        )
    }
}

async fn buy_ticket(Path(_id): Path<String>) -> StatusCode {
    StatusCode::OK
}

async fn slow() -> Json<Value> {
    tokio::time::sleep(Duration::from_millis(500)).await;
    Json(json!({}))
}

async fn broken() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "database unavailable")
}

async fn spawn_server() -> String {
    let router = Router::new()
        .route("/api/Concert/paged", get(concerts_paged))
        .route("/api/Concert/name/{name}", get(concert_by_name))
        .route("/api/Concert/buyTicket/{id}", post(buy_ticket))
        .route("/api/Auth/login", post(login))
        .route("/api/User/me", get(slow))
        .route("/api/Favorite/{id}", delete(broken));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}/api/", addr)
}

fn client(base: &str, timeout: Duration) -> ApiClient {
    let transport = HttpTransport::new(base, timeout).unwrap();
    ApiClient::new(Arc::new(transport)).with_timeout(timeout)
}

fn token() -> BearerToken {
    BearerToken::new(TOKEN).unwrap()
}

#[tokio::test]
async fn test_paged_listing_with_bearer() {
    let base = spawn_server().await;
    let api = client(&base, Duration::from_secs(5));

    let concerts = api.concerts(Some(&token()), 2, 10, None).await.unwrap();
    assert_eq!(concerts.len(), 1);
    assert_eq!(concerts[0].name, "p2t10");
    assert_eq!(concerts[0].ticket_price, 2500.5);
    assert!(concerts[0].image.is_none());
}

#[tokio::test]
async fn test_name_filter_is_sent_as_query() {
    let base = spawn_server().await;
    let api = client(&base, Duration::from_secs(5));

    let concerts = api
        .concerts(Some(&token()), 1, 25, Some("rock & roll"))
        .await
        .unwrap();
    assert_eq!(concerts[0].name, "rock & roll");
}

#[tokio::test]
async fn test_by_name_search_escapes_path() {
    let base = spawn_server().await;
    let api = client(&base, Duration::from_secs(5));

    let concerts = api
        .concert_by_name(Some(&token()), "Rock Night")
        .await
        .unwrap();
    assert_eq!(concerts.len(), 1);
    assert_eq!(concerts[0].name, "Rock Night");
}

#[tokio::test]
async fn test_wrong_token_is_auth_failure() {
    let base = spawn_server().await;
    let api = client(&base, Duration::from_secs(5));
    let wrong = BearerToken::new("nope").unwrap();

    let err = api.concerts(Some(&wrong), 1, 25, None).await.unwrap_err();
    assert!(err.is_auth_failure());
}

#[tokio::test]
async fn test_login_success_and_failure() {
    let base = spawn_server().await;
    let api = client(&base, Duration::from_secs(5));

    let response = api.login("ann", "secret").await.unwrap();
    assert_eq!(response.token.as_deref(), Some(TOKEN));

    let err = api.login("ann", "guess").await.unwrap_err();
    assert_eq!(
        err,
        ApiError::Status {
            status: 400,
            message: "Wrong user name or password".to_string()
        }
    );
}

#[tokio::test]
async fn test_empty_success_body() {
    let base = spawn_server().await;
    let api = client(&base, Duration::from_secs(5));

    api.buy_ticket(Some(&token()), "c1").await.unwrap();
}

#[tokio::test]
async fn test_plain_text_error_body() {
    let base = spawn_server().await;
    let api = client(&base, Duration::from_secs(5));

    let err = api.remove_favorite(Some(&token()), "f1").await.unwrap_err();
    assert_eq!(
        err,
        ApiError::Status {
            status: 500,
            message: "database unavailable".to_string()
        }
    );
}

#[tokio::test]
async fn test_request_timeout() {
    let base = spawn_server().await;
    let api = client(&base, Duration::from_millis(50));

    let err = api.me(Some(&token())).await.unwrap_err();
    assert!(matches!(err, ApiError::Timeout(_)));
}

#[tokio::test]
async fn test_connection_refused_is_network_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let api = client(&format!("http://{}/api/", addr), Duration::from_secs(2));
    let err = api.concerts(Some(&token()), 1, 25, None).await.unwrap_err();
    assert!(matches!(err, ApiError::Network(_)));
    assert_eq!(err.user_message(), "Network request failed");
}

#[tokio::test]
async fn test_service_end_to_end() {
    let base = spawn_server().await;
    let mut config = Config::default();
    config.api.base_url = base;
    config.storage.backend = StorageBackend::Memory;

    let service = EncoreService::from_config(config).unwrap();
    service.restore().await;
    service.auth().log_in("ann", "secret").await.unwrap();

    let concerts = service.concerts();
    let found = concerts.search("Jazz").await.unwrap();
    assert_eq!(found[0].name, "Jazz");
    assert!(matches!(concerts.state(), ListState::Loaded(_)));
}
