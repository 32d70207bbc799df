//! Mock transport for testing
//!
//! Scripts API responses per `(method, endpoint)` pair, simulates failures and
//! latency, and records every call so tests can assert on what was (or was
//! not) sent. Compiled into all builds so integration tests and binaries can
//! use it without network access.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::sleep;

use super::{ApiRequest, ApiResult, Endpoint, Method, Transport};
use crate::error::ApiError;

/// A scripted reply
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// Body on success, error otherwise
    pub result: ApiResult<Value>,

    /// Delay before completing (simulates network latency)
    pub delay: Duration,
}

impl MockResponse {
    pub fn ok(body: Value) -> Self {
        Self {
            result: Ok(body),
            delay: Duration::ZERO,
        }
    }

    /// Successful response with no body
    pub fn empty() -> Self {
        Self::ok(Value::Null)
    }

    pub fn error(error: ApiError) -> Self {
        Self {
            result: Err(error),
            delay: Duration::ZERO,
        }
    }

    /// Non-2xx response with a server message
    pub fn status(status: u16, message: &str) -> Self {
        Self::error(ApiError::Status {
            status,
            message: message.to_string(),
        })
    }

    pub fn network_failure() -> Self {
        Self::error(ApiError::Network("connection refused".to_string()))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// What the transport received
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: Method,
    pub endpoint: Endpoint,
    pub token: Option<String>,
    pub body: Option<Value>,
}

type RouteKey = (Method, Endpoint);

/// Mock transport for testing
///
/// Persistent routes (`on`) answer every matching call; queued routes
/// (`once`) answer one call each, in order, and take precedence. Unmatched
/// calls get a 404.
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<RouteKey, MockResponse>>,
    queued: Mutex<HashMap<RouteKey, VecDeque<MockResponse>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every `method endpoint` call with `response`
    pub fn on(&self, method: Method, endpoint: Endpoint, response: MockResponse) -> &Self {
        lock(&self.routes).insert((method, endpoint), response);
        self
    }

    /// Answer the next `method endpoint` call with `response`
    pub fn once(&self, method: Method, endpoint: Endpoint, response: MockResponse) -> &Self {
        lock(&self.queued)
            .entry((method, endpoint))
            .or_default()
            .push_back(response);
        self
    }

    /// All calls received so far
    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Number of calls received for one route
    pub fn calls_to(&self, method: Method, endpoint: &Endpoint) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|call| call.method == method && &call.endpoint == endpoint)
            .count()
    }

    pub fn clear_calls(&self) {
        lock(&self.calls).clear();
    }

    fn response_for(&self, key: &RouteKey) -> MockResponse {
        if let Some(response) = lock(&self.queued).get_mut(key).and_then(VecDeque::pop_front) {
            return response;
        }
        lock(&self.routes)
            .get(key)
            .cloned()
            .unwrap_or_else(|| {
                MockResponse::status(404, &format!("no mock route for {} {}", key.0, key.1))
            })
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: ApiRequest) -> ApiResult<Value> {
        lock(&self.calls).push(RecordedCall {
            method: request.method,
            endpoint: request.endpoint.clone(),
            token: request.token.as_ref().map(|t| t.expose().to_string()),
            body: request.body.clone(),
        });

        let response = self.response_for(&(request.method, request.endpoint));

        if !response.delay.is_zero() {
            sleep(response.delay).await;
        }

        response.result
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn get(endpoint: Endpoint) -> ApiRequest {
        ApiRequest {
            method: Method::Get,
            endpoint,
            token: None,
            body: None,
        }
    }

    #[tokio::test]
    async fn test_unmatched_route_is_404() {
        let mock = MockTransport::new();
        let err = mock.execute(get(Endpoint::Me)).await.unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 404, .. }));
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_queued_responses_take_precedence_in_order() {
        let mock = MockTransport::new();
        mock.on(Method::Get, Endpoint::Me, MockResponse::ok(json!("steady")))
            .once(Method::Get, Endpoint::Me, MockResponse::ok(json!("first")))
            .once(Method::Get, Endpoint::Me, MockResponse::network_failure());

        assert_eq!(mock.execute(get(Endpoint::Me)).await.unwrap(), json!("first"));
        assert!(matches!(
            mock.execute(get(Endpoint::Me)).await,
            Err(ApiError::Network(_))
        ));
        assert_eq!(mock.execute(get(Endpoint::Me)).await.unwrap(), json!("steady"));
        assert_eq!(mock.calls_to(Method::Get, &Endpoint::Me), 3);
    }

    #[tokio::test]
    async fn test_delay_is_applied() {
        let mock = MockTransport::new();
        mock.on(
            Method::Get,
            Endpoint::Favorites,
            MockResponse::empty().with_delay(Duration::from_millis(30)),
        );

        let start = std::time::Instant::now();
        mock.execute(get(Endpoint::Favorites)).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[tokio::test]
    async fn test_clear_calls() {
        let mock = MockTransport::new();
        let _ = mock.execute(get(Endpoint::Me)).await;
        mock.clear_calls();
        assert_eq!(mock.call_count(), 0);
    }
}
