//! Typed client for the concert REST API
//!
//! [`ApiClient`] turns domain operations into [`ApiRequest`]s and hands them to
//! a [`Transport`]. Production uses [`http::HttpTransport`]; tests script
//! responses with [`mock::MockTransport`].

pub mod http;
pub mod mock;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::ApiConfig;
use crate::error::{ApiError, Result};
use crate::normalize::{normalize, Shape};
use crate::session::BearerToken;
use crate::types::{AuthRequest, AuthResponse, Concert, Favorite, UserProfile};

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Default per-request timeout when none is configured
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every resource the client talks to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Login,
    Register,
    ConcertsPaged {
        page: u32,
        take: u32,
        name: Option<String>,
    },
    ConcertByName(String),
    BuyTicket(String),
    PostsPaged {
        page: u32,
        take: u32,
    },
    Me,
    Favorites,
    /// `/Favorite/{id}`: a concert id for toggling, a favorite id for removal
    Favorite(String),
    Tickets {
        page: u32,
        take: u32,
    },
}

impl Endpoint {
    /// Path below the API root, one entry per segment (unescaped)
    pub fn path_segments(&self) -> Vec<&str> {
        match self {
            Endpoint::Login => vec!["Auth", "login"],
            Endpoint::Register => vec!["Auth", "register"],
            Endpoint::ConcertsPaged { .. } => vec!["Concert", "paged"],
            Endpoint::ConcertByName(name) => vec!["Concert", "name", name.as_str()],
            Endpoint::BuyTicket(id) => vec!["Concert", "buyTicket", id.as_str()],
            Endpoint::PostsPaged { .. } => vec!["Post", "paged"],
            Endpoint::Me => vec!["User", "me"],
            Endpoint::Favorites => vec!["Favorite"],
            Endpoint::Favorite(id) => vec!["Favorite", id.as_str()],
            Endpoint::Tickets { .. } => vec!["Ticket"],
        }
    }

    pub fn query(&self) -> Vec<(&'static str, String)> {
        match self {
            Endpoint::ConcertsPaged { page, take, name } => {
                let mut query = vec![("page", page.to_string()), ("take", take.to_string())];
                if let Some(name) = name {
                    query.push(("name", name.clone()));
                }
                query
            }
            Endpoint::PostsPaged { page, take } | Endpoint::Tickets { page, take } => {
                vec![("page", page.to_string()), ("take", take.to_string())]
            }
            _ => Vec::new(),
        }
    }

    pub fn requires_auth(&self) -> bool {
        !matches!(self, Endpoint::Login | Endpoint::Register)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.path_segments().join("/"))?;
        let query = self.query();
        for (i, (key, value)) in query.iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            write!(f, "{}{}={}", sep, key, value)?;
        }
        Ok(())
    }
}

/// One outgoing call, as seen by a transport
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub endpoint: Endpoint,
    pub token: Option<BearerToken>,
    pub body: Option<Value>,
}

/// Executes requests against some backend
///
/// Implementations return the decoded JSON body of a successful response,
/// `Value::Null` for an empty body.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: ApiRequest) -> ApiResult<Value>;

    /// Name used in logs
    fn name(&self) -> &str;
}

/// Typed operations over a transport
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    timeout: Duration,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("transport", &self.transport.name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// HTTP client for the configured API root
    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        let timeout = config.timeout()?;
        let transport = http::HttpTransport::new(&config.base_url, timeout)?;
        Ok(Self::new(Arc::new(transport)).with_timeout(timeout))
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send one request, bounded by the client timeout
    ///
    /// Protected endpoints fail with `Unauthorized("not logged in")` before
    /// anything reaches the transport when `token` is `None`.
    pub async fn send(
        &self,
        method: Method,
        endpoint: Endpoint,
        token: Option<&BearerToken>,
        body: Option<Value>,
    ) -> ApiResult<Value> {
        if endpoint.requires_auth() && token.is_none() {
            return Err(ApiError::Unauthorized("not logged in".to_string()));
        }

        tracing::debug!(
            method = %method,
            endpoint = %endpoint,
            transport = self.transport.name(),
            "API request"
        );

        let request = ApiRequest {
            method,
            endpoint,
            token: token.cloned(),
            body,
        };

        match tokio::time::timeout(self.timeout, self.transport.execute(request)).await {
            Ok(result) => result,
            Err(_) => Err(ApiError::Timeout(self.timeout)),
        }
    }

    /// GET `endpoint` and normalize the body to a list
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        shape: Shape,
        token: Option<&BearerToken>,
    ) -> ApiResult<Vec<T>> {
        let body = self.send(Method::Get, endpoint, token, None).await?;
        normalize(body, shape)
    }

    pub async fn login(&self, user_name: &str, password: &str) -> ApiResult<AuthResponse> {
        self.authenticate(Endpoint::Login, user_name, password).await
    }

    pub async fn register(&self, user_name: &str, password: &str) -> ApiResult<AuthResponse> {
        self.authenticate(Endpoint::Register, user_name, password).await
    }

    async fn authenticate(
        &self,
        endpoint: Endpoint,
        user_name: &str,
        password: &str,
    ) -> ApiResult<AuthResponse> {
        let body = serde_json::to_value(AuthRequest {
            user_name: user_name.to_string(),
            password: password.to_string(),
        })
        .map_err(|e| ApiError::Decode(e.to_string()))?;

        let response = self.send(Method::Post, endpoint, None, Some(body)).await?;
        match response {
            Value::Null => Ok(AuthResponse {
                token: None,
                message: None,
            }),
            // Some deployments answer with the bare token string
            Value::String(token) => Ok(AuthResponse {
                token: Some(token),
                message: None,
            }),
            other => serde_json::from_value(other).map_err(|e| ApiError::Decode(e.to_string())),
        }
    }

    pub async fn concerts(
        &self,
        token: Option<&BearerToken>,
        page: u32,
        take: u32,
        name: Option<&str>,
    ) -> ApiResult<Vec<Concert>> {
        let endpoint = Endpoint::ConcertsPaged {
            page,
            take,
            name: name.map(str::to_string),
        };
        self.fetch(endpoint, Shape::List, token).await
    }

    pub async fn concert_by_name(
        &self,
        token: Option<&BearerToken>,
        name: &str,
    ) -> ApiResult<Vec<Concert>> {
        self.fetch(Endpoint::ConcertByName(name.to_string()), Shape::List, token)
            .await
    }

    pub async fn buy_ticket(&self, token: Option<&BearerToken>, concert_id: &str) -> ApiResult<()> {
        self.send(
            Method::Post,
            Endpoint::BuyTicket(concert_id.to_string()),
            token,
            None,
        )
        .await
        .map(|_| ())
    }

    pub async fn me(&self, token: Option<&BearerToken>) -> ApiResult<UserProfile> {
        let mut profiles: Vec<UserProfile> = self.fetch(Endpoint::Me, Shape::Single, token).await?;
        profiles
            .pop()
            .ok_or_else(|| ApiError::Decode("empty profile response".to_string()))
    }

    pub async fn favorites(&self, token: Option<&BearerToken>) -> ApiResult<Vec<Favorite>> {
        self.fetch(Endpoint::Favorites, Shape::List, token).await
    }

    pub async fn add_favorite(&self, token: Option<&BearerToken>, concert_id: &str) -> ApiResult<()> {
        self.send(
            Method::Post,
            Endpoint::Favorite(concert_id.to_string()),
            token,
            None,
        )
        .await
        .map(|_| ())
    }

    pub async fn delete_favorite(
        &self,
        token: Option<&BearerToken>,
        concert_id: &str,
    ) -> ApiResult<()> {
        self.send(
            Method::Delete,
            Endpoint::Favorite(concert_id.to_string()),
            token,
            None,
        )
        .await
        .map(|_| ())
    }

    /// Delete a favorite record by its own id
    pub async fn remove_favorite(
        &self,
        token: Option<&BearerToken>,
        favorite_id: &str,
    ) -> ApiResult<()> {
        self.delete_favorite(token, favorite_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::mock::{MockResponse, MockTransport};
    use super::*;
    use serde_json::json;

    fn token() -> BearerToken {
        BearerToken::new("t0k3n").unwrap()
    }

    fn concert_json(id: &str) -> Value {
        json!({
            "id": id,
            "name": format!("Concert {}", id),
            "startedAt": "2025-06-01T19:30:00",
            "ticketPrice": 1200,
            "availableTicketAmount": 10
        })
    }

    #[test]
    fn test_endpoint_display() {
        let endpoint = Endpoint::ConcertsPaged {
            page: 1,
            take: 25,
            name: Some("jazz".to_string()),
        };
        assert_eq!(endpoint.to_string(), "/Concert/paged?page=1&take=25&name=jazz");
        assert_eq!(Endpoint::Me.to_string(), "/User/me");
        assert_eq!(
            Endpoint::Tickets { page: 2, take: 10 }.to_string(),
            "/Ticket?page=2&take=10"
        );
        assert_eq!(
            Endpoint::BuyTicket("c1".to_string()).to_string(),
            "/Concert/buyTicket/c1"
        );
    }

    #[test]
    fn test_requires_auth() {
        assert!(!Endpoint::Login.requires_auth());
        assert!(!Endpoint::Register.requires_auth());
        assert!(Endpoint::Favorites.requires_auth());
        assert!(Endpoint::Me.requires_auth());
    }

    #[tokio::test]
    async fn test_protected_call_without_token_sends_nothing() {
        let mock = Arc::new(MockTransport::new());
        let client = ApiClient::new(mock.clone());

        let err = client.favorites(None).await.unwrap_err();
        assert_eq!(err, ApiError::Unauthorized("not logged in".to_string()));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_bearer_token_forwarded() {
        let mock = Arc::new(MockTransport::new());
        mock.on(Method::Get, Endpoint::Favorites, MockResponse::ok(json!([])));
        let client = ApiClient::new(mock.clone());

        client.favorites(Some(&token())).await.unwrap();

        let calls = mock.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].token.as_deref(), Some("t0k3n"));
    }

    #[tokio::test]
    async fn test_login_sends_credentials_without_token() {
        let mock = Arc::new(MockTransport::new());
        mock.on(
            Method::Post,
            Endpoint::Login,
            MockResponse::ok(json!({"token": "abc"})),
        );
        let client = ApiClient::new(mock.clone());

        let response = client.login("ann", "pw").await.unwrap();
        assert_eq!(response.token.as_deref(), Some("abc"));

        let call = &mock.calls()[0];
        assert!(call.token.is_none());
        assert_eq!(call.body, Some(json!({"userName": "ann", "password": "pw"})));
    }

    #[tokio::test]
    async fn test_concerts_accepts_wrapped_page() {
        let mock = Arc::new(MockTransport::new());
        mock.on(
            Method::Get,
            Endpoint::ConcertsPaged {
                page: 1,
                take: 25,
                name: None,
            },
            MockResponse::ok(json!({"items": [concert_json("a"), concert_json("b")]})),
        );
        let client = ApiClient::new(mock);

        let concerts = client.concerts(Some(&token()), 1, 25, None).await.unwrap();
        assert_eq!(concerts.len(), 2);
        assert_eq!(concerts[1].id, "b");
    }

    #[tokio::test]
    async fn test_timeout_maps_to_timeout_error() {
        let mock = Arc::new(MockTransport::new());
        mock.on(
            Method::Get,
            Endpoint::Me,
            MockResponse::ok(json!({})).with_delay(Duration::from_millis(200)),
        );
        let client = ApiClient::new(mock).with_timeout(Duration::from_millis(20));

        let err = client.me(Some(&token())).await.unwrap_err();
        assert_eq!(err, ApiError::Timeout(Duration::from_millis(20)));
    }

    #[tokio::test]
    async fn test_favorite_toggle_methods() {
        let mock = Arc::new(MockTransport::new());
        let endpoint = Endpoint::Favorite("c1".to_string());
        mock.on(Method::Post, endpoint.clone(), MockResponse::empty());
        mock.on(Method::Delete, endpoint.clone(), MockResponse::empty());
        let client = ApiClient::new(mock.clone());

        client.add_favorite(Some(&token()), "c1").await.unwrap();
        client.delete_favorite(Some(&token()), "c1").await.unwrap();

        assert_eq!(mock.calls_to(Method::Post, &endpoint), 1);
        assert_eq!(mock.calls_to(Method::Delete, &endpoint), 1);
    }
}
