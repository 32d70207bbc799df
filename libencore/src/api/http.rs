//! reqwest-backed transport

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde_json::Value;

use super::{ApiRequest, ApiResult, Method, Transport};
use crate::error::{ApiError, ConfigError, Result};

const USER_AGENT: &str = concat!("encore/", env!("CARGO_PKG_VERSION"));

/// Longest server text carried into an error message
const MAX_ERROR_TEXT: usize = 200;

pub struct HttpTransport {
    client: Client,
    base_url: Url,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| ConfigError::InvalidValue {
            field: "api.base_url".to_string(),
            reason: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ConfigError::InvalidValue {
                field: "api.base_url".to_string(),
                reason: format!("'{}' cannot be used as an API root", base_url),
            }
            .into());
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                field: "api".to_string(),
                reason: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Absolute URL for a request, segments percent-encoded
    pub fn url_for(&self, request: &ApiRequest) -> ApiResult<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| ApiError::Network(format!("invalid base URL {}", self.base_url)))?;
            segments
                .pop_if_empty()
                .extend(request.endpoint.path_segments());
        }

        let query = request.endpoint.query();
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }

    fn map_send_error(&self, error: reqwest::Error) -> ApiError {
        if error.is_timeout() {
            ApiError::Timeout(self.timeout)
        } else {
            ApiError::Network(error.to_string())
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: ApiRequest) -> ApiResult<Value> {
        let url = self.url_for(&request)?;

        let mut builder = match request.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
            Method::Delete => self.client.delete(url),
        };
        if let Some(token) = &request.token {
            builder = builder.bearer_auth(token.expose());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| self.map_send_error(e))?;
        let status = response.status();
        let text = response.text().await.map_err(|e| self.map_send_error(e))?;

        if !status.is_success() {
            tracing::debug!(status = status.as_u16(), "API returned an error status");
            return Err(status_error(status, &text));
        }

        decode_body(&text)
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Successful body to JSON: empty is `null`, plain text stays a string
fn decode_body(text: &str) -> ApiResult<Value> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(Value::Null);
    }
    match serde_json::from_str(trimmed) {
        Ok(value) => Ok(value),
        Err(e) if trimmed.starts_with('{') || trimmed.starts_with('[') => {
            Err(ApiError::Decode(e.to_string()))
        }
        Err(_) => Ok(Value::String(trimmed.to_string())),
    }
}

/// Build a status error, preferring the server's `message` or `title`
fn status_error(status: StatusCode, text: &str) -> ApiError {
    let message = match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => ["message", "title", "error"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
            .map(str::to_string)
            .unwrap_or_default(),
        Ok(Value::String(s)) => s,
        _ => text.trim().chars().take(MAX_ERROR_TEXT).collect(),
    };

    if status == StatusCode::UNAUTHORIZED && message.is_empty() {
        return ApiError::Status {
            status: status.as_u16(),
            message: "unauthorized".to_string(),
        };
    }

    ApiError::Status {
        status: status.as_u16(),
        message,
    }
}
