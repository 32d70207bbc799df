//! Login, registration and logout

use super::events::Event;
use super::ScreenContext;
use crate::error::{ApiError, EncoreError, Result};
use crate::session::BearerToken;

const AUTH_FAILED: &str = "Authentication failed";

pub struct AuthService {
    ctx: ScreenContext,
}

impl AuthService {
    pub(crate) fn new(ctx: ScreenContext) -> Self {
        Self { ctx }
    }

    pub async fn log_in(&self, user_name: &str, password: &str) -> Result<()> {
        self.authenticate(user_name, password, false).await
    }

    /// Create an account; the server logs the new user in directly
    pub async fn register(&self, user_name: &str, password: &str) -> Result<()> {
        self.authenticate(user_name, password, true).await
    }

    pub async fn log_out(&self) -> Result<()> {
        self.ctx.session.log_out().await?;
        self.ctx.events.emit(Event::SessionChanged {
            authenticated: false,
        });
        Ok(())
    }

    async fn authenticate(&self, user_name: &str, password: &str, register: bool) -> Result<()> {
        let user_name = user_name.trim();
        if user_name.is_empty() || password.is_empty() {
            return Err(EncoreError::InvalidInput(
                "user name and password are required".to_string(),
            ));
        }

        let api = &self.ctx.api;
        let result = if register {
            api.register(user_name, password).await
        } else {
            api.login(user_name, password).await
        };

        let token = match result {
            Ok(response) => match response.token.filter(|t| !t.trim().is_empty()) {
                Some(token) => BearerToken::new(token)?,
                None => {
                    let message = response.message.unwrap_or_else(|| AUTH_FAILED.to_string());
                    return Err(self.fail(ApiError::Unauthorized(message)));
                }
            },
            Err(ApiError::Status { message, .. }) => {
                let message = if message.is_empty() {
                    AUTH_FAILED.to_string()
                } else {
                    message
                };
                return Err(self.fail(ApiError::Unauthorized(message)));
            }
            Err(e) => {
                tracing::error!("Authentication request failed: {}", e);
                self.ctx.events.alert("Error", e.user_message());
                return Err(e.into());
            }
        };

        self.ctx.session.log_in(token).await?;
        self.ctx.events.emit(Event::SessionChanged {
            authenticated: true,
        });
        tracing::info!(user = user_name, registered = register, "Authenticated");
        Ok(())
    }

    fn fail(&self, error: ApiError) -> EncoreError {
        if let ApiError::Unauthorized(message) = &error {
            tracing::warn!("Authentication rejected: {}", message);
            self.ctx.events.alert("Error", message.clone());
        }
        error.into()
    }
}
