use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use super::wire::{error_message, error_u64, validation_message};
use crate::config::ApiSettings;
use crate::error::AuthError;
use crate::models::user::{AuthTokens, User, UserPayload, DEFAULT_EXPIRES_IN_SECS};

/// Wait the server imposes after too many login attempts when it does not
/// say otherwise.
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 900;

/// Login form input. The password stays wrapped until the request body is
/// built, so it never lands in logs or debug output.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: Secret<String>,
    pub remember_me: bool,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>, remember_me: bool) -> Self {
        Self {
            email: email.into(),
            password: Secret::new(password.into()),
            remember_me,
        }
    }
}

/// Outcome of a successful login or refresh.
#[derive(Debug, Clone)]
pub struct LoginSuccess {
    pub tokens: AuthTokens,
    pub user: User,
    /// Server-suggested landing page, when the flow has one.
    pub redirect_url: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct LogoutAck {
    pub success: bool,
    pub message: String,
}

/// Result of asking the server whether a token is still good. Never an
/// error: an unreachable validator reads as "not valid".
#[derive(Debug, Clone, Default)]
pub struct TokenValidation {
    pub valid: bool,
    pub user: Option<User>,
}

/// Boundary to the auth service. Everything the session controller needs
/// from the network goes through here, so tests can script it.
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn login(&self, credentials: &Credentials) -> Result<LoginSuccess, AuthError>;

    async fn logout(&self, logout_all: bool, access_token: &str) -> Result<LogoutAck, AuthError>;

    async fn refresh(&self, refresh_token: &str) -> Result<LoginSuccess, AuthError>;

    async fn current_user(&self, access_token: &str) -> Result<User, AuthError>;

    async fn validate(&self, access_token: &str) -> Result<TokenValidation, AuthError>;
}

// No Debug: this is the one place the password is in the clear.
#[derive(Serialize, Validate)]
struct LoginBody {
    #[validate(email(message = "Invalid email format"))]
    email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    password: String,
    remember_me: bool,
}

#[derive(Debug, Serialize)]
struct RefreshBody {
    refresh_token: String,
}

/// Token grant returned by login and refresh.
#[derive(Debug, Deserialize)]
struct TokenGrantBody {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    user: UserPayload,
    #[serde(default)]
    redirect_url: Option<String>,
}

impl From<TokenGrantBody> for LoginSuccess {
    fn from(body: TokenGrantBody) -> Self {
        LoginSuccess {
            tokens: AuthTokens {
                access_token: body.access_token,
                refresh_token: body.refresh_token,
                expires_in: body.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS),
            },
            user: body.user.into(),
            redirect_url: body.redirect_url,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CurrentUserBody {
    user: UserPayload,
}

#[derive(Debug, Deserialize)]
struct ValidateBody {
    valid: bool,
    #[serde(default)]
    user: Option<UserPayload>,
}

#[derive(Debug, Default, Deserialize)]
struct LogoutBody {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: String,
}

/// HTTP implementation of [`AuthApi`] against the platform auth routes.
pub struct HttpAuthApi {
    client: Client,
    settings: ApiSettings,
}

impl HttpAuthApi {
    pub fn new(settings: ApiSettings) -> Self {
        Self {
            client: Client::new(),
            settings,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.settings.base_url, path)
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.settings.timeout_seconds)
    }
}

#[async_trait]
impl AuthApi for HttpAuthApi {
    async fn login(&self, credentials: &Credentials) -> Result<LoginSuccess, AuthError> {
        let body = LoginBody {
            email: credentials.email.clone(),
            password: credentials.password.expose_secret().clone(),
            remember_me: credentials.remember_me,
        };
        body.validate().map_err(|e| AuthError::InvalidCredentials {
            message: validation_message(&e),
            attempts_remaining: None,
        })?;

        let url = self.url("/api/auth/login");
        let response = self
            .client
            .post(&url)
            .timeout(self.timeout())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send login request to {}: {}", url, e);
                AuthError::Transport(format!("login request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(login_error(status, &read_error_body(response).await));
        }

        let grant: TokenGrantBody = response
            .json()
            .await
            .map_err(|e| AuthError::Transport(format!("login response was not understood: {}", e)))?;
        Ok(grant.into())
    }

    async fn logout(&self, logout_all: bool, access_token: &str) -> Result<LogoutAck, AuthError> {
        let url = self.url(&format!("/api/auth/logout?logout_all={}", logout_all));
        let response = self
            .client
            .post(&url)
            .timeout(self.timeout())
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AuthError::Transport(format!("logout request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = read_error_body(response).await;
            return Err(AuthError::Unknown(error_message(
                &body,
                &format!("logout rejected ({})", status.as_u16()),
            )));
        }

        let ack: LogoutBody = response.json().await.unwrap_or_default();
        Ok(LogoutAck {
            success: ack.success,
            message: ack.message,
        })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<LoginSuccess, AuthError> {
        let url = self.url("/api/auth/refresh");
        let response = self
            .client
            .post(&url)
            .timeout(self.timeout())
            .json(&RefreshBody {
                refresh_token: refresh_token.to_string(),
            })
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send refresh request to {}: {}", url, e);
                AuthError::Transport(format!("refresh request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = read_error_body(response).await;
            return Err(match status {
                // A rejected refresh token means the session is over.
                StatusCode::UNAUTHORIZED => AuthError::TokenExpired,
                StatusCode::TOO_MANY_REQUESTS => AuthError::RateLimited {
                    message: error_message(&body, "Too many refresh attempts"),
                    retry_after_secs: error_u64(&body, "retry_after")
                        .unwrap_or(DEFAULT_RETRY_AFTER_SECS),
                },
                _ => AuthError::Transport(error_message(
                    &body,
                    &format!("refresh rejected ({})", status.as_u16()),
                )),
            });
        }

        let grant: TokenGrantBody = response.json().await.map_err(|e| {
            AuthError::Transport(format!("refresh response was not understood: {}", e))
        })?;
        Ok(grant.into())
    }

    async fn current_user(&self, access_token: &str) -> Result<User, AuthError> {
        let url = self.url("/api/auth/me");
        let response = self
            .client
            .get(&url)
            .timeout(self.timeout())
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send current-user request to {}: {}", url, e);
                AuthError::Transport(format!("current-user request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = read_error_body(response).await;
            return Err(AuthError::Unknown(error_message(
                &body,
                &format!("current-user request rejected ({})", status.as_u16()),
            )));
        }

        let body: CurrentUserBody = response.json().await.map_err(|e| {
            AuthError::Transport(format!("current-user response was not understood: {}", e))
        })?;
        Ok(body.user.into())
    }

    async fn validate(&self, access_token: &str) -> Result<TokenValidation, AuthError> {
        let url = self.url("/api/auth/validate");
        let response = match self
            .client
            .post(&url)
            .timeout(self.timeout())
            .bearer_auth(access_token)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!("Token validation call failed: {}", e);
                return Ok(TokenValidation::default());
            }
        };

        if !response.status().is_success() {
            return Ok(TokenValidation::default());
        }

        match response.json::<ValidateBody>().await {
            Ok(body) => Ok(TokenValidation {
                valid: body.valid,
                user: body.user.map(User::from),
            }),
            Err(e) => {
                tracing::debug!("Token validation response was not understood: {}", e);
                Ok(TokenValidation::default())
            }
        }
    }
}

async fn read_error_body(response: reqwest::Response) -> Value {
    response.json::<Value>().await.unwrap_or(Value::Null)
}

fn login_error(status: StatusCode, body: &Value) -> AuthError {
    match status {
        StatusCode::UNAUTHORIZED => AuthError::InvalidCredentials {
            message: error_message(body, "Incorrect email or password"),
            attempts_remaining: error_u64(body, "attempts_remaining").map(|n| n as u32),
        },
        StatusCode::TOO_MANY_REQUESTS => AuthError::RateLimited {
            message: error_message(body, "Too many login attempts"),
            retry_after_secs: error_u64(body, "retry_after").unwrap_or(DEFAULT_RETRY_AFTER_SECS),
        },
        // Unexpected statuses read as server trouble, same as a failed send.
        _ => AuthError::Transport(error_message(
            body,
            &format!("login rejected ({})", status.as_u16()),
        )),
    }
}
