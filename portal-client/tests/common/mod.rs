//! Shared fixtures for portal-client integration tests.
#![allow(dead_code)]

use std::sync::atomic::AtomicUsize;
use std::sync::{Arc, Mutex, Once};

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use chrono::Utc;
use tokio::sync::Notify;

use portal_client::config::SessionSettings;
use portal_client::error::AuthError;
use portal_client::models::user::{AuthTokens, User, UserType};
use portal_client::services::auth_api::{
    AuthApi, Credentials, LoginSuccess, LogoutAck, TokenValidation,
};
use portal_client::session::controller::SessionController;
use portal_client::session::navigation::Navigator;
use portal_client::storage::SessionStore;

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        dotenvy::dotenv().ok();
        tracing_subscriber::fmt()
            .with_env_filter("info,portal_client=debug")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Scripted auth API. Results are set per test; every call is counted.
/// An armed barrier parks the call until the test releases it, which lets
/// tests hold an operation in flight.
pub struct MockAuthApi {
    pub login_result: Mutex<Result<LoginSuccess, AuthError>>,
    pub logout_result: Mutex<Result<LogoutAck, AuthError>>,
    pub refresh_result: Mutex<Result<LoginSuccess, AuthError>>,
    pub current_user_result: Mutex<Result<User, AuthError>>,
    pub login_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub current_user_calls: AtomicUsize,
    pub validate_calls: AtomicUsize,
    pub login_barrier: Mutex<Option<Arc<Notify>>>,
    pub logout_barrier: Mutex<Option<Arc<Notify>>>,
    pub current_user_barrier: Mutex<Option<Arc<Notify>>>,
}

impl Default for MockAuthApi {
    fn default() -> Self {
        Self {
            login_result: Mutex::new(Err(AuthError::Unknown("no scripted login".to_string()))),
            logout_result: Mutex::new(Ok(LogoutAck {
                success: true,
                message: "Logged out".to_string(),
            })),
            refresh_result: Mutex::new(Err(AuthError::Unknown("no scripted refresh".to_string()))),
            current_user_result: Mutex::new(Err(AuthError::Unknown(
                "no scripted current_user".to_string(),
            ))),
            login_calls: AtomicUsize::new(0),
            logout_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            current_user_calls: AtomicUsize::new(0),
            validate_calls: AtomicUsize::new(0),
            login_barrier: Mutex::new(None),
            logout_barrier: Mutex::new(None),
            current_user_barrier: Mutex::new(None),
        }
    }
}

impl MockAuthApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

async fn wait_for(barrier: &Mutex<Option<Arc<Notify>>>) {
    let armed = barrier.lock().unwrap().clone();
    if let Some(notify) = armed {
        notify.notified().await;
    }
}

#[async_trait]
impl AuthApi for MockAuthApi {
    async fn login(&self, _credentials: &Credentials) -> Result<LoginSuccess, AuthError> {
        self.login_calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        wait_for(&self.login_barrier).await;
        self.login_result.lock().unwrap().clone()
    }

    async fn logout(&self, _logout_all: bool, _access_token: &str) -> Result<LogoutAck, AuthError> {
        self.logout_calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        wait_for(&self.logout_barrier).await;
        self.logout_result.lock().unwrap().clone()
    }

    async fn refresh(&self, _refresh_token: &str) -> Result<LoginSuccess, AuthError> {
        self.refresh_calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.refresh_result.lock().unwrap().clone()
    }

    async fn current_user(&self, _access_token: &str) -> Result<User, AuthError> {
        self.current_user_calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        wait_for(&self.current_user_barrier).await;
        self.current_user_result.lock().unwrap().clone()
    }

    async fn validate(&self, _access_token: &str) -> Result<TokenValidation, AuthError> {
        self.validate_calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(TokenValidation::default())
    }
}

/// Navigator that records every replace call.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    pub targets: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn count(&self) -> usize {
        self.targets.lock().unwrap().len()
    }

    pub fn last(&self) -> Option<String> {
        self.targets.lock().unwrap().last().cloned()
    }
}

impl Navigator for RecordingNavigator {
    fn replace(&self, path: &str) {
        self.targets.lock().unwrap().push(path.to_string());
    }
}

pub fn controller_with(
    api: Arc<MockAuthApi>,
    store: SessionStore,
    navigator: Arc<RecordingNavigator>,
) -> Arc<SessionController> {
    init_tracing();
    Arc::new(SessionController::new(
        api,
        store,
        navigator,
        SessionSettings::default(),
    ))
}

pub fn test_user(user_type: UserType) -> User {
    User {
        id: uuid::Uuid::new_v4().to_string(),
        email: "ana.diaz@example.com".to_string(),
        first_name: Some("Ana".to_string()),
        last_name: Some("Diaz".to_string()),
        user_type,
        is_verified: true,
        profile_completed: true,
        mandatory_fields_completed: true,
    }
}

pub fn credentials() -> Credentials {
    Credentials::new("ana.diaz@example.com", "hunter2", false)
}

fn token_from_claims(claims: &serde_json::Value) -> String {
    let header = general_purpose::URL_SAFE_NO_PAD.encode(b"{\"alg\":\"HS256\",\"typ\":\"JWT\"}");
    let payload = general_purpose::URL_SAFE_NO_PAD.encode(claims.to_string().as_bytes());
    format!("{}.{}.signature", header, payload)
}

/// A structurally valid bearer token with the given expiry.
pub fn bearer_token(exp: i64) -> String {
    token_from_claims(&serde_json::json!({
        "sub": "user_123",
        "email": "ana.diaz@example.com",
        "exp": exp,
        "iat": exp - 1800,
        "jti": "jti-1",
    }))
}

pub fn bearer_token_without_exp() -> String {
    token_from_claims(&serde_json::json!({"sub": "user_123"}))
}

pub fn live_token(now: i64) -> String {
    bearer_token(now + 1800)
}

pub fn login_success(user: &User) -> LoginSuccess {
    let now = Utc::now().timestamp();
    LoginSuccess {
        tokens: AuthTokens {
            access_token: live_token(now),
            refresh_token: Some("refresh-token-1".to_string()),
            expires_in: 1800,
        },
        user: user.clone(),
        redirect_url: Some("/dashboard".to_string()),
    }
}

/// Seed the store with a full triad whose token expires at `exp`.
pub fn seed_session(store: &SessionStore, user: &User, exp: i64) {
    store.set_session(
        &AuthTokens {
            access_token: bearer_token(exp),
            refresh_token: Some("refresh-token-1".to_string()),
            expires_in: 1800,
        },
        user,
    );
}
