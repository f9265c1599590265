use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{watch, Mutex};

use crate::config::SessionSettings;
use crate::error::{ApiError, AuthError};
use crate::models::user::{AuthTokens, User, DEFAULT_EXPIRES_IN_SECS};
use crate::services::auth_api::{AuthApi, Credentials};
use crate::session::navigation::{NavigationThrottle, Navigator};
use crate::session::state::{AuthState, Session};
use crate::storage::SessionStore;
use crate::utils::jwt;

/// Messages on a 401/403 that mean the session itself is dead, as opposed to
/// a single request the caller may not make. The server words these
/// responses; keep the list in step with it.
const SESSION_INVALIDATING_MARKERS: [&str; 5] = [
    "Authentication required",
    "Invalid token",
    "Token expired",
    "Session not found",
    "Account is locked",
];

/// True when a rejection message marks the whole session as invalid.
pub fn is_session_invalidating_error(message: &str) -> bool {
    SESSION_INVALIDATING_MARKERS
        .iter()
        .any(|marker| message.contains(marker))
}

/// Owner of the authentication lifecycle.
///
/// Holds the single authoritative [`AuthState`], publishes every transition
/// over a watch channel, and is the only writer of the persisted session
/// slots. Login and logout are serialized: a second call while one is in
/// flight is rejected, never queued.
pub struct SessionController {
    api: Arc<dyn AuthApi>,
    store: SessionStore,
    navigator: Arc<dyn Navigator>,
    throttle: Arc<NavigationThrottle>,
    settings: SessionSettings,
    state_tx: watch::Sender<AuthState>,
    init_gate: Mutex<()>,
    op_gate: Mutex<()>,
}

impl SessionController {
    pub fn new(
        api: Arc<dyn AuthApi>,
        store: SessionStore,
        navigator: Arc<dyn Navigator>,
        settings: SessionSettings,
    ) -> Self {
        let (state_tx, _) = watch::channel(AuthState::Initializing);
        let throttle = Arc::new(NavigationThrottle::new(Duration::from_millis(
            settings.redirect_debounce_ms,
        )));
        Self {
            api,
            store,
            navigator,
            throttle,
            settings,
            state_tx,
            init_gate: Mutex::new(()),
            op_gate: Mutex::new(()),
        }
    }

    /// Watch every state transition. The receiver starts at the current
    /// state, so late subscribers never miss where things stand.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state_tx.subscribe()
    }

    pub fn state(&self) -> AuthState {
        self.state_tx.borrow().clone()
    }

    /// Access token of the current session, if authenticated.
    pub fn access_token(&self) -> Option<String> {
        self.state_tx
            .borrow()
            .session()
            .map(|session| session.access_token.clone())
    }

    pub fn current_user(&self) -> Option<User> {
        self.state_tx.borrow().user().cloned()
    }

    /// The underlying store, for session-independent slots like the
    /// preferred language.
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Shared by route guards so their redirects and the controller's own
    /// fall under one debounce window.
    pub fn navigation_throttle(&self) -> Arc<NavigationThrottle> {
        self.throttle.clone()
    }

    /// Resolve persisted state into a settled authentication state.
    ///
    /// Safe to call more than once. A call that overlaps a running
    /// initialization waits for it and adopts its outcome instead of reading
    /// storage a second time.
    pub async fn initialize(&self) -> AuthState {
        match self.init_gate.try_lock() {
            Ok(_guard) => self.run_initialize().await,
            Err(_) => {
                let _guard = self.init_gate.lock().await;
                self.state()
            }
        }
    }

    async fn run_initialize(&self) -> AuthState {
        self.publish(AuthState::Initializing);

        let access_token = match self.store.access_token() {
            Some(token) => token,
            None => {
                tracing::debug!("no stored access token, settling unauthenticated");
                return self.settle(AuthState::Unauthenticated { error: None });
            }
        };

        let claims = match jwt::decode_claims(&access_token) {
            Ok(claims) => claims,
            Err(error) => {
                tracing::warn!(error = %error, "stored access token is malformed, clearing session");
                self.store.clear_session();
                return self.settle(AuthState::Unauthenticated { error: None });
            }
        };

        let now = Utc::now().timestamp();
        if jwt::is_expired(&claims, now) {
            tracing::info!("stored access token is expired, clearing session");
            self.store.clear_session();
            return self.settle(AuthState::Unauthenticated { error: None });
        }

        let refresh_token = self.store.refresh_token();
        let expires_at = claims.exp.unwrap_or(now + DEFAULT_EXPIRES_IN_SECS);

        if let Some(user) = self.store.user() {
            tracing::debug!(user_id = %user.id, "restored session from cached user record");
            return self.settle(AuthState::Authenticated {
                session: Session {
                    access_token,
                    refresh_token,
                    expires_at,
                    user,
                },
            });
        }

        // Usable token but no cached user record: fetch it and re-persist
        // the triad so the next start skips the network.
        match self.api.current_user(&access_token).await {
            Ok(user) => {
                let tokens = AuthTokens {
                    access_token: access_token.clone(),
                    refresh_token: refresh_token.clone(),
                    expires_in: expires_at - now,
                };
                self.store.set_session(&tokens, &user);
                self.settle(AuthState::Authenticated {
                    session: Session {
                        access_token,
                        refresh_token,
                        expires_at,
                        user,
                    },
                })
            }
            Err(error) => {
                tracing::warn!(error = %error, "could not fetch user for stored token, clearing session");
                self.store.clear_session();
                self.settle(AuthState::Unauthenticated { error: None })
            }
        }
    }

    /// Exchange credentials for a session.
    ///
    /// On success the triad is persisted before the authenticated state is
    /// published, and the server's suggested landing page is returned. On
    /// failure the error is published inside the unauthenticated state and
    /// returned verbatim; stored slots are left alone.
    pub async fn login(&self, credentials: &Credentials) -> Result<Option<String>, AuthError> {
        let _op = self
            .op_gate
            .try_lock()
            .map_err(|_| AuthError::OperationInFlight)?;

        tracing::info!(email = %credentials.email, "login attempt");
        match self.api.login(credentials).await {
            Ok(grant) => {
                let now = Utc::now().timestamp();
                let session = Session {
                    access_token: grant.tokens.access_token.clone(),
                    refresh_token: grant.tokens.refresh_token.clone(),
                    expires_at: now + grant.tokens.expires_in,
                    user: grant.user.clone(),
                };
                self.store.set_session(&grant.tokens, &grant.user);
                self.publish(AuthState::Authenticated { session });
                tracing::info!(
                    user_id = %grant.user.id,
                    user_type = %grant.user.user_type,
                    "login succeeded"
                );
                Ok(grant.redirect_url)
            }
            Err(error) => {
                tracing::warn!(error = %error, "login failed");
                self.publish(AuthState::Unauthenticated {
                    error: Some(error.clone()),
                });
                Err(error)
            }
        }
    }

    /// End the session. Remote invalidation is best-effort; the local clear
    /// and the transition to unauthenticated always happen, followed by one
    /// debounced navigation to the login page.
    pub async fn logout(&self) -> Result<(), AuthError> {
        let _op = self
            .op_gate
            .try_lock()
            .map_err(|_| AuthError::OperationInFlight)?;

        self.publish(AuthState::TransitioningOut);

        if let Some(access_token) = self.store.access_token() {
            // We don't fail the logout if this fails - just log the error
            if let Err(error) = self.api.logout(false, &access_token).await {
                tracing::warn!(error = %error, "remote logout failed, clearing local session anyway");
            }
        }

        self.store.clear_session();
        self.publish(AuthState::Unauthenticated { error: None });
        self.navigate(&self.settings.login_path);
        Ok(())
    }

    /// Trade the stored refresh token for a new grant.
    ///
    /// A rejected refresh token ends the session the same way a forced
    /// logout does; any other failure leaves the current state alone.
    pub async fn refresh(&self) -> Result<(), AuthError> {
        let _op = self
            .op_gate
            .try_lock()
            .map_err(|_| AuthError::OperationInFlight)?;

        let refresh_token = match self.store.refresh_token() {
            Some(token) => token,
            None => return Err(AuthError::TokenExpired),
        };

        match self.api.refresh(&refresh_token).await {
            Ok(grant) => {
                let now = Utc::now().timestamp();
                let session = Session {
                    access_token: grant.tokens.access_token.clone(),
                    refresh_token: grant.tokens.refresh_token.clone(),
                    expires_at: now + grant.tokens.expires_in,
                    user: grant.user.clone(),
                };
                self.store.set_session(&grant.tokens, &grant.user);
                self.publish(AuthState::Authenticated { session });
                tracing::debug!(user_id = %grant.user.id, "session refreshed");
                Ok(())
            }
            Err(AuthError::TokenExpired) => {
                tracing::info!("refresh token rejected, ending session");
                self.invalidate_session();
                Err(AuthError::TokenExpired)
            }
            Err(error) => {
                tracing::warn!(error = %error, "session refresh failed");
                Err(error)
            }
        }
    }

    /// Screen a failed authenticated request. When the rejection message
    /// marks the session as dead, clear it locally and head to login; the
    /// error is handed back either way so the caller still sees the failure.
    pub fn handle_request_error(&self, error: ApiError) -> ApiError {
        let message = match &error {
            ApiError::Unauthorized { message } | ApiError::Forbidden { message } => message,
            _ => return error,
        };

        if is_session_invalidating_error(message) {
            tracing::warn!(
                message = %message,
                "authenticated request reported an invalid session, forcing logout"
            );
            self.invalidate_session();
        }
        error
    }

    /// Local-only teardown: no remote call, straight to unauthenticated.
    fn invalidate_session(&self) {
        self.store.clear_session();
        self.publish(AuthState::Unauthenticated { error: None });
        self.navigate(&self.settings.login_path);
    }

    fn navigate(&self, target: &str) {
        if self.throttle.allow(target) {
            tracing::debug!(path = target, "navigating");
            self.navigator.replace(target);
        } else {
            tracing::debug!(path = target, "navigation suppressed by debounce");
        }
    }

    fn settle(&self, state: AuthState) -> AuthState {
        self.publish(state.clone());
        state
    }

    fn publish(&self, next: AuthState) {
        let from = self.state_tx.borrow().name();
        tracing::debug!(from = from, to = next.name(), "auth state transition");
        self.state_tx.send_replace(next);
    }
}
