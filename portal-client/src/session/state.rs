use crate::error::AuthError;
use crate::models::user::User;

/// An established session: the token material plus the account it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Unix seconds at which the access token stops being usable.
    pub expires_at: i64,
    pub user: User,
}

/// Authentication lifecycle. Exactly one variant holds at any time, and every
/// observer sees the same one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthState {
    /// Persisted state is still being read and validated. Guarded content
    /// must not render or redirect yet.
    #[default]
    Initializing,
    /// No usable session. Carries the most recent login failure, if any.
    Unauthenticated { error: Option<AuthError> },
    Authenticated { session: Session },
    /// Logout in progress; local state is about to be cleared.
    TransitioningOut,
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated { .. })
    }

    /// True while the state is still settling and observers should wait.
    pub fn is_pending(&self) -> bool {
        matches!(self, AuthState::Initializing | AuthState::TransitioningOut)
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            AuthState::Authenticated { session } => Some(session),
            _ => None,
        }
    }

    pub fn user(&self) -> Option<&User> {
        self.session().map(|session| &session.user)
    }

    /// The login failure carried by an unauthenticated state.
    pub fn login_error(&self) -> Option<&AuthError> {
        match self {
            AuthState::Unauthenticated { error } => error.as_ref(),
            _ => None,
        }
    }

    pub(crate) fn name(&self) -> &'static str {
        match self {
            AuthState::Initializing => "initializing",
            AuthState::Unauthenticated { .. } => "unauthenticated",
            AuthState::Authenticated { .. } => "authenticated",
            AuthState::TransitioningOut => "transitioning_out",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_states_are_initializing_and_transitioning_out() {
        assert!(AuthState::Initializing.is_pending());
        assert!(AuthState::TransitioningOut.is_pending());
        assert!(!AuthState::Unauthenticated { error: None }.is_pending());
    }

    #[test]
    fn login_error_is_only_visible_while_unauthenticated() {
        let state = AuthState::Unauthenticated {
            error: Some(AuthError::TokenExpired),
        };
        assert_eq!(state.login_error(), Some(&AuthError::TokenExpired));
        assert_eq!(AuthState::Initializing.login_error(), None);
    }
}
