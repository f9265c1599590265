use std::sync::{Arc, Mutex};

use crate::models::user::UserType;
use crate::session::controller::SessionController;
use crate::session::navigation::{NavigationThrottle, Navigator};
use crate::session::state::AuthState;

/// What a guarded view should do right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Session state is still settling: show a placeholder, never the
    /// protected content.
    Loading,
    /// Session satisfies the requirements: render the protected content.
    Render,
    /// Viewer must be sent elsewhere. The guard fires the navigation itself;
    /// the caller keeps showing the placeholder until it lands.
    Redirect { target: String },
}

/// Gatekeeper for a protected route.
///
/// `decide` computes the outcome for a state; `observe` additionally fires
/// the redirect, once per decision change. Redirects go through the
/// controller's shared throttle so a guard and the controller reacting to
/// the same transition produce a single navigation.
pub struct RouteGuard {
    controller: Arc<SessionController>,
    navigator: Arc<dyn Navigator>,
    throttle: Arc<NavigationThrottle>,
    required_user_type: Option<UserType>,
    fallback_path: String,
    unauthorized_path: String,
    last_decision: Mutex<Option<GateDecision>>,
}

impl RouteGuard {
    pub fn new(controller: Arc<SessionController>, navigator: Arc<dyn Navigator>) -> Self {
        let throttle = controller.navigation_throttle();
        let fallback_path = controller.settings().login_path.clone();
        let unauthorized_path = controller.settings().unauthorized_path.clone();
        Self {
            controller,
            navigator,
            throttle,
            required_user_type: None,
            fallback_path,
            unauthorized_path,
            last_decision: Mutex::new(None),
        }
    }

    /// Only sessions of this user type may render the content.
    pub fn require_user_type(mut self, user_type: UserType) -> Self {
        self.required_user_type = Some(user_type);
        self
    }

    /// Where unauthenticated viewers are sent instead of the login page.
    pub fn with_fallback(mut self, path: impl Into<String>) -> Self {
        self.fallback_path = path.into();
        self
    }

    /// Outcome for a given state. Fires nothing.
    pub fn decide(&self, state: &AuthState) -> GateDecision {
        match state {
            AuthState::Initializing | AuthState::TransitioningOut => GateDecision::Loading,
            AuthState::Unauthenticated { .. } => GateDecision::Redirect {
                target: self.fallback_path.clone(),
            },
            AuthState::Authenticated { session } => match self.required_user_type {
                Some(required) if session.user.user_type != required => {
                    tracing::debug!(
                        required = %required,
                        actual = %session.user.user_type,
                        "user type does not satisfy the route"
                    );
                    GateDecision::Redirect {
                        target: self.unauthorized_path.clone(),
                    }
                }
                _ => GateDecision::Render,
            },
        }
    }

    /// Evaluate the current state and, when the decision changed since the
    /// previous evaluation, fire its redirect. Re-rendering without a state
    /// change never re-fires.
    pub fn observe(&self) -> GateDecision {
        let decision = self.decide(&self.controller.state());

        let mut last_decision = self.last_decision.lock().unwrap();
        if last_decision.as_ref() != Some(&decision) {
            if let GateDecision::Redirect { target } = &decision {
                if self.throttle.allow(target) {
                    tracing::debug!(path = %target, "guard redirecting");
                    self.navigator.replace(target);
                } else {
                    tracing::debug!(path = %target, "guard redirect suppressed by debounce");
                }
            }
            *last_decision = Some(decision.clone());
        }

        decision
    }

    /// Drive `observe` from controller transitions until the controller is
    /// dropped. Hosts without a render loop spawn this once per guard.
    pub async fn run(&self) {
        let mut receiver = self.controller.subscribe();
        self.observe();
        while receiver.changed().await.is_ok() {
            self.observe();
        }
    }
}
