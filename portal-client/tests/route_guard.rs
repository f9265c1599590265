//! Route guard decisions and their navigation effects.

mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use common::{controller_with, seed_session, test_user, MockAuthApi, RecordingNavigator};
use portal_client::guard::{GateDecision, RouteGuard};
use portal_client::models::user::UserType;
use portal_client::session::state::AuthState;
use portal_client::storage::SessionStore;

#[tokio::test]
async fn initializing_state_keeps_the_content_hidden() {
    let controller = controller_with(
        MockAuthApi::new(),
        SessionStore::in_memory(),
        RecordingNavigator::new(),
    );
    let navigator = RecordingNavigator::new();
    let guard = RouteGuard::new(controller, navigator.clone());

    assert_eq!(guard.observe(), GateDecision::Loading);
    assert_eq!(guard.decide(&AuthState::TransitioningOut), GateDecision::Loading);
    assert_eq!(navigator.count(), 0);
}

#[tokio::test]
async fn unauthenticated_viewer_is_redirected_exactly_once() {
    let controller = controller_with(
        MockAuthApi::new(),
        SessionStore::in_memory(),
        RecordingNavigator::new(),
    );
    controller.initialize().await;

    let navigator = RecordingNavigator::new();
    let guard = RouteGuard::new(controller, navigator.clone());

    for _ in 0..3 {
        assert_eq!(
            guard.observe(),
            GateDecision::Redirect {
                target: "/login".to_string()
            }
        );
    }
    // Re-rendering without a state change never re-fires the navigation.
    assert_eq!(navigator.count(), 1);
    assert_eq!(navigator.last().as_deref(), Some("/login"));
}

#[tokio::test]
async fn matching_user_type_renders_without_navigation() {
    let store = SessionStore::in_memory();
    let now = Utc::now().timestamp();
    seed_session(&store, &test_user(UserType::Patient), now + 1800);
    let controller = controller_with(MockAuthApi::new(), store, RecordingNavigator::new());
    controller.initialize().await;

    let navigator = RecordingNavigator::new();
    let guard =
        RouteGuard::new(controller, navigator.clone()).require_user_type(UserType::Patient);

    assert_eq!(guard.observe(), GateDecision::Render);
    assert_eq!(navigator.count(), 0);
}

#[tokio::test]
async fn wrong_user_type_is_sent_to_unauthorized_without_rendering() {
    let store = SessionStore::in_memory();
    let now = Utc::now().timestamp();
    seed_session(&store, &test_user(UserType::Doctor), now + 1800);
    let controller = controller_with(MockAuthApi::new(), store, RecordingNavigator::new());
    controller.initialize().await;

    let navigator = RecordingNavigator::new();
    let guard =
        RouteGuard::new(controller, navigator.clone()).require_user_type(UserType::Patient);

    for _ in 0..3 {
        assert_eq!(
            guard.observe(),
            GateDecision::Redirect {
                target: "/unauthorized".to_string()
            }
        );
    }
    assert_eq!(navigator.count(), 1);
    assert_eq!(navigator.last().as_deref(), Some("/unauthorized"));
}

#[tokio::test]
async fn fallback_path_overrides_the_login_target() {
    let controller = controller_with(
        MockAuthApi::new(),
        SessionStore::in_memory(),
        RecordingNavigator::new(),
    );
    controller.initialize().await;

    let navigator = RecordingNavigator::new();
    let guard = RouteGuard::new(controller, navigator.clone()).with_fallback("/welcome");

    assert_eq!(
        guard.observe(),
        GateDecision::Redirect {
            target: "/welcome".to_string()
        }
    );
    assert_eq!(navigator.last().as_deref(), Some("/welcome"));
}

#[tokio::test]
async fn a_new_transition_rearms_the_navigation() {
    let store = SessionStore::in_memory();
    let now = Utc::now().timestamp();
    seed_session(&store, &test_user(UserType::Patient), now + 1800);
    let controller = controller_with(MockAuthApi::new(), store.clone(), RecordingNavigator::new());
    controller.initialize().await;

    let navigator = RecordingNavigator::new();
    let guard = RouteGuard::new(controller.clone(), navigator.clone());

    assert_eq!(guard.observe(), GateDecision::Render);
    assert_eq!(navigator.count(), 0);

    // Storage vanished underneath us (another window signed out).
    store.clear_session();
    controller.initialize().await;

    assert!(matches!(guard.observe(), GateDecision::Redirect { .. }));
    assert_eq!(navigator.count(), 1);
    assert_eq!(guard.observe(), GateDecision::Redirect {
        target: "/login".to_string()
    });
    assert_eq!(navigator.count(), 1);
}

#[tokio::test]
async fn guard_and_logout_share_one_debounce_window() {
    let store = SessionStore::in_memory();
    let now = Utc::now().timestamp();
    seed_session(&store, &test_user(UserType::Patient), now + 1800);
    let controller_navigator = RecordingNavigator::new();
    let controller = controller_with(MockAuthApi::new(), store, controller_navigator.clone());
    controller.initialize().await;

    let guard_navigator = RecordingNavigator::new();
    let guard = RouteGuard::new(controller.clone(), guard_navigator.clone());
    assert_eq!(guard.observe(), GateDecision::Render);

    controller.logout().await.unwrap();
    assert_eq!(controller_navigator.count(), 1);

    // The guard reacts to the same transition, but the shared throttle has
    // already spent the window for /login.
    assert!(matches!(guard.observe(), GateDecision::Redirect { .. }));
    assert_eq!(guard_navigator.count(), 0);
}

#[tokio::test]
async fn run_drives_observe_from_published_transitions() {
    let controller = controller_with(
        MockAuthApi::new(),
        SessionStore::in_memory(),
        RecordingNavigator::new(),
    );

    let navigator = RecordingNavigator::new();
    let guard = Arc::new(RouteGuard::new(controller.clone(), navigator.clone()));
    let driver = tokio::spawn({
        let guard = guard.clone();
        async move { guard.run().await }
    });

    controller.initialize().await;
    tokio::time::sleep(Duration::from_millis(25)).await;

    assert_eq!(navigator.count(), 1);
    assert_eq!(navigator.last().as_deref(), Some("/login"));
    driver.abort();
}
