pub mod controller;
pub mod navigation;
pub mod state;

pub use controller::{is_session_invalidating_error, SessionController};
pub use navigation::{NavigationThrottle, Navigator, NoopNavigator};
pub use state::{AuthState, Session};
