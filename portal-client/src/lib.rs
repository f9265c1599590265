//! portal-client: session-aware client for the patient records platform.
pub mod config;
pub mod error;
pub mod guard;
pub mod models;
pub mod services;
pub mod session;
pub mod storage;
pub mod utils;

use std::sync::Arc;

use config::Settings;
use services::auth_api::HttpAuthApi;
use services::records::RecordsClient;
use session::controller::SessionController;
use session::navigation::Navigator;
use storage::{FileBackend, SessionStore};

pub use error::{ApiError, AuthError};
pub use guard::{GateDecision, RouteGuard};
pub use models::user::{User, UserType};
pub use services::auth_api::Credentials;
pub use session::state::{AuthState, Session};

/// Shared client state wired once at application start.
#[derive(Clone)]
pub struct PortalClient {
    pub session: Arc<SessionController>,
    pub records: Arc<RecordsClient>,
}

impl PortalClient {
    /// Wire the client from settings: file-backed session storage, the HTTP
    /// auth boundary, the session controller, and the records client. Call
    /// `session.initialize()` afterwards to settle the starting state.
    pub fn new(settings: Settings, navigator: Arc<dyn Navigator>) -> anyhow::Result<Self> {
        let backend = FileBackend::open(&settings.storage.path)?;
        let store = SessionStore::new(Arc::new(backend));
        let api = Arc::new(HttpAuthApi::new(settings.api.clone()));
        let session = Arc::new(SessionController::new(
            api,
            store,
            navigator,
            settings.session.clone(),
        ));
        let records = Arc::new(RecordsClient::new(settings.api, session.clone()));
        Ok(Self { session, records })
    }
}
