use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use anyhow::Result;

use crate::models::user::{AuthTokens, User};

/// Slot names in the persisted key-value store. Key style matches the web
/// storage document this store replaces.
pub const ACCESS_TOKEN_KEY: &str = "accessToken";
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";
pub const USER_KEY: &str = "user";
pub const PREFERRED_LANGUAGE_KEY: &str = "preferredLanguage";

/// Raw string key-value persistence. Reads never fail; write failures are
/// logged by the backend rather than surfaced, matching web storage semantics.
pub trait KeyValueBackend: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// Volatile backend for tests and headless embedding.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueBackend for MemoryBackend {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries
            .write()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.entries.write().unwrap().remove(key);
    }
}

/// Durable backend: a single JSON document on disk, rewritten on every
/// mutation. Small enough (four slots) that write-through is fine.
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    entries: RwLock<HashMap<String, String>>,
}

impl FileBackend {
    /// Open the store at `path`, creating parent directories as needed.
    /// A corrupt document is logged and reset rather than refused.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    anyhow::anyhow!("failed to create {}: {}", parent.display(), e)
                })?;
            }
        }

        let entries = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<HashMap<String, String>>(&raw) {
                Ok(map) => map,
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "session file is not valid JSON, starting empty"
                    );
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "failed to read session file {}: {}",
                    path.display(),
                    e
                ));
            }
        };

        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    fn persist(&self, entries: &HashMap<String, String>) {
        match serde_json::to_string_pretty(entries) {
            Ok(raw) => {
                if let Err(e) = fs::write(&self.path, raw) {
                    tracing::error!(
                        path = %self.path.display(),
                        error = %e,
                        "failed to persist session file"
                    );
                }
            }
            Err(e) => tracing::error!(error = %e, "failed to serialize session entries"),
        }
    }
}

impl KeyValueBackend for FileBackend {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        let mut entries = self.entries.write().unwrap();
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries);
    }

    fn remove(&self, key: &str) {
        let mut entries = self.entries.write().unwrap();
        entries.remove(key);
        self.persist(&entries);
    }
}

/// Typed view over the session slots.
///
/// Only the session controller writes the token/user triad; everything else
/// treats this store as read-only. The preferred language slot is independent
/// of the session and survives `clear_session`.
#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn KeyValueBackend>,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn KeyValueBackend>) -> Self {
        Self { backend }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    /// Empty slots count as absent, so a blank token never looks usable.
    pub fn access_token(&self) -> Option<String> {
        self.backend.get(ACCESS_TOKEN_KEY).filter(|v| !v.is_empty())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.backend
            .get(REFRESH_TOKEN_KEY)
            .filter(|v| !v.is_empty())
    }

    /// The cached user record. A document that no longer parses is logged
    /// and treated as absent.
    pub fn user(&self) -> Option<User> {
        let raw = self.backend.get(USER_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::warn!(error = %e, "stored user record is unreadable, ignoring it");
                None
            }
        }
    }

    pub fn preferred_language(&self) -> Option<String> {
        self.backend
            .get(PREFERRED_LANGUAGE_KEY)
            .filter(|v| !v.is_empty())
    }

    pub fn set_preferred_language(&self, language: &str) {
        self.backend.set(PREFERRED_LANGUAGE_KEY, language);
    }

    /// Write the whole triad. An absent refresh token is stored as an empty
    /// slot so the triad always moves as a unit.
    pub fn set_session(&self, tokens: &AuthTokens, user: &User) {
        self.backend.set(ACCESS_TOKEN_KEY, &tokens.access_token);
        self.backend.set(
            REFRESH_TOKEN_KEY,
            tokens.refresh_token.as_deref().unwrap_or(""),
        );
        match serde_json::to_string(user) {
            Ok(raw) => self.backend.set(USER_KEY, &raw),
            Err(e) => tracing::error!(error = %e, "failed to serialize user record"),
        }
    }

    /// Remove the triad and nothing else.
    pub fn clear_session(&self) {
        self.backend.remove(ACCESS_TOKEN_KEY);
        self.backend.remove(REFRESH_TOKEN_KEY);
        self.backend.remove(USER_KEY);
    }

    pub fn has_valid_tokens(&self) -> bool {
        self.access_token().is_some() && self.refresh_token().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::UserType;

    fn sample_user() -> User {
        User {
            id: "u-1".to_string(),
            email: "ana@example.com".to_string(),
            first_name: Some("Ana".to_string()),
            last_name: None,
            user_type: UserType::Patient,
            is_verified: true,
            profile_completed: false,
            mandatory_fields_completed: false,
        }
    }

    fn sample_tokens() -> AuthTokens {
        AuthTokens {
            access_token: "access".to_string(),
            refresh_token: Some("refresh".to_string()),
            expires_in: 1800,
        }
    }

    #[test]
    fn triad_round_trips_through_the_store() {
        let store = SessionStore::in_memory();
        store.set_session(&sample_tokens(), &sample_user());

        assert_eq!(store.access_token().as_deref(), Some("access"));
        assert_eq!(store.refresh_token().as_deref(), Some("refresh"));
        assert_eq!(store.user(), Some(sample_user()));
        assert!(store.has_valid_tokens());
    }

    #[test]
    fn absent_refresh_token_is_stored_as_an_empty_slot() {
        let store = SessionStore::in_memory();
        let tokens = AuthTokens {
            refresh_token: None,
            ..sample_tokens()
        };
        store.set_session(&tokens, &sample_user());

        assert_eq!(store.refresh_token(), None);
        assert!(!store.has_valid_tokens());
    }

    #[test]
    fn clear_session_leaves_the_language_slot_alone() {
        let store = SessionStore::in_memory();
        store.set_preferred_language("es");
        store.set_session(&sample_tokens(), &sample_user());

        store.clear_session();

        assert_eq!(store.access_token(), None);
        assert_eq!(store.refresh_token(), None);
        assert_eq!(store.user(), None);
        assert_eq!(store.preferred_language().as_deref(), Some("es"));
    }

    #[test]
    fn unreadable_user_record_is_treated_as_absent() {
        let backend = Arc::new(MemoryBackend::new());
        backend.set(USER_KEY, "{not json");
        let store = SessionStore::new(backend);

        assert_eq!(store.user(), None);
    }

    #[test]
    fn file_backend_survives_a_reopen() {
        let path = std::env::temp_dir().join(format!(
            "portal-client-store-{}.json",
            uuid::Uuid::new_v4()
        ));

        {
            let store = SessionStore::new(Arc::new(FileBackend::open(&path).unwrap()));
            store.set_session(&sample_tokens(), &sample_user());
        }

        let reopened = SessionStore::new(Arc::new(FileBackend::open(&path).unwrap()));
        assert_eq!(reopened.access_token().as_deref(), Some("access"));
        assert_eq!(reopened.user(), Some(sample_user()));

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn file_backend_resets_a_corrupt_document() {
        let path = std::env::temp_dir().join(format!(
            "portal-client-corrupt-{}.json",
            uuid::Uuid::new_v4()
        ));
        fs::write(&path, "definitely not json").unwrap();

        let backend = FileBackend::open(&path).unwrap();
        assert_eq!(backend.get(ACCESS_TOKEN_KEY), None);

        let _ = fs::remove_file(&path);
    }
}
