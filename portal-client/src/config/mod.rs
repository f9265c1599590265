use serde::Deserialize;
use std::path::PathBuf;

/// Client configuration. Every field has a default so the client can be
/// wired with `Settings::default()` and overridden per deployment via
/// `config/base.yaml` or `APP_`-prefixed environment variables.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub session: SessionSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiSettings {
    /// Origin of the platform API, without a trailing slash.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageSettings {
    /// Where the persisted session document lives.
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
        }
    }
}

fn default_storage_path() -> PathBuf {
    PathBuf::from(".portal-client/session.json")
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionSettings {
    /// Where unauthenticated viewers are sent.
    #[serde(default = "default_login_path")]
    pub login_path: String,
    /// Where authenticated viewers with the wrong role are sent.
    #[serde(default = "default_unauthorized_path")]
    pub unauthorized_path: String,
    #[serde(default = "default_redirect_debounce_ms")]
    pub redirect_debounce_ms: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            login_path: default_login_path(),
            unauthorized_path: default_unauthorized_path(),
            redirect_debounce_ms: default_redirect_debounce_ms(),
        }
    }
}

fn default_login_path() -> String {
    "/login".to_string()
}

fn default_unauthorized_path() -> String {
    "/unauthorized".to_string()
}

fn default_redirect_debounce_ms() -> u64 {
    crate::session::navigation::DEFAULT_REDIRECT_DEBOUNCE_MS
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir().expect("Failed to determine the current directory");
    let configuration_file = base_path.join("config").join("base.yaml");

    let settings = config::Config::builder()
        .add_source(config::File::from(configuration_file).required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_section() {
        let settings = Settings::default();
        assert_eq!(settings.api.base_url, "http://localhost:8000");
        assert_eq!(settings.api.timeout_seconds, 30);
        assert_eq!(settings.session.login_path, "/login");
        assert_eq!(settings.session.unauthorized_path, "/unauthorized");
        assert_eq!(settings.session.redirect_debounce_ms, 1000);
    }

    #[test]
    fn yaml_overrides_win_over_defaults() {
        let settings = config::Config::builder()
            .add_source(config::File::from_str(
                "api:\n  base_url: https://api.example.com\nsession:\n  login_path: /signin\n",
                config::FileFormat::Yaml,
            ))
            .build()
            .unwrap()
            .try_deserialize::<Settings>()
            .unwrap();

        assert_eq!(settings.api.base_url, "https://api.example.com");
        assert_eq!(settings.session.login_path, "/signin");
        assert_eq!(settings.api.timeout_seconds, 30);
    }
}
