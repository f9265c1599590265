use serde::{Deserialize, Serialize};
use std::fmt;

/// Access token lifetime the server assumes when it omits `expires_in`.
pub const DEFAULT_EXPIRES_IN_SECS: i64 = 1800;

/// Role attached to an account. Gates which sections of the portal render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Patient,
    Doctor,
    Admin,
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserType::Patient => write!(f, "patient"),
            UserType::Doctor => write!(f, "doctor"),
            UserType::Admin => write!(f, "admin"),
        }
    }
}

/// Account record as cached between visits.
///
/// Serializes in camelCase: the persisted session document keeps the key
/// style of the web storage it replaces, while the wire payloads below stay
/// snake_case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    pub user_type: UserType,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub profile_completed: bool,
    #[serde(default)]
    pub mandatory_fields_completed: bool,
}

impl User {
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{} {}", first, last).trim().to_string(),
            (Some(first), None) => first.clone(),
            _ => self.email.split('@').next().unwrap_or("User").to_string(),
        }
    }

    /// Verified accounts with every mandatory profile field filled in.
    pub fn is_onboarded(&self) -> bool {
        self.is_verified && self.mandatory_fields_completed
    }
}

/// Wire shape of a user document. Auth endpoints disagree on the id key
/// (`id` on login, `user_id` on `/me` and `/validate`), so both are accepted.
#[derive(Debug, Clone, Deserialize)]
pub struct UserPayload {
    #[serde(alias = "user_id")]
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    pub user_type: UserType,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub profile_completed: bool,
    #[serde(default)]
    pub mandatory_fields_completed: bool,
}

impl From<UserPayload> for User {
    fn from(payload: UserPayload) -> Self {
        User {
            id: payload.id,
            email: payload.email,
            first_name: payload.first_name,
            last_name: payload.last_name,
            user_type: payload.user_type,
            is_verified: payload.is_verified,
            profile_completed: payload.profile_completed,
            mandatory_fields_completed: payload.mandatory_fields_completed,
        }
    }
}

/// Token material handed out by login and refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Seconds until the access token expires, counted from issuance.
    pub expires_in: i64,
}
