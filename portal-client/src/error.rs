use thiserror::Error;

/// Failures surfaced by the authentication flows.
///
/// Variants carry owned strings rather than source errors so that a failure
/// can be stored inside the published auth state and compared in tests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Malformed bearer token: {0}")]
    TokenMalformed(String),

    #[error("Bearer token expired")]
    TokenExpired,

    #[error("{message}")]
    InvalidCredentials {
        message: String,
        /// Login attempts left before the account locks, when the server says.
        attempts_remaining: Option<u32>,
    },

    #[error("{message}")]
    RateLimited {
        message: String,
        /// Seconds the caller should wait before retrying.
        retry_after_secs: u64,
    },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Another authentication operation is already in flight")]
    OperationInFlight,

    #[error("{0}")]
    Unknown(String),
}

/// Failures surfaced by authenticated resource requests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),
}

impl ApiError {
    /// The server-supplied message, when the variant carries one.
    pub fn message(&self) -> &str {
        match self {
            ApiError::Unauthorized { message }
            | ApiError::Forbidden { message }
            | ApiError::NotFound { message }
            | ApiError::Server { message, .. } => message,
            ApiError::Validation(message) | ApiError::Transport(message) => message,
        }
    }
}
