use thiserror::Error;

/// Failures reported by an [`IdentityProvider`](super::IdentityProvider).
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("email already in use")]
    EmailInUse,
    #[error("invalid email address")]
    InvalidEmail,
    #[error("rejected by password policy: {0}")]
    Policy(String),
    #[error("session expired, sign in again")]
    SessionExpired,
    #[error("too many attempts, try again later")]
    RateLimited,
    #[error("federated sign-in failed: {0}")]
    Federated(String),
    #[error("request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Failures reported by the document store and the object store.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("invalid object path: {0}")]
    InvalidPath(String),
    #[error("not configured: {0}")]
    Config(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}
