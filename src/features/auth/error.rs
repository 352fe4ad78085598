use crate::backend::{BackendError, ProviderError, Session};
use crate::features::notice::Notice;
use thiserror::Error;

/// Shared message for unknown handles and rejected credentials.
pub const INVALID_LOGIN_MESSAGE: &str = "Invalid email, username, or password. Please try again.";
pub const UNVERIFIED_MESSAGE: &str = "Please verify your email before logging in.";
pub const SECRET_TOO_SHORT_MESSAGE: &str = "Password must be at least 6 characters long.";
pub const HANDLE_IS_EMAIL_MESSAGE: &str = "Username cannot be an email address.";

/// Failures of the account flows. Every variant maps to exactly one message
/// shown on the screen that initiated the action.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),
    #[error("no profile with that handle")]
    IdentifierNotFound,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("email address is not verified")]
    EmailUnverified { session: Box<Session> },
    #[error("verification email could not be sent: {0}")]
    Delivery(#[source] ProviderError),
    #[error("secret rejected: {0}")]
    PolicyViolation(String),
    #[error("secret change failed: {0}")]
    SecretChange(#[source] ProviderError),
    #[error("avatar upload failed: {0}")]
    Upload(String),
    #[error("handle {0:?} is already taken")]
    HandleTaken(String),
    #[error("profile lookup failed: {0}")]
    Lookup(#[source] BackendError),
    #[error("profile write failed: {0}")]
    ProfileWrite(#[source] BackendError),
    #[error("signup rejected: {0}")]
    Signup(#[source] ProviderError),
    #[error("federated sign-in failed: {0}")]
    Federated(#[source] ProviderError),
    #[error("profile update failed: {0}")]
    ProfileUpdate(#[source] ProviderError),
    #[error("sign out failed: {0}")]
    SignOut(#[source] ProviderError),
}

impl AuthError {
    /// Human-readable message for the screen that initiated the action.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(message) | Self::PolicyViolation(message) => message.clone(),
            Self::IdentifierNotFound | Self::InvalidCredentials => INVALID_LOGIN_MESSAGE.to_string(),
            Self::EmailUnverified { .. } => UNVERIFIED_MESSAGE.to_string(),
            Self::Delivery(_) => "Error sending verification email. Try again later.".to_string(),
            Self::SecretChange(_) => "Error updating password. Please try again.".to_string(),
            Self::Upload(_) => "Error updating profile picture. Please try again.".to_string(),
            Self::HandleTaken(handle) => format!("The username {handle} is already taken."),
            Self::Lookup(_) => "Error fetching user details.".to_string(),
            Self::ProfileWrite(_) => "Error saving your profile. Please try again.".to_string(),
            Self::Signup(err) => signup_message(err),
            Self::Federated(_) => "Federated login failed. Try again later.".to_string(),
            Self::ProfileUpdate(_) => "Error updating username.".to_string(),
            Self::SignOut(_) => "Error logging out. Please try again.".to_string(),
        }
    }

    #[must_use]
    pub fn notice(&self) -> Notice {
        match self {
            Self::EmailUnverified { .. } => Notice::warning(self.user_message()),
            _ => Notice::error(self.user_message()),
        }
    }
}

fn signup_message(err: &ProviderError) -> String {
    match err {
        ProviderError::EmailInUse => "That email address is already registered.".to_string(),
        ProviderError::InvalidEmail => "Please enter a valid email address.".to_string(),
        ProviderError::Policy(_) => SECRET_TOO_SHORT_MESSAGE.to_string(),
        ProviderError::RateLimited => "Too many attempts. Try again later.".to_string(),
        _ => "Sign up failed. Please try again.".to_string(),
    }
}
