//! Auth feature: identifier classification, handle resolution, password and
//! federated login, signup and verification resend. It never touches
//! credentials beyond handing them to the identity provider, and secrets are
//! skipped in every span.
//!
//! Flow Overview: a login identifier is classified as an email or a handle; a
//! handle is resolved to an email through the profile collection; the provider
//! authenticates; an unverified session stops the flow with
//! [`AuthError::EmailUnverified`]; a verified session is enriched with the
//! profile handle and returned as a [`CompletedSession`].

mod error;
mod identifier;
mod login;
mod resolver;
mod signup;

pub use error::{
    AuthError, HANDLE_IS_EMAIL_MESSAGE, INVALID_LOGIN_MESSAGE, SECRET_TOO_SHORT_MESSAGE,
    UNVERIFIED_MESSAGE,
};
pub use identifier::{is_email_shaped, Identifier, EMAIL_SHAPE};
pub use login::{CompletedSession, FederatedLogin, LoginService};
pub use resolver::{IdentifierResolver, Resolution};
pub use signup::{SignupOutcome, SignupRequest, SignupService, VERIFICATION_SENT_MESSAGE};

use crate::backend::USERS_COLLECTION;
use std::time::Duration;

/// Tunables shared by the auth and account flows.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    collection: String,
    password_fallback_handle: String,
    federated_fallback_handle: String,
    signup_redirect_delay: Duration,
    min_secret_len: usize,
}

impl AuthConfig {
    pub const DEFAULT_PASSWORD_FALLBACK: &'static str = "Mysterious Player";
    pub const DEFAULT_FEDERATED_FALLBACK: &'static str = "User";
    pub const DEFAULT_SIGNUP_REDIRECT_DELAY: Duration = Duration::from_millis(2000);
    pub const DEFAULT_MIN_SECRET_LEN: usize = 6;

    #[must_use]
    pub fn new() -> Self {
        Self {
            collection: USERS_COLLECTION.to_string(),
            password_fallback_handle: Self::DEFAULT_PASSWORD_FALLBACK.to_string(),
            federated_fallback_handle: Self::DEFAULT_FEDERATED_FALLBACK.to_string(),
            signup_redirect_delay: Self::DEFAULT_SIGNUP_REDIRECT_DELAY,
            min_secret_len: Self::DEFAULT_MIN_SECRET_LEN,
        }
    }

    #[must_use]
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    #[must_use]
    pub fn with_password_fallback_handle(mut self, handle: impl Into<String>) -> Self {
        self.password_fallback_handle = handle.into();
        self
    }

    #[must_use]
    pub fn with_federated_fallback_handle(mut self, handle: impl Into<String>) -> Self {
        self.federated_fallback_handle = handle.into();
        self
    }

    #[must_use]
    pub fn with_signup_redirect_delay(mut self, delay: Duration) -> Self {
        self.signup_redirect_delay = delay;
        self
    }

    #[must_use]
    pub fn with_min_secret_len(mut self, len: usize) -> Self {
        self.min_secret_len = len;
        self
    }

    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    #[must_use]
    pub fn password_fallback_handle(&self) -> &str {
        &self.password_fallback_handle
    }

    #[must_use]
    pub fn federated_fallback_handle(&self) -> &str {
        &self.federated_fallback_handle
    }

    #[must_use]
    pub fn signup_redirect_delay(&self) -> Duration {
        self.signup_redirect_delay
    }

    #[must_use]
    pub fn min_secret_len(&self) -> usize {
        self.min_secret_len
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = AuthConfig::default();
        assert_eq!(config.collection(), "users");
        assert_eq!(config.password_fallback_handle(), "Mysterious Player");
        assert_eq!(config.federated_fallback_handle(), "User");
        assert_eq!(config.signup_redirect_delay(), Duration::from_millis(2000));
        assert_eq!(config.min_secret_len(), 6);
    }

    #[test]
    fn builders_override_defaults() {
        let config = AuthConfig::new()
            .with_collection("profiles")
            .with_password_fallback_handle("Stranger")
            .with_signup_redirect_delay(Duration::ZERO)
            .with_min_secret_len(12);
        assert_eq!(config.collection(), "profiles");
        assert_eq!(config.password_fallback_handle(), "Stranger");
        assert_eq!(config.federated_fallback_handle(), "User");
        assert_eq!(config.signup_redirect_delay(), Duration::ZERO);
        assert_eq!(config.min_secret_len(), 12);
    }
}
