//! Contracts for the external collaborators and their implementations.
//!
//! The identity provider owns credentials, sessions and verification email; the
//! document store owns profile records; the object store owns uploaded bytes.
//! None of them is reimplemented here. Callers receive them as
//! `Arc<dyn Trait>` so tests can swap in the in-process backend (`memory`,
//! built with the `test-support` feature) and the CLI can use the REST
//! adapters in [`firebase`].
//!
//! Sessions carry the provider credential as a `SecretString`; it must never be
//! logged or shown to the user.

pub mod error;
pub mod firebase;
#[cfg(any(test, feature = "test-support"))]
pub mod memory;

pub use error::{BackendError, ProviderError};

use async_trait::async_trait;
use secrecy::SecretString;

/// Collection holding one profile record per user id.
pub const USERS_COLLECTION: &str = "users";

/// Authenticated-user context returned by the identity provider.
#[derive(Clone, Debug)]
pub struct Session {
    pub user_id: String,
    pub email: String,
    pub email_verified: bool,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub credential: SecretString,
}

/// Result of a federated sign-in; `is_new_user` is set the first time the
/// provider sees this account.
#[derive(Clone, Debug)]
pub struct FederatedSession {
    pub session: Session,
    pub is_new_user: bool,
}

/// Token issued by a federated provider (for example a Google ID token).
#[derive(Clone, Debug)]
pub struct FederatedToken {
    pub provider_id: String,
    pub id_token: SecretString,
}

impl FederatedToken {
    #[must_use]
    pub fn new(provider_id: impl Into<String>, id_token: SecretString) -> Self {
        Self {
            provider_id: provider_id.into(),
            id_token,
        }
    }
}

/// Partial profile update; `None` fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl ProfileUpdate {
    #[must_use]
    pub fn display_name(name: impl Into<String>) -> Self {
        Self {
            display_name: Some(name.into()),
            avatar_url: None,
        }
    }

    #[must_use]
    pub fn avatar_url(url: impl Into<String>) -> Self {
        Self {
            display_name: None,
            avatar_url: Some(url.into()),
        }
    }
}

/// Profile record stored in the `users` collection under the user id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProfileRecord {
    pub user_id: String,
    pub handle: String,
    pub email: String,
    pub avatar_url: Option<String>,
}

/// Queryable profile fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProfileField {
    Handle,
    Email,
}

impl ProfileField {
    /// Field name as stored in the document store.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Handle => "username",
            Self::Email => "email",
        }
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Verify an email/secret pair and open a session.
    async fn authenticate_with_password(
        &self,
        email: &str,
        secret: &SecretString,
    ) -> Result<Session, ProviderError>;

    /// Exchange a federated provider token for a session.
    async fn authenticate_federated(
        &self,
        token: &FederatedToken,
    ) -> Result<FederatedSession, ProviderError>;

    /// Register a new email/secret account and open a session for it.
    async fn create_account(
        &self,
        email: &str,
        secret: &SecretString,
    ) -> Result<Session, ProviderError>;

    async fn send_verification_email(&self, session: &Session) -> Result<(), ProviderError>;

    /// Apply a profile update and return the refreshed session.
    async fn update_profile(
        &self,
        session: &Session,
        update: &ProfileUpdate,
    ) -> Result<Session, ProviderError>;

    /// Replace the account secret; providers may rotate the session credential.
    async fn change_secret(
        &self,
        session: &Session,
        new_secret: &SecretString,
    ) -> Result<Session, ProviderError>;

    /// Drop provider-side session state. Token based providers have nothing to do.
    async fn sign_out(&self, _session: &Session) -> Result<(), ProviderError> {
        Ok(())
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// First record in `collection` whose `field` equals `value` exactly.
    async fn find_one_where(
        &self,
        collection: &str,
        field: ProfileField,
        value: &str,
    ) -> Result<Option<ProfileRecord>, BackendError>;

    /// Create or replace the record stored under `record.user_id`.
    async fn put(
        &self,
        collection: &str,
        record: &ProfileRecord,
        session: &Session,
    ) -> Result<(), BackendError>;
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        session: &Session,
    ) -> Result<(), BackendError>;

    /// Publicly fetchable URL for an uploaded object.
    async fn public_url(&self, path: &str, session: &Session) -> Result<String, BackendError>;
}
