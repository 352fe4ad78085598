//! Account actions available on the landing view: rename, secret change,
//! avatar upload and sign out. Each action takes the current
//! [`CompletedSession`] and returns the refreshed one; the caller owns the
//! session hub and decides what to publish.

use crate::backend::{
    DocumentStore, IdentityProvider, ObjectStorage, ProfileField, ProfileRecord, ProfileUpdate,
    ProviderError,
};
use crate::features::auth::{
    is_email_shaped, AuthConfig, AuthError, CompletedSession, HANDLE_IS_EMAIL_MESSAGE,
    SECRET_TOO_SHORT_MESSAGE,
};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Folder holding one avatar object per user id.
pub const AVATAR_PREFIX: &str = "profilePictures";

/// Second paragraph of the landing view.
pub const LANDING_MESSAGE: &str = "Get ready for the ultimate challenge. Only the bold survive. \
Stay sharp, trust no one, and may the odds be in your favor!";

/// Headline shown on the landing view.
#[must_use]
pub fn greeting(handle: &str) -> String {
    format!("Hiii, {handle}! 🌚 Congrats! You’ve successfully signed up for Squid Game! 🦑🏆")
}

/// Letter shown in place of a missing avatar picture.
#[must_use]
pub fn avatar_initial(handle: &str) -> char {
    handle
        .trim()
        .chars()
        .next()
        .map_or('M', |c| c.to_uppercase().next().unwrap_or(c))
}

#[must_use]
pub fn avatar_path(user_id: &str) -> String {
    format!("{AVATAR_PREFIX}/{user_id}")
}

#[derive(Clone)]
pub struct AccountService {
    provider: Arc<dyn IdentityProvider>,
    store: Arc<dyn DocumentStore>,
    storage: Arc<dyn ObjectStorage>,
    config: AuthConfig,
}

impl AccountService {
    #[must_use]
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        store: Arc<dyn DocumentStore>,
        storage: Arc<dyn ObjectStorage>,
        config: AuthConfig,
    ) -> Self {
        Self {
            provider,
            store,
            storage,
            config,
        }
    }

    /// Change the display handle and keep the profile record in step so
    /// handle login keeps working.
    ///
    /// # Errors
    /// [`AuthError::Validation`] for a blank or email-shaped handle, [`AuthError::HandleTaken`]
    /// when another user holds it, [`AuthError::ProfileUpdate`] or
    /// [`AuthError::ProfileWrite`] when a collaborator refuses.
    #[instrument(skip_all, fields(user_id = %current.session.user_id))]
    pub async fn rename(
        &self,
        current: &CompletedSession,
        new_handle: &str,
    ) -> Result<CompletedSession, AuthError> {
        let handle = new_handle.trim();
        if handle.is_empty() {
            return Err(AuthError::Validation("Username cannot be empty.".to_string()));
        }
        if is_email_shaped(handle) {
            return Err(AuthError::Validation(HANDLE_IS_EMAIL_MESSAGE.to_string()));
        }

        let holder = self
            .store
            .find_one_where(self.config.collection(), ProfileField::Handle, handle)
            .await
            .map_err(AuthError::Lookup)?;
        if holder.is_some_and(|record| record.user_id != current.session.user_id) {
            return Err(AuthError::HandleTaken(handle.to_string()));
        }

        let session = self
            .provider
            .update_profile(&current.session, &ProfileUpdate::display_name(handle))
            .await
            .map_err(AuthError::ProfileUpdate)?;

        let record = ProfileRecord {
            user_id: session.user_id.clone(),
            handle: handle.to_string(),
            email: session.email.clone(),
            avatar_url: session.avatar_url.clone(),
        };
        self.store
            .put(self.config.collection(), &record, &session)
            .await
            .map_err(AuthError::ProfileWrite)?;

        info!("handle updated");
        Ok(CompletedSession {
            session,
            handle: handle.to_string(),
        })
    }

    /// # Errors
    /// [`AuthError::PolicyViolation`] when the secret is too short (checked
    /// locally first) or the provider's policy rejects it, and
    /// [`AuthError::SecretChange`] for any other provider failure.
    #[instrument(skip_all, fields(user_id = %current.session.user_id))]
    pub async fn change_secret(
        &self,
        current: &CompletedSession,
        new_secret: &SecretString,
    ) -> Result<CompletedSession, AuthError> {
        if new_secret.expose_secret().trim().chars().count() < self.config.min_secret_len() {
            return Err(AuthError::PolicyViolation(
                SECRET_TOO_SHORT_MESSAGE.to_string(),
            ));
        }

        let session = self
            .provider
            .change_secret(&current.session, new_secret)
            .await
            .map_err(|err| match err {
                ProviderError::Policy(detail) => {
                    warn!(%detail, "secret rejected by provider policy");
                    AuthError::PolicyViolation(SECRET_TOO_SHORT_MESSAGE.to_string())
                }
                other => AuthError::SecretChange(other),
            })?;

        info!("secret changed");
        Ok(CompletedSession {
            session,
            handle: current.handle.clone(),
        })
    }

    /// Upload a new avatar to `profilePictures/{user_id}` and point the
    /// provider profile and the profile record at its public URL.
    ///
    /// # Errors
    /// [`AuthError::Validation`] for non-image content and
    /// [`AuthError::Upload`] when any step fails.
    #[instrument(skip_all, fields(user_id = %current.session.user_id, size = bytes.len()))]
    pub async fn upload_avatar(
        &self,
        current: &CompletedSession,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<CompletedSession, AuthError> {
        if bytes.is_empty() || !content_type.starts_with("image/") {
            return Err(AuthError::Validation(
                "Please choose an image file.".to_string(),
            ));
        }

        let path = avatar_path(&current.session.user_id);
        self.storage
            .upload(&path, bytes, content_type, &current.session)
            .await
            .map_err(|err| AuthError::Upload(err.to_string()))?;

        let url = self
            .storage
            .public_url(&path, &current.session)
            .await
            .map_err(|err| AuthError::Upload(err.to_string()))?;

        let session = self
            .provider
            .update_profile(&current.session, &ProfileUpdate::avatar_url(url))
            .await
            .map_err(|err| AuthError::Upload(err.to_string()))?;

        let record = ProfileRecord {
            user_id: session.user_id.clone(),
            handle: current.handle.clone(),
            email: session.email.clone(),
            avatar_url: session.avatar_url.clone(),
        };
        self.store
            .put(self.config.collection(), &record, &session)
            .await
            .map_err(|err| AuthError::Upload(err.to_string()))?;

        info!("avatar updated");
        Ok(CompletedSession {
            session,
            handle: current.handle.clone(),
        })
    }

    /// # Errors
    /// [`AuthError::SignOut`] when the provider refuses.
    #[instrument(skip_all, fields(user_id = %current.session.user_id))]
    pub async fn sign_out(&self, current: &CompletedSession) -> Result<(), AuthError> {
        self.provider
            .sign_out(&current.session)
            .await
            .map_err(AuthError::SignOut)?;
        info!("signed out");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::backend::memory::{Call, Failure, MemoryBackend};
    use crate::features::auth::LoginService;

    fn secret(value: &str) -> SecretString {
        SecretString::from(value.to_string())
    }

    fn service(backend: &Arc<MemoryBackend>) -> AccountService {
        AccountService::new(
            backend.clone(),
            backend.clone(),
            backend.clone(),
            AuthConfig::new(),
        )
    }

    async fn signed_in(backend: &Arc<MemoryBackend>) -> CompletedSession {
        let user_id = backend.seed_account("a@b.com", "hunter22", true).await;
        backend.seed_profile(&user_id, "nova", "a@b.com").await;
        let completed = LoginService::new(backend.clone(), backend.clone(), AuthConfig::new())
            .login("nova", &secret("hunter22"))
            .await
            .unwrap();
        backend.clear_calls().await;
        completed
    }

    #[test]
    fn greeting_and_initial_use_handle() {
        assert!(greeting("nova").starts_with("Hiii, nova! "));
        assert_eq!(avatar_initial("nova"), 'N');
        assert_eq!(avatar_initial(""), 'M');
        assert_eq!(avatar_path("uid-1"), "profilePictures/uid-1");
    }

    #[tokio::test]
    async fn rename_updates_provider_and_record() {
        let backend = Arc::new(MemoryBackend::new());
        let current = signed_in(&backend).await;

        let renamed = service(&backend).rename(&current, "  sae-byeok ").await.unwrap();
        assert_eq!(renamed.handle, "sae-byeok");
        assert_eq!(renamed.session.display_name.as_deref(), Some("sae-byeok"));
        let records = backend.records().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].handle, "sae-byeok");
    }

    #[tokio::test]
    async fn rename_to_own_handle_is_allowed_but_not_someone_elses() {
        let backend = Arc::new(MemoryBackend::new());
        let current = signed_in(&backend).await;
        backend.seed_profile("uid-other", "taken", "x@b.com").await;
        let service = service(&backend);

        assert!(service.rename(&current, "nova").await.is_ok());
        let result = service.rename(&current, "taken").await;
        assert!(matches!(result, Err(AuthError::HandleTaken(_))));
        let result = service.rename(&current, "   ").await;
        assert!(matches!(result, Err(AuthError::Validation(_))));
    }

    #[tokio::test]
    async fn rename_rejects_email_shaped_handles() {
        let backend = Arc::new(MemoryBackend::new());
        let current = signed_in(&backend).await;

        let err = service(&backend)
            .rename(&current, " other@x.com ")
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), HANDLE_IS_EMAIL_MESSAGE);
        assert!(backend.calls().await.is_empty());

        let completed = LoginService::new(backend.clone(), backend.clone(), AuthConfig::new())
            .login("nova", &secret("hunter22"))
            .await
            .unwrap();
        assert_eq!(completed.handle, "nova");
    }

    #[tokio::test]
    async fn short_secret_never_reaches_provider() {
        let backend = Arc::new(MemoryBackend::new());
        let current = signed_in(&backend).await;

        let err = service(&backend)
            .change_secret(&current, &secret(" abc12 "))
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), SECRET_TOO_SHORT_MESSAGE);
        assert!(backend.calls().await.is_empty());
    }

    #[tokio::test]
    async fn change_secret_replaces_provider_secret() {
        let backend = Arc::new(MemoryBackend::new());
        let current = signed_in(&backend).await;

        let updated = service(&backend)
            .change_secret(&current, &secret("new-secret"))
            .await
            .unwrap();
        assert_eq!(updated.handle, "nova");
        assert!(backend.secret_matches(&current.session.user_id, "new-secret").await);
    }

    #[tokio::test]
    async fn avatar_upload_stores_object_and_updates_profile() {
        let backend = Arc::new(MemoryBackend::new());
        let current = signed_in(&backend).await;
        let path = avatar_path(&current.session.user_id);

        let updated = service(&backend)
            .upload_avatar(&current, vec![0x89, b'P', b'N', b'G'], "image/png")
            .await
            .unwrap();
        assert_eq!(updated.session.avatar_url, Some(format!("memory://{path}")));
        assert_eq!(
            backend.object(&path).await.map(|(_, content_type)| content_type),
            Some("image/png".to_string())
        );

        let records = backend.records().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].handle, "nova");
        assert_eq!(records[0].avatar_url, updated.session.avatar_url);
    }

    #[tokio::test]
    async fn avatar_upload_failure_is_an_upload_error() {
        let backend = Arc::new(MemoryBackend::new());
        let current = signed_in(&backend).await;
        backend.fail(Failure::Upload).await;

        let err = service(&backend)
            .upload_avatar(&current, vec![1, 2, 3], "image/jpeg")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Upload(_)));
        assert_eq!(
            err.user_message(),
            "Error updating profile picture. Please try again."
        );
        assert!(!backend
            .calls()
            .await
            .iter()
            .any(|call| matches!(call, Call::UpdateProfile { .. })));
    }

    #[tokio::test]
    async fn sign_out_reaches_provider() {
        let backend = Arc::new(MemoryBackend::new());
        let current = signed_in(&backend).await;

        service(&backend).sign_out(&current).await.unwrap();
        assert_eq!(
            backend.calls().await,
            vec![Call::SignOut {
                user_id: current.session.user_id.clone()
            }]
        );
    }
}
