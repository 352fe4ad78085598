use super::{
    is_email_shaped, AuthConfig, AuthError, FederatedLogin, LoginService, HANDLE_IS_EMAIL_MESSAGE,
};
use crate::backend::{
    DocumentStore, FederatedToken, IdentityProvider, ProfileField, ProfileRecord, ProfileUpdate,
    Session,
};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

pub const VERIFICATION_SENT_MESSAGE: &str = "Verification email sent! Please check your inbox.";

/// Registration form as submitted.
#[derive(Clone, Debug)]
pub struct SignupRequest {
    pub handle: String,
    pub email: String,
    pub secret: SecretString,
    pub confirmation: SecretString,
}

/// A created, still unverified account and the delay before the caller should
/// move on to the login view.
#[derive(Clone, Debug)]
pub struct SignupOutcome {
    pub session: Session,
    pub redirect_after: Duration,
}

#[derive(Clone)]
pub struct SignupService {
    provider: Arc<dyn IdentityProvider>,
    store: Arc<dyn DocumentStore>,
    login: LoginService,
    config: AuthConfig,
}

impl SignupService {
    #[must_use]
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        store: Arc<dyn DocumentStore>,
        config: AuthConfig,
    ) -> Self {
        Self {
            login: LoginService::new(provider.clone(), store.clone(), config.clone()),
            provider,
            store,
            config,
        }
    }

    fn validate(request: &SignupRequest) -> Result<(), AuthError> {
        if request.handle.trim().is_empty()
            || request.email.trim().is_empty()
            || request.secret.expose_secret().is_empty()
        {
            return Err(AuthError::Validation("All fields are required.".to_string()));
        }
        if is_email_shaped(request.handle.trim()) {
            return Err(AuthError::Validation(HANDLE_IS_EMAIL_MESSAGE.to_string()));
        }
        if request.secret.expose_secret() != request.confirmation.expose_secret() {
            return Err(AuthError::Validation("Passwords do not match.".to_string()));
        }
        Ok(())
    }

    /// Register an email/secret account, name it, store its profile record and
    /// send the first verification email.
    ///
    /// The handle uniqueness check and the record write are separate calls, so
    /// two concurrent signups can still claim the same handle.
    ///
    /// # Errors
    /// - [`AuthError::Validation`] before any collaborator call
    /// - [`AuthError::HandleTaken`] before the account is created
    /// - [`AuthError::Signup`] when the provider refuses the account
    /// - [`AuthError::ProfileUpdate`], [`AuthError::ProfileWrite`] or
    ///   [`AuthError::Delivery`] for the follow-up steps
    #[instrument(skip_all)]
    pub async fn signup(&self, request: &SignupRequest) -> Result<SignupOutcome, AuthError> {
        Self::validate(request)?;
        let handle = request.handle.trim();
        let email = request.email.trim();

        let existing = self
            .store
            .find_one_where(self.config.collection(), ProfileField::Handle, handle)
            .await
            .map_err(AuthError::Lookup)?;
        if existing.is_some() {
            return Err(AuthError::HandleTaken(handle.to_string()));
        }

        let session = self
            .provider
            .create_account(email, &request.secret)
            .await
            .map_err(AuthError::Signup)?;

        let session = self
            .provider
            .update_profile(&session, &ProfileUpdate::display_name(handle))
            .await
            .map_err(AuthError::ProfileUpdate)?;

        let record = ProfileRecord {
            user_id: session.user_id.clone(),
            handle: handle.to_string(),
            email: session.email.clone(),
            avatar_url: None,
        };
        self.store
            .put(self.config.collection(), &record, &session)
            .await
            .map_err(AuthError::ProfileWrite)?;

        self.provider
            .send_verification_email(&session)
            .await
            .map_err(AuthError::Delivery)?;

        info!(user_id = %session.user_id, "account created, verification pending");
        Ok(SignupOutcome {
            session,
            redirect_after: self.config.signup_redirect_delay(),
        })
    }

    /// Sign up (or in) with a federated provider. First-time users get a
    /// profile record named after the provider display name.
    ///
    /// # Errors
    /// Same as [`LoginService::login_federated`], plus
    /// [`AuthError::ProfileWrite`] when the new record cannot be stored.
    #[instrument(skip_all, fields(provider_id = %token.provider_id))]
    pub async fn signup_federated(&self, token: &FederatedToken) -> Result<FederatedLogin, AuthError> {
        let federated = self
            .provider
            .authenticate_federated(token)
            .await
            .map_err(AuthError::Federated)?;

        if federated.is_new_user {
            let session = &federated.session;
            let handle = session
                .display_name
                .clone()
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| self.config.federated_fallback_handle().to_string());
            let record = ProfileRecord {
                user_id: session.user_id.clone(),
                handle,
                email: session.email.clone(),
                avatar_url: None,
            };
            self.store
                .put(self.config.collection(), &record, session)
                .await
                .map_err(AuthError::ProfileWrite)?;
        }

        self.login.finish_federated(federated).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::backend::memory::{Call, Failure, MemoryBackend};

    fn service(backend: &Arc<MemoryBackend>) -> SignupService {
        SignupService::new(backend.clone(), backend.clone(), AuthConfig::new())
    }

    fn request(handle: &str, secret: &str, confirmation: &str) -> SignupRequest {
        SignupRequest {
            handle: handle.to_string(),
            email: "a@b.com".to_string(),
            secret: SecretString::from(secret.to_string()),
            confirmation: SecretString::from(confirmation.to_string()),
        }
    }

    #[tokio::test]
    async fn mismatched_confirmation_never_calls_collaborators() {
        let backend = Arc::new(MemoryBackend::new());
        let err = service(&backend)
            .signup(&request("nova", "hunter22", "hunter23"))
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "Passwords do not match.");
        assert!(backend.calls().await.is_empty());
    }

    #[tokio::test]
    async fn email_shaped_handle_is_rejected() {
        let backend = Arc::new(MemoryBackend::new());
        let result = service(&backend)
            .signup(&request("nova@b.com", "hunter22", "hunter22"))
            .await;
        assert!(matches!(result, Err(AuthError::Validation(_))));
    }

    #[tokio::test]
    async fn signup_writes_one_record_and_sends_verification() {
        let backend = Arc::new(MemoryBackend::new());
        let outcome = service(&backend)
            .signup(&request(" nova ", "hunter22", "hunter22"))
            .await
            .unwrap();

        assert_eq!(outcome.redirect_after, Duration::from_millis(2000));
        assert_eq!(outcome.session.display_name.as_deref(), Some("nova"));
        let records = backend.records().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].handle, "nova");
        assert_eq!(records[0].user_id, outcome.session.user_id);

        let calls = backend.calls().await;
        assert!(matches!(calls[0], Call::FindOneWhere { .. }));
        assert!(matches!(calls[1], Call::CreateAccount { .. }));
        assert!(matches!(calls[2], Call::UpdateProfile { .. }));
        assert!(matches!(calls[3], Call::Put { .. }));
        assert!(matches!(calls[4], Call::SendVerification { .. }));
    }

    #[tokio::test]
    async fn taken_handle_blocks_account_creation() {
        let backend = Arc::new(MemoryBackend::new());
        backend.seed_profile("uid-0", "nova", "other@b.com").await;

        let result = service(&backend)
            .signup(&request("nova", "hunter22", "hunter22"))
            .await;
        assert!(matches!(result, Err(AuthError::HandleTaken(_))));
        assert!(!backend
            .calls()
            .await
            .iter()
            .any(|call| matches!(call, Call::CreateAccount { .. })));
    }

    #[tokio::test]
    async fn provider_policy_rejection_surfaces_as_signup_error() {
        let backend = Arc::new(MemoryBackend::new());
        let err = service(&backend)
            .signup(&request("nova", "abc", "abc"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Signup(_)));
        assert_eq!(err.user_message(), "Password must be at least 6 characters long.");
        assert!(backend.records().await.is_empty());
    }

    #[tokio::test]
    async fn federated_signup_records_new_users_only() {
        let backend = Arc::new(MemoryBackend::new());
        backend
            .seed_federated("google.com", "tok", "g@b.com", Some("Gi-hun"), true)
            .await;
        let token = FederatedToken::new("google.com", SecretString::from("tok".to_string()));
        let service = service(&backend);

        let first = service.signup_federated(&token).await.unwrap();
        assert!(first.is_new_user);
        assert!(!first.verification_sent);
        assert_eq!(first.completed.handle, "Gi-hun");

        let second = service.signup_federated(&token).await.unwrap();
        assert!(!second.is_new_user);
        assert_eq!(backend.records().await.len(), 1);
    }

    #[tokio::test]
    async fn federated_signup_write_failure_is_reported() {
        let backend = Arc::new(MemoryBackend::new());
        backend
            .seed_federated("google.com", "tok", "g@b.com", None, true)
            .await;
        backend.fail(Failure::StoreWrite).await;

        let result = service(&backend)
            .signup_federated(&FederatedToken::new(
                "google.com",
                SecretString::from("tok".to_string()),
            ))
            .await;
        assert!(matches!(result, Err(AuthError::ProfileWrite(_))));
    }
}
