use super::{AuthConfig, AuthError, Identifier, IdentifierResolver};
use crate::backend::{
    DocumentStore, FederatedSession, FederatedToken, IdentityProvider, ProviderError, Session,
};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// A verified session together with the handle shown to the user.
#[derive(Clone, Debug)]
pub struct CompletedSession {
    pub session: Session,
    pub handle: String,
}

impl CompletedSession {
    /// Pick the first non-empty of profile handle, provider display name and
    /// `fallback`.
    #[must_use]
    pub fn new(session: Session, profile_handle: Option<String>, fallback: &str) -> Self {
        let handle = profile_handle
            .filter(|handle| !handle.trim().is_empty())
            .or_else(|| {
                session
                    .display_name
                    .clone()
                    .filter(|name| !name.trim().is_empty())
            })
            .unwrap_or_else(|| fallback.to_string());
        Self { session, handle }
    }
}

/// Outcome of a federated login; unverified accounts get a verification email
/// instead of being blocked.
#[derive(Clone, Debug)]
pub struct FederatedLogin {
    pub completed: CompletedSession,
    pub is_new_user: bool,
    pub verification_sent: bool,
}

#[derive(Clone)]
pub struct LoginService {
    provider: Arc<dyn IdentityProvider>,
    resolver: IdentifierResolver,
    config: AuthConfig,
}

impl LoginService {
    #[must_use]
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        store: Arc<dyn DocumentStore>,
        config: AuthConfig,
    ) -> Self {
        Self {
            resolver: IdentifierResolver::new(store, config.collection()),
            provider,
            config,
        }
    }

    /// Log in with an email or handle and a secret.
    ///
    /// # Errors
    /// - [`AuthError::Validation`] for empty input, before any collaborator call
    /// - [`AuthError::IdentifierNotFound`] for an unknown handle
    /// - [`AuthError::InvalidCredentials`] for any provider rejection
    /// - [`AuthError::EmailUnverified`] for an unverified account
    /// - [`AuthError::Lookup`] when the profile store cannot be read
    #[instrument(skip_all)]
    pub async fn login(
        &self,
        identifier: &str,
        secret: &SecretString,
    ) -> Result<CompletedSession, AuthError> {
        if identifier.trim().is_empty() || secret.expose_secret().is_empty() {
            return Err(AuthError::Validation(
                "Please enter your email or username and password.".to_string(),
            ));
        }

        let identifier = Identifier::classify(identifier);
        let resolution = self.resolver.resolve(&identifier).await?;

        let session = self
            .provider
            .authenticate_with_password(&resolution.email, secret)
            .await
            .map_err(|err| {
                warn!(error = %err, "password authentication rejected");
                AuthError::InvalidCredentials
            })?;

        if !session.email_verified {
            info!(user_id = %session.user_id, "login blocked until email is verified");
            return Err(AuthError::EmailUnverified {
                session: Box::new(session),
            });
        }

        let handle = match resolution.handle {
            Some(handle) => Some(handle),
            None => self.resolver.handle_for_email(&resolution.email).await?,
        };

        let completed =
            CompletedSession::new(session, handle, self.config.password_fallback_handle());
        info!(user_id = %completed.session.user_id, "login completed");
        Ok(completed)
    }

    /// Log in with a token from a federated provider.
    ///
    /// # Errors
    /// [`AuthError::Federated`] when the provider rejects the token,
    /// [`AuthError::Lookup`] when enrichment fails and [`AuthError::Delivery`]
    /// when the automatic verification email cannot be sent.
    #[instrument(skip_all, fields(provider_id = %token.provider_id))]
    pub async fn login_federated(&self, token: &FederatedToken) -> Result<FederatedLogin, AuthError> {
        let federated = self
            .provider
            .authenticate_federated(token)
            .await
            .map_err(AuthError::Federated)?;
        self.finish_federated(federated).await
    }

    /// Enrich a federated session and send a verification email when the
    /// provider has not verified the address yet.
    pub(crate) async fn finish_federated(
        &self,
        federated: FederatedSession,
    ) -> Result<FederatedLogin, AuthError> {
        let FederatedSession {
            session,
            is_new_user,
        } = federated;

        let handle = self.resolver.handle_for_email(&session.email).await?;

        let verification_sent = if session.email_verified {
            false
        } else {
            self.provider
                .send_verification_email(&session)
                .await
                .map_err(AuthError::Delivery)?;
            true
        };

        let completed =
            CompletedSession::new(session, handle, self.config.federated_fallback_handle());
        info!(
            user_id = %completed.session.user_id,
            is_new_user,
            verification_sent,
            "federated login completed"
        );
        Ok(FederatedLogin {
            completed,
            is_new_user,
            verification_sent,
        })
    }

    /// Send another verification email for a session that was stopped by
    /// [`AuthError::EmailUnverified`].
    ///
    /// # Errors
    /// [`AuthError::Delivery`] when the provider cannot send the email.
    #[instrument(skip_all, fields(user_id = %session.user_id))]
    pub async fn resend_verification(&self, session: &Session) -> Result<(), AuthError> {
        self.provider
            .send_verification_email(session)
            .await
            .map_err(|err: ProviderError| {
                warn!(error = %err, "verification email not sent");
                AuthError::Delivery(err)
            })
    }
}
