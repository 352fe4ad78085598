//! In-process backend implementing all three collaborator traits.
//!
//! Used by the test suites to observe exactly which collaborator calls a flow
//! makes, in which order, and to inject failures. Accounts, profile records and
//! objects live behind one `tokio::sync::Mutex`.

use super::{
    BackendError, DocumentStore, FederatedSession, FederatedToken, IdentityProvider,
    ObjectStorage, ProfileField, ProfileRecord, ProfileUpdate, ProviderError, Session,
};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

/// Minimum secret length enforced by the in-memory provider.
const MIN_SECRET_LEN: usize = 6;

/// One collaborator call, recorded in order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    FindOneWhere { field: ProfileField, value: String },
    Put { user_id: String },
    Authenticate { email: String },
    AuthenticateFederated { provider_id: String },
    CreateAccount { email: String },
    SendVerification { user_id: String },
    UpdateProfile { user_id: String, update: ProfileUpdate },
    ChangeSecret { user_id: String },
    SignOut { user_id: String },
    Upload { path: String },
    PublicUrl { path: String },
}

/// Failure switches; an enabled switch fails every matching call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Failure {
    StoreRead,
    StoreWrite,
    Delivery,
    ProfileUpdate,
    Upload,
    Federated,
}

struct Account {
    user_id: String,
    email: String,
    secret: SecretString,
    email_verified: bool,
    display_name: Option<String>,
    avatar_url: Option<String>,
    disabled: bool,
}

struct FederatedIdentity {
    email: String,
    display_name: Option<String>,
    email_verified: bool,
}

#[derive(Default)]
struct State {
    accounts: Vec<Account>,
    federated: HashMap<String, FederatedIdentity>,
    records: Vec<(String, ProfileRecord)>,
    objects: HashMap<String, (Vec<u8>, String)>,
    failures: HashSet<Failure>,
    calls: Vec<Call>,
}

impl State {
    fn session_for(&self, user_id: &str) -> Option<Session> {
        self.accounts
            .iter()
            .find(|account| account.user_id == user_id)
            .map(|account| Session {
                user_id: account.user_id.clone(),
                email: account.email.clone(),
                email_verified: account.email_verified,
                display_name: account.display_name.clone(),
                avatar_url: account.avatar_url.clone(),
                credential: SecretString::from(format!("mem-token-{}", Uuid::new_v4())),
            })
    }

    fn account_mut(&mut self, user_id: &str) -> Result<&mut Account, ProviderError> {
        self.accounts
            .iter_mut()
            .find(|account| account.user_id == user_id)
            .ok_or(ProviderError::SessionExpired)
    }

    fn fails(&self, failure: Failure) -> bool {
        self.failures.contains(&failure)
    }
}

#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<State>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an email/secret account and return its user id.
    pub async fn seed_account(&self, email: &str, secret: &str, email_verified: bool) -> String {
        let user_id = Uuid::new_v4().to_string();
        self.state.lock().await.accounts.push(Account {
            user_id: user_id.clone(),
            email: email.to_string(),
            secret: SecretString::from(secret.to_string()),
            email_verified,
            display_name: None,
            avatar_url: None,
            disabled: false,
        });
        user_id
    }

    /// Store a profile record; records keep insertion order.
    pub async fn seed_profile(&self, user_id: &str, handle: &str, email: &str) {
        self.state.lock().await.records.push((
            super::USERS_COLLECTION.to_string(),
            ProfileRecord {
                user_id: user_id.to_string(),
                handle: handle.to_string(),
                email: email.to_string(),
                avatar_url: None,
            },
        ));
    }

    /// Make `id_token` from `provider_id` resolve to the given identity.
    pub async fn seed_federated(
        &self,
        provider_id: &str,
        id_token: &str,
        email: &str,
        display_name: Option<&str>,
        email_verified: bool,
    ) {
        self.state.lock().await.federated.insert(
            format!("{provider_id}:{id_token}"),
            FederatedIdentity {
                email: email.to_string(),
                display_name: display_name.map(ToString::to_string),
                email_verified,
            },
        );
    }

    pub async fn set_display_name(&self, user_id: &str, display_name: &str) {
        if let Ok(account) = self.state.lock().await.account_mut(user_id) {
            account.display_name = Some(display_name.to_string());
        }
    }

    pub async fn disable_account(&self, user_id: &str) {
        if let Ok(account) = self.state.lock().await.account_mut(user_id) {
            account.disabled = true;
        }
    }

    pub async fn fail(&self, failure: Failure) {
        self.state.lock().await.failures.insert(failure);
    }

    pub async fn calls(&self) -> Vec<Call> {
        self.state.lock().await.calls.clone()
    }

    pub async fn clear_calls(&self) {
        self.state.lock().await.calls.clear();
    }

    pub async fn records(&self) -> Vec<ProfileRecord> {
        self.state
            .lock()
            .await
            .records
            .iter()
            .map(|(_, record)| record.clone())
            .collect()
    }

    pub async fn object(&self, path: &str) -> Option<(Vec<u8>, String)> {
        self.state.lock().await.objects.get(path).cloned()
    }

    /// Current secret check, for asserting secret changes.
    pub async fn secret_matches(&self, user_id: &str, secret: &str) -> bool {
        self.state
            .lock()
            .await
            .accounts
            .iter()
            .any(|account| account.user_id == user_id && account.secret.expose_secret() == secret)
    }
}

#[async_trait]
impl IdentityProvider for MemoryBackend {
    async fn authenticate_with_password(
        &self,
        email: &str,
        secret: &SecretString,
    ) -> Result<Session, ProviderError> {
        let mut state = self.state.lock().await;
        state.calls.push(Call::Authenticate {
            email: email.to_string(),
        });

        let user_id = state
            .accounts
            .iter()
            .find(|account| {
                account.email == email
                    && !account.disabled
                    && account.secret.expose_secret() == secret.expose_secret()
            })
            .map(|account| account.user_id.clone())
            .ok_or(ProviderError::InvalidCredentials)?;

        debug!(user_id = %user_id, "memory provider authenticated");
        state
            .session_for(&user_id)
            .ok_or(ProviderError::InvalidCredentials)
    }

    async fn authenticate_federated(
        &self,
        token: &FederatedToken,
    ) -> Result<FederatedSession, ProviderError> {
        let mut state = self.state.lock().await;
        state.calls.push(Call::AuthenticateFederated {
            provider_id: token.provider_id.clone(),
        });
        if state.fails(Failure::Federated) {
            return Err(ProviderError::Federated("popup closed".to_string()));
        }

        let key = format!("{}:{}", token.provider_id, token.id_token.expose_secret());
        let (email, display_name, email_verified) = state
            .federated
            .get(&key)
            .map(|identity| {
                (
                    identity.email.clone(),
                    identity.display_name.clone(),
                    identity.email_verified,
                )
            })
            .ok_or_else(|| ProviderError::Federated("unknown token".to_string()))?;

        let existing = state
            .accounts
            .iter()
            .find(|account| account.email == email)
            .map(|account| account.user_id.clone());

        let is_new_user = existing.is_none();
        let user_id = if let Some(user_id) = existing {
            user_id
        } else {
            let user_id = Uuid::new_v4().to_string();
            state.accounts.push(Account {
                user_id: user_id.clone(),
                email,
                secret: SecretString::from(String::new()),
                email_verified,
                display_name,
                avatar_url: None,
                disabled: false,
            });
            user_id
        };

        let session = state
            .session_for(&user_id)
            .ok_or_else(|| ProviderError::Federated("account vanished".to_string()))?;
        Ok(FederatedSession {
            session,
            is_new_user,
        })
    }

    async fn create_account(
        &self,
        email: &str,
        secret: &SecretString,
    ) -> Result<Session, ProviderError> {
        let mut state = self.state.lock().await;
        state.calls.push(Call::CreateAccount {
            email: email.to_string(),
        });

        if !email.contains('@') {
            return Err(ProviderError::InvalidEmail);
        }
        if secret.expose_secret().len() < MIN_SECRET_LEN {
            return Err(ProviderError::Policy(
                "Password should be at least 6 characters".to_string(),
            ));
        }
        if state.accounts.iter().any(|account| account.email == email) {
            return Err(ProviderError::EmailInUse);
        }

        let user_id = Uuid::new_v4().to_string();
        state.accounts.push(Account {
            user_id: user_id.clone(),
            email: email.to_string(),
            secret: secret.clone(),
            email_verified: false,
            display_name: None,
            avatar_url: None,
            disabled: false,
        });
        state
            .session_for(&user_id)
            .ok_or(ProviderError::SessionExpired)
    }

    async fn send_verification_email(&self, session: &Session) -> Result<(), ProviderError> {
        let mut state = self.state.lock().await;
        state.calls.push(Call::SendVerification {
            user_id: session.user_id.clone(),
        });
        if state.fails(Failure::Delivery) {
            return Err(ProviderError::Rejected {
                status: 503,
                message: "mailer unavailable".to_string(),
            });
        }
        Ok(())
    }

    async fn update_profile(
        &self,
        session: &Session,
        update: &ProfileUpdate,
    ) -> Result<Session, ProviderError> {
        let mut state = self.state.lock().await;
        state.calls.push(Call::UpdateProfile {
            user_id: session.user_id.clone(),
            update: update.clone(),
        });
        if state.fails(Failure::ProfileUpdate) {
            return Err(ProviderError::Rejected {
                status: 500,
                message: "profile update failed".to_string(),
            });
        }

        let account = state.account_mut(&session.user_id)?;
        if let Some(name) = &update.display_name {
            account.display_name = Some(name.clone());
        }
        if let Some(url) = &update.avatar_url {
            account.avatar_url = Some(url.clone());
        }

        let mut refreshed = session.clone();
        refreshed.display_name = account.display_name.clone();
        refreshed.avatar_url = account.avatar_url.clone();
        Ok(refreshed)
    }

    async fn change_secret(
        &self,
        session: &Session,
        new_secret: &SecretString,
    ) -> Result<Session, ProviderError> {
        let mut state = self.state.lock().await;
        state.calls.push(Call::ChangeSecret {
            user_id: session.user_id.clone(),
        });
        if new_secret.expose_secret().len() < MIN_SECRET_LEN {
            return Err(ProviderError::Policy(
                "Password should be at least 6 characters".to_string(),
            ));
        }

        state.account_mut(&session.user_id)?.secret = new_secret.clone();
        state
            .session_for(&session.user_id)
            .ok_or(ProviderError::SessionExpired)
    }

    async fn sign_out(&self, session: &Session) -> Result<(), ProviderError> {
        self.state.lock().await.calls.push(Call::SignOut {
            user_id: session.user_id.clone(),
        });
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryBackend {
    async fn find_one_where(
        &self,
        collection: &str,
        field: ProfileField,
        value: &str,
    ) -> Result<Option<ProfileRecord>, BackendError> {
        let mut state = self.state.lock().await;
        state.calls.push(Call::FindOneWhere {
            field,
            value: value.to_string(),
        });
        if state.fails(Failure::StoreRead) {
            return Err(BackendError::Transport("store unreachable".to_string()));
        }

        Ok(state
            .records
            .iter()
            .filter(|(name, _)| name == collection)
            .map(|(_, record)| record)
            .find(|record| match field {
                ProfileField::Handle => record.handle == value,
                ProfileField::Email => record.email == value,
            })
            .cloned())
    }

    async fn put(
        &self,
        collection: &str,
        record: &ProfileRecord,
        session: &Session,
    ) -> Result<(), BackendError> {
        let mut state = self.state.lock().await;
        state.calls.push(Call::Put {
            user_id: record.user_id.clone(),
        });
        if state.fails(Failure::StoreWrite) {
            return Err(BackendError::Rejected {
                status: 403,
                message: "permission denied".to_string(),
            });
        }
        if session.user_id != record.user_id {
            return Err(BackendError::Rejected {
                status: 403,
                message: "record belongs to another user".to_string(),
            });
        }

        let position = state
            .records
            .iter()
            .position(|(name, existing)| name == collection && existing.user_id == record.user_id);
        match position {
            Some(index) => state.records[index].1 = record.clone(),
            None => state.records.push((collection.to_string(), record.clone())),
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStorage for MemoryBackend {
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        _session: &Session,
    ) -> Result<(), BackendError> {
        let mut state = self.state.lock().await;
        state.calls.push(Call::Upload {
            path: path.to_string(),
        });
        if state.fails(Failure::Upload) {
            return Err(BackendError::Rejected {
                status: 413,
                message: "object too large".to_string(),
            });
        }
        state
            .objects
            .insert(path.to_string(), (bytes, content_type.to_string()));
        Ok(())
    }

    async fn public_url(&self, path: &str, _session: &Session) -> Result<String, BackendError> {
        let mut state = self.state.lock().await;
        state.calls.push(Call::PublicUrl {
            path: path.to_string(),
        });
        if state.objects.contains_key(path) {
            Ok(format!("memory://{path}"))
        } else {
            Err(BackendError::Rejected {
                status: 404,
                message: format!("no object at {path}"),
            })
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn secret(value: &str) -> SecretString {
        SecretString::from(value.to_string())
    }

    #[tokio::test]
    async fn authenticate_rejects_wrong_secret_and_disabled_accounts() {
        let backend = MemoryBackend::new();
        let user_id = backend.seed_account("a@b.com", "hunter22", true).await;

        assert!(matches!(
            backend
                .authenticate_with_password("a@b.com", &secret("wrong-secret"))
                .await,
            Err(ProviderError::InvalidCredentials)
        ));

        let session = backend
            .authenticate_with_password("a@b.com", &secret("hunter22"))
            .await
            .unwrap();
        assert_eq!(session.user_id, user_id);

        backend.disable_account(&user_id).await;
        assert!(matches!(
            backend
                .authenticate_with_password("a@b.com", &secret("hunter22"))
                .await,
            Err(ProviderError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn find_one_where_returns_first_match() {
        let backend = MemoryBackend::new();
        backend.seed_profile("uid-1", "nova", "first@b.com").await;
        backend.seed_profile("uid-2", "nova", "second@b.com").await;

        let record = backend
            .find_one_where(crate::backend::USERS_COLLECTION, ProfileField::Handle, "nova")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.email, "first@b.com");

        let missing = backend
            .find_one_where(crate::backend::USERS_COLLECTION, ProfileField::Handle, "Nova")
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn federated_sign_in_flags_new_users_once() {
        let backend = MemoryBackend::new();
        backend
            .seed_federated("google.com", "tok", "g@b.com", Some("Gee"), true)
            .await;
        let token = FederatedToken::new("google.com", secret("tok"));

        let first = backend.authenticate_federated(&token).await.unwrap();
        assert!(first.is_new_user);
        assert_eq!(first.session.display_name.as_deref(), Some("Gee"));

        let second = backend.authenticate_federated(&token).await.unwrap();
        assert!(!second.is_new_user);
        assert_eq!(second.session.user_id, first.session.user_id);
    }
}
