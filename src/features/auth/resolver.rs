use super::{AuthError, Identifier};
use crate::backend::{DocumentStore, ProfileField};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Email to authenticate with, plus the handle when the lookup already found it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub email: String,
    pub handle: Option<String>,
}

/// Resolves handles to email addresses through the profile collection.
#[derive(Clone)]
pub struct IdentifierResolver {
    store: Arc<dyn DocumentStore>,
    collection: String,
}

impl IdentifierResolver {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    /// Email identifiers pass through untouched; handles cost one store read.
    ///
    /// # Errors
    /// [`AuthError::IdentifierNotFound`] when no record carries the handle and
    /// [`AuthError::Lookup`] when the store cannot be read.
    #[instrument(skip_all, fields(email_shaped = identifier.is_email()))]
    pub async fn resolve(&self, identifier: &Identifier) -> Result<Resolution, AuthError> {
        let handle = match identifier {
            Identifier::Email(email) => {
                return Ok(Resolution {
                    email: email.clone(),
                    handle: None,
                })
            }
            Identifier::Handle(handle) => handle,
        };

        let record = self
            .store
            .find_one_where(&self.collection, ProfileField::Handle, handle)
            .await
            .map_err(AuthError::Lookup)?
            .ok_or(AuthError::IdentifierNotFound)?;

        debug!("handle resolved");
        Ok(Resolution {
            email: record.email,
            handle: Some(record.handle),
        })
    }

    /// Handle stored for `email`, if any record carries it.
    ///
    /// # Errors
    /// [`AuthError::Lookup`] when the store cannot be read.
    #[instrument(skip_all)]
    pub async fn handle_for_email(&self, email: &str) -> Result<Option<String>, AuthError> {
        let record = self
            .store
            .find_one_where(&self.collection, ProfileField::Email, email)
            .await
            .map_err(AuthError::Lookup)?;
        debug!(found = record.is_some(), "enrichment lookup finished");
        Ok(record.map(|record| record.handle))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::backend::memory::{Call, Failure, MemoryBackend};
    use crate::backend::USERS_COLLECTION;

    fn resolver(backend: &Arc<MemoryBackend>) -> IdentifierResolver {
        IdentifierResolver::new(backend.clone(), USERS_COLLECTION)
    }

    #[tokio::test]
    async fn email_resolves_without_store_reads() {
        let backend = Arc::new(MemoryBackend::new());
        let resolution = resolver(&backend)
            .resolve(&Identifier::classify("a@b.com"))
            .await
            .unwrap();
        assert_eq!(resolution.email, "a@b.com");
        assert!(resolution.handle.is_none());
        assert!(backend.calls().await.is_empty());
    }

    #[tokio::test]
    async fn handle_resolves_to_first_matching_record() {
        let backend = Arc::new(MemoryBackend::new());
        backend.seed_profile("uid-1", "nova", "first@b.com").await;
        backend.seed_profile("uid-2", "nova", "second@b.com").await;

        let resolution = resolver(&backend)
            .resolve(&Identifier::classify("nova"))
            .await
            .unwrap();
        assert_eq!(resolution.email, "first@b.com");
        assert_eq!(resolution.handle.as_deref(), Some("nova"));
        assert_eq!(
            backend.calls().await,
            vec![Call::FindOneWhere {
                field: ProfileField::Handle,
                value: "nova".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn handle_match_is_case_sensitive() {
        let backend = Arc::new(MemoryBackend::new());
        backend.seed_profile("uid-1", "nova", "a@b.com").await;

        let result = resolver(&backend)
            .resolve(&Identifier::classify("Nova"))
            .await;
        assert!(matches!(result, Err(AuthError::IdentifierNotFound)));
    }

    #[tokio::test]
    async fn store_failure_is_a_lookup_error() {
        let backend = Arc::new(MemoryBackend::new());
        backend.fail(Failure::StoreRead).await;

        let result = resolver(&backend).handle_for_email("a@b.com").await;
        assert!(matches!(result, Err(AuthError::Lookup(_))));
    }
}
