//! Firestore REST client implementing [`DocumentStore`] for profile records.
//!
//! Lookups use `:runQuery` with a single equality filter and `limit: 1`, so
//! duplicates resolve to whichever document Firestore orders first. Writes
//! replace the whole document under the user id and are authorized with the
//! caller's ID token.

use super::{error_parts, http_client, FirebaseConfig};
use crate::backend::{BackendError, DocumentStore, ProfileField, ProfileRecord, Session};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use tracing::{debug, instrument};
use url::Url;

const AVATAR_FIELD: &str = "avatarUrl";

#[derive(Deserialize)]
struct QueryItem {
    #[serde(default)]
    document: Option<Document>,
}

#[derive(Deserialize)]
struct Document {
    name: String,
    #[serde(default)]
    fields: HashMap<String, Value>,
}

fn string_field(fields: &HashMap<String, Value>, name: &str) -> Option<String> {
    fields
        .get(name)
        .and_then(|value| value.get("stringValue"))
        .and_then(Value::as_str)
        .map(ToString::to_string)
}

impl Document {
    fn into_record(self) -> Result<ProfileRecord, BackendError> {
        let user_id = self
            .name
            .rsplit('/')
            .next()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| BackendError::InvalidResponse(format!("bad document name {}", self.name)))?
            .to_string();

        let missing = |field: &str| {
            BackendError::InvalidResponse(format!("document {user_id} has no {field}"))
        };
        let handle = string_field(&self.fields, ProfileField::Handle.as_str())
            .ok_or_else(|| missing(ProfileField::Handle.as_str()))?;
        let email = string_field(&self.fields, ProfileField::Email.as_str())
            .ok_or_else(|| missing(ProfileField::Email.as_str()))?;

        Ok(ProfileRecord {
            avatar_url: string_field(&self.fields, AVATAR_FIELD),
            user_id,
            handle,
            email,
        })
    }
}

fn encode_record(record: &ProfileRecord) -> Value {
    let mut fields = Map::new();
    fields.insert(
        ProfileField::Handle.as_str().to_string(),
        json!({ "stringValue": record.handle }),
    );
    fields.insert(
        ProfileField::Email.as_str().to_string(),
        json!({ "stringValue": record.email }),
    );
    if let Some(url) = &record.avatar_url {
        fields.insert(AVATAR_FIELD.to_string(), json!({ "stringValue": url }));
    }
    json!({ "fields": fields })
}

#[derive(Clone, Debug)]
pub struct Firestore {
    config: FirebaseConfig,
    client: Client,
}

impl Firestore {
    /// Build a client for the configured project's default database.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: FirebaseConfig) -> Result<Self, BackendError> {
        Ok(Self {
            config,
            client: http_client()?,
        })
    }

    fn documents_url(&self, suffix: &str) -> Result<Url, BackendError> {
        let base = self.config.firestore_base_url.trim_end_matches('/');
        let mut url = Url::parse(&format!(
            "{base}/projects/{}/databases/(default)/documents{suffix}",
            self.config.project_id
        ))
        .map_err(|e| BackendError::Config(format!("invalid firestore endpoint: {e}")))?;
        url.query_pairs_mut()
            .append_pair("key", self.config.api_key.expose_secret());
        Ok(url)
    }
}

#[async_trait]
impl DocumentStore for Firestore {
    #[instrument(skip(self, value))]
    async fn find_one_where(
        &self,
        collection: &str,
        field: ProfileField,
        value: &str,
    ) -> Result<Option<ProfileRecord>, BackendError> {
        let url = self.documents_url(":runQuery")?;
        let query = json!({
            "structuredQuery": {
                "from": [{ "collectionId": collection }],
                "where": {
                    "fieldFilter": {
                        "field": { "fieldPath": field.as_str() },
                        "op": "EQUAL",
                        "value": { "stringValue": value }
                    }
                },
                "limit": 1
            }
        });

        let response = self.client.post(url).json(&query).send().await?;
        if !response.status().is_success() {
            let (status, message) = error_parts(response).await;
            return Err(BackendError::Rejected { status, message });
        }

        let items: Vec<QueryItem> = response.json().await?;
        let document = items.into_iter().find_map(|item| item.document);
        debug!(found = document.is_some(), "profile query finished");

        document.map(Document::into_record).transpose()
    }

    #[instrument(skip(self, record, session), fields(user_id = %record.user_id))]
    async fn put(
        &self,
        collection: &str,
        record: &ProfileRecord,
        session: &Session,
    ) -> Result<(), BackendError> {
        let mut url = self.documents_url("")?;
        url.path_segments_mut()
            .map_err(|()| BackendError::Config("firestore endpoint cannot be a base".to_string()))?
            .push(collection)
            .push(&record.user_id);

        let response = self
            .client
            .patch(url)
            .bearer_auth(session.credential.expose_secret())
            .json(&encode_record(record))
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, message) = error_parts(response).await;
            return Err(BackendError::Rejected { status, message });
        }
        Ok(())
    }
}
