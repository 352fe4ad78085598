//! REST adapters for a Firebase-compatible backend: the Identity Toolkit for
//! accounts and sessions, Firestore for profile records and Cloud Storage for
//! avatars. Base URLs are configurable so the local emulator suite can be
//! targeted. The API key is public project configuration but is still kept in a
//! `SecretString` so it never ends up in logs.

pub mod auth;
pub mod firestore;
pub mod storage;

pub use auth::IdentityToolkit;
pub use firestore::Firestore;
pub use storage::CloudStorage;

use reqwest::{Client, Response};
use secrecy::SecretString;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_AUTH_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";
pub const DEFAULT_FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com/v1";
pub const DEFAULT_STORAGE_BASE_URL: &str = "https://firebasestorage.googleapis.com/v0";

/// Request timeout applied to every backend call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
/// Maximum number of error body characters kept in error messages.
const MAX_ERROR_CHARS: usize = 200;

#[derive(Clone)]
pub struct FirebaseConfig {
    pub api_key: SecretString,
    pub project_id: String,
    pub storage_bucket: Option<String>,
    pub auth_base_url: String,
    pub firestore_base_url: String,
    pub storage_base_url: String,
}

impl FirebaseConfig {
    #[must_use]
    pub fn new(api_key: SecretString, project_id: impl Into<String>) -> Self {
        Self {
            api_key,
            project_id: project_id.into(),
            storage_bucket: None,
            auth_base_url: DEFAULT_AUTH_BASE_URL.to_string(),
            firestore_base_url: DEFAULT_FIRESTORE_BASE_URL.to_string(),
            storage_base_url: DEFAULT_STORAGE_BASE_URL.to_string(),
        }
    }

    #[must_use]
    pub fn with_storage_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.storage_bucket = Some(bucket.into());
        self
    }

    #[must_use]
    pub fn with_auth_base_url(mut self, url: impl Into<String>) -> Self {
        self.auth_base_url = url.into();
        self
    }

    #[must_use]
    pub fn with_firestore_base_url(mut self, url: impl Into<String>) -> Self {
        self.firestore_base_url = url.into();
        self
    }

    #[must_use]
    pub fn with_storage_base_url(mut self, url: impl Into<String>) -> Self {
        self.storage_base_url = url.into();
        self
    }
}

impl std::fmt::Debug for FirebaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirebaseConfig")
            .field("api_key", &"***")
            .field("project_id", &self.project_id)
            .field("storage_bucket", &self.storage_bucket)
            .field("auth_base_url", &self.auth_base_url)
            .field("firestore_base_url", &self.firestore_base_url)
            .field("storage_base_url", &self.storage_base_url)
            .finish()
    }
}

fn http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(crate::APP_USER_AGENT)
        .timeout(REQUEST_TIMEOUT)
        .build()
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Extract status and error message from a failed response.
async fn error_parts(response: Response) -> (u16, String) {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorEnvelope>(&body).map_or_else(
        |_| body.chars().take(MAX_ERROR_CHARS).collect(),
        |envelope| envelope.error.message,
    );
    (status, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_debug_hides_api_key() {
        let config = FirebaseConfig::new(SecretString::from("AIza-secret".to_string()), "demo")
            .with_storage_bucket("demo.appspot.com");
        let debug = format!("{config:?}");
        assert!(debug.contains("demo.appspot.com"));
        assert!(!debug.contains("AIza-secret"));
    }

    #[test]
    fn config_defaults_point_at_public_endpoints() {
        let config = FirebaseConfig::new(SecretString::from("key".to_string()), "demo");
        assert_eq!(config.auth_base_url, DEFAULT_AUTH_BASE_URL);
        assert_eq!(config.firestore_base_url, DEFAULT_FIRESTORE_BASE_URL);
        assert_eq!(config.storage_base_url, DEFAULT_STORAGE_BASE_URL);
        assert!(config.storage_bucket.is_none());
    }
}
