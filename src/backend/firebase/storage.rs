//! Cloud Storage client implementing [`ObjectStorage`] for profile pictures.
//! Objects are addressed as a single percent-encoded path segment under
//! `/b/{bucket}/o/`, and public URLs embed the object's download token.

use super::{error_parts, http_client, FirebaseConfig};
use crate::backend::{BackendError, ObjectStorage, Session};
use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client};
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::instrument;
use url::Url;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectMetadata {
    #[serde(default)]
    download_tokens: Option<String>,
}

fn validate_path(path: &str) -> Result<(), BackendError> {
    if path.is_empty() || path.starts_with('/') || path.ends_with('/') {
        return Err(BackendError::InvalidPath(path.to_string()));
    }
    Ok(())
}

#[derive(Clone, Debug)]
pub struct CloudStorage {
    config: FirebaseConfig,
    client: Client,
}

impl CloudStorage {
    /// Build a client for the configured bucket.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: FirebaseConfig) -> Result<Self, BackendError> {
        Ok(Self {
            config,
            client: http_client()?,
        })
    }

    /// `{base}/b/{bucket}/o`, optionally followed by the encoded object path.
    fn objects_url(&self, object: Option<&str>) -> Result<Url, BackendError> {
        let bucket = self
            .config
            .storage_bucket
            .as_deref()
            .ok_or_else(|| BackendError::Config("storage bucket".to_string()))?;

        let mut url = Url::parse(self.config.storage_base_url.trim_end_matches('/'))
            .map_err(|e| BackendError::Config(format!("invalid storage endpoint: {e}")))?;
        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                BackendError::Config("storage endpoint cannot be a base".to_string())
            })?;
            segments.pop_if_empty().push("b").push(bucket).push("o");
            if let Some(object) = object {
                segments.push(object);
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl ObjectStorage for CloudStorage {
    #[instrument(skip(self, bytes, session), fields(size = bytes.len()))]
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        session: &Session,
    ) -> Result<(), BackendError> {
        validate_path(path)?;
        let mut url = self.objects_url(None)?;
        url.query_pairs_mut().append_pair("name", path);

        let response = self
            .client
            .post(url)
            .bearer_auth(session.credential.expose_secret())
            .header(CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, message) = error_parts(response).await;
            return Err(BackendError::Rejected { status, message });
        }
        Ok(())
    }

    #[instrument(skip(self, session))]
    async fn public_url(&self, path: &str, session: &Session) -> Result<String, BackendError> {
        validate_path(path)?;
        let url = self.objects_url(Some(path))?;

        let response = self
            .client
            .get(url.clone())
            .bearer_auth(session.credential.expose_secret())
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, message) = error_parts(response).await;
            return Err(BackendError::Rejected { status, message });
        }

        let metadata: ObjectMetadata = response.json().await?;
        let token = metadata
            .download_tokens
            .as_deref()
            .and_then(|tokens| tokens.split(',').next())
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                BackendError::InvalidResponse(format!("object {path} has no download token"))
            })?
            .to_string();

        let mut public = url;
        public
            .query_pairs_mut()
            .append_pair("alt", "media")
            .append_pair("token", &token);
        Ok(public.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use anyhow::Result;
    use secrecy::SecretString;
    use serde_json::json;
    use std::net::TcpListener;
    use wiremock::matchers::{header, method, path, path_regex, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn can_bind_localhost() -> bool {
        TcpListener::bind("127.0.0.1:0").is_ok()
    }

    fn storage(server: &MockServer) -> CloudStorage {
        let config = FirebaseConfig::new(SecretString::from("api-key".to_string()), "demo")
            .with_storage_bucket("demo-bucket")
            .with_storage_base_url(server.uri());
        CloudStorage::new(config).unwrap()
    }

    fn session() -> Session {
        Session {
            user_id: "uid-1".to_string(),
            email: "a@b.com".to_string(),
            email_verified: true,
            display_name: None,
            avatar_url: None,
            credential: SecretString::from("id-token".to_string()),
        }
    }

    #[test]
    fn validate_path_rejects_empty_and_rooted_paths() {
        assert!(validate_path("profilePictures/uid-1").is_ok());
        assert!(validate_path("").is_err());
        assert!(validate_path("/profilePictures/uid-1").is_err());
        assert!(validate_path("profilePictures/").is_err());
    }

    #[test]
    fn missing_bucket_is_a_config_error() {
        let config = FirebaseConfig::new(SecretString::from("api-key".to_string()), "demo");
        let storage = CloudStorage::new(config).unwrap();
        assert!(matches!(
            storage.objects_url(None),
            Err(BackendError::Config(_))
        ));
    }

    #[tokio::test]
    async fn upload_posts_bytes_under_object_name() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/b/demo-bucket/o"))
            .and(query_param("name", "profilePictures/uid-1"))
            .and(header("content-type", "image/png"))
            .and(header("authorization", "Bearer id-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "profilePictures/uid-1",
                "downloadTokens": "tok-1"
            })))
            .expect(1)
            .mount(&server)
            .await;

        storage(&server)
            .upload("profilePictures/uid-1", vec![1, 2, 3], "image/png", &session())
            .await?;
        Ok(())
    }

    #[tokio::test]
    async fn public_url_embeds_first_download_token() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path_regex(r"^/b/demo-bucket/o/profilePictures.*uid-1$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "profilePictures/uid-1",
                "downloadTokens": "tok-1,tok-2"
            })))
            .mount(&server)
            .await;

        let url = storage(&server)
            .public_url("profilePictures/uid-1", &session())
            .await?;
        assert!(url.starts_with(&server.uri()));
        assert!(url.contains("profilePictures%2Fuid-1"));
        assert!(url.ends_with("alt=media&token=tok-1"));
        Ok(())
    }
}
