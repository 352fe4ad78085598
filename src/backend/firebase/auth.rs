//! Identity Toolkit (`accounts:*`) client implementing [`IdentityProvider`].
//! Request payloads carry passwords and ID tokens; they are built inline and
//! never logged.

use super::{error_parts, http_client, FirebaseConfig};
use crate::backend::{
    FederatedSession, FederatedToken, IdentityProvider, ProfileUpdate, ProviderError, Session,
};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use tracing::{debug, instrument};
use url::{form_urlencoded, Url};

/// Redirect URI sent with federated sign-ins; only checked for shape.
const IDP_REQUEST_URI: &str = "http://localhost";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    local_id: String,
    id_token: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<AccountInfo>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountInfo {
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    email_verified: bool,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    photo_url: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdpResponse {
    local_id: String,
    id_token: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    email_verified: bool,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    photo_url: Option<String>,
    #[serde(default)]
    is_new_user: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateResponse {
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    photo_url: Option<String>,
    #[serde(default)]
    id_token: Option<String>,
}

/// Map an Identity Toolkit error message (`CODE : detail`) to a provider error.
fn provider_error(status: u16, message: &str) -> ProviderError {
    let mut parts = message.splitn(2, ':');
    let code = parts.next().unwrap_or(message).trim();
    let detail = parts.next().map_or(code, str::trim);

    match code {
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" | "USER_DISABLED" => {
            ProviderError::InvalidCredentials
        }
        "EMAIL_EXISTS" => ProviderError::EmailInUse,
        "INVALID_EMAIL" | "MISSING_EMAIL" => ProviderError::InvalidEmail,
        "WEAK_PASSWORD" => ProviderError::Policy(detail.to_string()),
        "INVALID_ID_TOKEN" | "TOKEN_EXPIRED" | "CREDENTIAL_TOO_OLD_LOGIN_AGAIN"
        | "USER_NOT_FOUND" => ProviderError::SessionExpired,
        "TOO_MANY_ATTEMPTS_TRY_LATER" => ProviderError::RateLimited,
        "INVALID_IDP_RESPONSE" | "FEDERATED_USER_ID_ALREADY_LINKED" | "OPERATION_NOT_ALLOWED" => {
            ProviderError::Federated(message.to_string())
        }
        _ => ProviderError::Rejected {
            status,
            message: message.to_string(),
        },
    }
}

#[derive(Clone, Debug)]
pub struct IdentityToolkit {
    config: FirebaseConfig,
    client: Client,
}

impl IdentityToolkit {
    /// Build a client for the configured Identity Toolkit endpoint.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: FirebaseConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            config,
            client: http_client()?,
        })
    }

    fn endpoint(&self, method: &str) -> Result<Url, ProviderError> {
        let base = self.config.auth_base_url.trim_end_matches('/');
        let mut url = Url::parse(&format!("{base}/accounts:{method}"))
            .map_err(|e| ProviderError::Transport(format!("invalid auth endpoint: {e}")))?;
        url.query_pairs_mut()
            .append_pair("key", self.config.api_key.expose_secret());
        Ok(url)
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, body: &Value) -> Result<T, ProviderError> {
        let url = self.endpoint(method)?;
        let response = self.client.post(url).json(body).send().await?;

        if !response.status().is_success() {
            let (status, message) = error_parts(response).await;
            debug!(method, status, "identity toolkit rejected request");
            return Err(provider_error(status, &message));
        }

        Ok(response.json().await?)
    }

    async fn account_info(&self, id_token: &str) -> Result<AccountInfo, ProviderError> {
        let response: LookupResponse = self.call("lookup", &json!({ "idToken": id_token })).await?;
        response
            .users
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse("lookup returned no users".to_string()))
    }

    async fn update(&self, session: &Session, mut body: Value) -> Result<Session, ProviderError> {
        body["idToken"] = Value::String(session.credential.expose_secret().to_string());
        body["returnSecureToken"] = Value::Bool(true);
        let response: UpdateResponse = self.call("update", &body).await?;

        let mut refreshed = session.clone();
        if response.display_name.is_some() {
            refreshed.display_name = response.display_name;
        }
        if response.photo_url.is_some() {
            refreshed.avatar_url = response.photo_url;
        }
        if let Some(token) = response.id_token {
            refreshed.credential = SecretString::from(token);
        }
        Ok(refreshed)
    }
}

#[async_trait]
impl IdentityProvider for IdentityToolkit {
    #[instrument(skip(self, email, secret))]
    async fn authenticate_with_password(
        &self,
        email: &str,
        secret: &SecretString,
    ) -> Result<Session, ProviderError> {
        let signed_in: SignInResponse = self
            .call(
                "signInWithPassword",
                &json!({
                    "email": email,
                    "password": secret.expose_secret(),
                    "returnSecureToken": true,
                }),
            )
            .await?;

        // signInWithPassword does not report verification state
        let info = self.account_info(&signed_in.id_token).await?;

        Ok(Session {
            user_id: signed_in.local_id,
            email: info
                .email
                .or(signed_in.email)
                .unwrap_or_else(|| email.to_string()),
            email_verified: info.email_verified,
            display_name: info.display_name,
            avatar_url: info.photo_url,
            credential: SecretString::from(signed_in.id_token),
        })
    }

    #[instrument(skip(self, token), fields(provider_id = %token.provider_id))]
    async fn authenticate_federated(
        &self,
        token: &FederatedToken,
    ) -> Result<FederatedSession, ProviderError> {
        let post_body = form_urlencoded::Serializer::new(String::new())
            .append_pair("id_token", token.id_token.expose_secret())
            .append_pair("providerId", &token.provider_id)
            .finish();

        let response: IdpResponse = self
            .call(
                "signInWithIdp",
                &json!({
                    "postBody": post_body,
                    "requestUri": IDP_REQUEST_URI,
                    "returnIdpCredential": true,
                    "returnSecureToken": true,
                }),
            )
            .await?;

        let email = response.email.ok_or_else(|| {
            ProviderError::Federated("provider did not share an email address".to_string())
        })?;

        Ok(FederatedSession {
            session: Session {
                user_id: response.local_id,
                email,
                email_verified: response.email_verified,
                display_name: response.display_name,
                avatar_url: response.photo_url,
                credential: SecretString::from(response.id_token),
            },
            is_new_user: response.is_new_user,
        })
    }

    #[instrument(skip(self, email, secret))]
    async fn create_account(
        &self,
        email: &str,
        secret: &SecretString,
    ) -> Result<Session, ProviderError> {
        let created: SignInResponse = self
            .call(
                "signUp",
                &json!({
                    "email": email,
                    "password": secret.expose_secret(),
                    "returnSecureToken": true,
                }),
            )
            .await?;

        Ok(Session {
            user_id: created.local_id,
            email: created.email.unwrap_or_else(|| email.to_string()),
            email_verified: false,
            display_name: None,
            avatar_url: None,
            credential: SecretString::from(created.id_token),
        })
    }

    #[instrument(skip(self, session), fields(user_id = %session.user_id))]
    async fn send_verification_email(&self, session: &Session) -> Result<(), ProviderError> {
        let _: Value = self
            .call(
                "sendOobCode",
                &json!({
                    "requestType": "VERIFY_EMAIL",
                    "idToken": session.credential.expose_secret(),
                }),
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self, session), fields(user_id = %session.user_id))]
    async fn update_profile(
        &self,
        session: &Session,
        update: &ProfileUpdate,
    ) -> Result<Session, ProviderError> {
        let mut body = json!({});
        if let Some(name) = &update.display_name {
            body["displayName"] = Value::String(name.clone());
        }
        if let Some(url) = &update.avatar_url {
            body["photoUrl"] = Value::String(url.clone());
        }
        self.update(session, body).await
    }

    #[instrument(skip(self, session, new_secret), fields(user_id = %session.user_id))]
    async fn change_secret(
        &self,
        session: &Session,
        new_secret: &SecretString,
    ) -> Result<Session, ProviderError> {
        self.update(
            session,
            json!({ "password": new_secret.expose_secret() }),
        )
        .await
    }
}
