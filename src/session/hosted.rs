//! Hosted identity provider client
//!
//! Talks to the backend's auth endpoints under `/auth/v1`. Provider error
//! bodies are classified through `AuthError::from_provider_message`.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use url::Url;

use super::{AuthEvent, AuthSession, AuthUser, IdentityProvider};
use crate::config::BackendConfig;
use crate::error::AuthError;

pub struct HostedIdentity {
    client: Client,
    base: Url,
    anon_key: String,
    events: broadcast::Sender<AuthEvent>,
}

/// Token endpoint response
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: AuthUser,
}

impl TokenResponse {
    fn into_session(self) -> AuthSession {
        let expires_at = self
            .expires_at
            .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
            .or_else(|| self.expires_in.map(|s| Utc::now() + Duration::seconds(s)));
        AuthSession {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            user: self.user,
            expires_at,
        }
    }
}

/// Auth error body; field names differ between provider versions
#[derive(Deserialize, Default)]
struct ProviderErrorBody {
    msg: Option<String>,
    message: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
}

impl ProviderErrorBody {
    fn message(self) -> Option<String> {
        self.msg
            .or(self.message)
            .or(self.error_description)
            .or(self.error)
    }
}

impl HostedIdentity {
    pub fn new(config: &BackendConfig) -> Result<Self, AuthError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(network)?;
        let base = config.url.join("auth/v1/").map_err(|e| AuthError::Provider {
            message: format!("invalid backend url: {}", e),
        })?;
        let (events, _) = broadcast::channel(64);
        Ok(Self {
            client,
            base,
            anon_key: config.anon_key.clone(),
            events,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, AuthError> {
        self.base.join(path).map_err(|e| AuthError::Provider {
            message: e.to_string(),
        })
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, AuthError> {
        let body = self.send_raw(request).await?;
        serde_json::from_str(&body).map_err(|e| AuthError::Provider {
            message: format!("unexpected auth response: {}", e),
        })
    }

    async fn send_raw(&self, request: RequestBuilder) -> Result<String, AuthError> {
        let response = request
            .header("apikey", &self.anon_key)
            .send()
            .await
            .map_err(network)?;
        let status = response.status();
        let body = response.text().await.map_err(network)?;
        if status.is_success() {
            return Ok(body);
        }
        let message = serde_json::from_str::<ProviderErrorBody>(&body)
            .unwrap_or_default()
            .message()
            .unwrap_or_else(|| status.to_string());
        warn!("Auth request failed with {}: {}", status, message);
        Err(AuthError::from_provider_message(&message))
    }

    async fn token(&self, grant_type: &str, body: serde_json::Value) -> Result<AuthSession, AuthError> {
        let mut url = self.endpoint("token")?;
        url.query_pairs_mut().append_pair("grant_type", grant_type);
        let response: TokenResponse = self.send(self.client.post(url).json(&body)).await?;
        Ok(response.into_session())
    }

    fn notify(&self, event: AuthEvent) {
        let _ = self.events.send(event);
    }
}

fn network(e: reqwest::Error) -> AuthError {
    AuthError::Network {
        message: e.to_string(),
    }
}

#[async_trait]
impl IdentityProvider for HostedIdentity {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthError> {
        debug!("Signing in {}", email);
        let session = self
            .token("password", json!({ "email": email, "password": password }))
            .await?;
        self.notify(AuthEvent::SignedIn(session.clone()));
        Ok(session)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<AuthSession, AuthError> {
        let session = self
            .token("refresh_token", json!({ "refresh_token": refresh_token }))
            .await?;
        self.notify(AuthEvent::TokenRefreshed(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let user = self.get_user(access_token).await?;
        let request = self
            .client
            .post(self.endpoint("logout")?)
            .bearer_auth(access_token);
        self.send_raw(request).await?;
        self.notify(AuthEvent::SignedOut { user_id: user.id });
        Ok(())
    }

    async fn get_user(&self, access_token: &str) -> Result<AuthUser, AuthError> {
        let request = self
            .client
            .get(self.endpoint("user")?)
            .bearer_auth(access_token);
        self.send(request).await
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}
