//! Adapter for the hosted auth API (`/auth/v1`).

use async_trait::async_trait;
use bugtrack_application::{AuthGateway, AuthSession, Registration};
use bugtrack_core::{AppError, AppResult, UserIdentity};
use chrono::{Duration, Utc};
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::RwLock;
use url::Url;
use uuid::Uuid;

use crate::hosted_backend_client::HostedBackendClient;

/// Auth gateway that keeps the current session in memory and shares its
/// access token with the backend client.
pub struct HostedAuthGateway {
    client: HostedBackendClient,
    session: RwLock<Option<AuthSession>>,
}

impl HostedAuthGateway {
    /// Creates a gateway over a shared backend client.
    #[must_use]
    pub fn new(client: HostedBackendClient) -> Self {
        Self {
            client,
            session: RwLock::new(None),
        }
    }

    fn auth_url(&self, path: &str) -> AppResult<Url> {
        self.client.endpoint(&["auth", "v1", path])
    }

    async fn store_session(&self, session: Option<AuthSession>) {
        self.client
            .set_access_token(session.as_ref().map(|held| held.access_token.clone()))
            .await;
        *self.session.write().await = session;
    }

    async fn grant(&self, grant_type: &str, body: serde_json::Value) -> AppResult<AuthSession> {
        let mut url = self.auth_url("token")?;
        url.query_pairs_mut().append_pair("grant_type", grant_type);

        let request = self.client.request(Method::POST, url).await.json(&body);
        let response = self.client.execute(request, "request auth token").await?;
        let payload: SessionPayload =
            HostedBackendClient::read_json(response, "request auth token").await?;
        payload.into_session()
    }
}

#[derive(Debug, Deserialize)]
struct UserPayload {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
}

impl From<UserPayload> for UserIdentity {
    fn from(user: UserPayload) -> Self {
        UserIdentity::new(user.id, user.email.unwrap_or_default())
    }
}

#[derive(Debug, Deserialize)]
struct SessionPayload {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    user: UserPayload,
}

impl SessionPayload {
    fn into_session(self) -> AppResult<AuthSession> {
        if self.access_token.trim().is_empty() {
            return Err(AppError::Unauthorized(
                "auth service returned an empty access token".to_owned(),
            ));
        }

        Ok(AuthSession {
            identity: self.user.into(),
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: self
                .expires_in
                .map(|seconds| Utc::now() + Duration::seconds(seconds)),
        })
    }
}

/// Sign-up answers with a full session when email confirmation is off and
/// with the bare user otherwise.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpPayload {
    Session(SessionPayload),
    User(UserPayload),
}

impl SignUpPayload {
    fn into_registration(self) -> AppResult<Registration> {
        match self {
            Self::Session(payload) => {
                let session = payload.into_session()?;
                Ok(Registration {
                    identity: session.identity.clone(),
                    session: Some(session),
                })
            }
            Self::User(user) => Ok(Registration {
                identity: user.into(),
                session: None,
            }),
        }
    }
}

#[async_trait]
impl AuthGateway for HostedAuthGateway {
    async fn authenticate(&self, email: &str, password: &str) -> AppResult<AuthSession> {
        let session = self
            .grant("password", json!({ "email": email, "password": password }))
            .await
            .map_err(|error| AppError::Unauthorized(error.message().to_owned()))?;

        self.store_session(Some(session.clone())).await;
        Ok(session)
    }

    async fn register(&self, email: &str, password: &str) -> AppResult<Registration> {
        let url = self.auth_url("signup")?;
        let request = self
            .client
            .request(Method::POST, url)
            .await
            .json(&json!({ "email": email, "password": password }));
        let response = self.client.execute(request, "sign up").await?;
        let payload: SignUpPayload = HostedBackendClient::read_json(response, "sign up").await?;
        let registration = payload.into_registration()?;

        if registration.session.is_some() {
            self.store_session(registration.session.clone()).await;
        }
        Ok(registration)
    }

    async fn deauthenticate(&self) -> AppResult<()> {
        let held = self.session.read().await.is_some();
        if held {
            let url = self.auth_url("logout")?;
            let request = self.client.request(Method::POST, url).await;
            let result = self.client.execute(request, "sign out").await;
            if let Err(error) = result {
                tracing::warn!(error = %error, "remote sign-out failed, clearing local session");
            }
        }

        self.store_session(None).await;
        Ok(())
    }

    async fn current_session(&self) -> AppResult<Option<AuthSession>> {
        let Some(held) = self.session.read().await.clone() else {
            return Ok(None);
        };

        let expired = held.expires_at.is_some_and(|expires_at| expires_at <= Utc::now());
        if !expired {
            return Ok(Some(held));
        }

        let Some(refresh_token) = held.refresh_token else {
            self.store_session(None).await;
            return Ok(None);
        };

        match self
            .grant("refresh_token", json!({ "refresh_token": refresh_token }))
            .await
        {
            Ok(renewed) => {
                self.store_session(Some(renewed.clone())).await;
                Ok(Some(renewed))
            }
            Err(error) => {
                tracing::warn!(error = %error, "session refresh failed");
                self.store_session(None).await;
                Ok(None)
            }
        }
    }

    async fn request_password_reset(
        &self,
        email: &str,
        redirect_to: Option<&str>,
    ) -> AppResult<()> {
        let mut url = self.auth_url("recover")?;
        if let Some(redirect_to) = redirect_to {
            url.query_pairs_mut().append_pair("redirect_to", redirect_to);
        }

        let request = self
            .client
            .request(Method::POST, url)
            .await
            .json(&json!({ "email": email }));
        self.client
            .execute(request, "request password reset")
            .await
            .map(|_| ())
    }

    async fn update_password(&self, new_password: &str) -> AppResult<()> {
        if self.session.read().await.is_none() {
            return Err(AppError::Unauthorized(
                "sign in before changing the password".to_owned(),
            ));
        }

        let url = self.auth_url("user")?;
        let request = self
            .client
            .request(Method::PUT, url)
            .await
            .json(&json!({ "password": new_password }));
        self.client
            .execute(request, "update password")
            .await
            .map(|_| ())
    }
}
