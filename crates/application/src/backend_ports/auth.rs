use async_trait::async_trait;
use bugtrack_core::{AppResult, UserIdentity};
use chrono::{DateTime, Utc};

/// Session issued by the hosted auth service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    /// Authenticated account.
    pub identity: UserIdentity,
    /// Bearer token for row and storage requests.
    pub access_token: String,
    /// Token used to renew the session.
    pub refresh_token: Option<String>,
    /// Access token expiry.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Outcome of creating an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    /// The created account.
    pub identity: UserIdentity,
    /// Present when the service signs the account in immediately.
    pub session: Option<AuthSession>,
}

/// Port for the hosted authentication service.
#[async_trait]
pub trait AuthGateway: Send + Sync {
    /// Signs in with email and password.
    async fn authenticate(&self, email: &str, password: &str) -> AppResult<AuthSession>;

    /// Creates an account.
    async fn register(&self, email: &str, password: &str) -> AppResult<Registration>;

    /// Ends the current session.
    async fn deauthenticate(&self) -> AppResult<()>;

    /// Returns the session the gateway currently holds, if any.
    async fn current_session(&self) -> AppResult<Option<AuthSession>>;

    /// Sends a password reset email.
    async fn request_password_reset(&self, email: &str, redirect_to: Option<&str>)
    -> AppResult<()>;

    /// Changes the password of the signed-in account.
    async fn update_password(&self, new_password: &str) -> AppResult<()>;
}
