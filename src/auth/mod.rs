//! Firebase Authentication for the client side.
//!
//! Only anonymous accounts are supported: `sign_in_anonymously` creates a user through
//! the Identity Toolkit API and keeps its credentials in a session shared by every clone
//! of [`FirebaseAuth`]. ID tokens are refreshed through the Secure Token API shortly
//! before they expire.

pub mod models;

use crate::auth::models::{RefreshTokenResponse, SignUpRequest, SignUpResponse, User};
use crate::core::config::FirebaseOptions;
use crate::core::parse_error_response;
use chrono::{DateTime, Duration, Utc};
use reqwest::{header, Client};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;


const IDENTITY_TOOLKIT_V1_API: &str = "https://identitytoolkit.googleapis.com/v1";
const SECURE_TOKEN_V1_API: &str = "https://securetoken.googleapis.com/v1";

// Tokens this close to expiry are refreshed before use.
const TOKEN_REFRESH_MARGIN_SECS: i64 = 5 * 60;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("HTTP Request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("Middleware error: {0}")]
    MiddlewareError(#[from] reqwest_middleware::Error),
    #[error("API error: {0}")]
    ApiError(String),
    #[error("No user is signed in")]
    NotSignedIn,
    #[error("Invalid token response: {0}")]
    InvalidResponse(String),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

#[derive(Clone)]
pub struct FirebaseAuth {
    client: ClientWithMiddleware,
    api_key: String,
    identity_url: String,
    token_url: String,
    session: Arc<RwLock<Option<User>>>,
}

impl FirebaseAuth {
    pub fn new(options: &FirebaseOptions) -> Self {
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(3);

        let client = ClientBuilder::new(Client::new())
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Self::new_with_client(
            client,
            options.api_key.clone(),
            IDENTITY_TOOLKIT_V1_API.to_string(),
            SECURE_TOKEN_V1_API.to_string(),
        )
    }

    /// Creates a client against custom endpoints (emulators or tests).
    pub fn new_with_client(
        client: ClientWithMiddleware,
        api_key: String,
        identity_url: String,
        token_url: String,
    ) -> Self {
        Self {
            client,
            api_key,
            identity_url,
            token_url,
            session: Arc::new(RwLock::new(None)),
        }
    }

    /// Creates a new anonymous account and makes it the current user.
    pub async fn sign_in_anonymously(&self) -> Result<User, AuthError> {
        let url = format!("{}/accounts:signUp", self.identity_url);
        let request = SignUpRequest {
            return_secure_token: true,
        };

        let response = self
            .client
            .post(&url)
            .query(&[("key", &self.api_key)])
            .header(header::CONTENT_TYPE, "application/json")
            .body(serde_json::to_vec(&request)?)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AuthError::ApiError(
                parse_error_response(response, "Anonymous sign-in failed").await,
            ));
        }

        let result: SignUpResponse = response.json().await?;
        let user = User {
            uid: result.local_id,
            id_token: result.id_token,
            refresh_token: result.refresh_token,
            expires_at: expires_at(Utc::now(), &result.expires_in)?,
            is_anonymous: true,
        };

        tracing::info!(uid = %user.uid, "signed in anonymously");
        *self.session.write().await = Some(user.clone());
        Ok(user)
    }

    /// Returns the signed-in user, if any.
    pub async fn current_user(&self) -> Option<User> {
        self.session.read().await.clone()
    }

    /// Returns a valid ID token for the current user, refreshing it if it is about to expire.
    pub async fn id_token(&self) -> Result<String, AuthError> {
        let user = self.current_user().await.ok_or(AuthError::NotSignedIn)?;

        if !user.expires_within(Utc::now(), Duration::seconds(TOKEN_REFRESH_MARGIN_SECS)) {
            return Ok(user.id_token);
        }

        let refreshed = self.refresh(&user).await?;
        Ok(refreshed.id_token)
    }

    /// Forgets the current user.
    pub async fn sign_out(&self) {
        *self.session.write().await = None;
    }

    async fn refresh(&self, user: &User) -> Result<User, AuthError> {
        let url = format!("{}/token", self.token_url);
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", "refresh_token")
            .append_pair("refresh_token", &user.refresh_token)
            .finish();

        let response = self
            .client
            .post(&url)
            .query(&[("key", &self.api_key)])
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AuthError::ApiError(
                parse_error_response(response, "Token refresh failed").await,
            ));
        }

        let result: RefreshTokenResponse = response.json().await?;
        if result.user_id != user.uid {
            return Err(AuthError::InvalidResponse(format!(
                "refreshed token belongs to {}, expected {}",
                result.user_id, user.uid
            )));
        }

        let refreshed = User {
            uid: result.user_id,
            id_token: result.id_token,
            refresh_token: result.refresh_token,
            expires_at: expires_at(Utc::now(), &result.expires_in)?,
            is_anonymous: user.is_anonymous,
        };

        tracing::debug!(uid = %refreshed.uid, "refreshed ID token");
        *self.session.write().await = Some(refreshed.clone());
        Ok(refreshed)
    }

    #[cfg(test)]
    pub(crate) async fn set_current_user(&self, user: User) {
        *self.session.write().await = Some(user);
    }
}

fn parse_expires_in(value: &str) -> Result<Duration, AuthError> {
    let secs = value
        .parse::<i64>()
        .map_err(|e| AuthError::InvalidResponse(format!("expiresIn '{}': {}", value, e)))?;
    Duration::try_seconds(secs)
        .ok_or_else(|| AuthError::InvalidResponse(format!("expiresIn '{}' out of range", value)))
}

// Absolute expiry for a token issued at `now`.
fn expires_at(now: DateTime<Utc>, expires_in: &str) -> Result<DateTime<Utc>, AuthError> {
    now.checked_add_signed(parse_expires_in(expires_in)?)
        .ok_or_else(|| {
            AuthError::InvalidResponse(format!("expiresIn '{}' out of range", expires_in))
        })
}
