use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    pub return_secure_token: bool,
}

/// Response of `accounts:signUp`. With no email or password this creates an anonymous user.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpResponse {
    pub kind: Option<String>,
    pub id_token: String,
    pub refresh_token: String,
    /// Seconds until the ID token expires, sent as a string.
    pub expires_in: String,
    pub local_id: String,
}

/// Response of the Secure Token API. Unlike Identity Toolkit it uses snake_case.
#[derive(Debug, Deserialize)]
pub struct RefreshTokenResponse {
    pub id_token: String,
    pub refresh_token: String,
    pub expires_in: String,
    pub user_id: String,
    pub token_type: Option<String>,
    pub project_id: Option<String>,
}

/// The signed-in user and their current credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub uid: String,
    pub id_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub is_anonymous: bool,
}

impl User {
    /// Returns `true` if the ID token expires within `margin` of `now`.
    pub fn expires_within(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        self.expires_at - margin <= now
    }
}
