//! Client configuration.
//!
//! Everything here is public client configuration: the Firebase web API key and
//! an unsigned Cloudinary upload preset are meant to ship with the client.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required environment variable is unset or empty.
    #[error("missing configuration: env var {var} not set")]
    MissingVar { var: String },
    /// The Firebase config blob could not be parsed.
    #[error("invalid Firebase config: {0}")]
    Json(#[from] serde_json::Error),
}

/// The Firebase web app configuration, as shown in the Firebase console.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FirebaseOptions {
    pub api_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_domain: Option<String>,
    pub project_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_bucket: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messaging_sender_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
}

impl FirebaseOptions {
    /// Parses the camelCase config object (`{"apiKey": ..., "projectId": ...}`).
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Loads the config from `FIREBASE_*` environment variables.
    ///
    /// `FIREBASE_API_KEY` and `FIREBASE_PROJECT_ID` are required.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_key: required_var("FIREBASE_API_KEY")?,
            auth_domain: optional_var("FIREBASE_AUTH_DOMAIN"),
            project_id: required_var("FIREBASE_PROJECT_ID")?,
            storage_bucket: optional_var("FIREBASE_STORAGE_BUCKET"),
            messaging_sender_id: optional_var("FIREBASE_MESSAGING_SENDER_ID"),
            app_id: optional_var("FIREBASE_APP_ID"),
        })
    }
}

/// Cloudinary account settings for unsigned uploads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CloudinaryOptions {
    pub cloud_name: String,
    pub upload_preset: String,
}

impl CloudinaryOptions {
    /// Loads `CLOUDINARY_CLOUD_NAME` and `CLOUDINARY_UPLOAD_PRESET`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            cloud_name: required_var("CLOUDINARY_CLOUD_NAME")?,
            upload_preset: required_var("CLOUDINARY_UPLOAD_PRESET")?,
        })
    }
}

/// Full configuration for [`crate::app::PhotoRoomApp`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    pub firebase: FirebaseOptions,
    pub cloudinary: CloudinaryOptions,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            firebase: FirebaseOptions::from_env()?,
            cloudinary: CloudinaryOptions::from_env()?,
        })
    }
}

fn required_var(var: &str) -> Result<String, ConfigError> {
    optional_var(var).ok_or_else(|| ConfigError::MissingVar {
        var: var.to_string(),
    })
}

fn optional_var(var: &str) -> Option<String> {
    std::env::var(var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_console_blob() {
        let json = r#"{
            "apiKey": "AIzaSyTest",
            "authDomain": "photo-rooms.firebaseapp.com",
            "projectId": "photo-rooms",
            "storageBucket": "photo-rooms.appspot.com",
            "messagingSenderId": "1234567890",
            "appId": "1:1234567890:web:abcdef"
        }"#;

        let options = FirebaseOptions::from_json(json).unwrap();
        assert_eq!(options.api_key, "AIzaSyTest");
        assert_eq!(options.project_id, "photo-rooms");
        assert_eq!(options.app_id.as_deref(), Some("1:1234567890:web:abcdef"));
    }

    #[test]
    fn test_from_json_optional_fields() {
        let options =
            FirebaseOptions::from_json(r#"{"apiKey":"k","projectId":"p"}"#).unwrap();
        assert!(options.auth_domain.is_none());
        assert!(options.storage_bucket.is_none());
    }

    #[test]
    fn test_from_json_missing_project_id() {
        let err = FirebaseOptions::from_json(r#"{"apiKey":"k"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn test_cloudinary_from_env() {
        std::env::set_var("CLOUDINARY_CLOUD_NAME", " demo ");
        std::env::set_var("CLOUDINARY_UPLOAD_PRESET", "");

        let err = CloudinaryOptions::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar { ref var } if var == "CLOUDINARY_UPLOAD_PRESET"));

        std::env::set_var("CLOUDINARY_UPLOAD_PRESET", "unsigned_photos");
        let options = CloudinaryOptions::from_env().unwrap();
        assert_eq!(options.cloud_name, "demo");
        assert_eq!(options.upload_preset, "unsigned_photos");

        std::env::remove_var("CLOUDINARY_CLOUD_NAME");
        std::env::remove_var("CLOUDINARY_UPLOAD_PRESET");
    }

    #[test]
    fn test_missing_var() {
        let err = required_var("PHOTO_ROOMS_TEST_UNSET_VARIABLE").unwrap_err();
        assert_eq!(
            err.to_string(),
            "missing configuration: env var PHOTO_ROOMS_TEST_UNSET_VARIABLE not set"
        );
    }
}
