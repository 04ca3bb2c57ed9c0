//! Unsigned image uploads to Cloudinary.
//!
//! Uploads go straight from the client to
//! `https://api.cloudinary.com/v1_1/{cloud_name}/upload` as multipart form data with the
//! `file` and `upload_preset` fields. An unsigned preset needs no credentials.

pub mod models;

use crate::cloudinary::models::{CloudinaryErrorResponse, PhotoFile, UploadedImage};
use crate::core::config::CloudinaryOptions;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use thiserror::Error;

#[cfg(test)]
mod tests;

const CLOUDINARY_V1_API: &str = "https://api.cloudinary.com/v1_1";

#[derive(Error, Debug)]
pub enum CloudinaryError {
    #[error("HTTP Request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("Middleware error: {0}")]
    MiddlewareError(#[from] reqwest_middleware::Error),
    #[error("API error: {0}")]
    ApiError(String),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Client for Cloudinary's upload API.
#[derive(Clone)]
pub struct CloudinaryClient {
    client: ClientWithMiddleware,
    base_url: String,
    upload_preset: String,
}

impl CloudinaryClient {
    pub fn new(options: &CloudinaryOptions) -> Self {
        // No retry middleware: multipart bodies cannot be cloned for a second attempt.
        let client = ClientBuilder::new(Client::new()).build();
        let base_url = format!("{}/{}", CLOUDINARY_V1_API, options.cloud_name);
        Self::new_with_client(client, base_url, options.upload_preset.clone())
    }

    /// Creates a client against a custom API root, which must include the cloud name.
    pub fn new_with_client(
        client: ClientWithMiddleware,
        base_url: String,
        upload_preset: String,
    ) -> Self {
        Self {
            client,
            base_url,
            upload_preset,
        }
    }

    /// Uploads an image and returns where Cloudinary stored it.
    pub async fn upload(&self, file: PhotoFile) -> Result<UploadedImage, CloudinaryError> {
        let url = format!("{}/upload", self.base_url);
        let size = file.data.len();

        let part = Part::bytes(file.data)
            .file_name(file.file_name.clone())
            .mime_str(&file.mime_type)?;
        let form = Form::new()
            .part("file", part)
            .text("upload_preset", self.upload_preset.clone());

        tracing::debug!(file = %file.file_name, size, "uploading image");

        let response = self.client.post(&url).multipart(form).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<CloudinaryErrorResponse>(&text) {
                Ok(body) => body.error.message,
                Err(_) => format!("Upload failed {}: {}", status, text),
            };
            return Err(CloudinaryError::ApiError(message));
        }

        let text = response.text().await?;
        let image: UploadedImage = serde_json::from_str(&text)?;
        Ok(image)
    }
}
