use super::{PhotoRecord, PhotoStore};
use crate::cloudinary::models::PhotoFile;
use crate::cloudinary::{CloudinaryClient, CloudinaryError};
use crate::firestore::FirestoreError;
use crate::rooms::RoomCode;
use chrono::Utc;
use thiserror::Error;

/// Errors from the upload flow. `Display` is the message shown to the user.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Please select a photo")]
    NoPhotoSelected,
    #[error("Join or create a room first")]
    NoRoom,
    #[error("Sign-in required before uploading")]
    NotSignedIn,
    #[error("Upload failed: {0}")]
    Upload(#[source] CloudinaryError),
    #[error("Failed to save photo: {0}")]
    Save(#[source] FirestoreError),
}

/// The upload form: the picked file and an optional caption.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhotoDraft {
    pub file: Option<PhotoFile>,
    pub caption: String,
}

impl PhotoDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, file: PhotoFile) -> Self {
        self.file = Some(file);
        self
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = caption.into();
        self
    }
}

/// Uploads an image to Cloudinary, then records it in the room.
#[derive(Clone)]
pub struct PhotoUploader {
    cloudinary: CloudinaryClient,
    store: PhotoStore,
}

impl PhotoUploader {
    pub fn new(cloudinary: CloudinaryClient, store: PhotoStore) -> Self {
        Self { cloudinary, store }
    }

    /// Submits the draft as `user_id`'s photo in `room`.
    ///
    /// Without a file nothing is sent. Neither step is retried.
    pub async fn submit(
        &self,
        room: &RoomCode,
        user_id: &str,
        draft: PhotoDraft,
    ) -> Result<PhotoRecord, UploadError> {
        let file = draft.file.ok_or(UploadError::NoPhotoSelected)?;

        let image = self
            .cloudinary
            .upload(file)
            .await
            .map_err(UploadError::Upload)?;

        let record = PhotoRecord {
            url: image.secure_url,
            caption: draft.caption.trim().to_string(),
            user_id: user_id.to_string(),
            timestamp: Utc::now().timestamp_millis(),
        };

        self.store
            .save(room, &record)
            .await
            .map_err(UploadError::Save)?;

        tracing::info!(room = %room, user = user_id, url = %record.url, "photo uploaded");
        Ok(record)
    }
}
