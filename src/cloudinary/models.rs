use serde::Deserialize;

/// An image file picked for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoFile {
    pub file_name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl PhotoFile {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            data,
        }
    }
}

/// The parts of Cloudinary's upload response this crate uses.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct UploadedImage {
    pub secure_url: String,
    pub public_id: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub format: Option<String>,
    pub bytes: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CloudinaryErrorResponse {
    pub error: CloudinaryErrorDetails,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CloudinaryErrorDetails {
    pub message: String,
}
