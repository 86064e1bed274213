use async_trait::async_trait;
use thiserror::Error;

/// Image upload failures. `Rejected` carries the host's own message (the
/// `error.message` field of its response body).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UploadError {
    #[error("image upload rejected: {message}")]
    Rejected { message: String },
    #[error("image upload failed: {reason}")]
    Transport { reason: String },
}

/// Contract for the external image host. Returns the hosted https URL on
/// success.
#[async_trait]
pub trait ImageUploader: Send + Sync {
    async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, UploadError>;
}
