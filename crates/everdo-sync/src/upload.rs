use async_trait::async_trait;
use everdo_core::upload::{ImageUploader, UploadError};
use reqwest::multipart;
use serde::{Deserialize, Serialize};
use tracing::instrument;

const DEFAULT_BASE_URL: &str = "https://api.cloudinary.com/v1_1";

/// Image host settings. Uploads are unsigned, authorized by the preset.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub upload_preset: String,
    #[serde(default)]
    pub base_url: Option<String>,
}

/// Multipart uploader for the external image host. The host always answers
/// with a JSON body: `secure_url` on success, `error.message` on failure.
pub struct CloudinaryUploader {
    cfg: CloudinaryConfig,
    client: reqwest::Client,
}

impl CloudinaryUploader {
    pub fn new(cfg: CloudinaryConfig) -> Self {
        Self {
            cfg,
            client: reqwest::Client::new(),
        }
    }

    fn upload_url(&self) -> String {
        let base = self
            .cfg
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/');
        format!("{base}/{}/image/upload", self.cfg.cloud_name)
    }
}

#[async_trait]
impl ImageUploader for CloudinaryUploader {
    #[instrument(skip(self, bytes))]
    async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, UploadError> {
        let part = multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str("image/jpeg")
            .map_err(transport)?;
        let form = multipart::Form::new()
            .part("file", part)
            .text("upload_preset", self.cfg.upload_preset.clone());

        // Failures come back as an error body, not just a status code, so
        // the body is parsed either way.
        let body: UploadResponse = self
            .client
            .post(self.upload_url())
            .multipart(form)
            .send()
            .await
            .map_err(transport)?
            .json()
            .await
            .map_err(transport)?;

        match (body.secure_url, body.error) {
            (Some(url), _) => Ok(url),
            (None, Some(failure)) => Err(UploadError::Rejected {
                message: failure.message,
            }),
            (None, None) => Err(UploadError::Transport {
                reason: "malformed upload response".to_string(),
            }),
        }
    }
}

fn transport(err: reqwest::Error) -> UploadError {
    UploadError::Transport {
        reason: err.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    secure_url: Option<String>,
    #[serde(default)]
    error: Option<UploadFailure>,
}

#[derive(Debug, Deserialize)]
struct UploadFailure {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_url_embeds_the_cloud_name() {
        let uploader = CloudinaryUploader::new(CloudinaryConfig {
            cloud_name: "demo".into(),
            upload_preset: "everdo".into(),
            base_url: None,
        });
        assert_eq!(
            uploader.upload_url(),
            "https://api.cloudinary.com/v1_1/demo/image/upload"
        );
    }

    #[test]
    fn success_bodies_carry_a_secure_url() {
        let body: UploadResponse = serde_json::from_str(
            r#"{ "secure_url": "https://res.example/image/upload/v1/x.jpg", "bytes": 1024 }"#,
        )
        .expect("parse");
        assert_eq!(
            body.secure_url.as_deref(),
            Some("https://res.example/image/upload/v1/x.jpg")
        );
        assert!(body.error.is_none());
    }

    #[test]
    fn failure_bodies_carry_the_host_message() {
        let body: UploadResponse = serde_json::from_str(
            r#"{ "error": { "message": "Upload preset not found" } }"#,
        )
        .expect("parse");
        assert!(body.secure_url.is_none());
        assert_eq!(
            body.error.expect("error body").message,
            "Upload preset not found"
        );
    }
}
