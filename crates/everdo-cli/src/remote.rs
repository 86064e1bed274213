use color_eyre::Result;
use everdo_core::auth::AuthSession;
use everdo_sync::{CloudinaryUploader, FirestoreTaskStore, RestAuthProvider};

use crate::config::Config;

/// Build the task/profile store for the signed-in user.
pub fn task_store(config: &Config, session: &AuthSession) -> Result<FirestoreTaskStore> {
    let cfg = config.firestore.clone().ok_or_else(|| {
        color_eyre::eyre::eyre!("firestore is not configured; run `everdo config init` and fill in [firestore]")
    })?;
    Ok(FirestoreTaskStore::new(cfg).with_id_token(session.id_token.clone()))
}

pub fn auth_provider(config: &Config) -> Result<RestAuthProvider> {
    let cfg = config.auth.clone().ok_or_else(|| {
        color_eyre::eyre::eyre!("auth is not configured; run `everdo config init` and fill in [auth]")
    })?;
    Ok(RestAuthProvider::new(cfg))
}

pub fn image_uploader(config: &Config) -> Result<CloudinaryUploader> {
    let cfg = config.cloudinary.clone().ok_or_else(|| {
        color_eyre::eyre::eyre!(
            "cloudinary is not configured; run `everdo config init` and fill in [cloudinary]"
        )
    })?;
    Ok(CloudinaryUploader::new(cfg))
}
