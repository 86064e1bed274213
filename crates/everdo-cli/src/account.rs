use std::{
    io::{self, BufRead, Write},
    path::Path,
};

use color_eyre::Result;
use everdo_core::{auth::AuthProvider, store::ProfileStore, upload::ImageUploader};

use crate::{config::Config, remote, session};

pub async fn signup(email: &str, config: &Config) -> Result<()> {
    let password = prompt_password()?;
    let provider = remote::auth_provider(config)?;
    let new_session = provider
        .sign_up(email, &password)
        .await
        .map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?;
    session::session_file(config)?
        .save(&new_session)
        .map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?;
    println!("Account created; signed in as {}", new_session.email);
    Ok(())
}

pub async fn login(email: &str, config: &Config) -> Result<()> {
    let password = prompt_password()?;
    let provider = remote::auth_provider(config)?;
    let new_session = provider
        .sign_in(email, &password)
        .await
        .map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?;
    session::session_file(config)?
        .save(&new_session)
        .map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?;
    println!("Signed in as {}", new_session.email);
    Ok(())
}

pub async fn logout(config: &Config) -> Result<()> {
    let file = session::session_file(config)?;
    match file
        .load()
        .map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?
    {
        Some(cached) => {
            if let Ok(provider) = remote::auth_provider(config) {
                provider
                    .sign_out(&cached)
                    .await
                    .map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?;
            }
            file.clear()
                .map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?;
            println!("Signed out.");
        }
        None => println!("No cached session."),
    }
    Ok(())
}

pub async fn reset_password(email: &str, config: &Config) -> Result<()> {
    let provider = remote::auth_provider(config)?;
    provider
        .send_password_reset(email)
        .await
        .map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?;
    println!("Password reset email sent to {email}.");
    Ok(())
}

/// Upload an avatar image, then record the hosted URL on the profile
/// document. If the upload fails nothing is written; the previous avatar
/// stays in place.
pub async fn avatar(path: &Path, config: &Config) -> Result<()> {
    let cached = session::require_session(config)?;
    let uploader = remote::image_uploader(config)?;
    let store = remote::task_store(config, &cached)?;

    let bytes = std::fs::read(path)?;
    let file_name = format!("avatar_{}", cached.uid);
    let url = uploader
        .upload(&file_name, bytes)
        .await
        .map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?;
    store
        .set_avatar_url(&cached.uid, &url)
        .await
        .map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?;
    println!("Avatar updated: {url}");
    Ok(())
}

fn prompt_password() -> Result<String> {
    print!("Password: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
