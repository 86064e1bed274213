use std::path::PathBuf;

use color_eyre::Result;
use dirs::data_dir;
use everdo_core::auth::AuthSession;
use everdo_session::{KeyringKeySource, SessionFile};
use tracing::debug;

use crate::config::Config;

const KEYRING_SERVICE: &str = "everdo-cli";
const KEYRING_ACCOUNT: &str = "session-key";

/// Resolve the default session cache location.
pub fn default_session_path() -> Result<PathBuf> {
    let base = data_dir().ok_or_else(|| color_eyre::eyre::eyre!("no data dir available"))?;
    Ok(base.join("everdo").join("session.json"))
}

/// Open the encrypted session cache, honoring a config override.
pub fn session_file(config: &Config) -> Result<SessionFile<KeyringKeySource>> {
    let path = match &config.session_path {
        Some(path) => path.clone(),
        None => default_session_path()?,
    };
    debug!(?path, "opening session cache");
    Ok(SessionFile::new(
        path,
        KeyringKeySource::new(KEYRING_SERVICE, KEYRING_ACCOUNT),
    ))
}

/// Load the cached session or explain how to get one.
pub fn require_session(config: &Config) -> Result<AuthSession> {
    session_file(config)?
        .load()
        .map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?
        .ok_or_else(|| color_eyre::eyre::eyre!("not signed in; run `everdo login <email>` first"))
}
