//! Encrypted on-disk cache of the signed-in auth session. The remote
//! provider owns authentication; this crate only keeps the issued tokens
//! readable across CLI runs without leaving them in plaintext.

pub mod keys;
pub mod session_file;

use thiserror::Error;

pub use keys::{EphemeralKeySource, KeyringKeySource, SessionKeySource};
pub use session_file::SessionFile;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("keyring error: {0}")]
    Keyring(String),
    #[error("session crypto failure: {0}")]
    Crypto(String),
    #[error("session file corrupt: {0}")]
    Corrupt(String),
    #[error("session io error: {0}")]
    Io(String),
}
