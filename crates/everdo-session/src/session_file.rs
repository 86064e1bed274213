use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use everdo_core::auth::AuthSession;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::{keys::SessionKeySource, SessionError};

#[derive(Debug, Serialize, Deserialize)]
struct SealedSession {
    nonce: String,
    ciphertext: String,
}

/// One AES-256-GCM encrypted document holding the cached `AuthSession`.
/// Writes go through a temp file and an atomic rename.
pub struct SessionFile<K: SessionKeySource> {
    path: PathBuf,
    keys: K,
}

impl<K: SessionKeySource> SessionFile<K> {
    pub fn new(path: impl Into<PathBuf>, keys: K) -> Self {
        Self {
            path: path.into(),
            keys,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file means signed out, not an error.
    pub fn load(&self) -> Result<Option<AuthSession>, SessionError> {
        let raw = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(SessionError::Io(err.to_string())),
        };
        let sealed: SealedSession =
            serde_json::from_slice(&raw).map_err(|e| SessionError::Corrupt(e.to_string()))?;

        let nonce_bytes = STANDARD
            .decode(sealed.nonce)
            .map_err(|e| SessionError::Corrupt(e.to_string()))?;
        if nonce_bytes.len() != 12 {
            return Err(SessionError::Corrupt(format!(
                "expected 12 nonce bytes, got {}",
                nonce_bytes.len()
            )));
        }
        let ciphertext = STANDARD
            .decode(sealed.ciphertext)
            .map_err(|e| SessionError::Corrupt(e.to_string()))?;

        let plain = self
            .cipher()?
            .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_ref())
            .map_err(|e| SessionError::Crypto(e.to_string()))?;
        let session =
            serde_json::from_slice(&plain).map_err(|e| SessionError::Corrupt(e.to_string()))?;
        Ok(Some(session))
    }

    pub fn save(&self, session: &AuthSession) -> Result<(), SessionError> {
        let cipher = self.cipher()?;
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let plain =
            serde_json::to_vec(session).map_err(|e| SessionError::Crypto(e.to_string()))?;
        let ciphertext = cipher
            .encrypt(&nonce, plain.as_ref())
            .map_err(|e| SessionError::Crypto(e.to_string()))?;
        let sealed = SealedSession {
            nonce: STANDARD.encode(nonce.as_slice()),
            ciphertext: STANDARD.encode(ciphertext),
        };

        let parent = self
            .path
            .parent()
            .ok_or_else(|| SessionError::Io("invalid session path".to_string()))?;
        fs::create_dir_all(parent).map_err(io_err)?;
        let mut tmp = NamedTempFile::new_in(parent).map_err(io_err)?;
        let json = serde_json::to_vec(&sealed).map_err(|e| SessionError::Io(e.to_string()))?;
        tmp.write_all(&json).map_err(io_err)?;
        tmp.flush().map_err(io_err)?;
        tmp.persist(&self.path)
            .map_err(|e| io_err(e.error))?;
        Ok(())
    }

    /// Removing an absent file still succeeds.
    pub fn clear(&self) -> Result<(), SessionError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(SessionError::Io(err.to_string())),
        }
    }

    fn cipher(&self) -> Result<Aes256Gcm, SessionError> {
        let key = self.keys.load_or_generate()?;
        Aes256Gcm::new_from_slice(&key).map_err(|e| SessionError::Crypto(e.to_string()))
    }
}

fn io_err(err: std::io::Error) -> SessionError {
    SessionError::Io(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::EphemeralKeySource;

    fn session() -> AuthSession {
        AuthSession {
            uid: "u1".to_string(),
            email: "user@example.com".to_string(),
            id_token: "id-token-value".to_string(),
            refresh_token: "refresh-token-value".to_string(),
        }
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = SessionFile::new(dir.path().join("session.json"), EphemeralKeySource::default());

        file.save(&session()).expect("save");
        let loaded = file.load().expect("load").expect("session present");
        assert_eq!(loaded, session());
    }

    #[test]
    fn tokens_are_not_stored_in_plaintext() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = SessionFile::new(dir.path().join("session.json"), EphemeralKeySource::default());
        file.save(&session()).expect("save");

        let on_disk = fs::read_to_string(file.path()).expect("read");
        assert!(!on_disk.contains("id-token-value"));
        assert!(!on_disk.contains("user@example.com"));
    }

    #[test]
    fn missing_file_is_signed_out() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = SessionFile::new(dir.path().join("session.json"), EphemeralKeySource::default());
        assert!(file.load().expect("load").is_none());
    }

    #[test]
    fn clear_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = SessionFile::new(dir.path().join("session.json"), EphemeralKeySource::default());
        file.save(&session()).expect("save");
        file.clear().expect("clear");
        file.clear().expect("clear again should still succeed");
        assert!(file.load().expect("load").is_none());
    }

    #[test]
    fn garbage_on_disk_is_reported_as_corrupt() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("session.json");
        fs::write(&path, b"not json at all").expect("write");
        let file = SessionFile::new(path, EphemeralKeySource::default());
        let err = file.load().expect_err("should fail");
        assert!(matches!(err, SessionError::Corrupt(_)));
    }
}
