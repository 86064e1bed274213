use std::sync::Mutex;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::{rngs::OsRng, RngCore};

use crate::SessionError;

/// Where the 256-bit session-file key comes from.
pub trait SessionKeySource: Send + Sync {
    fn load_or_generate(&self) -> Result<[u8; 32], SessionError>;
}

/// OS keyring-backed source. The key is generated once and parked in the
/// keychain; the session file on disk is useless without it.
pub struct KeyringKeySource {
    service: String,
    account: String,
}

impl KeyringKeySource {
    pub fn new(service: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            account: account.into(),
        }
    }
}

impl SessionKeySource for KeyringKeySource {
    fn load_or_generate(&self) -> Result<[u8; 32], SessionError> {
        let entry = keyring::Entry::new(&self.service, &self.account)
            .map_err(|e| SessionError::Keyring(e.to_string()))?;
        if let Ok(secret) = entry.get_password() {
            return decode_key(&secret);
        }
        let key = generate_key();
        entry
            .set_password(&STANDARD.encode(key))
            .map_err(|e| SessionError::Keyring(e.to_string()))?;
        Ok(key)
    }
}

/// Process-local source for tests; the key dies with the process.
#[derive(Default)]
pub struct EphemeralKeySource {
    key: Mutex<Option<[u8; 32]>>,
}

impl SessionKeySource for EphemeralKeySource {
    fn load_or_generate(&self) -> Result<[u8; 32], SessionError> {
        let mut guard = self
            .key
            .lock()
            .map_err(|err| SessionError::Crypto(format!("lock poisoned: {err}")))?;
        Ok(*guard.get_or_insert_with(generate_key))
    }
}

fn generate_key() -> [u8; 32] {
    let mut key = [0u8; 32];
    OsRng.fill_bytes(&mut key);
    key
}

fn decode_key(secret: &str) -> Result<[u8; 32], SessionError> {
    let bytes = STANDARD
        .decode(secret)
        .map_err(|e| SessionError::Keyring(e.to_string()))?;
    let len = bytes.len();
    bytes
        .try_into()
        .map_err(|_| SessionError::Keyring(format!("expected 32 key bytes, got {len}")))
}
