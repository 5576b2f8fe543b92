//! Local AES-256-GCM-SIV encryption of card payloads.
//!
//! Tokens have the form `v1.<base64url(nonce)>.<base64url(ciphertext+tag)>`.
//! A fresh random 96-bit nonce is drawn from the OS CSPRNG for every payload.

use crate::domain::ports::EncryptionService;
use crate::error::{CseError, ServiceError};
use aes_gcm_siv::{
    Aes256GcmSiv, Nonce,
    aead::{Aead, KeyInit, OsRng, rand_core::RngCore},
};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};

/// Byte length of an AES-256 key.
pub const KEY_LEN: usize = 32;

/// Byte length of an AES-GCM-SIV nonce.
pub const NONCE_LEN: usize = 12;

pub const VERSION_PREFIX: &str = "v1";

/// Encrypts payloads in-process with a key held in memory.
#[derive(Clone)]
pub struct AeadEncryptionService {
    cipher: Aes256GcmSiv,
}

impl AeadEncryptionService {
    pub fn new(key: &[u8]) -> Result<Self, CseError> {
        if key.len() != KEY_LEN {
            return Err(CseError::InvalidKey(format!(
                "expected {KEY_LEN} bytes, got {}",
                key.len()
            )));
        }
        let cipher = Aes256GcmSiv::new_from_slice(key)
            .map_err(|_| CseError::InvalidKey("rejected by cipher".to_string()))?;
        Ok(Self { cipher })
    }

    /// Decodes a base64 (standard alphabet) key, as stored in configuration.
    pub fn from_base64(encoded: &str) -> Result<Self, CseError> {
        let key = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| CseError::InvalidKey(e.to_string()))?;
        Self::new(&key)
    }

    fn seal(&self, plain: &[u8]) -> Result<String, ServiceError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plain)
            .map_err(|_| ServiceError::Encryption("aead operation failed".to_string()))?;

        Ok(format!(
            "{}.{}.{}",
            VERSION_PREFIX,
            URL_SAFE_NO_PAD.encode(nonce_bytes),
            URL_SAFE_NO_PAD.encode(ciphertext),
        ))
    }

    /// Reverses [`EncryptionService::encrypt`] for a token produced with the same key.
    pub fn open(&self, token: &str) -> Result<String, ServiceError> {
        let invalid = || ServiceError::Encryption("invalid token format".to_string());

        let parts: Vec<&str> = token.splitn(3, '.').collect();
        if parts.len() != 3 || parts[0] != VERSION_PREFIX {
            return Err(invalid());
        }
        let nonce_bytes = URL_SAFE_NO_PAD.decode(parts[1]).map_err(|_| invalid())?;
        if nonce_bytes.len() != NONCE_LEN {
            return Err(invalid());
        }
        let ciphertext = URL_SAFE_NO_PAD.decode(parts[2]).map_err(|_| invalid())?;

        let plain = self
            .cipher
            .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_ref())
            .map_err(|_| ServiceError::Encryption("aead operation failed".to_string()))?;
        String::from_utf8(plain).map_err(|_| invalid())
    }
}

#[async_trait]
impl EncryptionService for AeadEncryptionService {
    async fn encrypt(&self, plain: String) -> Result<String, ServiceError> {
        self.seal(plain.as_bytes())
    }
}
