//! Secret encryption
//!
//! A single process-wide key is derived from `EIFL_ENCRYPTION_KEY` with
//! PBKDF2-HMAC-SHA-256 (100,000 iterations, fixed application salt) and
//! used to seal secret values with AES-256-GCM under a fresh 96-bit nonce
//! per encryption. Ciphertext and IV are stored base64-encoded.
//!
//! Rotating the environment key makes existing ciphertexts unreadable;
//! re-encryption is a manual operation.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use thiserror::Error;
use tokio::sync::OnceCell;

const KEY_SALT: &[u8] = b"eifl-secret-storage";
const PBKDF2_ITERATIONS: u32 = 100_000;
const MIN_KEY_LENGTH: usize = 32;
const NONCE_LENGTH: usize = 12;

/// Secret encryption errors
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("EIFL_ENCRYPTION_KEY is not set; secret management is not configured")]
    NotConfigured,

    #[error("EIFL_ENCRYPTION_KEY must be at least {MIN_KEY_LENGTH} characters (got {0})")]
    KeyTooShort(usize),

    #[error("encryption failed")]
    Encrypt,

    #[error("decryption failed: {0}")]
    Decrypt(String),

    #[error("key derivation task failed")]
    Derivation,
}

/// An encrypted secret value as stored
#[derive(Debug, Clone)]
pub struct EncryptedSecret {
    pub ciphertext: String,
    pub iv: String,
}

/// AEAD cipher for secret values
pub struct SecretCipher {
    cipher: Aes256Gcm,
}

impl SecretCipher {
    /// Derive the cipher from a master key string
    pub fn derive(master: &str) -> Result<Self, CryptoError> {
        if master.len() < MIN_KEY_LENGTH {
            return Err(CryptoError::KeyTooShort(master.len()));
        }

        let mut key = [0u8; 32];
        pbkdf2_hmac::<Sha256>(master.as_bytes(), KEY_SALT, PBKDF2_ITERATIONS, &mut key);

        let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| CryptoError::Encrypt)?;
        Ok(Self { cipher })
    }

    /// Encrypt a UTF-8 plaintext under a fresh random nonce
    pub fn encrypt(&self, plaintext: &str) -> Result<EncryptedSecret, CryptoError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| CryptoError::Encrypt)?;

        Ok(EncryptedSecret {
            ciphertext: BASE64.encode(ciphertext),
            iv: BASE64.encode(nonce.as_slice()),
        })
    }

    /// Decrypt a stored ciphertext/IV pair back to the plaintext
    pub fn decrypt(&self, ciphertext_b64: &str, iv_b64: &str) -> Result<String, CryptoError> {
        let ciphertext = BASE64
            .decode(ciphertext_b64)
            .map_err(|e| CryptoError::Decrypt(format!("invalid base64 in ciphertext: {e}")))?;

        let iv = BASE64
            .decode(iv_b64)
            .map_err(|e| CryptoError::Decrypt(format!("invalid base64 in iv: {e}")))?;

        if iv.len() != NONCE_LENGTH {
            return Err(CryptoError::Decrypt(format!(
                "invalid IV length: {} (expected {NONCE_LENGTH})",
                iv.len()
            )));
        }

        let nonce = Nonce::from_slice(&iv);
        let plaintext = self
            .cipher
            .decrypt(nonce, ciphertext.as_ref())
            .map_err(|_| CryptoError::Decrypt("AES-GCM authentication failed".to_string()))?;

        String::from_utf8(plaintext)
            .map_err(|e| CryptoError::Decrypt(format!("plaintext is not valid UTF-8: {e}")))
    }
}

/// Lazily derived, process-wide cipher
///
/// PBKDF2 runs once, off the async executor, on first use; every later
/// call returns the cached cipher. A missing key surfaces as
/// `NotConfigured` on each call so operators can fix the environment and
/// restart without the handle caching the failure.
pub struct SecretCipherHandle {
    master: Option<String>,
    cell: OnceCell<std::sync::Arc<SecretCipher>>,
}

impl SecretCipherHandle {
    /// Capture `EIFL_ENCRYPTION_KEY` from the environment
    pub fn from_env() -> Self {
        Self::with_key(std::env::var("EIFL_ENCRYPTION_KEY").ok())
    }

    /// Build a handle around an explicit key (or its absence)
    pub fn with_key(master: Option<String>) -> Self {
        Self {
            master,
            cell: OnceCell::new(),
        }
    }

    /// Whether a key was configured at all
    pub fn is_configured(&self) -> bool {
        self.master.is_some()
    }

    /// Get the derived cipher, deriving it on first call
    pub async fn get(&self) -> Result<std::sync::Arc<SecretCipher>, CryptoError> {
        let master = self.master.clone().ok_or(CryptoError::NotConfigured)?;

        self.cell
            .get_or_try_init(|| async move {
                tokio::task::spawn_blocking(move || {
                    SecretCipher::derive(&master).map(std::sync::Arc::new)
                })
                .await
                .map_err(|_| CryptoError::Derivation)?
            })
            .await
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn test_round_trip() {
        let cipher = SecretCipher::derive(KEY).unwrap();
        let sealed = cipher.encrypt("hunter2").unwrap();
        assert_eq!(cipher.decrypt(&sealed.ciphertext, &sealed.iv).unwrap(), "hunter2");
    }

    #[test]
    fn test_distinct_ciphertexts_for_same_plaintext() {
        let cipher = SecretCipher::derive(KEY).unwrap();
        let a = cipher.encrypt("same value").unwrap();
        let b = cipher.encrypt("same value").unwrap();
        assert_ne!(a.ciphertext, b.ciphertext);
        assert_ne!(a.iv, b.iv);
    }

    #[test]
    fn test_wrong_key_fails_to_decrypt() {
        let cipher = SecretCipher::derive(KEY).unwrap();
        let other = SecretCipher::derive("ffffffffffffffffffffffffffffffff").unwrap();
        let sealed = cipher.encrypt("secret").unwrap();
        assert!(matches!(
            other.decrypt(&sealed.ciphertext, &sealed.iv),
            Err(CryptoError::Decrypt(_))
        ));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let cipher = SecretCipher::derive(KEY).unwrap();
        let sealed = cipher.encrypt("secret").unwrap();
        let mut bytes = BASE64.decode(&sealed.ciphertext).unwrap();
        bytes[0] ^= 0xff;
        let tampered = BASE64.encode(bytes);
        assert!(cipher.decrypt(&tampered, &sealed.iv).is_err());
    }

    #[test]
    fn test_short_key_rejected() {
        assert!(matches!(
            SecretCipher::derive("too short"),
            Err(CryptoError::KeyTooShort(9))
        ));
    }

    #[tokio::test]
    async fn test_handle_without_key() {
        let handle = SecretCipherHandle::with_key(None);
        assert!(!handle.is_configured());
        assert!(matches!(handle.get().await, Err(CryptoError::NotConfigured)));
    }

    #[tokio::test]
    async fn test_handle_caches_derivation() {
        let handle = SecretCipherHandle::with_key(Some(KEY.to_string()));
        let a = handle.get().await.unwrap();
        let b = handle.get().await.unwrap();
        assert!(std::sync::Arc::ptr_eq(&a, &b));
    }
}
