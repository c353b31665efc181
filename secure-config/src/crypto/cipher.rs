//! Authenticated encryption of the serialized store, built on ChaCha20-Poly1305.
//! The on-disk payload is `nonce || ciphertext || tag`; nothing else frames it.

use base64::{engine::general_purpose::URL_SAFE, Engine};
use chacha20poly1305::aead::{Aead, AeadCore, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;
use zeroize::{Zeroize, Zeroizing};

use super::integrity::hkdf_expand;

const NONCE_SIZE: usize = 12;
const TAG_SIZE: usize = 16;
const CIPHER_KEY_LEN: usize = 32;
const GENERATED_KEY_LEN: usize = 32;

const KDF_SALT: &[u8] = b"secure-config/v1";
const KDF_INFO: &[u8] = b"payload-encryption";

#[derive(Debug, Error)]
pub enum CipherError {
    #[error("encryption key is empty")]
    EmptyKey,
    #[error("key derivation failed: {0}")]
    DerivationFailed(String),
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),
    #[error("decryption failed: {0}")]
    DecryptionFailed(String),
}

/// Generates a fresh random key, URL-safe base64 encoded so it can be kept in
/// a text key file.
pub fn generate_key() -> Zeroizing<Vec<u8>> {
    let mut raw = Zeroizing::new([0u8; GENERATED_KEY_LEN]);
    OsRng.fill_bytes(&mut raw[..]);
    Zeroizing::new(URL_SAFE.encode(&raw[..]).into_bytes())
}

/// Encrypts and decrypts whole payloads under a key derived from arbitrary
/// store key bytes.
pub struct PayloadCipher {
    key: Key,
}

impl PayloadCipher {
    /// Derives the cipher key from the store key with HKDF-SHA256.
    pub fn from_store_key(store_key: &[u8]) -> Result<Self, CipherError> {
        if store_key.is_empty() {
            return Err(CipherError::EmptyKey);
        }
        let mut derived = hkdf_expand(store_key, KDF_SALT, KDF_INFO, CIPHER_KEY_LEN)
            .map_err(|e| CipherError::DerivationFailed(format!("{e}")))?;
        let mut key = Key::default();
        key.copy_from_slice(&derived);
        derived.zeroize();
        Ok(Self { key })
    }

    /// Encrypts `plaintext` under a fresh nonce.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CipherError> {
        let cipher = ChaCha20Poly1305::new(&self.key);
        let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);
        let ciphertext_and_tag = cipher
            .encrypt(&nonce, plaintext)
            .map_err(|e| CipherError::EncryptionFailed(format!("{e}")))?;

        let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext_and_tag.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext_and_tag);
        Ok(out)
    }

    /// Authenticates and decrypts a payload produced by [`PayloadCipher::encrypt`].
    pub fn decrypt(&self, payload: &[u8]) -> Result<Vec<u8>, CipherError> {
        if payload.len() < NONCE_SIZE + TAG_SIZE {
            return Err(CipherError::DecryptionFailed(
                "payload shorter than nonce and authentication tag".to_string(),
            ));
        }
        let (nonce, ciphertext_and_tag) = payload.split_at(NONCE_SIZE);
        let cipher = ChaCha20Poly1305::new(&self.key);
        cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext_and_tag)
            .map_err(|e| CipherError::DecryptionFailed(format!("{e}")))
    }
}

impl Drop for PayloadCipher {
    fn drop(&mut self) {
        self.key.as_mut_slice().zeroize();
    }
}
