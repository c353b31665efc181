//! Hashing and key-derivation primitives shared by the credential and cipher
//! modules. Kept apart from both so neither grows its own SHA-256 plumbing.

use hkdf::Hkdf;
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IntegrityError {
    #[error("hkdf expansion failed: {0}")]
    HkdfFailed(String),
}

/// Produces a raw SHA-256 digest over the concatenation of `parts`.
pub fn sha256_digest(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// Lowercase hexadecimal SHA-256 over the concatenation of `parts`.
pub fn sha256_hex(parts: &[&[u8]]) -> String {
    hex::encode(sha256_digest(parts))
}

/// Derives key material using HKDF-SHA256.
pub fn hkdf_expand(
    input_key_material: &[u8],
    salt: &[u8],
    info: &[u8],
    length: usize,
) -> Result<Vec<u8>, IntegrityError> {
    let hk = Hkdf::<Sha256>::new(Some(salt), input_key_material);
    let mut okm = vec![0u8; length];
    hk.expand(info, &mut okm)
        .map_err(|e| IntegrityError::HkdfFailed(format!("{e}")))?;
    Ok(okm)
}
