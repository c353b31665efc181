//! Salted credential digests. The digest layout is fixed so files written by
//! earlier versions of the store keep verifying:
//! `hex(sha256(salt || password || user))` over the UTF-8 bytes.

use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroizing;

use super::integrity::sha256_hex;

/// Random bytes per salt; hex-encoded this gives a 32 character token.
const SALT_BYTES: usize = 16;

/// Generates a fresh hex-encoded salt.
pub fn generate_salt() -> String {
    let mut bytes = [0u8; SALT_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Computes the stored password digest for a user.
pub fn password_digest(salt: &str, password: &str, user: &str) -> String {
    sha256_hex(&[salt.as_bytes(), password.as_bytes(), user.as_bytes()])
}

/// Username and password supplied by the caller. Only held in memory; the
/// password buffer is wiped when the value is dropped.
pub struct Credentials {
    user: String,
    password: Zeroizing<String>,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: Zeroizing::new(password.into()),
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    /// Digest of this pair under `salt`.
    pub fn digest(&self, salt: &str) -> String {
        password_digest(salt, &self.password, &self.user)
    }

    /// Whether this pair reproduces `stored_digest` under `salt`.
    pub fn matches(&self, salt: &str, stored_digest: &str) -> bool {
        self.digest(salt) == stored_digest
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}
