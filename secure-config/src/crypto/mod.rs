//! Cryptography used by the store: the credential digest, the payload cipher,
//! and the hashing helpers both are built from.

pub mod cipher;
pub mod credentials;
pub mod integrity;
