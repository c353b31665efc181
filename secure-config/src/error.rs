use std::path::PathBuf;

use thiserror::Error;

use crate::crypto::cipher::CipherError;
use crate::ini::ParseError;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("section '{0}' not found")]
    SectionNotFound(String),
    #[error("invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },
    #[error("option '{option}' not found in section '{section}'")]
    OptionNotFound { section: String, option: String },
    #[error("credentials are invalid")]
    Authentication,
    #[error("credentials rejected: {0}")]
    InvalidCredentials(&'static str),
    #[error("decryption failed: {0}")]
    Decryption(String),
    #[error("config content is not valid utf-8: {0}")]
    Encoding(String),
    #[error("config parse failed: {0}")]
    Parse(#[from] ParseError),
    #[error("encryption is enabled but no key is set")]
    MissingKey,
    #[error("no config file path configured")]
    NoConfigFile,
    #[error("config file io failed: {0}")]
    Io(String),
    #[error("store options invalid: {0}")]
    Options(String),
    #[error("crypto error: {0}")]
    Crypto(String),
}

impl From<CipherError> for StoreError {
    fn from(value: CipherError) -> Self {
        match value {
            CipherError::DecryptionFailed(reason) => StoreError::Decryption(reason),
            other => StoreError::Crypto(format!("{other}")),
        }
    }
}
