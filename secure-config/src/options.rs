//! Construction parameters for [`ConfigStore`]. They can be assembled in code
//! through [`StoreBuilder`] or read from a JSON document such as:
//!
//! ```json
//! { "file": "app.ini", "key_path": "app.key", "user": "alice", "strict": true }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};
use zeroize::Zeroizing;

use crate::error::{Result, StoreError};
use crate::store::ConfigStore;

#[derive(Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreOptions {
    /// Backing INI file. Loaded at open time when it already exists.
    pub file: Option<PathBuf>,
    /// Raw store key. Takes precedence over `key_path`.
    #[serde(deserialize_with = "key_from_text")]
    pub key: Option<Vec<u8>>,
    /// File holding the store key as text; surrounding whitespace is ignored.
    pub key_path: Option<PathBuf>,
    /// Overrides the encryption flag; defaults to "a key is set".
    pub encryption: Option<bool>,
    pub user: Option<String>,
    /// Enables credential checks together with `user`.
    pub password: Option<String>,
    /// Fail `set_option` on a missing section instead of ignoring the write.
    pub strict: bool,
}

fn key_from_text<'de, D>(deserializer: D) -> std::result::Result<Option<Vec<u8>>, D::Error>
where
    D: Deserializer<'de>,
{
    let text: Option<String> = Option::deserialize(deserializer)?;
    Ok(text.map(String::into_bytes))
}

impl StoreOptions {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| StoreError::Options(format!("{e}")))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .map_err(|e| StoreError::Options(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&raw)
    }

    /// Resolves the key from `key` or, failing that, `key_path`.
    pub(crate) fn resolve_key(&self) -> Result<Option<Zeroizing<Vec<u8>>>> {
        if let Some(key) = self.key.as_ref().filter(|k| !k.is_empty()) {
            return Ok(Some(Zeroizing::new(key.clone())));
        }
        let Some(path) = &self.key_path else {
            return Ok(None);
        };
        let content = Zeroizing::new(
            fs::read(path)
                .map_err(|e| StoreError::Options(format!("key file {}: {e}", path.display())))?,
        );
        let start = content
            .iter()
            .position(|b| !b.is_ascii_whitespace())
            .unwrap_or(content.len());
        let end = content
            .iter()
            .rposition(|b| !b.is_ascii_whitespace())
            .map_or(start, |last| last + 1);
        let trimmed = &content[start..end];
        if trimmed.is_empty() {
            return Err(StoreError::Options(format!(
                "key file {} is empty",
                path.display()
            )));
        }
        Ok(Some(Zeroizing::new(trimmed.to_vec())))
    }
}

impl std::fmt::Debug for StoreOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreOptions")
            .field("file", &self.file)
            .field("key", &self.key.as_ref().map(|_| "<redacted>"))
            .field("key_path", &self.key_path)
            .field("encryption", &self.encryption)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("strict", &self.strict)
            .finish()
    }
}

/// Fluent construction of a [`ConfigStore`].
#[derive(Debug, Default)]
pub struct StoreBuilder {
    options: StoreOptions,
}

impl StoreBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.file = Some(path.into());
        self
    }

    pub fn key(mut self, key: impl AsRef<[u8]>) -> Self {
        self.options.key = Some(key.as_ref().to_vec());
        self
    }

    pub fn key_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.key_path = Some(path.into());
        self
    }

    pub fn encryption(mut self, enabled: bool) -> Self {
        self.options.encryption = Some(enabled);
        self
    }

    pub fn credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.options.user = Some(user.into());
        self.options.password = Some(password.into());
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.options.strict = strict;
        self
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    pub fn open(self) -> Result<ConfigStore> {
        ConfigStore::open(self.options)
    }
}

impl From<StoreOptions> for StoreBuilder {
    fn from(options: StoreOptions) -> Self {
        Self { options }
    }
}
