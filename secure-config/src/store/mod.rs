//! The configuration store handle.
//!
//! Every section/option operation, and every load or save driven by the
//! caller, calls [`ConfigStore::guard`] first. When the handle was opened with
//! a username and password the guard re-verifies them against the `security`
//! section on each call, so a stored digest that stops matching blocks all
//! further access.

mod persist;
mod security;

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::crypto::credentials::Credentials;
use crate::error::{Result, StoreError};
use crate::ini::{self, Section, SectionTable};
use crate::options::{StoreBuilder, StoreOptions};

pub use security::{PASSWORD_OPTION, SALT_OPTION, SECURITY_SECTION, USER_OPTION};

pub struct ConfigStore {
    table: SectionTable,
    key: Option<Zeroizing<Vec<u8>>>,
    encryption: bool,
    credentials: Option<Credentials>,
    config_file: Option<PathBuf>,
    strict: bool,
}

impl ConfigStore {
    pub fn builder() -> StoreBuilder {
        StoreBuilder::new()
    }

    /// Opens a store: installs the key, loads the backing file when it exists,
    /// then bootstraps the `security` section if a password was given.
    pub fn open(options: StoreOptions) -> Result<Self> {
        let key = options.resolve_key()?;
        let credentials = options
            .password
            .filter(|password| !password.is_empty())
            .map(|password| Credentials::new(options.user.unwrap_or_default(), password));

        let mut store = Self {
            table: SectionTable::new(),
            key: None,
            encryption: false,
            credentials,
            config_file: None,
            strict: options.strict,
        };
        if let Some(key) = key {
            store.set_key(&key);
        }
        if let Some(enabled) = options.encryption {
            store.encryption = enabled;
        }
        if let Some(path) = options.file {
            store.attach_file(path)?;
        }
        if store.credentials.is_some() {
            store.bootstrap_credentials();
        }
        Ok(store)
    }

    /// Disposes of the handle. Key, password, and table contents are wiped on drop.
    pub fn close(self) {
        debug!(path = ?self.config_file, "closing config store");
    }

    pub fn config_file(&self) -> Option<&Path> {
        self.config_file.as_deref()
    }

    /// Points the store at another file. An empty path is ignored; an existing
    /// file is loaded before the path is switched, a missing one is only recorded.
    pub fn set_config_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Ok(());
        }
        if path.exists() {
            self.guard()?;
        }
        self.attach_file(path.to_path_buf())
    }

    fn attach_file(&mut self, path: PathBuf) -> Result<()> {
        if path.exists() {
            self.read_file(&path)?;
        }
        self.config_file = Some(path);
        Ok(())
    }

    pub fn encryption(&self) -> bool {
        self.encryption
    }

    pub fn set_encryption(&mut self, enabled: bool) {
        self.encryption = enabled;
    }

    /// Installs `key` and enables encryption. An empty key drops the current
    /// key and disables encryption.
    pub fn set_key(&mut self, key: &[u8]) {
        if key.is_empty() {
            self.clear_key();
            return;
        }
        self.key = Some(Zeroizing::new(key.to_vec()));
        self.encryption = true;
    }

    pub fn clear_key(&mut self) {
        self.key = None;
        self.encryption = false;
    }

    pub fn has_key(&self) -> bool {
        self.key.is_some()
    }

    pub fn strict(&self) -> bool {
        self.strict
    }

    pub fn set_strict(&mut self, strict: bool) {
        self.strict = strict;
    }

    /// Rejects the call when credentials are configured but no longer verify.
    pub fn guard(&self) -> Result<()> {
        if !self.is_securable() {
            return Ok(());
        }
        if self.credentials_valid()? {
            Ok(())
        } else {
            warn!(path = ?self.config_file, "rejected access with invalid credentials");
            Err(StoreError::Authentication)
        }
    }

    /// Adds an empty section. Existing sections and empty names are left alone;
    /// names that cannot be saved as a header fail with [`StoreError::InvalidName`].
    pub fn add_section(&mut self, name: &str) -> Result<()> {
        self.guard()?;
        if name.is_empty() {
            return Ok(());
        }
        ini::validate_section_name(name).map_err(|reason| invalid_name(name, reason))?;
        self.table.add_section(name);
        Ok(())
    }

    pub fn remove_section(&mut self, name: &str) -> Result<()> {
        self.guard()?;
        self.table.remove_section(name);
        Ok(())
    }

    pub fn list_sections(&self) -> Result<Vec<String>> {
        self.guard()?;
        Ok(self.table.section_names())
    }

    pub fn has_section(&self, name: &str) -> Result<bool> {
        self.guard()?;
        Ok(self.table.has_section(name))
    }

    pub fn get_section(&self, name: &str) -> Result<Section> {
        self.guard()?;
        self.section(name).cloned()
    }

    /// Writes an option. A missing section drops the write unless the store is
    /// strict, in which case it fails with [`StoreError::SectionNotFound`].
    /// Option names that would not read back unchanged fail with
    /// [`StoreError::InvalidName`].
    pub fn set_option(&mut self, section: &str, option: &str, value: impl Into<String>) -> Result<()> {
        self.guard()?;
        if option.is_empty() {
            return Ok(());
        }
        ini::validate_option_name(option).map_err(|reason| invalid_name(option, reason))?;
        match self.table.section_mut(section) {
            Some(target) => {
                target.set(option, value);
                Ok(())
            }
            None if self.strict => Err(StoreError::SectionNotFound(section.to_string())),
            None => {
                debug!(section, option, "ignoring write to missing section");
                Ok(())
            }
        }
    }

    pub fn get_option(&self, section: &str, option: &str) -> Result<String> {
        self.guard()?;
        self.lookup(section, option).map(str::to_string)
    }

    pub fn has_option(&self, section: &str, option: &str) -> Result<bool> {
        self.guard()?;
        Ok(self.table.get(section, option).is_some())
    }

    /// Removes an option, returning whether it existed.
    pub fn remove_option(&mut self, section: &str, option: &str) -> Result<bool> {
        self.guard()?;
        let target = self
            .table
            .section_mut(section)
            .ok_or_else(|| StoreError::SectionNotFound(section.to_string()))?;
        Ok(target.remove(option).is_some())
    }

    fn section(&self, name: &str) -> Result<&Section> {
        self.table
            .section(name)
            .ok_or_else(|| StoreError::SectionNotFound(name.to_string()))
    }

    fn lookup(&self, section: &str, option: &str) -> Result<&str> {
        self.section(section)?
            .get(option)
            .ok_or_else(|| StoreError::OptionNotFound {
                section: section.to_string(),
                option: option.to_string(),
            })
    }
}

fn invalid_name(name: &str, reason: String) -> StoreError {
    StoreError::InvalidName {
        name: name.to_string(),
        reason,
    }
}

impl Drop for ConfigStore {
    fn drop(&mut self) {
        self.table.wipe();
    }
}

impl std::fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigStore")
            .field("config_file", &self.config_file)
            .field("encryption", &self.encryption)
            .field("key", &self.key.as_ref().map(|_| "<redacted>"))
            .field("credentials", &self.credentials)
            .field("strict", &self.strict)
            .field("sections", &self.table.len())
            .finish()
    }
}
