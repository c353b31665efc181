//! Reading and writing the backing file, with the encryption transform applied
//! when the store has encryption enabled.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use zeroize::Zeroizing;

use super::ConfigStore;
use crate::crypto::cipher::{self, PayloadCipher};
use crate::error::{Result, StoreError};
use crate::ini::SectionTable;

impl ConfigStore {
    /// Reloads the current config file, replacing the in-memory table.
    pub fn load(&mut self) -> Result<()> {
        let path = self.current_file()?;
        self.load_path(path)
    }

    /// Replaces the in-memory table with the contents of `path`. The table is
    /// untouched when reading, decrypting, or parsing fails.
    pub fn load_path(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.guard()?;
        self.read_file(path.as_ref())
    }

    /// Merges INI text into the table.
    pub fn load_from_text(&mut self, text: &str) -> Result<()> {
        self.guard()?;
        let parsed = SectionTable::parse(text, "<text>")?;
        self.table.merge(parsed);
        Ok(())
    }

    /// Merges nested section/option pairs into the table. `source_label`
    /// identifies the mapping in parse errors.
    pub fn load_from_mapping<S, O, K, V>(
        &mut self,
        data: impl IntoIterator<Item = (S, O)>,
        source_label: &str,
    ) -> Result<()>
    where
        S: Into<String>,
        O: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.guard()?;
        let parsed = SectionTable::from_mapping(data, source_label)?;
        self.table.merge(parsed);
        Ok(())
    }

    /// Writes the table to the current config file.
    pub fn save(&mut self) -> Result<()> {
        let path = self.current_file()?;
        self.save_as(path)
    }

    /// Serializes the table, encrypts it when enabled, and atomically replaces
    /// `path`. Encrypted files are restricted to the owner before they appear
    /// under the target name.
    pub fn save_as(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.guard()?;
        let path = path.as_ref();
        let text = Zeroizing::new(self.table.to_ini_string());
        let payload = if self.encryption {
            self.cipher()?.encrypt(text.as_bytes())?
        } else {
            text.as_bytes().to_vec()
        };

        write_atomic(path, &payload, self.encryption)?;
        debug!(
            path = %path.display(),
            encrypted = self.encryption,
            sections = self.table.len(),
            "saved config"
        );
        Ok(())
    }

    /// Draws a new random key. With `persist` it becomes the active key and
    /// encryption is switched on; the file on disk only matches it after the
    /// next save. With `verbose` the key is printed to stdout.
    pub fn generate_key(&mut self, persist: bool, verbose: bool) -> Result<Zeroizing<Vec<u8>>> {
        self.guard()?;
        let key = cipher::generate_key();
        if verbose {
            println!("{}", String::from_utf8_lossy(&key));
        }
        if persist {
            self.key = Some(key.clone());
            self.encryption = true;
            debug!("installed generated key");
        }
        Ok(key)
    }

    pub(super) fn read_file(&mut self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(StoreError::NotFound(path.to_path_buf()));
        }
        let raw = fs::read(path).map_err(|e| StoreError::Io(format!("{}: {e}", path.display())))?;
        let content = if self.encryption {
            Zeroizing::new(self.cipher()?.decrypt(&raw)?)
        } else {
            Zeroizing::new(raw)
        };
        let text = std::str::from_utf8(&content)
            .map_err(|e| StoreError::Encoding(format!("{}: {e}", path.display())))?;
        let table = SectionTable::parse(text, &path.display().to_string())?;

        debug!(
            path = %path.display(),
            encrypted = self.encryption,
            sections = table.len(),
            "loaded config"
        );
        let mut previous = std::mem::replace(&mut self.table, table);
        previous.wipe();
        Ok(())
    }

    fn current_file(&self) -> Result<PathBuf> {
        self.config_file.clone().ok_or(StoreError::NoConfigFile)
    }

    fn cipher(&self) -> Result<PayloadCipher> {
        let key = self.key.as_ref().ok_or(StoreError::MissingKey)?;
        Ok(PayloadCipher::from_store_key(key)?)
    }
}

/// Writes to a staging file next to `path` and renames it into place, so an
/// interrupted save never truncates the previous file. With `owner_only` the
/// staging file is set to 0600 before the rename.
fn write_atomic(path: &Path, bytes: &[u8], owner_only: bool) -> Result<()> {
    let file_name = path
        .file_name()
        .ok_or_else(|| StoreError::Io(format!("{} is not a file path", path.display())))?;
    let staging = path.with_file_name(format!(
        ".{}.{:016x}.tmp",
        file_name.to_string_lossy(),
        rand::random::<u64>()
    ));

    let io_error = |e: std::io::Error| StoreError::Io(format!("{}: {e}", staging.display()));
    let written = File::create(&staging)
        .and_then(|mut file| {
            file.write_all(bytes)?;
            file.sync_all()
        })
        .map_err(io_error)
        .and_then(|()| {
            if owner_only {
                restrict_to_owner(&staging);
            }
            fs::rename(&staging, path)
                .map_err(|e| StoreError::Io(format!("{}: {e}", path.display())))
        });
    if written.is_err() {
        let _ = fs::remove_file(&staging);
    }
    written
}

fn restrict_to_owner(path: &Path) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
            warn!(path = %path.display(), "cannot restrict config file permissions: {e}");
        }
    }
    #[cfg(not(unix))]
    {
        debug!(path = %path.display(), "owner-only permissions not supported here");
    }
}
