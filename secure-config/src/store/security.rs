//! Credential bootstrap and verification against the reserved `security` section.
//!
//! Bootstrap never replaces an existing `password`/`salt` pair: reopening a
//! file with a different password has to verify against the stored digest.
//! [`ConfigStore::reset_credentials`] is the only way to rotate them.

use tracing::info;

use super::ConfigStore;
use crate::crypto::credentials::{generate_salt, Credentials};
use crate::error::{Result, StoreError};

pub const SECURITY_SECTION: &str = "security";
pub const USER_OPTION: &str = "user";
pub const PASSWORD_OPTION: &str = "password";
pub const SALT_OPTION: &str = "salt";

impl ConfigStore {
    /// True when the handle was opened with both a username and a password.
    pub fn is_securable(&self) -> bool {
        self.credentials
            .as_ref()
            .is_some_and(|credentials| !credentials.user().is_empty())
    }

    /// Recomputes the digest of the in-memory credentials with the stored salt
    /// and compares it to the stored digest. A missing `security` section or
    /// option is reported as the lookup error, not as `false`.
    pub fn credentials_valid(&self) -> Result<bool> {
        let salt = self.lookup(SECURITY_SECTION, SALT_OPTION)?;
        let stored = self.lookup(SECURITY_SECTION, PASSWORD_OPTION)?;
        Ok(self
            .credentials
            .as_ref()
            .is_some_and(|credentials| credentials.matches(salt, stored)))
    }

    /// Fills in whatever part of the `security` section is missing.
    pub(super) fn bootstrap_credentials(&mut self) {
        let Some(credentials) = &self.credentials else {
            return;
        };
        let created = self.table.add_section(SECURITY_SECTION);
        let Some(section) = self.table.section_mut(SECURITY_SECTION) else {
            return;
        };

        if created {
            let salt = generate_salt();
            section.set(USER_OPTION, credentials.user());
            section.set(PASSWORD_OPTION, credentials.digest(&salt));
            section.set(SALT_OPTION, salt);
            info!(user = credentials.user(), "created security section");
            return;
        }
        if !section.contains(PASSWORD_OPTION) {
            let salt = generate_salt();
            section.set(PASSWORD_OPTION, credentials.digest(&salt));
            section.set(SALT_OPTION, salt);
            info!("stored password digest in existing security section");
        }
        if !section.contains(USER_OPTION) {
            section.set(USER_OPTION, credentials.user());
        }
    }

    /// Replaces the stored credentials under a fresh salt and adopts the new
    /// pair for this handle. The current credentials must still verify.
    pub fn reset_credentials(&mut self, user: &str, password: &str) -> Result<()> {
        self.guard()?;
        if user.is_empty() {
            return Err(StoreError::InvalidCredentials("user name is empty"));
        }
        if password.is_empty() {
            return Err(StoreError::InvalidCredentials("password is empty"));
        }

        let credentials = Credentials::new(user, password);
        let salt = generate_salt();
        self.table.add_section(SECURITY_SECTION);
        if let Some(section) = self.table.section_mut(SECURITY_SECTION) {
            section.set(USER_OPTION, user);
            section.set(PASSWORD_OPTION, credentials.digest(&salt));
            section.set(SALT_OPTION, salt);
        }
        self.credentials = Some(credentials);
        info!(user, "reset credentials");
        Ok(())
    }
}
