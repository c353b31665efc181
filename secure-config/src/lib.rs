//! Credential-gated INI configuration store with optional encryption at rest.
//!
//! A [`ConfigStore`] keeps named sections of string options in memory and
//! persists them to a single file. With a key set, the whole serialized file
//! is encrypted; with a username and password set, every operation is checked
//! against a salted digest kept in the file's `security` section.

pub mod crypto;
pub mod error;
pub mod ini;
pub mod options;
pub mod store;

pub use error::{Result, StoreError};
pub use ini::{Section, SectionTable};
pub use options::{StoreBuilder, StoreOptions};
pub use store::ConfigStore;
