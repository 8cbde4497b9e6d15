//! Store configuration.
//!
//! A [`StoreConfig`] is read once when the store is opened and is immutable
//! for the rest of the process lifetime. When no configuration is supplied to
//! [`StoreManager::setup`](crate::StoreManager::setup), [`StoreConfig::default`]
//! is used: an on-disk store at [`DEFAULT_STORE_FILE`] that discards and
//! recreates itself when the on-disk schema is incompatible.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name used by the default configuration, resolved against the current
/// working directory.
pub const DEFAULT_STORE_FILE: &str = "default.db";

/// Where the store lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Location {
    /// Persistent store backed by a file at this path. The file is created
    /// on first open.
    OnDisk(PathBuf),
    /// Volatile store that lives only as long as the handle.
    InMemory,
}

/// What to do when the on-disk schema version does not match the configured
/// one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecoveryPolicy {
    /// Destroy and recreate the store instead of migrating. All stored data
    /// is lost.
    DiscardIfIncompatible,
    /// Refuse to open; the mismatch surfaces as
    /// [`Error::IncompatibleSchema`](crate::Error::IncompatibleSchema).
    Strict,
}

/// Configuration for opening a store.
///
/// # Example
///
/// ```rust,ignore
/// use depot::{RecoveryPolicy, StoreConfig};
///
/// let config = StoreConfig::on_disk("cache/app.db")
///     .schema_version(3)
///     .recovery(RecoveryPolicy::Strict);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Where the store lives.
    pub location: Location,
    /// Version the caller's record types expect. Compared against the stamp
    /// persisted in the store on every open.
    pub schema_version: u32,
    /// Policy applied when the versions disagree.
    pub recovery: RecoveryPolicy,
}

impl StoreConfig {
    /// Configuration for a persistent store at `path`.
    pub fn on_disk(path: impl Into<PathBuf>) -> Self {
        Self {
            location: Location::OnDisk(path.into()),
            ..Self::default()
        }
    }

    /// Configuration for a volatile in-memory store.
    pub fn in_memory() -> Self {
        Self {
            location: Location::InMemory,
            ..Self::default()
        }
    }

    /// Set the expected schema version.
    pub fn schema_version(mut self, version: u32) -> Self {
        self.schema_version = version;
        self
    }

    /// Set the recovery policy for version mismatches.
    pub fn recovery(mut self, policy: RecoveryPolicy) -> Self {
        self.recovery = policy;
        self
    }

    /// The configured on-disk path, if any.
    pub fn file_path(&self) -> Option<&Path> {
        match &self.location {
            Location::OnDisk(path) => Some(path),
            Location::InMemory => None,
        }
    }
}

impl Default for StoreConfig {
    /// On-disk store at [`DEFAULT_STORE_FILE`], schema version 1, discarding
    /// on incompatibility.
    fn default() -> Self {
        Self {
            location: Location::OnDisk(PathBuf::from(DEFAULT_STORE_FILE)),
            schema_version: 1,
            recovery: RecoveryPolicy::DiscardIfIncompatible,
        }
    }
}
