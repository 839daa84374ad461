//! Error types for the migration engine
//!
//! Everything a migration run can fail with is collected in
//! [`MigrationError`]. The variants fall into three groups:
//!
//! - Drift between the local migration set and the remote ledger
//!   ([`MigrationError::VersionMismatch`], [`MigrationError::ChecksumMismatch`],
//!   [`MigrationError::NameMismatch`], [`MigrationError::NonMonotonicVersion`],
//!   [`MigrationError::InconsistentHistory`]) - always fatal, never retried.
//! - Run-time failures ([`MigrationError::MigrationFailed`],
//!   [`MigrationError::AlreadyExists`], [`MigrationError::Transport`]).
//! - Caller mistakes ([`MigrationError::InvalidMeta`],
//!   [`MigrationError::DuplicateVersion`]).

use thiserror::Error;

use crate::transport::TransportError;

/// Errors raised while validating or applying a migration set
#[derive(Debug, Error)]
pub enum MigrationError {
    /// A prior ledger entry is not in SUCCESS state and the caller did not
    /// opt to ignore previous failures
    #[error("previous migration version {version} is not in SUCCESS state: {message}")]
    PreviousMigrationFailed { version: u32, message: String },

    /// The local migration set is missing history the ledger already recorded
    #[error("local migration set is smaller than the applied history (local entries: {local}, applied entries: {applied})")]
    InconsistentHistory { local: usize, applied: usize },

    /// A ledger entry and the local entry at the same position disagree on version
    #[error("version mismatch for '{name}': local version {local}, recorded version {remote}")]
    VersionMismatch { name: String, local: u32, remote: u32 },

    /// The local and recorded checksum sets for a version share no element
    #[error("checksum mismatch for version {version} ('{name}'): local {local}, recorded {remote}")]
    ChecksumMismatch {
        version: u32,
        name: String,
        local: String,
        remote: String,
    },

    /// A ledger entry and the local entry for the same version disagree on name
    #[error("name mismatch for version {version}: local '{local}', recorded '{remote}'")]
    NameMismatch {
        version: u32,
        local: String,
        remote: String,
    },

    /// A local entry beyond the recorded history is not strictly newer than
    /// the latest applied version
    #[error("migration set contains version {version} which is not greater than the latest applied version {latest_applied}")]
    NonMonotonicVersion { version: u32, latest_applied: u32 },

    /// The conditional ledger insert lost to an existing entry, either from a
    /// racing runner or a corrupt partial prior run
    #[error("ledger entry for '{identifier}' version {version} already exists")]
    AlreadyExists { identifier: String, version: u32 },

    /// A ledger update targeted an entry that does not exist
    #[error("no ledger entry for '{identifier}' version {version}")]
    NotFound { identifier: String, version: u32 },

    /// Executing a migration's operations failed; the ledger entry has been
    /// marked FAILURE and no later version was attempted
    #[error("migration version {version} ('{name}') failed: {message}")]
    MigrationFailed {
        version: u32,
        name: String,
        message: String,
    },

    /// Migration metadata failed validation at construction
    #[error("invalid migration metadata: {0}")]
    InvalidMeta(String),

    /// A migration set contains the same version twice
    #[error("duplicate migration version {0} in migration set")]
    DuplicateVersion(u32),

    /// I/O or remote failure talking to the cluster
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

impl MigrationError {
    /// Returns true if this error reports structural drift between the local
    /// migration set and the remote ledger
    pub fn is_drift(&self) -> bool {
        matches!(
            self,
            Self::InconsistentHistory { .. }
                | Self::VersionMismatch { .. }
                | Self::ChecksumMismatch { .. }
                | Self::NameMismatch { .. }
                | Self::NonMonotonicVersion { .. }
        )
    }

    /// Returns true if this error came from the transport layer
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
