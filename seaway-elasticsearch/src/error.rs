//! Error types for the Elasticsearch collaborators

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the client builder and the YAML migration source
///
/// Transport failures during execution are reported through
/// [`seaway_core::TransportError`]; this type covers everything that happens
/// before a request is on the wire.
#[derive(Debug, Error)]
pub enum Error {
    /// Client configuration problem (bad base URL, HTTP client setup)
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Failed to read a migration file or scan the directory
    #[error("I/O error for {path}: {message}")]
    Io { path: PathBuf, message: String },

    /// A migration file is not valid YAML or does not match the schema
    #[error("failed to parse {path}: {message}")]
    InvalidMigrationFile { path: PathBuf, message: String },

    /// Validation failure from the core model (bad metadata, duplicate
    /// versions)
    #[error(transparent)]
    Migration(#[from] seaway_core::MigrationError),
}
