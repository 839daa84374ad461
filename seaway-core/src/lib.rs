//! # Seaway Core
//!
//! A Flyway-style migration engine for Elasticsearch clusters. An ordered,
//! versioned set of changes is applied exactly once per logical identifier;
//! progress is recorded in a ledger index kept in the cluster itself, and
//! every run first verifies that the locally supplied migration set still
//! matches the recorded history.
//!
//! This crate is transport-agnostic: it speaks to the cluster only through
//! the [`Transport`] trait. The `seaway-elasticsearch` crate provides the
//! reqwest-backed implementation, the typed change catalogue, and the YAML
//! migration source.
//!
//! ## Quick Start
//!
//! ```ignore
//! use seaway_core::{Migrator, MigratorConfig};
//! use seaway_elasticsearch::{Elasticsearch, YamlDirectorySource};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let transport = Elasticsearch::builder()
//!         .base_url("http://localhost:9200")
//!         .build()?;
//!
//!     let set = YamlDirectorySource::new("./migrations").migration_set()?;
//!
//!     let migrator = Migrator::initialize(transport, MigratorConfig::new(false)).await?;
//!     migrator.apply_migration_set("orders", &set).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Guarantees and limits
//!
//! - Versions apply in ascending order; operations within a version apply in
//!   declared order; every remote call is awaited before the next.
//! - A version already present in the ledger (in any state) is never
//!   re-executed.
//! - The conditional ledger insert is the only concurrency guard: of two
//!   racing runners, exactly one claims a version and the other fails the
//!   run. It protects only the claim, not the execution that follows.
//! - Operations are not rolled back. A failed run leaves earlier versions
//!   SUCCESS, the failed version FAILURE, and later versions untouched.
//! - A crash between the claim and the final update leaves the entry
//!   IN_PROGRESS permanently; the next run reports it as a previous failure.

// Domain modules
pub mod checker;
mod error;
pub mod ledger;
pub mod migration;
pub mod operation;
pub mod probe;
mod transport;

mod migrator;

#[cfg(test)]
pub(crate) mod test_utils;

// Orchestration surface
pub use migrator::{Migrator, MigratorConfig};

// Error types
pub use error::MigrationError;

// Transport seam
pub use transport::{Response, Transport, TransportError};

// Model types
pub use ledger::{LedgerEntry, LedgerStore, MigrationState, LEDGER_INDEX};
pub use migration::{MigrationMeta, MigrationSet, MigrationSetEntry};
pub use operation::{Method, Operation};
pub use probe::ClusterProbe;
