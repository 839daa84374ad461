//! # Seaway Elasticsearch
//!
//! The Elasticsearch-facing collaborators for the `seaway-core` migration
//! engine:
//!
//! - [`Elasticsearch`]: a reqwest-backed [`seaway_core::Transport`] with
//!   basic auth, timeouts, and fixed-backoff retry for transient failures.
//! - [`Change`]: the typed catalogue of cluster changes a migration file can
//!   declare, translated into opaque operations for the engine.
//! - [`YamlDirectorySource`]: reads `V<version>__<name>.yaml` files from a
//!   directory into a validated migration set, computing SHA-256 content
//!   checksums along the way.
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
//!         .basic_auth("elastic", "changeme")
//!         .retry_count(3)
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
//! ## Migration file format
//!
//! ```yaml
//! migrations:
//!   - type: CREATE_INDEX
//!     index: events
//!     definition: '{"settings": {"index": {"number_of_shards": 1}}}'
//!   - type: INDEX_DOCUMENT
//!     index: events
//!     id: seed
//!     op_type: CREATE
//!     definition: '{"kind": "genesis"}'
//! ```

pub mod changes;
mod client;
mod error;
pub mod source;

pub use changes::{Change, OpType};
pub use client::{Elasticsearch, ElasticsearchBuilder, RetryPolicy};
pub use error::Error;
pub use source::YamlDirectorySource;
