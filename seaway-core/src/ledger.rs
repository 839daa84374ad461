//! The migration ledger and its store
//!
//! The ledger is an Elasticsearch index holding one document per
//! (identifier, version): the record of an applied or attempted migration.
//! [`LedgerStore`] issues the reads and writes through the [`Transport`]
//! seam. The engine is the only writer; documents are created once, updated
//! exactly once to a terminal state, and never deleted.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::MigrationError;
use crate::operation::{Method, Operation};
use crate::transport::{Transport, TransportError};

/// Name of the index holding ledger documents
pub const LEDGER_INDEX: &str = "seaway_migration_version";

/// Maximum number of ledger documents fetched per identifier
const LEDGER_SEARCH_SIZE: usize = 1000;

/// Settings and strict mapping for the ledger index
const LEDGER_INDEX_BODY: &str = r#"{
  "settings": {
    "index": {
      "number_of_shards": 1,
      "auto_expand_replicas": "0-all"
    }
  },
  "mappings": {
    "dynamic": "strict",
    "properties": {
      "identifier": { "type": "keyword" },
      "version": { "type": "integer" },
      "name": { "type": "keyword" },
      "sha256_checksum": { "type": "keyword" },
      "state": { "type": "keyword" },
      "failure_message": { "type": "text" },
      "created": { "type": "date" }
    }
  }
}"#;

/// Lifecycle state of a ledger entry
///
/// Entries are created IN_PROGRESS and transitioned exactly once to SUCCESS
/// or FAILURE. A crash between the insert and the final update leaves the
/// entry IN_PROGRESS forever; there is no reconciliation path, and the next
/// run reports it as a previous failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MigrationState {
    InProgress,
    Success,
    Failure,
}

/// One persisted ledger document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub identifier: String,
    pub version: u32,
    pub name: String,
    #[serde(rename = "sha256_checksum")]
    pub checksums: BTreeSet<String>,
    pub state: MigrationState,
    #[serde(default)]
    pub failure_message: String,
    pub created: DateTime<Utc>,
}

#[derive(Deserialize)]
struct SearchResponse {
    hits: SearchHits,
}

#[derive(Deserialize)]
struct SearchHits {
    hits: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    #[serde(rename = "_source")]
    source: LedgerEntry,
}

/// Reads and writes ledger documents through a [`Transport`]
pub struct LedgerStore<'a, T: Transport> {
    transport: &'a T,
}

impl<'a, T: Transport> LedgerStore<'a, T> {
    pub fn new(transport: &'a T) -> Self {
        Self { transport }
    }

    /// Idempotently create the ledger index
    ///
    /// The one place a remote "already exists" failure is swallowed: a 400
    /// carrying a resource-already-exists marker means a previous run (or a
    /// concurrent one) created the index, which is success here.
    pub async fn ensure_initialized(&self) -> Result<(), MigrationError> {
        let operation = Operation::new(Method::Put, format!("/{}", LEDGER_INDEX))
            .with_body(LEDGER_INDEX_BODY);
        match self.transport.execute(&operation).await {
            Ok(_) => {
                log::debug!("created ledger index '{}'", LEDGER_INDEX);
                Ok(())
            }
            Err(TransportError::Status { status: 400, message }) if is_already_exists(&message) => {
                log::debug!("ledger index '{}' already exists", LEDGER_INDEX);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Fetch all ledger entries for an identifier, ascending by version
    pub async fn fetch_all(&self, identifier: &str) -> Result<Vec<LedgerEntry>, MigrationError> {
        let query = serde_json::json!({
            "query": { "bool": { "must": { "term": { "identifier": identifier } } } },
            "size": LEDGER_SEARCH_SIZE,
        });
        let operation = Operation::new(Method::Post, format!("/{}/_search", LEDGER_INDEX))
            .with_body(query.to_string());
        let response = self.transport.execute(&operation).await?;

        let parsed: SearchResponse = response.json()?;
        let mut entries: Vec<LedgerEntry> = parsed.hits.hits.into_iter().map(|h| h.source).collect();
        entries.sort_by_key(|e| e.version);
        log::debug!(
            "fetched {} ledger entries for '{}'",
            entries.len(),
            identifier
        );
        Ok(entries)
    }

    /// Insert a new ledger entry with a conditional create
    ///
    /// Uses `op_type=create` so that exactly one of two racing runners wins
    /// the right to apply the version; the loser gets
    /// [`MigrationError::AlreadyExists`]. This conditional write is the
    /// engine's only concurrency guard.
    pub async fn insert(&self, entry: &LedgerEntry) -> Result<(), MigrationError> {
        let body = serde_json::to_string(entry)
            .map_err(|e| TransportError::InvalidResponse(format!("failed to encode ledger entry: {}", e)))?;
        let operation = Operation::new(
            Method::Put,
            format!("/{}/_doc/{}", LEDGER_INDEX, document_id(&entry.identifier, entry.version)),
        )
        .with_param("op_type", "create")
        .with_header("Content-Type", "application/json")
        .with_body(body);

        match self.transport.execute(&operation).await {
            Ok(_) => Ok(()),
            Err(TransportError::Status { status: 409, .. }) => Err(MigrationError::AlreadyExists {
                identifier: entry.identifier.clone(),
                version: entry.version,
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Overwrite the mutable fields of an existing entry
    pub async fn update(
        &self,
        identifier: &str,
        version: u32,
        state: MigrationState,
        failure_message: &str,
    ) -> Result<(), MigrationError> {
        let body = serde_json::json!({
            "doc": { "state": state, "failure_message": failure_message }
        });
        let operation = Operation::new(
            Method::Post,
            format!("/{}/_update/{}", LEDGER_INDEX, document_id(identifier, version)),
        )
        .with_header("Content-Type", "application/json")
        .with_body(body.to_string());

        match self.transport.execute(&operation).await {
            Ok(_) => Ok(()),
            Err(TransportError::Status { status: 404, .. }) => Err(MigrationError::NotFound {
                identifier: identifier.to_string(),
                version,
            }),
            Err(e) => Err(e.into()),
        }
    }
}

/// Stable document id for one (identifier, version) pair
fn document_id(identifier: &str, version: u32) -> String {
    format!("{}-{}", identifier, version)
}

/// Markers Elasticsearch has used across major versions for an index that is
/// already present
fn is_already_exists(message: &str) -> bool {
    message.contains("resource_already_exists_exception")
        || message.contains("index_already_exists_exception")
        || message.contains("IndexAlreadyExistsException")
}
