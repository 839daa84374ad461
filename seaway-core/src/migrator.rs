//! The migration applier
//!
//! [`Migrator`] owns the top-level run: initialize once, fetch the ledger,
//! run the consistency checks, then walk the migration set in ascending
//! version order, claiming each new version in the ledger before executing
//! its operations and recording the outcome.
//!
//! Side effects are strictly ordered per version: ledger insert, then the
//! operations in declared order, then the ledger update. Nothing is rolled
//! back; the first failure marks its version FAILURE and aborts the run, so
//! earlier versions stay SUCCESS and later versions are never attempted.

use std::collections::BTreeSet;

use chrono::Utc;

use crate::checker::check_consistency;
use crate::error::MigrationError;
use crate::ledger::{LedgerEntry, LedgerStore, MigrationState};
use crate::migration::{MigrationSet, MigrationSetEntry};
use crate::operation::Operation;
use crate::probe::ClusterProbe;
use crate::transport::{Transport, TransportError};

/// Write-acknowledgement parameter clamped to the cluster's node count
const WAIT_FOR_ACTIVE_SHARDS: &str = "wait_for_active_shards";

/// Configuration consumed by the applier
#[derive(Debug, Clone, Copy)]
pub struct MigratorConfig {
    /// Proceed even when the ledger records a non-SUCCESS entry
    ///
    /// This only suppresses the pre-run abort. A failed version is still
    /// present in the ledger and therefore still skipped; it is never
    /// re-driven automatically.
    pub ignore_previous_failures: bool,
}

impl MigratorConfig {
    pub fn new(ignore_previous_failures: bool) -> Self {
        Self {
            ignore_previous_failures,
        }
    }
}

/// Applies migration sets to a cluster through a [`Transport`]
///
/// Construction goes through [`Migrator::initialize`], which probes the node
/// count and creates the ledger index. The returned value carries that
/// context for its lifetime; there is no lazy state.
pub struct Migrator<T: Transport> {
    transport: T,
    config: MigratorConfig,
    node_count: u64,
}

impl<T: Transport> Migrator<T> {
    /// Probe the cluster and create the ledger index, returning a ready
    /// applier
    ///
    /// Idempotent with respect to the ledger index: an index that already
    /// exists is treated as success.
    pub async fn initialize(transport: T, config: MigratorConfig) -> Result<Self, MigrationError> {
        let node_count = ClusterProbe::new(&transport).node_count().await?;
        log::debug!("cluster reports {} nodes", node_count);
        LedgerStore::new(&transport).ensure_initialized().await?;
        Ok(Self {
            transport,
            config,
            node_count,
        })
    }

    /// The node count probed at initialization
    pub fn node_count(&self) -> u64 {
        self.node_count
    }

    /// Configured shard count of a named index
    pub async fn shard_count(&self, index: &str) -> Result<u64, MigrationError> {
        ClusterProbe::new(&self.transport).shard_count(index).await
    }

    /// Apply a migration set under the given identifier
    ///
    /// On success every version in the set is recorded SUCCESS. On failure
    /// exactly one version is recorded FAILURE (or a drift/claim error
    /// occurred before any operation ran) and later versions were never
    /// attempted.
    pub async fn apply_migration_set(
        &self,
        identifier: &str,
        set: &MigrationSet,
    ) -> Result<(), MigrationError> {
        let ledger = LedgerStore::new(&self.transport);
        let recorded = ledger.fetch_all(identifier).await?;

        log::info!("Running consistency checks for '{}'", identifier);
        check_consistency(&recorded, set, self.config.ignore_previous_failures)?;
        log::info!("Checks done");

        // Versions present in any state are skipped, including FAILURE:
        // ignoring previous failures never re-drives failed work.
        let seen: BTreeSet<u32> = recorded.iter().map(|e| e.version).collect();

        for entry in set.entries() {
            let meta = entry.meta();
            if seen.contains(&meta.version()) {
                log::info!(
                    "Skipping migration version {}. Already applied.",
                    meta.version()
                );
                continue;
            }

            log::info!(
                "Applying migration version {} ('{}')",
                meta.version(),
                meta.name()
            );
            ledger
                .insert(&LedgerEntry {
                    identifier: identifier.to_string(),
                    version: meta.version(),
                    name: meta.name().to_string(),
                    checksums: meta.checksums().clone(),
                    state: MigrationState::InProgress,
                    failure_message: String::new(),
                    created: Utc::now(),
                })
                .await?;

            if let Err(err) = self.execute_operations(entry).await {
                let message = err.to_string();
                log::warn!(
                    "Migration version {} failed: {}",
                    meta.version(),
                    message
                );
                ledger
                    .update(identifier, meta.version(), MigrationState::Failure, &message)
                    .await?;
                return Err(MigrationError::MigrationFailed {
                    version: meta.version(),
                    name: meta.name().to_string(),
                    message,
                });
            }

            ledger
                .update(identifier, meta.version(), MigrationState::Success, "")
                .await?;
        }

        Ok(())
    }

    async fn execute_operations(&self, entry: &MigrationSetEntry) -> Result<(), TransportError> {
        for operation in entry.operations() {
            log::info!("Executing {} {}", operation.method, operation.path);
            let operation = self.clamp_active_shards(operation);
            self.transport.execute(&operation).await?;
        }
        Ok(())
    }

    /// Replace a numeric `wait_for_active_shards` with
    /// `min(requested, node_count)`
    ///
    /// Non-numeric values such as `all` are the cluster's own vocabulary and
    /// pass through unchanged, as does every other parameter.
    fn clamp_active_shards(&self, operation: &Operation) -> Operation {
        let mut operation = operation.clone();
        if let Some(requested) = operation.param(WAIT_FOR_ACTIVE_SHARDS) {
            if let Ok(requested) = requested.parse::<u64>() {
                let clamped = requested.min(self.node_count);
                if clamped != requested {
                    log::debug!(
                        "clamping {} from {} to {}",
                        WAIT_FOR_ACTIVE_SHARDS,
                        requested,
                        clamped
                    );
                }
                operation = operation.with_param(WAIT_FOR_ACTIVE_SHARDS, clamped.to_string());
            }
        }
        operation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::LEDGER_INDEX;
    use crate::migration::MigrationMeta;
    use crate::operation::Method;
    use crate::test_utils::MockTransport;
    use crate::transport::Response;

    fn checksums(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn entry(version: u32, name: &str, operations: Vec<Operation>) -> MigrationSetEntry {
        MigrationSetEntry::new(
            MigrationMeta::new(version, name, checksums(&["sum"])).unwrap(),
            operations,
        )
    }

    fn recorded(version: u32, name: &str, state: MigrationState) -> LedgerEntry {
        LedgerEntry {
            identifier: "orders".to_string(),
            version,
            name: name.to_string(),
            checksums: checksums(&["sum"]),
            state,
            failure_message: if state == MigrationState::Failure {
                "index_not_found_exception".to_string()
            } else {
                String::new()
            },
            created: Utc::now(),
        }
    }

    /// A transport primed with a node count and recorded ledger entries
    fn cluster(node_count: u64, ledger: &[LedgerEntry]) -> MockTransport {
        let transport = MockTransport::new();
        transport.stub(
            Method::Get,
            "/_nodes",
            Ok(Response::new(
                200,
                format!(r#"{{"_nodes": {{"total": {}}}}}"#, node_count),
            )),
        );
        let hits: Vec<serde_json::Value> = ledger
            .iter()
            .map(|e| serde_json::json!({ "_source": e }))
            .collect();
        transport.stub(
            Method::Post,
            &format!("/{}/_search", LEDGER_INDEX),
            Ok(Response::new(
                200,
                serde_json::json!({ "hits": { "hits": hits } }).to_string(),
            )),
        );
        transport
    }

    async fn migrator(transport: MockTransport, ignore: bool) -> Migrator<MockTransport> {
        Migrator::initialize(transport, MigratorConfig::new(ignore))
            .await
            .unwrap()
    }

    fn paths(requests: &[Operation]) -> Vec<String> {
        requests.iter().map(|r| r.path.clone()).collect()
    }

    #[tokio::test]
    async fn initialize_probes_and_creates_ledger_index() {
        let transport = cluster(3, &[]);
        let migrator = migrator(transport, false).await;
        assert_eq!(migrator.node_count(), 3);

        let requests = migrator.transport.requests();
        assert_eq!(requests[0].path, "/_nodes");
        assert_eq!(requests[1].path, format!("/{}", LEDGER_INDEX));
    }

    #[tokio::test]
    async fn initialize_is_idempotent_against_existing_index() {
        let transport = cluster(3, &[]);
        transport.stub(
            Method::Put,
            &format!("/{}", LEDGER_INDEX),
            Err(TransportError::Status {
                status: 400,
                message: "resource_already_exists_exception".to_string(),
            }),
        );
        // An index created by an earlier run answers 400 already-exists;
        // initialization must treat that as success.
        migrator(transport, false).await;
    }

    #[tokio::test]
    async fn applies_new_versions_in_ascending_order() {
        let transport = cluster(3, &[]);
        let set = MigrationSet::new(vec![
            entry(3, "three", vec![Operation::new(Method::Put, "/three")]),
            entry(1, "one", vec![Operation::new(Method::Put, "/one")]),
            entry(2, "two", vec![Operation::new(Method::Put, "/two")]),
        ])
        .unwrap();

        let migrator = migrator(transport, false).await;
        migrator.apply_migration_set("orders", &set).await.unwrap();

        let all = paths(&migrator.transport.requests());
        let one = all.iter().position(|p| p == "/one").unwrap();
        let two = all.iter().position(|p| p == "/two").unwrap();
        let three = all.iter().position(|p| p == "/three").unwrap();
        assert!(one < two && two < three);

        // Each version: claim, execute, record. 3 versions plus init + fetch.
        let inserts: Vec<&String> = all.iter().filter(|p| p.contains("/_doc/")).collect();
        assert_eq!(
            inserts,
            vec![
                &format!("/{}/_doc/orders-1", LEDGER_INDEX),
                &format!("/{}/_doc/orders-2", LEDGER_INDEX),
                &format!("/{}/_doc/orders-3", LEDGER_INDEX),
            ]
        );
    }

    #[tokio::test]
    async fn skips_versions_already_in_ledger() {
        let transport = cluster(3, &[recorded(1, "one", MigrationState::Success)]);
        let set = MigrationSet::new(vec![
            entry(1, "one", vec![Operation::new(Method::Put, "/one")]),
            entry(2, "two", vec![Operation::new(Method::Put, "/two")]),
        ])
        .unwrap();

        let migrator = migrator(transport, false).await;
        migrator.apply_migration_set("orders", &set).await.unwrap();

        let all = paths(&migrator.transport.requests());
        assert!(!all.contains(&"/one".to_string()));
        assert!(all.contains(&"/two".to_string()));
        assert!(!all.contains(&format!("/{}/_doc/orders-1", LEDGER_INDEX)));
    }

    #[tokio::test]
    async fn failure_marks_version_and_halts_the_run() {
        let transport = cluster(3, &[]);
        transport.stub(
            Method::Put,
            "/two",
            Err(TransportError::Status {
                status: 500,
                message: "shard failure".to_string(),
            }),
        );
        let set = MigrationSet::new(vec![
            entry(1, "one", vec![Operation::new(Method::Put, "/one")]),
            entry(2, "two", vec![Operation::new(Method::Put, "/two")]),
            entry(3, "three", vec![Operation::new(Method::Put, "/three")]),
        ])
        .unwrap();

        let migrator = migrator(transport, false).await;
        let err = migrator
            .apply_migration_set("orders", &set)
            .await
            .unwrap_err();
        match err {
            MigrationError::MigrationFailed { version, name, message } => {
                assert_eq!(version, 2);
                assert_eq!(name, "two");
                assert!(message.contains("shard failure"));
            }
            other => panic!("unexpected error: {}", other),
        }

        let requests = migrator.transport.requests();
        let all = paths(&requests);

        // Version 1 completed, version 2 was recorded FAILURE, version 3 was
        // never touched.
        let update_two = requests
            .iter()
            .find(|r| r.path == format!("/{}/_update/orders-2", LEDGER_INDEX))
            .unwrap();
        assert!(update_two.body.as_deref().unwrap().contains("FAILURE"));
        assert!(update_two.body.as_deref().unwrap().contains("shard failure"));
        assert!(!all.contains(&"/three".to_string()));
        assert!(!all.contains(&format!("/{}/_doc/orders-3", LEDGER_INDEX)));
    }

    #[tokio::test]
    async fn prior_failure_gate_blocks_the_run() {
        let transport = cluster(3, &[recorded(1, "one", MigrationState::Failure)]);
        let set = MigrationSet::new(vec![
            entry(1, "one", vec![Operation::new(Method::Put, "/one")]),
            entry(2, "two", vec![Operation::new(Method::Put, "/two")]),
        ])
        .unwrap();

        let migrator = migrator(transport, false).await;
        let err = migrator
            .apply_migration_set("orders", &set)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            MigrationError::PreviousMigrationFailed { version: 1, .. }
        ));

        // Nothing was applied.
        let all = paths(&migrator.transport.requests());
        assert!(!all.contains(&"/one".to_string()));
        assert!(!all.contains(&"/two".to_string()));
    }

    #[tokio::test]
    async fn ignoring_failures_applies_newer_versions_but_never_retries() {
        let transport = cluster(3, &[recorded(1, "one", MigrationState::Failure)]);
        let set = MigrationSet::new(vec![
            entry(1, "one", vec![Operation::new(Method::Put, "/one")]),
            entry(2, "two", vec![Operation::new(Method::Put, "/two")]),
        ])
        .unwrap();

        let migrator = migrator(transport, true).await;
        migrator.apply_migration_set("orders", &set).await.unwrap();

        let all = paths(&migrator.transport.requests());
        assert!(!all.contains(&"/one".to_string()));
        assert!(all.contains(&"/two".to_string()));
    }

    #[tokio::test]
    async fn losing_the_insert_race_fails_the_run() {
        let transport = cluster(3, &[]);
        transport.stub(
            Method::Put,
            &format!("/{}/_doc/orders-1", LEDGER_INDEX),
            Err(TransportError::Status {
                status: 409,
                message: "version conflict, document already exists".to_string(),
            }),
        );
        let set = MigrationSet::new(vec![entry(
            1,
            "one",
            vec![Operation::new(Method::Put, "/one")],
        )])
        .unwrap();

        let migrator = migrator(transport, false).await;
        let err = migrator
            .apply_migration_set("orders", &set)
            .await
            .unwrap_err();
        assert!(matches!(err, MigrationError::AlreadyExists { version: 1, .. }));

        // The loser must not execute operations it did not win the right to
        // record.
        let all = paths(&migrator.transport.requests());
        assert!(!all.contains(&"/one".to_string()));
    }

    #[tokio::test]
    async fn clamps_wait_for_active_shards_to_node_count() {
        let transport = cluster(3, &[]);
        let set = MigrationSet::new(vec![
            entry(
                1,
                "over",
                vec![Operation::new(Method::Put, "/over").with_param(WAIT_FOR_ACTIVE_SHARDS, "10")],
            ),
            entry(
                2,
                "under",
                vec![Operation::new(Method::Put, "/under").with_param(WAIT_FOR_ACTIVE_SHARDS, "2")],
            ),
            entry(
                3,
                "all",
                vec![Operation::new(Method::Put, "/all").with_param(WAIT_FOR_ACTIVE_SHARDS, "all")],
            ),
        ])
        .unwrap();

        let migrator = migrator(transport, false).await;
        migrator.apply_migration_set("orders", &set).await.unwrap();

        let requests = migrator.transport.requests();
        let param = |path: &str| {
            requests
                .iter()
                .find(|r| r.path == path)
                .unwrap()
                .param(WAIT_FOR_ACTIVE_SHARDS)
                .unwrap()
                .to_string()
        };
        assert_eq!(param("/over"), "3");
        assert_eq!(param("/under"), "2");
        assert_eq!(param("/all"), "all");
    }

    #[tokio::test]
    async fn drift_aborts_before_anything_is_applied() {
        let transport = cluster(3, &[recorded(1, "recorded_name", MigrationState::Success)]);
        let set = MigrationSet::new(vec![entry(
            1,
            "local_name",
            vec![Operation::new(Method::Put, "/one")],
        )])
        .unwrap();

        let migrator = migrator(transport, false).await;
        let err = migrator
            .apply_migration_set("orders", &set)
            .await
            .unwrap_err();
        assert!(matches!(err, MigrationError::NameMismatch { version: 1, .. }));
        assert!(err.is_drift());

        let all = paths(&migrator.transport.requests());
        assert!(!all.contains(&"/one".to_string()));
    }
}
