//! Consistency checks between the ledger and the local migration set
//!
//! All checks are pure: they never touch the cluster and either return `Ok`
//! or the first detected drift. Inputs are assumed sorted ascending by
//! version, which [`LedgerStore::fetch_all`](crate::ledger::LedgerStore) and
//! [`MigrationSet`] both guarantee.

use crate::error::MigrationError;
use crate::ledger::{LedgerEntry, MigrationState};
use crate::migration::MigrationSet;

/// Validate the local migration set against the recorded history
///
/// Checks run in order and stop at the first violation:
///
/// 1. Prior-failure gate: any non-SUCCESS ledger entry aborts, unless
///    `ignore_previous_failures` is set.
/// 2. Shrinkage: the local set must be at least as large as the number of
///    SUCCESS entries in the ledger.
/// 3. Pairwise: recorded and local entries at the same position must agree
///    on version and name and share at least one checksum.
/// 4. Monotonicity: local entries beyond the recorded history must be
///    strictly newer than the latest recorded version.
pub fn check_consistency(
    ledger: &[LedgerEntry],
    set: &MigrationSet,
    ignore_previous_failures: bool,
) -> Result<(), MigrationError> {
    if !ignore_previous_failures {
        for entry in ledger {
            if entry.state != MigrationState::Success {
                return Err(MigrationError::PreviousMigrationFailed {
                    version: entry.version,
                    message: entry.failure_message.clone(),
                });
            }
        }
    }

    let applied = ledger
        .iter()
        .filter(|e| e.state == MigrationState::Success)
        .count();
    if set.len() < applied {
        return Err(MigrationError::InconsistentHistory {
            local: set.len(),
            applied,
        });
    }

    for (entry, local) in ledger.iter().zip(set.entries()) {
        let meta = local.meta();
        if entry.version != meta.version() {
            return Err(MigrationError::VersionMismatch {
                name: entry.name.clone(),
                local: meta.version(),
                remote: entry.version,
            });
        }
        if entry.checksums.is_disjoint(meta.checksums()) {
            return Err(MigrationError::ChecksumMismatch {
                version: entry.version,
                name: entry.name.clone(),
                local: join(meta.checksums().iter()),
                remote: join(entry.checksums.iter()),
            });
        }
        if entry.name != meta.name() {
            return Err(MigrationError::NameMismatch {
                version: entry.version,
                local: meta.name().to_string(),
                remote: entry.name.clone(),
            });
        }
    }

    // The set is sorted, so only the first unrecorded entry can actually
    // violate this. Checked for all of them anyway.
    if let Some(last) = ledger.last() {
        for local in set.entries().iter().skip(ledger.len()) {
            if local.meta().version() <= last.version {
                return Err(MigrationError::NonMonotonicVersion {
                    version: local.meta().version(),
                    latest_applied: last.version,
                });
            }
        }
    }

    Ok(())
}

fn join<'a>(values: impl Iterator<Item = &'a String>) -> String {
    values.cloned().collect::<Vec<_>>().join(", ")
}
