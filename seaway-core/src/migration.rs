//! Local migration set model
//!
//! [`MigrationMeta`] is the identity and integrity descriptor of one version;
//! [`MigrationSetEntry`] pairs it with the operations to execute; a
//! [`MigrationSet`] is the validated, version-sorted collection the engine
//! consumes. All invariants are enforced at construction so the rest of the
//! engine can assume well-formed input.

use std::collections::BTreeSet;

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::MigrationError;
use crate::operation::Operation;

lazy_static! {
    static ref NAME_PATTERN: Regex = Regex::new("^[a-zA-Z0-9][a-zA-Z0-9_-]*$").unwrap();
}

/// Identity and integrity descriptor of one migration version
///
/// `checksums` is a set rather than a single value: a file re-encoded with
/// different line endings hashes differently, and a recorded entry is accepted
/// as long as at least one checksum is shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationMeta {
    version: u32,
    name: String,
    checksums: BTreeSet<String>,
}

impl MigrationMeta {
    /// Create metadata, validating version, name, and checksums
    ///
    /// Fails with [`MigrationError::InvalidMeta`] if the version is zero, the
    /// name is blank or does not match `^[a-zA-Z0-9][a-zA-Z0-9_-]*$`, or the
    /// checksum set is empty or contains a blank element.
    pub fn new(
        version: u32,
        name: impl Into<String>,
        checksums: BTreeSet<String>,
    ) -> Result<Self, MigrationError> {
        let name = name.into();
        if version == 0 {
            return Err(MigrationError::InvalidMeta(
                "version must be a positive integer".to_string(),
            ));
        }
        if !NAME_PATTERN.is_match(&name) {
            return Err(MigrationError::InvalidMeta(format!(
                "name '{}' must match ^[a-zA-Z0-9][a-zA-Z0-9_-]*$",
                name
            )));
        }
        if checksums.is_empty() {
            return Err(MigrationError::InvalidMeta(format!(
                "migration '{}' has no checksums",
                name
            )));
        }
        if checksums.iter().any(|c| c.trim().is_empty()) {
            return Err(MigrationError::InvalidMeta(format!(
                "migration '{}' has a blank checksum",
                name
            )));
        }
        Ok(Self {
            version,
            name,
            checksums,
        })
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn checksums(&self) -> &BTreeSet<String> {
        &self.checksums
    }
}

/// One version's full payload: metadata plus its ordered operations
#[derive(Debug, Clone)]
pub struct MigrationSetEntry {
    meta: MigrationMeta,
    operations: Vec<Operation>,
}

impl MigrationSetEntry {
    pub fn new(meta: MigrationMeta, operations: Vec<Operation>) -> Self {
        Self { meta, operations }
    }

    pub fn meta(&self) -> &MigrationMeta {
        &self.meta
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }
}

/// A validated collection of migration entries, sorted ascending by version
#[derive(Debug, Clone)]
pub struct MigrationSet {
    entries: Vec<MigrationSetEntry>,
}

impl MigrationSet {
    /// Build a set from entries in any order
    ///
    /// Entries are sorted ascending by version; a duplicate version fails
    /// with [`MigrationError::DuplicateVersion`].
    pub fn new(mut entries: Vec<MigrationSetEntry>) -> Result<Self, MigrationError> {
        entries.sort_by_key(|e| e.meta.version);
        for pair in entries.windows(2) {
            if pair[0].meta.version == pair[1].meta.version {
                return Err(MigrationError::DuplicateVersion(pair[0].meta.version));
            }
        }
        Ok(Self { entries })
    }

    /// An empty migration set
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Entries in ascending version order
    pub fn entries(&self) -> &[MigrationSetEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
