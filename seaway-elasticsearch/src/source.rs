//! YAML-directory migration source
//!
//! Scans a directory for files named `V<version>__<name>.yaml`, parses each
//! into its declared changes, and yields a validated, version-sorted
//! [`MigrationSet`]. The file name carries the version and name; the file
//! content carries the operations and, hashed, the checksums.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use seaway_core::{MigrationMeta, MigrationSet, MigrationSetEntry};

use crate::changes::Change;
use crate::error::Error;

lazy_static! {
    static ref MIGRATION_FILE_PATTERN: Regex =
        Regex::new(r"^V([0-9]+)__([a-zA-Z0-9][a-zA-Z0-9_-]*)\.yaml$").unwrap();
}

#[derive(Debug, Deserialize)]
struct MigrationFile {
    migrations: Vec<Change>,
}

/// Reads migration sets from a directory of YAML files
///
/// ```ignore
/// let set = YamlDirectorySource::new("./migrations").migration_set()?;
/// ```
pub struct YamlDirectorySource {
    dir: PathBuf,
}

impl YamlDirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Scan, parse, and validate the directory's migration files
    ///
    /// YAML files whose name does not match `V<version>__<name>.yaml` are
    /// ignored with a warning. Duplicate versions across files fail the set.
    pub fn migration_set(&self) -> Result<MigrationSet, Error> {
        let mut entries = Vec::new();

        if !self.dir.is_dir() {
            return Err(Error::Io {
                path: self.dir.clone(),
                message: "not a directory".to_string(),
            });
        }
        let pattern = self.dir.join("*.yaml");
        let paths = glob::glob(&pattern.to_string_lossy())
            .map_err(|e| Error::Io {
                path: self.dir.clone(),
                message: e.to_string(),
            })?
            .filter_map(|r| r.ok());
        let mut paths: Vec<PathBuf> = paths.collect();
        paths.sort();

        for path in paths {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let captures = match MIGRATION_FILE_PATTERN.captures(&file_name) {
                Some(captures) => captures,
                None => {
                    log::warn!(
                        "ignoring '{}': file name does not match V<version>__<name>.yaml",
                        file_name
                    );
                    continue;
                }
            };
            let version: u32 = captures[1].parse().map_err(|_| Error::InvalidMigrationFile {
                path: path.clone(),
                message: format!("version '{}' is out of range", &captures[1]),
            })?;
            let name = captures[2].to_string();

            let raw = fs::read(&path).map_err(|e| Error::Io {
                path: path.clone(),
                message: e.to_string(),
            })?;
            let file: MigrationFile =
                serde_yaml::from_slice(&raw).map_err(|e| Error::InvalidMigrationFile {
                    path: path.clone(),
                    message: e.to_string(),
                })?;

            log::debug!(
                "loaded migration version {} ('{}') with {} changes from '{}'",
                version,
                name,
                file.migrations.len(),
                file_name
            );
            let operations = file.migrations.iter().map(Change::to_operation).collect();
            entries.push(MigrationSetEntry::new(
                MigrationMeta::new(version, name, content_checksums(&raw))?,
                operations,
            ));
        }

        Ok(MigrationSet::new(entries)?)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// SHA-256 checksums of the file content
///
/// Two hashes: the exact bytes, and the bytes with CRLF line endings
/// normalized to LF. A file checked out with different line-ending settings
/// still shares a checksum with the history recorded from the original.
fn content_checksums(raw: &[u8]) -> BTreeSet<String> {
    let mut checksums = BTreeSet::new();
    checksums.insert(hex::encode(Sha256::digest(raw)));

    let normalized = String::from_utf8_lossy(raw).replace("\r\n", "\n");
    checksums.insert(hex::encode(Sha256::digest(normalized.as_bytes())));
    checksums
}
