//! The installed-package database.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{PackageIdentifier, StoreError};

/// The set of installed package instances, persisted as one JSON document.
///
/// The database is loaded once per invocation, mutated on the main thread
/// only, and written back whole. There is no file lock: two concurrent
/// installs race and the last writer wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageCacheDB {
    installed: BTreeSet<PackageIdentifier>,
}

impl PackageCacheDB {
    /// Read the database, returning an empty set when the file is absent.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let text = fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&text).map_err(|source| StoreError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn contains(&self, ident: &PackageIdentifier) -> bool {
        self.installed.contains(ident)
    }

    /// Add an identifier; returns false when it was already present.
    pub fn insert(&mut self, ident: PackageIdentifier) -> bool {
        self.installed.insert(ident)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PackageIdentifier> {
        self.installed.iter()
    }

    pub fn len(&self) -> usize {
        self.installed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.installed.is_empty()
    }

    /// Overwrite the whole set on disk, via a temp file and rename so a
    /// crashed writer never leaves a truncated database behind.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let text = serde_json::to_string_pretty(self).map_err(|source| StoreError::Json {
            path: path.to_path_buf(),
            source,
        })?;

        let tmp = path.with_extension("json.tmp");
        let io_err = |source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        };

        fs::write(&tmp, text).map_err(io_err)?;
        fs::rename(&tmp, path).map_err(io_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TargetTriplet;
    use hewg_semver::SemVer;
    use pretty_assertions::assert_eq;

    fn ident(name: &str, version: (u64, u64, u64)) -> PackageIdentifier {
        PackageIdentifier::new(
            "crow",
            name,
            SemVer::new(version.0, version.1, version.2),
            TargetTriplet::host(),
        )
        .unwrap()
    }

    #[test]
    fn absent_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let db = PackageCacheDB::open(&dir.path().join("package_db.json")).unwrap();
        assert!(db.is_empty());
    }

    #[test]
    fn insert_contains_save_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("package_db.json");

        let mut db = PackageCacheDB::default();
        assert!(db.insert(ident("scl", (0, 3, 0))));
        assert!(db.insert(ident("scl", (0, 4, 1))));
        assert!(!db.insert(ident("scl", (0, 3, 0))), "duplicate insert");
        assert_eq!(db.len(), 2);

        db.save(&path).unwrap();

        let reopened = PackageCacheDB::open(&path).unwrap();
        assert_eq!(reopened, db);
        assert!(reopened.contains(&ident("scl", (0, 4, 1))));
        assert!(!reopened.contains(&ident("scl", (1, 0, 0))));
    }

    #[test]
    fn save_overwrites_whole_set() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("package_db.json");

        let mut db = PackageCacheDB::default();
        db.insert(ident("scl", (0, 3, 0)));
        db.save(&path).unwrap();

        let db = PackageCacheDB::default();
        db.save(&path).unwrap();
        assert!(PackageCacheDB::open(&path).unwrap().is_empty());
    }

    #[test]
    fn corrupt_database_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("package_db.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(PackageCacheDB::open(&path).is_err());
    }

    #[test]
    fn db_serializes_as_identifier_strings() {
        let mut db = PackageCacheDB::default();
        db.insert(ident("scl", (0, 3, 0)));
        let json = serde_json::to_string(&db).unwrap();
        assert_eq!(json, "[\"crow.scl-0.3.0:x86-linux-gnu\"]");
    }
}
