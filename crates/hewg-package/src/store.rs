//! On-disk layout of the user package store.
//!
//! ```text
//! ~/.hewg/
//!   packages/<org>.<name>-<version>:<target>/
//!     manifest.json
//!     <artifact files>
//!     include/<name>/...
//!   bin/<name>
//!   package_db.json
//!   targets/<triplet>
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::PackageIdentifier;

/// Path layout of a hewg user directory.
#[derive(Debug, Clone)]
pub struct PackageStore {
    root: PathBuf,
}

impl PackageStore {
    /// A store rooted at an explicit directory.
    pub fn at(root: PathBuf) -> Self {
        Self { root }
    }

    /// The conventional store under the user's home directory.
    pub fn in_home(home: &Path) -> Self {
        Self {
            root: home.join(".hewg"),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn packages_dir(&self) -> PathBuf {
        self.root.join("packages")
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.root.join("bin")
    }

    pub fn targets_dir(&self) -> PathBuf {
        self.root.join("targets")
    }

    pub fn db_path(&self) -> PathBuf {
        self.root.join("package_db.json")
    }

    /// The instance directory of one installed package.
    pub fn package_dir(&self, ident: &PackageIdentifier) -> PathBuf {
        self.packages_dir().join(ident.to_string())
    }

    pub fn manifest_path(&self, ident: &PackageIdentifier) -> PathBuf {
        self.package_dir(ident).join("manifest.json")
    }

    /// The public header root a consumer adds with `-I`.
    pub fn include_dir(&self, ident: &PackageIdentifier) -> PathBuf {
        self.package_dir(ident).join("include")
    }

    /// Create the store skeleton if it does not exist yet.
    pub fn ensure_layout(&self) -> io::Result<()> {
        fs::create_dir_all(self.packages_dir())?;
        fs::create_dir_all(self.bin_dir())?;
        fs::create_dir_all(self.targets_dir())?;
        Ok(())
    }
}
