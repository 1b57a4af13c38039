//! Package identity and the local installed-package store.
//!
//! A package instance is addressed by `org.name-version:target`; dependency
//! requests prefix that form with `=` (exact) or `>=` (this-or-better). The
//! set of installed instances is persisted in a single JSON database under
//! the user's hewg directory, which is the sole source of truth for what is
//! installed — directory presence alone is never trusted.

mod db;
mod ident;
mod info;
mod store;
mod target;

use std::path::PathBuf;

use thiserror::Error;

pub use db::PackageCacheDB;
pub use ident::{DependencyIdentifier, DependencyKind, PackageIdentifier};
pub use info::{PackageInfo, PackageType};
pub use store::PackageStore;
pub use target::TargetTriplet;

/// Error produced when identifier text does not match its grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("invalid target triplet <{0}>, expected arch-os-vendor of [A-Za-z0-9]+ tokens")]
    InvalidTarget(String),

    #[error("invalid package identifier <{0}>, expected org.name-version:target")]
    InvalidIdentifier(String),

    #[error("invalid dependency identifier <{0}>, expected a leading = or >=")]
    InvalidDependency(String),

    #[error(transparent)]
    InvalidVersion(#[from] hewg_semver::InvalidVersion),
}

/// Error produced by on-disk package state (database, package manifests).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unable to access <{}>: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed package state in <{}>: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
