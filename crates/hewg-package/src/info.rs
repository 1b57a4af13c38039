//! Per-package metadata written into each installed instance.

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{DependencyIdentifier, PackageIdentifier, StoreError};

/// What a package produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PackageType {
    #[serde(rename = "executable")]
    Executable,
    #[serde(rename = "library")]
    StaticLibrary,
    #[serde(rename = "dynlib")]
    SharedLibrary,
    #[serde(rename = "headers")]
    Headers,
}

impl PackageType {
    pub fn as_str(self) -> &'static str {
        match self {
            PackageType::Executable => "executable",
            PackageType::StaticLibrary => "library",
            PackageType::SharedLibrary => "dynlib",
            PackageType::Headers => "headers",
        }
    }
}

impl fmt::Display for PackageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PackageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "executable" => Ok(PackageType::Executable),
            "library" => Ok(PackageType::StaticLibrary),
            "dynlib" => Ok(PackageType::SharedLibrary),
            "headers" => Ok(PackageType::Headers),
            other => Err(format!(
                "unknown package type <{other}>, expected one of executable, library, dynlib, headers"
            )),
        }
    }
}

/// `manifest.json` inside a package instance directory.
///
/// The dependency sets hold the *declared* identifiers, not the resolved
/// ones, so re-resolving against a different database remains meaningful.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInfo {
    pub identifier: PackageIdentifier,
    pub package_type: PackageType,
    pub internal_dependencies: BTreeSet<DependencyIdentifier>,
    pub external_dependencies: BTreeSet<DependencyIdentifier>,
}

impl PackageInfo {
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let text = fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&text).map_err(|source| StoreError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let text = serde_json::to_string_pretty(self).map_err(|source| StoreError::Json {
            path: path.to_path_buf(),
            source,
        })?;

        fs::write(path, text).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
