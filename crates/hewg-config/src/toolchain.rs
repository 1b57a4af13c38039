//! Toolchain descriptors.
//!
//! A target's compiler/archiver/linker binaries are named by a descriptor
//! file under `~/.hewg/targets/<triplet>`. The host target falls back to the
//! system default toolchain when no descriptor exists.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use hewg_package::{PackageStore, TargetTriplet};

use crate::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ToolchainSpec {
    cxx: String,
    cc: String,
    ld: String,
    ar: String,
}

/// The concrete tools invoked for one target.
#[derive(Debug, Clone)]
pub struct Toolchain {
    pub triplet: TargetTriplet,
    pub cxx: String,
    pub cc: String,
    pub ld: String,
    pub ar: String,
}

impl Toolchain {
    /// Load the descriptor for `triplet`; `profile_name` selects a named
    /// descriptor file instead of the triplet's own.
    pub fn load(
        store: &PackageStore,
        triplet: &TargetTriplet,
        profile_name: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let file_name = profile_name
            .map(str::to_string)
            .unwrap_or_else(|| triplet.to_string());
        let path = store.targets_dir().join(&file_name);

        if !path.exists() {
            if profile_name.is_none() && *triplet == TargetTriplet::host() {
                return Ok(Self::host_default());
            }
            return Err(ConfigError::MissingToolchain {
                target: file_name,
                path,
            });
        }

        let text = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;

        let spec: ToolchainSpec = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path,
            source: Box::new(source),
        })?;

        Ok(Self {
            triplet: triplet.clone(),
            cxx: spec.cxx,
            cc: spec.cc,
            ld: spec.ld,
            ar: spec.ar,
        })
    }

    /// The system default toolchain for the host triplet.
    pub fn host_default() -> Self {
        Self {
            triplet: TargetTriplet::host(),
            cxx: "c++".to_string(),
            cc: "cc".to_string(),
            ld: "ld".to_string(),
            ar: "ar".to_string(),
        }
    }

    /// True when the descriptor names a non-default linker that must be
    /// selected with `-fuse-ld=`.
    pub fn uses_custom_linker(&self) -> bool {
        self.ld != "ld"
    }

    pub fn write_descriptor(&self, dir: &Path) -> Result<(), ConfigError> {
        let spec = ToolchainSpec {
            cxx: self.cxx.clone(),
            cc: self.cc.clone(),
            ld: self.ld.clone(),
            ar: self.ar.clone(),
        };
        let path = dir.join(self.triplet.to_string());
        let text = toml::to_string_pretty(&spec).expect("toolchain spec serializes");
        fs::write(&path, text).map_err(|source| ConfigError::Io { path, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn host_falls_back_to_system_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = PackageStore::in_home(dir.path());
        store.ensure_layout().unwrap();

        let toolchain = Toolchain::load(&store, &TargetTriplet::host(), None).unwrap();
        assert_eq!(toolchain.cxx, "c++");
        assert_eq!(toolchain.cc, "cc");
        assert!(!toolchain.uses_custom_linker());
    }

    #[test]
    fn missing_descriptor_for_foreign_target_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = PackageStore::in_home(dir.path());
        store.ensure_layout().unwrap();

        let triplet = TargetTriplet::parse("arm-linux-gnu").unwrap();
        assert!(matches!(
            Toolchain::load(&store, &triplet, None),
            Err(ConfigError::MissingToolchain { .. })
        ));
    }

    #[test]
    fn descriptor_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = PackageStore::in_home(dir.path());
        store.ensure_layout().unwrap();

        let triplet = TargetTriplet::parse("arm-linux-gnu").unwrap();
        let written = Toolchain {
            triplet: triplet.clone(),
            cxx: "arm-g++".to_string(),
            cc: "arm-gcc".to_string(),
            ld: "mold".to_string(),
            ar: "arm-ar".to_string(),
        };
        written.write_descriptor(&store.targets_dir()).unwrap();

        let loaded = Toolchain::load(&store, &triplet, None).unwrap();
        assert_eq!(loaded.cxx, "arm-g++");
        assert_eq!(loaded.ar, "arm-ar");
        assert!(loaded.uses_custom_linker());
    }

    #[test]
    fn named_profile_selects_other_descriptor() {
        let dir = tempfile::tempdir().unwrap();
        let store = PackageStore::in_home(dir.path());
        store.ensure_layout().unwrap();

        fs::write(
            store.targets_dir().join("clang-profile"),
            "cxx = \"clang++\"\ncc = \"clang\"\nld = \"lld\"\nar = \"llvm-ar\"\n",
        )
        .unwrap();

        let toolchain =
            Toolchain::load(&store, &TargetTriplet::host(), Some("clang-profile")).unwrap();
        assert_eq!(toolchain.cxx, "clang++");
        assert!(toolchain.uses_custom_linker());
    }
}
