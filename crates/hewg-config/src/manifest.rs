//! Typed views over the project manifest (`hewg.toml`).

use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use hewg_package::PackageType;
use hewg_semver::SemVer;

use crate::ConfigError;

static PROJECT_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("project name regex"));

/// The whole project manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub hewg: HewgTable,
    pub project: ProjectTable,
    #[serde(default)]
    pub libraries: LibrariesTable,
    #[serde(default)]
    pub tools: Option<ToolsTable>,
    pub c: LanguageTable,
    pub cxx: LanguageTable,
    pub depends: DependsTable,
    #[serde(default)]
    pub hooks: HooksTables,
}

/// `[hewg]`: metadata about the build tool itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HewgTable {
    /// Minimum hewg version the project requires.
    pub version: String,
    #[serde(rename = "type")]
    pub package_type: PackageType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_override: Option<String>,
}

/// `[project]`: identity of the package being built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectTable {
    pub version: String,
    pub name: String,
    pub org: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub authors: Vec<String>,
}

/// `[libraries]`: native libraries passed to the linker as `-l` flags.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LibrariesTable {
    #[serde(default)]
    pub native: Vec<String>,
}

/// `[tools]`: selects a named toolchain descriptor instead of the target's.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsTable {
    pub name: String,
}

/// `[c]` / `[cxx]`: one compiled language.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LanguageTable {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub std: Option<u32>,
    #[serde(default)]
    pub flags: Vec<String>,
    #[serde(default)]
    pub sources: Vec<String>,
}

/// `[depends]`: declared dependency identifiers, in textual form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DependsTable {
    #[serde(default)]
    pub internal: Vec<String>,
    #[serde(default)]
    pub external: Vec<String>,
}

/// `[hooks.prebuild]` / `[hooks.postbuild]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HooksTables {
    #[serde(default)]
    pub prebuild: HooksTable,
    #[serde(default)]
    pub postbuild: HooksTable,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HooksTable {
    #[serde(default)]
    pub once: Vec<String>,
    #[serde(default)]
    pub always: Vec<String>,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let manifest: Manifest = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source: Box::new(source),
        })?;

        manifest.validate()?;
        Ok(manifest)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !PROJECT_NAME_RE.is_match(&self.project.name) {
            return Err(ConfigError::InvalidProjectName(self.project.name.clone()));
        }
        Ok(())
    }

    /// The project's own version, parsed.
    pub fn project_version(&self) -> Result<SemVer, ConfigError> {
        Ok(SemVer::parse(&self.project.version)?)
    }

    /// Fails when this hewg is older than the version the project requires.
    /// `--force` downgrades the failure to a warning at the call site.
    pub fn check_required_version(&self, current: &SemVer) -> Result<(), ConfigError> {
        let required = SemVer::parse(&self.hewg.version)?;
        if current < &required {
            return Err(ConfigError::HewgTooOld {
                required,
                current: current.clone(),
            });
        }
        Ok(())
    }
}

/// `-std=` value for a C standard from the manifest; defaults to c17.
pub fn c_standard_flag(std: Option<u32>) -> Result<String, ConfigError> {
    let name = match std.unwrap_or(17) {
        99 => "c99",
        11 => "c11",
        17 => "c17",
        23 => "c23",
        other => return Err(ConfigError::UnknownCStandard(other)),
    };
    Ok(format!("-std={name}"))
}

/// `-std=` value for a C++ standard from the manifest; defaults to c++20.
pub fn cxx_standard_flag(std: Option<u32>) -> Result<String, ConfigError> {
    let name = match std.unwrap_or(20) {
        98 => "c++98",
        3 => "c++03",
        11 => "c++11",
        14 => "c++14",
        17 => "c++17",
        20 => "c++20",
        23 => "c++23",
        other => return Err(ConfigError::UnknownCxxStandard(other)),
    };
    Ok(format!("-std={name}"))
}
