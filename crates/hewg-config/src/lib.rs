//! Invocation-scoped configuration: the project manifest, the toolchain
//! descriptor for the requested target, and the [`Environment`] record that
//! replaces every would-be global (paths, verbosity, job count).
//!
//! Configuration is loaded once per invocation and read-only thereafter.

mod env;
mod manifest;
mod toolchain;

use std::path::PathBuf;

use thiserror::Error;

use hewg_semver::SemVer;

pub use env::Environment;
pub use manifest::{
    c_standard_flag, cxx_standard_flag, DependsTable, HewgTable, HooksTable, HooksTables,
    LanguageTable, LibrariesTable, Manifest, ProjectTable, ToolsTable,
};
pub use toolchain::Toolchain;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read <{}>: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed manifest <{}>: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: Box<toml::de::Error>,
    },

    #[error("invalid project name <{0}>, must match [A-Za-z0-9_-]+")]
    InvalidProjectName(String),

    #[error("unrecognized std <{0}> for C")]
    UnknownCStandard(u32),

    #[error("unrecognized std <{0}> for C++")]
    UnknownCxxStandard(u32),

    #[error(transparent)]
    Version(#[from] hewg_semver::InvalidVersion),

    #[error("project requires hewg {required} but this is hewg {current}")]
    HewgTooOld { required: SemVer, current: SemVer },

    #[error("no toolchain descriptor for target <{target}> at <{}>", path.display())]
    MissingToolchain { target: String, path: PathBuf },
}
