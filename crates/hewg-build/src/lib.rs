//! The incremental compilation engine.
//!
//! A build flows through this crate in stages: the fingerprint layout maps
//! sources to their cached object/depfile pair, the staleness analyzer
//! selects the translation units that must rebuild, the compile driver
//! schedules one job per stale TU on the worker pool, and the link driver
//! produces the final artifact. The command runner and console are the two
//! shared services underneath.

mod command;
mod compile;
mod console;
mod depfile;
mod layout;
mod link;
mod pool;
mod staleness;
mod symbols;

use std::path::PathBuf;

use thiserror::Error;

pub use command::{run_command, MAX_CAPTURED_OUTPUT};
pub use compile::{compile_language, write_compile_commands, CompileCommand, CompileContext};
pub use console::{Console, Speaker};
pub use depfile::{parse_depfile, read_depfile, Depfile};
pub use layout::{
    cache_folder, depfile_for, file_type_of, object_file_for, profile_key, shared_library_name,
    static_library_name, FileType, Language,
};
pub use link::{link_executable, link_shared, pack_static_library, LinkInputs};
pub use pool::{JobHandle, PoolController, WorkerPool};
pub use staleness::{mark_for_rebuild, modification_time};
pub use symbols::compile_hewgsym;

#[derive(Debug, Error)]
pub enum BuildError {
    /// A computed path escaped the root that must contain it. This is a
    /// programmer bug, not a user error.
    #[error("path <{}> escapes <{}>", path.display(), root.display())]
    PathEscape { path: PathBuf, root: PathBuf },

    #[error("unknown filetype in sources: <{}>", .0.display())]
    UnknownFileType(PathBuf),

    #[error("<{}> is not a file, despite being listed in the project manifest", .0.display())]
    MissingSource(PathBuf),

    #[error("malformed depfile <{}>: {reason}", path.display())]
    MalformedDepfile { path: PathBuf, reason: String },

    #[error("unable to run <{program}>: {source}")]
    CommandSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("<{program}> did not exit normally")]
    AbnormalExit { program: String },

    #[error("output of <{program}> exceeded the {limit} byte capture limit")]
    OutputOverflow { program: String, limit: usize },

    #[error("<{program}> failed with exit code {code}")]
    ToolFailure { program: String, code: i32 },

    #[error("toolchain failure: {0}")]
    Toolchain(String),

    /// The aggregated result of a compile batch with at least one failing
    /// translation unit.
    #[error("fatal errors when compiling source files:\n{}",
        failures.iter().map(|f| format!("\t{f}")).collect::<Vec<_>>().join("\n"))]
    CompileFailed { failures: Vec<String> },

    #[error(transparent)]
    Config(#[from] hewg_config::ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
