//! The per-invocation environment.
//!
//! Every path and flag that would otherwise live in module-level statics is
//! collected here once in `main` and passed by reference.

use std::path::{Path, PathBuf};

use hewg_package::PackageStore;

/// Immutable invocation state: project paths, the user store, and the
/// global command-line switches.
#[derive(Debug, Clone)]
pub struct Environment {
    project_root: PathBuf,
    manifest_path: PathBuf,
    store: PackageStore,
    jobs: usize,
    verbose: bool,
    force: bool,
    skip_countdown: bool,
}

impl Environment {
    pub fn new(
        project_root: PathBuf,
        manifest_override: Option<PathBuf>,
        home: &Path,
        jobs: usize,
        verbose: bool,
        force: bool,
        skip_countdown: bool,
    ) -> Self {
        let manifest_path =
            manifest_override.unwrap_or_else(|| project_root.join("hewg.toml"));

        Self {
            store: PackageStore::in_home(home),
            project_root,
            manifest_path,
            jobs: jobs.max(1),
            verbose,
            force,
            skip_countdown,
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    pub fn store(&self) -> &PackageStore {
        &self.store
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn force(&self) -> bool {
        self.force
    }

    pub fn skip_countdown(&self) -> bool {
        self.skip_countdown
    }

    // project-relative layout

    pub fn cache_root(&self) -> PathBuf {
        self.project_root.join(".hcache")
    }

    pub fn incremental_root(&self) -> PathBuf {
        self.cache_root().join("incremental")
    }

    pub fn hook_cache_path(&self) -> PathBuf {
        self.cache_root().join("hooks.json")
    }

    pub fn hewgsym_source_path(&self) -> PathBuf {
        self.cache_root().join("hewgsyms.c")
    }

    pub fn hewgsym_object_path(&self, pic: bool) -> PathBuf {
        if pic {
            self.cache_root().join("hewgsyms-pic.o")
        } else {
            self.cache_root().join("hewgsyms.o")
        }
    }

    pub fn hewgsym_cache_path(&self) -> PathBuf {
        self.cache_root().join("hewgsyms.json")
    }

    pub fn target_root(&self) -> PathBuf {
        self.project_root.join("target")
    }

    /// Where finished artifacts for one build profile land.
    pub fn artifact_dir(&self, profile: &str) -> PathBuf {
        self.target_root().join(profile)
    }

    pub fn cxx_source_root(&self) -> PathBuf {
        self.project_root.join("src")
    }

    pub fn c_source_root(&self) -> PathBuf {
        self.project_root.join("csrc")
    }

    pub fn public_include_root(&self) -> PathBuf {
        self.project_root.join("include")
    }

    pub fn private_include_root(&self) -> PathBuf {
        self.project_root.join("private")
    }

    pub fn hooks_root(&self) -> PathBuf {
        self.project_root.join("hooks")
    }

    pub fn compile_commands_path(&self) -> PathBuf {
        self.project_root.join("compile_commands.json")
    }
}
