//! The link driver: executables, static archives and shared objects.

use std::fs;
use std::path::{Path, PathBuf};

use hewg_config::{Environment, Toolchain};

use crate::{
    run_command, shared_library_name, static_library_name, BuildError, Console, Speaker,
};

/// Libraries the final artifact links against, straight from the resolver
/// and the manifest.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkInputs<'a> {
    /// Archives of the resolver's link set.
    pub archives: &'a [PathBuf],
    /// Shared-library packages, linked by name.
    pub shared_libraries: &'a [String],
    /// The manifest's native libraries.
    pub native: &'a [String],
}

fn relative_to(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

/// Objects, output and linker selection; shared by the executable and
/// shared-object modes.
fn link_args(
    env: &Environment,
    toolchain: &Toolchain,
    objects: &[PathBuf],
    output: &Path,
) -> Vec<String> {
    let root = env.project_root();

    let mut args: Vec<String> = objects.iter().map(|o| relative_to(root, o)).collect();
    args.push("-o".to_string());
    args.push(relative_to(root, output));

    if toolchain.uses_custom_linker() {
        args.push(format!("-fuse-ld={}", toolchain.ld));
    }

    args
}

/// `-L`/`-l` flags plus the canonical archive paths from the link set.
fn library_args(inputs: &LinkInputs<'_>) -> Result<Vec<String>, BuildError> {
    let mut args = vec!["-L/usr/local/lib".to_string()];

    for native in inputs.native {
        args.push(format!("-l{native}"));
    }
    for shared in inputs.shared_libraries {
        args.push(format!("-l{shared}"));
    }
    for archive in inputs.archives {
        // canonicalization doubles as an existence check
        let canonical = fs::canonicalize(archive)?;
        args.push(canonical.display().to_string());
    }

    Ok(args)
}

fn run_tool(
    console: &Console,
    env: &Environment,
    program: &str,
    args: &[String],
) -> Result<(), BuildError> {
    let (code, _) = run_command(console, Speaker::Main, program, args, env.project_root())?;
    if code != 0 {
        return Err(BuildError::ToolFailure {
            program: program.to_string(),
            code,
        });
    }
    Ok(())
}

/// Link an executable named after the project into `output_dir`, stripping
/// it on release.
pub fn link_executable(
    console: &Console,
    env: &Environment,
    toolchain: &Toolchain,
    project: &str,
    release: bool,
    objects: &[PathBuf],
    inputs: &LinkInputs<'_>,
    output_dir: &Path,
) -> Result<PathBuf, BuildError> {
    fs::create_dir_all(output_dir)?;
    let output = output_dir.join(project);

    let mut args = link_args(env, toolchain, objects, &output);
    args.extend(library_args(inputs)?);

    run_tool(console, env, &toolchain.cxx, &args)?;

    if release {
        let strip_args = vec!["-s".to_string(), output.display().to_string()];
        run_tool(console, env, "strip", &strip_args)?;
    }

    Ok(output)
}

/// Pack one archive (`lib<project>.a`, or the `-PIE` variant) with `rcs`.
pub fn pack_static_library(
    console: &Console,
    env: &Environment,
    toolchain: &Toolchain,
    project: &str,
    objects: &[PathBuf],
    output_dir: &Path,
    pie: bool,
) -> Result<PathBuf, BuildError> {
    fs::create_dir_all(output_dir)?;
    let output = output_dir.join(static_library_name(project, pie));

    let mut args = vec!["rcs".to_string(), output.display().to_string()];
    args.extend(objects.iter().map(|o| o.display().to_string()));

    run_tool(console, env, &toolchain.ar, &args)?;
    Ok(output)
}

/// Link `lib<project>.so` from position-independent objects.
pub fn link_shared(
    console: &Console,
    env: &Environment,
    toolchain: &Toolchain,
    project: &str,
    objects: &[PathBuf],
    inputs: &LinkInputs<'_>,
    output_dir: &Path,
) -> Result<PathBuf, BuildError> {
    fs::create_dir_all(output_dir)?;
    let output = output_dir.join(shared_library_name(project));

    let mut args = link_args(env, toolchain, objects, &output);
    args.extend(library_args(inputs)?);
    args.push("-shared".to_string());

    run_tool(console, env, &toolchain.cxx, &args)?;
    Ok(output)
}
