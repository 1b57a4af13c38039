//! The compile driver.
//!
//! For each language the driver discovers the manifest's sources, asks the
//! staleness analyzer which of them must rebuild, and submits one job per
//! stale TU to the worker pool. The first failing job drains the pool so
//! queued siblings never start; in-flight jobs finish and are still
//! reported. The driver aggregates all failures into a single error.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::Serialize;

use hewg_config::{c_standard_flag, cxx_standard_flag, Environment, Manifest, Toolchain};

use crate::{
    depfile_for, file_type_of, mark_for_rebuild, object_file_for, run_command, BuildError,
    Console, Language, Speaker, WorkerPool,
};

/// One entry of `compile_commands.json`.
#[derive(Debug, Clone, Serialize)]
pub struct CompileCommand {
    pub directory: String,
    pub arguments: Vec<String>,
    pub file: String,
}

/// Shared inputs of one compile pass.
pub struct CompileContext<'a> {
    pub console: Arc<Console>,
    pub env: &'a Environment,
    pub manifest: &'a Manifest,
    pub toolchain: &'a Toolchain,
    pub pool: &'a WorkerPool,
    /// `-I` roots of the resolved dependencies, added before user flags.
    pub include_dirs: &'a [PathBuf],
}

/// Per-TU job outcome, aggregated by the driver.
enum TuFailure {
    /// The toolchain rejected this TU; carries its source-relative path.
    Compile(String),
    /// The toolchain itself could not run.
    Fatal(String),
}

/// Flags shared by every TU of a profile.
fn common_flags(release: bool, pic: bool) -> Vec<String> {
    let mut flags = vec![
        "-c".to_string(),
        "-Iprivate".to_string(),
        "-Iinclude".to_string(),
        "-fdiagnostics-color=always".to_string(),
    ];

    if release {
        flags.push("-O2".to_string());
    } else {
        flags.push("-Og".to_string());
        flags.push("-g".to_string());
    }

    if pic {
        flags.push("-fPIC".to_string());
    }

    flags
}

/// Common flags, the language's standard, dependency includes, then the
/// manifest's own flag list.
fn language_flags(
    ctx: &CompileContext<'_>,
    lang: Language,
    release: bool,
    pic: bool,
) -> Result<Vec<String>, BuildError> {
    let mut flags = common_flags(release, pic);

    let table = match lang {
        Language::C => &ctx.manifest.c,
        Language::Cxx => &ctx.manifest.cxx,
    };

    flags.push(match lang {
        Language::C => c_standard_flag(table.std)?,
        Language::Cxx => cxx_standard_flag(table.std)?,
    });

    for include in ctx.include_dirs {
        flags.push(format!("-I{}", include.display()));
    }

    flags.extend(table.flags.iter().cloned());
    Ok(flags)
}

/// Depfile and object emission for one TU, all paths relative to the
/// working directory.
fn tu_flags(depfile: &str, object: &str, source: &str) -> Vec<String> {
    vec![
        "-MMD".to_string(),
        "-MF".to_string(),
        depfile.to_string(),
        "-o".to_string(),
        object.to_string(),
        source.to_string(),
    ]
}

fn relative_to(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

/// Resolve the manifest's source listing against the language root,
/// keeping only sources of the language and rejecting anything that is not
/// a file under the root.
fn source_paths(
    ctx: &CompileContext<'_>,
    lang: Language,
) -> Result<Vec<PathBuf>, BuildError> {
    let table = match lang {
        Language::C => &ctx.manifest.c,
        Language::Cxx => &ctx.manifest.cxx,
    };
    let root = lang.source_root(ctx.env);

    let mut paths = Vec::new();
    for listed in &table.sources {
        let path = root.join(listed);

        if file_type_of(&path)? != lang.source_type() {
            continue;
        }
        if !path.is_file() {
            return Err(BuildError::MissingSource(path));
        }
        paths.push(path);
    }

    Ok(paths)
}

/// Compile one language's stale TUs into the given cache folder.
///
/// Returns every object file of the language (clean ones included) plus the
/// `compile_commands.json` entries for all its TUs.
pub fn compile_language(
    ctx: &CompileContext<'_>,
    lang: Language,
    cache_folder: &Path,
    release: bool,
    pic: bool,
) -> Result<(Vec<PathBuf>, Vec<CompileCommand>), BuildError> {
    let root = lang.source_root(ctx.env);
    let project_root = ctx.env.project_root();
    let sources = source_paths(ctx, lang)?;

    let flags = language_flags(ctx, lang, release, pic)?;
    ctx.console.verbose_line(
        Speaker::Main,
        &format!("{} flags: {}", lang.tag(), flags.join(" ")),
    );

    let compiler = match lang {
        Language::C => ctx.toolchain.cc.clone(),
        Language::Cxx => ctx.toolchain.cxx.clone(),
    };

    // full argument vectors for every TU, stale or not; clangd wants them all
    let mut objects = Vec::new();
    let mut commands = Vec::new();
    for source in &sources {
        let object = object_file_for(cache_folder, lang, &root, source)?;
        let depfile = depfile_for(cache_folder, lang, &root, source)?;
        fs_create_parents(&object)?;
        fs_create_parents(&depfile)?;

        let mut arguments = vec![compiler.clone()];
        arguments.extend(flags.iter().cloned());
        arguments.extend(tu_flags(
            &relative_to(project_root, &depfile),
            &relative_to(project_root, &object),
            &relative_to(project_root, source),
        ));

        commands.push(CompileCommand {
            directory: project_root.display().to_string(),
            arguments,
            file: relative_to(project_root, source),
        });
        objects.push(object);
    }

    let rebuilds = mark_for_rebuild(cache_folder, lang, &root, &sources)?;
    let total = rebuilds.len();
    let counter = Arc::new(AtomicUsize::new(0));
    let controller = ctx.pool.controller();

    let mut handles = Vec::new();
    for source in &rebuilds {
        let display_path = relative_to(&root, source);
        let args: Vec<String> = {
            let index = sources
                .iter()
                .position(|s| s == source)
                .expect("rebuild set is a subset of the sources");
            // strip the leading program name recorded for clangd
            commands[index].arguments[1..].to_vec()
        };

        let console = Arc::clone(&ctx.console);
        let counter = Arc::clone(&counter);
        let controller = controller.clone();
        let compiler = compiler.clone();
        let cwd = project_root.to_path_buf();
        let tag = lang.tag();

        handles.push(ctx.pool.submit(move |worker| -> Result<(), TuFailure> {
            let position = counter.fetch_add(1, Ordering::SeqCst) + 1;
            console.ramp_line(
                Speaker::Worker(worker),
                position,
                total,
                &format!("({position}/{total}) [{tag}] {display_path}"),
            );

            match run_command(&console, Speaker::Worker(worker), &compiler, &args, &cwd) {
                Ok((0, _)) => Ok(()),
                Ok((_, _)) => {
                    // cancel queued siblings; in-flight jobs still finish
                    controller.drain();
                    Err(TuFailure::Compile(display_path))
                }
                Err(err) => {
                    controller.drain();
                    Err(TuFailure::Fatal(err.to_string()))
                }
            }
        }));
    }

    let mut failures = Vec::new();
    let mut fatal = None;
    for handle in handles {
        match handle.wait() {
            // drained before it started
            None => {}
            Some(Ok(())) => {}
            Some(Err(TuFailure::Compile(path))) => failures.push(path),
            Some(Err(TuFailure::Fatal(message))) => {
                fatal.get_or_insert(message);
            }
        };
    }

    if let Some(message) = fatal {
        return Err(BuildError::Toolchain(message));
    }
    if !failures.is_empty() {
        return Err(BuildError::CompileFailed { failures });
    }

    Ok((objects, commands))
}

/// Serialize compile commands for clangd.
pub fn write_compile_commands(
    path: &Path,
    commands: &[CompileCommand],
) -> Result<(), BuildError> {
    let text = serde_json::to_string_pretty(commands).expect("compile commands serialize");
    std::fs::write(path, text)?;
    Ok(())
}

fn fs_create_parents(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn common_flags_by_profile() {
        let debug = common_flags(false, false);
        assert_eq!(debug, vec!["-c", "-Iprivate", "-Iinclude", "-fdiagnostics-color=always", "-Og", "-g"]);

        let release = common_flags(true, false);
        assert!(release.contains(&"-O2".to_string()));
        assert!(!release.contains(&"-g".to_string()));

        let pic = common_flags(true, true);
        assert_eq!(pic.last().unwrap(), "-fPIC");
    }

    #[test]
    fn tu_flags_shape() {
        let flags = tu_flags(".hcache/a.d", ".hcache/a.o", "src/a.cc");
        assert_eq!(
            flags,
            vec!["-MMD", "-MF", ".hcache/a.d", "-o", ".hcache/a.o", "src/a.cc"]
        );
    }

    #[test]
    fn relative_to_strips_known_roots() {
        assert_eq!(
            relative_to(Path::new("/work/demo"), Path::new("/work/demo/src/a.cc")),
            "src/a.cc"
        );
        assert_eq!(
            relative_to(Path::new("/work/demo"), Path::new("/elsewhere/a.cc")),
            "/elsewhere/a.cc"
        );
    }
}
