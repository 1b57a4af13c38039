//! The build command: resolution, compilation, linking, optional install.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;

use hewg_build::{
    cache_folder, compile_hewgsym, compile_language, link_executable, link_shared,
    pack_static_library, write_compile_commands, CompileCommand, CompileContext, Console,
    Language, LinkInputs, Speaker, WorkerPool,
};
use hewg_config::{ConfigError, Environment, Manifest, Toolchain};
use hewg_package::{
    DependencyIdentifier, PackageCacheDB, PackageIdentifier, PackageType, TargetTriplet,
};
use hewg_resolver::{Resolution, Resolver, RootPackage};
use hewg_semver::SemVer;

use crate::hooks::{run_hooks, HookCache};
use crate::install;

pub struct BuildRequest {
    pub release: bool,
    pub install: bool,
    pub target: Option<String>,
}

/// The identity this build produces.
pub fn this_package_ident(
    manifest: &Manifest,
    target: &TargetTriplet,
) -> anyhow::Result<PackageIdentifier> {
    let version = manifest
        .project_version()
        .context("invalid project version in the manifest")?;

    PackageIdentifier::new(&manifest.project.org, &manifest.project.name, version, target.clone())
        .context("the project org/name cannot form a package identifier")
}

fn parse_dependencies(texts: &[String]) -> anyhow::Result<Vec<DependencyIdentifier>> {
    texts
        .iter()
        .map(|text| {
            DependencyIdentifier::parse(text)
                .with_context(|| format!("invalid dependency <{text}> in the manifest"))
        })
        .collect()
}

pub fn run(console: &Arc<Console>, env: &Environment, request: BuildRequest) -> anyhow::Result<()> {
    let manifest = Manifest::load(env.manifest_path())?;

    let current = SemVer::parse(env!("CARGO_PKG_VERSION")).expect("crate version is valid semver");
    match manifest.check_required_version(&current) {
        Err(err @ ConfigError::HewgTooOld { .. }) if env.force() => {
            console.line(Speaker::Main, &format!("warning: {err}"));
        }
        other => other?,
    }

    let target = match &request.target {
        Some(text) => TargetTriplet::parse(text)?,
        None => TargetTriplet::host(),
    };
    let toolchain = Toolchain::load(
        env.store(),
        &target,
        manifest.tools.as_ref().map(|t| t.name.as_str()),
    )?;

    let ident = this_package_ident(&manifest, &target)?;

    let db = PackageCacheDB::open(&env.store().db_path())?;
    let root = RootPackage {
        ident: ident.clone(),
        package_type: manifest.hewg.package_type,
        internal: parse_dependencies(&manifest.depends.internal)?,
        external: parse_dependencies(&manifest.depends.external)?,
    };

    let resolver = Resolver::new(&db, env.store(), &target);
    let resolution = resolver.resolve(&root)?;
    for line in resolution.report() {
        console.verbose_line(Speaker::Main, &line);
    }
    for warning in &resolution.warnings {
        console.line(Speaker::Main, &format!("warning: {warning}"));
    }

    let mut hook_cache = HookCache::load(&env.hook_cache_path())?;
    run_hooks(console, env, &manifest.hooks.prebuild, &mut hook_cache)?;

    let pool = WorkerPool::new(env.jobs());
    let profile = manifest
        .hewg
        .profile_override
        .clone()
        .unwrap_or_else(|| target.to_string());
    let emit_dir = env.artifact_dir(&profile);

    let ctx = CompileContext {
        console: Arc::clone(console),
        env,
        manifest: &manifest,
        toolchain: &toolchain,
        pool: &pool,
        include_dirs: &resolution.include_dirs,
    };

    let commands = match manifest.hewg.package_type {
        PackageType::Executable => {
            build_executable(console, env, &ctx, &manifest, &resolution, &target, request.release, &emit_dir)?
        }
        PackageType::StaticLibrary => {
            build_static_library(console, env, &ctx, &manifest, &target, request.release, &emit_dir)?
        }
        PackageType::SharedLibrary => {
            build_shared_library(console, env, &ctx, &manifest, &resolution, &target, request.release, &emit_dir)?
        }
        PackageType::Headers => {
            // nothing to compile
            console.line(Speaker::Main, "header-only project, skipping compilation");
            Vec::new()
        }
    };

    if !commands.is_empty() {
        write_compile_commands(&env.compile_commands_path(), &commands)?;
    }

    run_hooks(console, env, &manifest.hooks.postbuild, &mut hook_cache)?;
    hook_cache.save(&env.hook_cache_path())?;

    if request.install {
        install::run(console, env, &manifest, &ident, db, &profile)?;
    }

    Ok(())
}

/// Compile both languages into one profile cache and append the hewgsym
/// object.
fn compile_pass(
    console: &Arc<Console>,
    env: &Environment,
    ctx: &CompileContext<'_>,
    manifest: &Manifest,
    target: &TargetTriplet,
    release: bool,
    pic: bool,
) -> anyhow::Result<(Vec<PathBuf>, Vec<CompileCommand>)> {
    let cache = cache_folder(env, target, release, pic)?;

    let (mut objects, mut commands) = compile_language(ctx, Language::Cxx, &cache, release, pic)?;
    let (c_objects, c_commands) = compile_language(ctx, Language::C, &cache, release, pic)?;
    objects.extend(c_objects);
    commands.extend(c_commands);

    let version = manifest.project_version()?;
    objects.push(compile_hewgsym(
        console,
        env,
        ctx.toolchain,
        &manifest.project.name,
        &version,
        pic,
    )?);

    Ok((objects, commands))
}

#[allow(clippy::too_many_arguments)]
fn build_executable(
    console: &Arc<Console>,
    env: &Environment,
    ctx: &CompileContext<'_>,
    manifest: &Manifest,
    resolution: &Resolution,
    target: &TargetTriplet,
    release: bool,
    emit_dir: &Path,
) -> anyhow::Result<Vec<CompileCommand>> {
    let (objects, commands) = compile_pass(console, env, ctx, manifest, target, release, false)?;

    let inputs = LinkInputs {
        archives: &resolution.archives,
        shared_libraries: &resolution.shared_libraries,
        native: &manifest.libraries.native,
    };

    link_executable(
        console,
        env,
        ctx.toolchain,
        &manifest.project.name,
        release,
        &objects,
        &inputs,
        emit_dir,
    )?;

    Ok(commands)
}

#[allow(clippy::too_many_arguments)]
fn build_static_library(
    console: &Arc<Console>,
    env: &Environment,
    ctx: &CompileContext<'_>,
    manifest: &Manifest,
    target: &TargetTriplet,
    release: bool,
    emit_dir: &Path,
) -> anyhow::Result<Vec<CompileCommand>> {
    console.line(Speaker::Main, "building non-PIC library code...");
    let (objects, commands) = compile_pass(console, env, ctx, manifest, target, release, false)?;
    pack_static_library(
        console,
        env,
        ctx.toolchain,
        &manifest.project.name,
        &objects,
        emit_dir,
        false,
    )?;

    console.line(Speaker::Main, "building PIC library code...");
    let (pic_objects, _) = compile_pass(console, env, ctx, manifest, target, release, true)?;
    pack_static_library(
        console,
        env,
        ctx.toolchain,
        &manifest.project.name,
        &pic_objects,
        emit_dir,
        true,
    )?;

    Ok(commands)
}

#[allow(clippy::too_many_arguments)]
fn build_shared_library(
    console: &Arc<Console>,
    env: &Environment,
    ctx: &CompileContext<'_>,
    manifest: &Manifest,
    resolution: &Resolution,
    target: &TargetTriplet,
    release: bool,
    emit_dir: &Path,
) -> anyhow::Result<Vec<CompileCommand>> {
    let (objects, commands) = compile_pass(console, env, ctx, manifest, target, release, true)?;

    // shared objects pull in the position-independent archive variants
    let inputs = LinkInputs {
        archives: &resolution.pie_archives,
        shared_libraries: &resolution.shared_libraries,
        native: &manifest.libraries.native,
    };

    link_shared(
        console,
        env,
        ctx.toolchain,
        &manifest.project.name,
        &objects,
        &inputs,
        emit_dir,
    )?;

    Ok(commands)
}
