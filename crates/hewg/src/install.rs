//! The install writer: copy a freshly built artifact into the package
//! store and register it in the database.
//!
//! Multiple versions of an executable can be installed at once; a symlink
//! in `~/.hewg/bin` selects the one on the PATH, and installing replaces
//! it.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use walkdir::WalkDir;

use hewg_build::{static_library_name, Console, Speaker};
use hewg_config::{Environment, Manifest};
use hewg_package::{
    DependencyIdentifier, PackageCacheDB, PackageIdentifier, PackageInfo, PackageType,
};

pub fn run(
    console: &Arc<Console>,
    env: &Environment,
    manifest: &Manifest,
    ident: &PackageIdentifier,
    mut db: PackageCacheDB,
    profile: &str,
) -> anyhow::Result<()> {
    env.store().ensure_layout()?;

    let instance_dir = env.store().package_dir(ident);
    fs::create_dir_all(&instance_dir)
        .with_context(|| format!("unable to create <{}>", instance_dir.display()))?;

    write_package_manifest(env, manifest, ident)?;

    let artifact_dir = env.artifact_dir(profile);
    match manifest.hewg.package_type {
        PackageType::Executable => {
            copy_file(
                &artifact_dir.join(&manifest.project.name),
                &instance_dir.join(&manifest.project.name),
            )?;
        }
        PackageType::StaticLibrary => {
            copy_include_tree(env, ident)?;
            for pie in [false, true] {
                let name = static_library_name(&manifest.project.name, pie);
                copy_file(&artifact_dir.join(&name), &instance_dir.join(&name))?;
            }
        }
        PackageType::Headers => {
            copy_include_tree(env, ident)?;
        }
        PackageType::SharedLibrary => {
            bail!("hewg does not support installing shared libraries");
        }
    }

    // the database is only touched once every copy has landed
    db.insert(ident.clone());
    db.save(&env.store().db_path())?;

    if manifest.hewg.package_type == PackageType::Executable {
        select_executable(console, env, &db, ident)?;
    }

    console.line(Speaker::Main, &format!("installed {ident}"));
    Ok(())
}

/// `manifest.json` carries the *declared* dependency identifiers, so the
/// package can be re-resolved against a different database later.
fn write_package_manifest(
    env: &Environment,
    manifest: &Manifest,
    ident: &PackageIdentifier,
) -> anyhow::Result<()> {
    let parse_set = |texts: &[String]| -> anyhow::Result<BTreeSet<DependencyIdentifier>> {
        texts
            .iter()
            .map(|text| {
                DependencyIdentifier::parse(text)
                    .with_context(|| format!("invalid dependency <{text}> in the manifest"))
            })
            .collect()
    };

    let info = PackageInfo {
        identifier: ident.clone(),
        package_type: manifest.hewg.package_type,
        internal_dependencies: parse_set(&manifest.depends.internal)?,
        external_dependencies: parse_set(&manifest.depends.external)?,
    };

    info.save(&env.store().manifest_path(ident))?;
    Ok(())
}

fn copy_file(from: &Path, to: &Path) -> anyhow::Result<()> {
    fs::copy(from, to)
        .with_context(|| format!("unable to copy <{}> to <{}>", from.display(), to.display()))?;
    Ok(())
}

/// Copy the project's public headers into `include/<name>/` inside the
/// instance directory, so consumers include them as `<name/header.hh>`.
fn copy_include_tree(env: &Environment, ident: &PackageIdentifier) -> anyhow::Result<()> {
    let source = env.public_include_root();
    let destination = env.store().include_dir(ident).join(ident.name());
    fs::create_dir_all(&destination)?;

    for entry in WalkDir::new(&source) {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(&source)
            .expect("walkdir stays under its root");
        let target = destination.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            copy_file(entry.path(), &target)?;
        }
    }

    Ok(())
}

/// Point `~/.hewg/bin/<name>` at this package's executable.
fn select_executable(
    console: &Arc<Console>,
    env: &Environment,
    db: &PackageCacheDB,
    ident: &PackageIdentifier,
) -> anyhow::Result<()> {
    if !db.contains(ident) {
        bail!("attempting to select executable {ident}, which is not installed");
    }

    let executable = env.store().package_dir(ident).join(ident.name());
    let link = env.store().bin_dir().join(ident.name());

    if link.symlink_metadata().is_ok() {
        console.line(
            Speaker::Main,
            &format!("replacing the selected <{}> executable...", ident.name()),
        );
        console.countdown(3, env.skip_countdown());
        fs::remove_file(&link)?;
    }

    #[cfg(unix)]
    std::os::unix::fs::symlink(&executable, &link)
        .with_context(|| format!("unable to create symlink <{}>", link.display()))?;

    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use hewg_config::{
        DependsTable, HewgTable, HooksTables, LanguageTable, LibrariesTable, ProjectTable,
    };
    use hewg_package::TargetTriplet;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        env: Environment,
        console: Arc<Console>,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let root = dir.path().join("project");
            let home = dir.path().join("home");
            fs::create_dir_all(&root).unwrap();
            fs::create_dir_all(&home).unwrap();

            let env = Environment::new(root, None, &home, 1, false, false, true);
            Self {
                _dir: dir,
                env,
                console: Arc::new(Console::new(false, 1)),
            }
        }
    }

    fn manifest(package_type: PackageType, internal: &[&str]) -> Manifest {
        Manifest {
            hewg: HewgTable {
                version: "0.4.0".to_string(),
                package_type,
                profile_override: None,
            },
            project: ProjectTable {
                version: "0.1.0".to_string(),
                name: "demo".to_string(),
                org: "crow".to_string(),
                description: String::new(),
                authors: vec![],
            },
            libraries: LibrariesTable::default(),
            tools: None,
            c: LanguageTable::default(),
            cxx: LanguageTable::default(),
            depends: DependsTable {
                internal: internal.iter().map(|s| s.to_string()).collect(),
                external: vec![],
            },
            hooks: HooksTables::default(),
        }
    }

    fn ident(env: &Environment) -> PackageIdentifier {
        let _ = env;
        PackageIdentifier::parse("crow.demo-0.1.0:x86-linux-gnu").unwrap()
    }

    #[test]
    fn installs_an_executable_with_symlink_and_db_entry() {
        let fx = Fixture::new();
        let manifest = manifest(PackageType::Executable, &[">=crow.scl-0.3.0"]);
        let ident = ident(&fx.env);

        let profile = TargetTriplet::host().to_string();
        let artifact_dir = fx.env.artifact_dir(&profile);
        fs::create_dir_all(&artifact_dir).unwrap();
        fs::write(artifact_dir.join("demo"), b"\x7fELF").unwrap();

        run(
            &fx.console,
            &fx.env,
            &manifest,
            &ident,
            PackageCacheDB::default(),
            &profile,
        )
        .unwrap();

        let store = fx.env.store();
        assert!(store.package_dir(&ident).join("demo").is_file());

        let db = PackageCacheDB::open(&store.db_path()).unwrap();
        assert!(db.contains(&ident));

        let link = store.bin_dir().join("demo");
        let resolved = fs::read_link(&link).unwrap();
        assert_eq!(resolved, store.package_dir(&ident).join("demo"));

        // the stored manifest carries the declared dependency text
        let info = PackageInfo::load(&store.manifest_path(&ident)).unwrap();
        assert_eq!(info.internal_dependencies.len(), 1);
        assert_eq!(
            info.internal_dependencies.iter().next().unwrap().to_string(),
            ">=crow.scl-0.3.0"
        );
    }

    #[test]
    fn installs_a_static_library_with_headers_and_both_archives() {
        let fx = Fixture::new();
        let manifest = manifest(PackageType::StaticLibrary, &[]);
        let ident = ident(&fx.env);

        fs::create_dir_all(fx.env.public_include_root().join("detail")).unwrap();
        fs::write(fx.env.public_include_root().join("demo.hh"), "#pragma once\n").unwrap();
        fs::write(
            fx.env.public_include_root().join("detail/impl.hh"),
            "#pragma once\n",
        )
        .unwrap();

        let profile = TargetTriplet::host().to_string();
        let artifact_dir = fx.env.artifact_dir(&profile);
        fs::create_dir_all(&artifact_dir).unwrap();
        fs::write(artifact_dir.join("libdemo.a"), b"!<arch>\n").unwrap();
        fs::write(artifact_dir.join("libdemo-PIE.a"), b"!<arch>\n").unwrap();

        run(
            &fx.console,
            &fx.env,
            &manifest,
            &ident,
            PackageCacheDB::default(),
            &profile,
        )
        .unwrap();

        let instance = fx.env.store().package_dir(&ident);
        assert!(instance.join("libdemo.a").is_file());
        assert!(instance.join("libdemo-PIE.a").is_file());
        assert!(instance.join("include/demo/demo.hh").is_file());
        assert!(instance.join("include/demo/detail/impl.hh").is_file());
    }

    #[test]
    fn reinstall_replaces_the_bin_symlink() {
        let fx = Fixture::new();
        let manifest = manifest(PackageType::Executable, &[]);
        let ident = ident(&fx.env);

        let profile = TargetTriplet::host().to_string();
        let artifact_dir = fx.env.artifact_dir(&profile);
        fs::create_dir_all(&artifact_dir).unwrap();
        fs::write(artifact_dir.join("demo"), b"v1").unwrap();

        run(
            &fx.console,
            &fx.env,
            &manifest,
            &ident,
            PackageCacheDB::default(),
            &profile,
        )
        .unwrap();

        fs::write(artifact_dir.join("demo"), b"v2").unwrap();
        let db = PackageCacheDB::open(&fx.env.store().db_path()).unwrap();
        run(&fx.console, &fx.env, &manifest, &ident, db, &profile).unwrap();

        let installed = fx.env.store().package_dir(&ident).join("demo");
        assert_eq!(fs::read(installed).unwrap(), b"v2");
    }

    #[test]
    fn shared_libraries_refuse_to_install() {
        let fx = Fixture::new();
        let manifest = manifest(PackageType::SharedLibrary, &[]);
        let ident = ident(&fx.env);

        let err = run(
            &fx.console,
            &fx.env,
            &manifest,
            &ident,
            PackageCacheDB::default(),
            &TargetTriplet::host().to_string(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("shared libraries"));
    }
}
