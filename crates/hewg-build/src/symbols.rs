//! The `hewgsym` synthetic translation unit.
//!
//! Every build compiles a generated C file exposing the package's version,
//! pre-release, metadata and build date as process-wide symbols, and links
//! the object into the final artifact. The source is regenerated on every
//! build so the embedded timestamp stays fresh.

use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use hewg_config::{Environment, Toolchain};
use hewg_semver::SemVer;

use crate::{run_command, BuildError, Console, Speaker};

/// Mirror of the version data baked into the object, kept next to it for
/// inspection.
#[derive(Debug, Serialize)]
struct SymbolCache<'a> {
    version: &'a str,
    build_date: i64,
}

fn symbol_suffix(project: &str) -> String {
    project.replace('-', "_")
}

fn c_string(value: Option<&str>) -> String {
    match value {
        Some(text) => format!("\"{text}\""),
        None => "0".to_string(),
    }
}

/// The generated C source for one package.
pub(crate) fn hewgsym_source(project: &str, version: &SemVer, build_date: i64) -> String {
    let name = symbol_suffix(project);

    format!(
        "int __hewg_version_package_{name}[3] = {{ {}, {}, {} }};\n\
         const char* __hewg_prerelease_package_{name} = {};\n\
         const char* __hewg_metadata_package_{name} = {};\n\
         long __hewg_build_date_package_{name} = {build_date};\n",
        version.major(),
        version.minor(),
        version.patch(),
        c_string(version.prerelease()),
        c_string(version.build()),
    )
}

/// Regenerate and compile the symbol TU, returning the object path to link.
pub fn compile_hewgsym(
    console: &Console,
    env: &Environment,
    toolchain: &Toolchain,
    project: &str,
    version: &SemVer,
    pic: bool,
) -> Result<PathBuf, BuildError> {
    let build_date = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);

    fs::create_dir_all(env.cache_root())?;

    let source_path = env.hewgsym_source_path();
    let object_path = env.hewgsym_object_path(pic);

    fs::write(&source_path, hewgsym_source(project, version, build_date))?;

    let version_text = version.to_string();
    let cache = SymbolCache {
        version: &version_text,
        build_date,
    };
    fs::write(
        env.hewgsym_cache_path(),
        serde_json::to_string_pretty(&cache).expect("symbol cache serializes"),
    )?;

    let mut args = vec![
        source_path.display().to_string(),
        "-O2".to_string(),
        "-c".to_string(),
    ];
    if pic {
        args.push("-fPIC".to_string());
    }
    args.push("-o".to_string());
    args.push(object_path.display().to_string());

    let (code, _) = run_command(
        console,
        Speaker::Main,
        &toolchain.cc,
        &args,
        env.project_root(),
    )?;
    if code != 0 {
        return Err(BuildError::ToolFailure {
            program: toolchain.cc.clone(),
            code,
        });
    }

    Ok(object_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn source_exposes_all_four_symbols() {
        let version = SemVer::new(1, 2, 3);
        let source = hewgsym_source("demo", &version, 1700000000);

        assert!(source.contains("int __hewg_version_package_demo[3] = { 1, 2, 3 };"));
        assert!(source.contains("const char* __hewg_prerelease_package_demo = 0;"));
        assert!(source.contains("const char* __hewg_metadata_package_demo = 0;"));
        assert!(source.contains("long __hewg_build_date_package_demo = 1700000000;"));
    }

    #[test]
    fn prerelease_and_metadata_become_string_literals() {
        let version = SemVer::new(0, 4, 0)
            .with_prerelease("rc.1")
            .with_build("nightly");
        let source = hewgsym_source("demo", &version, 0);

        assert!(source.contains("__hewg_prerelease_package_demo = \"rc.1\";"));
        assert!(source.contains("__hewg_metadata_package_demo = \"nightly\";"));
    }

    #[test]
    fn dashes_in_project_names_become_underscores() {
        let source = hewgsym_source("my-tool", &SemVer::new(0, 1, 0), 0);
        assert!(source.contains("__hewg_version_package_my_tool"));
    }

    #[test]
    fn version_array_matches_components() {
        let source = hewgsym_source("x", &SemVer::new(10, 20, 30), 0);
        assert!(source.contains("{ 10, 20, 30 }"));
        assert_eq!(source.lines().count(), 4);
    }
}
