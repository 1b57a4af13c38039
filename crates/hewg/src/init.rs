//! Project scaffolding.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};

use hewg_build::{Console, Speaker};
use hewg_config::Environment;
use hewg_package::PackageType;

const MAIN_TEMPLATE: &str = r#"#include <iostream>

int main() {
  std::cout << "hello, world!\n";
}
"#;

const GITIGNORE_TEMPLATE: &str = "/target\n/.hcache\ncompile_commands.json\n";

fn manifest_template(package_type: PackageType, name: &str, default_source: &str) -> String {
    let sources = if default_source.is_empty() {
        String::new()
    } else {
        format!("\"{default_source}\"")
    };

    format!(
        r#"[hewg]
version = "{version}"
type = "{package_type}"

[project]
version = "0.1.0"
name = "{name}"
org = "local"
description = ""
authors = []

[libraries]
native = []

[c]
flags = ["-Wextra", "-Werror"]
std = 17
sources = []

[cxx]
flags = ["-Wextra", "-Werror"]
std = 23
sources = [{sources}]

[depends]
internal = []
external = []

[hooks.prebuild]

[hooks.postbuild]
"#,
        version = env!("CARGO_PKG_VERSION"),
    )
}

fn valid_project_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

pub fn run(
    console: &Arc<Console>,
    env: &Environment,
    package_type: &str,
    name: &str,
    directory: Option<PathBuf>,
) -> anyhow::Result<()> {
    let package_type: PackageType = package_type
        .parse()
        .map_err(|message: String| anyhow::anyhow!(message))?;

    if !valid_project_name(name) {
        bail!("invalid project name <{name}>, must match [A-Za-z0-9_-]+");
    }

    let install_directory = directory.unwrap_or_else(|| env.project_root().to_path_buf());

    console.line(
        Speaker::Main,
        &format!("initializing project in <{}>...", install_directory.display()),
    );
    console.countdown(3, env.skip_countdown());

    check_or_create_directory(&install_directory)?;
    for subdir in ["src", "csrc", "include", "private", "hooks"] {
        fs::create_dir(install_directory.join(subdir))?;
    }

    let default_source = match package_type {
        PackageType::Executable => "main.cc",
        _ => "",
    };
    fs::write(
        install_directory.join("hewg.toml"),
        manifest_template(package_type, name, default_source),
    )?;
    fs::write(install_directory.join(".gitignore"), GITIGNORE_TEMPLATE)?;

    match package_type {
        PackageType::Executable => {
            fs::write(install_directory.join("src/main.cc"), MAIN_TEMPLATE)?;
        }
        PackageType::Headers => {
            fs::write(
                install_directory.join("include").join(format!("{name}.hh")),
                "#pragma once\n",
            )?;
        }
        PackageType::StaticLibrary | PackageType::SharedLibrary => {}
    }

    console.line(Speaker::Main, &format!("created {package_type} project <{name}>"));
    Ok(())
}

fn check_or_create_directory(directory: &Path) -> anyhow::Result<()> {
    if !directory.exists() {
        fs::create_dir_all(directory)
            .with_context(|| format!("unable to create <{}>", directory.display()))?;
        return Ok(());
    }

    if !directory.is_dir() {
        bail!("provided path <{}> is not a directory", directory.display());
    }

    if fs::read_dir(directory)?.next().is_some() {
        bail!("provided directory <{}> is not empty", directory.display());
    }

    Ok(())
}
