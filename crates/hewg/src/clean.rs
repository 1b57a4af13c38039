//! Remove all build artifacts.

use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

use hewg_build::{Console, Speaker};
use hewg_config::Environment;

pub fn run(console: &Arc<Console>, env: &Environment) -> anyhow::Result<()> {
    console.line(
        Speaker::Main,
        &format!(
            "removing <{}> and <{}>...",
            env.cache_root().display(),
            env.target_root().display()
        ),
    );
    console.countdown(3, env.skip_countdown());

    remove_if_present(&env.cache_root())?;
    remove_if_present(&env.target_root())?;

    Ok(())
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
