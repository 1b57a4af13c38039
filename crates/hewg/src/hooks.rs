//! Pre/post-build user hooks.
//!
//! Hooks are shell scripts in the project's `hooks/` directory. `always`
//! hooks run on every build; `once` hooks run a single time per project,
//! tracked by a cache file under `.hcache/`. The cache is a plain value
//! owned by the build command and saved explicitly when the build ends.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use hewg_build::{run_command, Console, Speaker};
use hewg_config::{Environment, HooksTable};

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct HookCache {
    #[serde(default)]
    once_hooks_ran: Vec<String>,
}

impl HookCache {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let text = fs::read_to_string(path)
            .with_context(|| format!("unable to read hook cache <{}>", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("malformed hook cache <{}>", path.display()))
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)
            .with_context(|| format!("unable to write hook cache <{}>", path.display()))
    }

    fn has_run(&self, hook: &str) -> bool {
        self.once_hooks_ran.iter().any(|h| h == hook)
    }

    fn mark_ran(&mut self, hook: &str) {
        self.once_hooks_ran.push(hook.to_string());
    }
}

/// Run one hook table: unexpired `once` hooks first, then every `always`
/// hook. A hook failing its exit code aborts the build.
pub fn run_hooks(
    console: &Arc<Console>,
    env: &Environment,
    table: &HooksTable,
    cache: &mut HookCache,
) -> anyhow::Result<()> {
    for hook in &table.once {
        if cache.has_run(hook) {
            continue;
        }
        run_hook(console, env, hook)?;
        cache.mark_ran(hook);
    }

    for hook in &table.always {
        run_hook(console, env, hook)?;
    }

    Ok(())
}

fn run_hook(console: &Arc<Console>, env: &Environment, hook: &str) -> anyhow::Result<()> {
    let script = env.hooks_root().join(hook);
    let args = vec![script.display().to_string()];

    let (code, _) = run_command(console, Speaker::Main, "sh", &args, env.project_root())?;
    if code != 0 {
        bail!("hook <{hook}> failed with exit code {code}");
    }
    Ok(())
}
