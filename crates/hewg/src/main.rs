//! hewg, a C/C++ build system and package manager.

mod build;
mod clean;
mod hooks;
mod init;
mod install;

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use anyhow::Context;
use clap::{Parser, Subcommand};

use hewg_build::Console;
use hewg_config::Environment;

#[derive(Parser)]
#[command(name = "hewg", version, about = "A C/C++ build system and package manager")]
struct Cli {
    /// Downgrade the manifest's hewg version check to a warning
    #[arg(long, global = true)]
    force: bool,

    /// Skip the blocking countdown before destructive operations
    #[arg(short = 's', long = "skip", global = true)]
    skip: bool,

    /// Enable verbose printing and diagnostic output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Number of tasks to run for compilation jobs
    #[arg(short = 'j', long = "tasks", global = true)]
    tasks: Option<usize>,

    /// Path of the project manifest to read
    #[arg(short = 'c', long = "config", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scaffold a new project
    Init {
        /// One of executable, library, dynlib, headers
        #[arg(value_name = "TYPE")]
        package_type: String,
        /// Project name
        name: String,
        /// Directory to scaffold into instead of the current one
        #[arg(short = 'd', long)]
        directory: Option<PathBuf>,
    },
    /// Build the project
    Build {
        /// Build with optimizations and strip the artifact
        #[arg(long)]
        release: bool,
        /// Install the built package into the local store
        #[arg(long)]
        install: bool,
        /// Target triplet to build for instead of the host
        #[arg(long)]
        target: Option<String>,
    },
    /// Remove all build artifacts
    Clean,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("hewg: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let home = dirs::home_dir().context("unable to determine the home directory")?;
    let project_root = std::env::current_dir()?;
    let jobs = cli.tasks.unwrap_or_else(|| {
        thread::available_parallelism().map(|n| n.get()).unwrap_or(4)
    });

    let env = Environment::new(
        project_root,
        cli.config,
        &home,
        jobs,
        cli.verbose,
        cli.force,
        cli.skip,
    );
    let console = Arc::new(Console::new(env.verbose(), env.jobs()));

    match cli.command {
        Commands::Init {
            package_type,
            name,
            directory,
        } => init::run(&console, &env, &package_type, &name, directory),
        Commands::Build {
            release,
            install,
            target,
        } => build::run(
            &console,
            &env,
            build::BuildRequest {
                release,
                install,
                target,
            },
        ),
        Commands::Clean => clean::run(&console, &env),
    }
}
