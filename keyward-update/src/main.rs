//! Keyward desktop launcher
//!
//! Runs on every application start:
//! 1. Activates a staged update (`newbin/` → `bin/`) if one is waiting
//! 2. Refuses to start if the install is left in an inconsistent state
//! 3. Runs `bin/<app>` with the remaining arguments and exits with its status
//!
//! Usage:
//!   keyward-launcher [--root DIR] [--app NAME] [-- app-args...]

use anyhow::{bail, Context, Result};
use clap::Parser;
use keyward_types::Platform;
use keyward_update::{apply_staged_update, SwapState, BIN_DIR};
use std::path::PathBuf;
use std::process::{Command, ExitCode};
use tracing::{error, info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "keyward-launcher")]
#[command(about = "Applies staged Keyward updates and starts the application")]
struct Args {
    /// Install root. Defaults to the directory holding this executable.
    #[arg(long)]
    root: Option<PathBuf>,

    /// Executable name under `bin/`
    #[arg(long, default_value = "app")]
    app: String,

    /// Apply a staged update and exit without launching
    #[arg(long)]
    update_only: bool,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Arguments passed through to the application
    #[arg(last = true)]
    app_args: Vec<String>,
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with_target(false)
        .compact()
        .init();

    let root = match args.root {
        Some(root) => root,
        None => std::env::current_exe()
            .context("locating launcher executable")?
            .parent()
            .map(PathBuf::from)
            .context("launcher executable has no parent directory")?,
    };
    info!(
        root = %root.display(),
        platform = ?Platform::current().map(|p| p.as_slug()),
        "launcher starting"
    );

    match apply_staged_update(&root) {
        Ok(outcome) => info!(state = ?outcome.state(), "update check done"),
        Err(e) if e.state() == SwapState::Failed => {
            error!("{e}");
            bail!("install at {} needs repair: {e}", root.display());
        }
        Err(e) => warn!(state = ?e.state(), "{e}"),
    }

    if args.update_only {
        return Ok(ExitCode::SUCCESS);
    }

    let exe = root.join(BIN_DIR).join(&args.app);
    let status = Command::new(&exe)
        .args(&args.app_args)
        .status()
        .with_context(|| format!("starting {}", exe.display()))?;

    if !status.success() {
        warn!(status = %status, "application exited with failure");
    }
    let code = status.code().and_then(|c| u8::try_from(c).ok()).unwrap_or(1);
    Ok(ExitCode::from(code))
}
