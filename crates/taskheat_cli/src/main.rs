//! `taskheat` command-line shell.
//!
//! # Responsibility
//! - Resolve settings, start logging, open the store and run one subcommand.
//! - Make sure every queued autosave has landed before the process exits.

mod cli;
mod commands;
mod dates;
mod settings;

use anyhow::{bail, Context};
use clap::Parser;
use log::info;
use std::io::Write;
use std::path::{Path, PathBuf};
use taskheat_core::{default_log_level, init_logging, TaskStore};

fn main() {
    if let Err(error) = run() {
        eprintln!("taskheat error: {error:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    if let Some(log_dir) = cli.log_dir.as_deref() {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        init_logging(level, absolute(log_dir)?)?;
    }

    let config = settings::load_or_create(&cli.settings)?;
    let save_path = config.task_save_path.clone();
    let mut store = TaskStore::open(config)
        .with_context(|| format!("failed to open task store at `{}`", save_path.display()))?;

    let output = if cli.json {
        commands::Output::Json
    } else {
        commands::Output::Text
    };
    let mutates = cli.command.mutates();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    commands::execute(&mut store, cli.command, output, &mut out)?;
    out.flush()?;

    if cli.save && mutates {
        store.save_now()?;
    }
    store.flush()?;
    let status = store.autosave_status();
    store.close();
    if let Some(last_error) = status.last_error {
        bail!("{} autosave(s) failed: {last_error}", status.failed);
    }
    info!("event=cli_exit module=cli status=ok saves={}", status.completed);
    Ok(())
}

fn absolute(path: &Path) -> anyhow::Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("failed to resolve working directory")?;
    Ok(cwd.join(path))
}
