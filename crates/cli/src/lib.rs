// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! roam-cli: the `roam` command.
//!
//! Manages the files the sync engine reads at startup (engine
//! configuration and stored credentials) and inspects the durable offline
//! queue. It never talks to the remote service.

pub mod cli;
pub mod commands;
pub mod error;

use std::io;
use std::path::PathBuf;

pub use cli::{Cli, Command, ConfigCommand, OutputFormat, QueueCommand};
pub use error::{Error, Result};

const APP_DIR_NAME: &str = "roam";
const CONFIG_FILE_NAME: &str = "config.toml";
const CREDENTIALS_FILE_NAME: &str = "credentials.toml";

/// Files the command operates on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    pub config: PathBuf,
    pub credentials: PathBuf,
}

impl Paths {
    /// Fills in platform defaults for paths not given explicitly.
    pub fn resolve(config: Option<PathBuf>, credentials: Option<PathBuf>) -> Result<Self> {
        let dir = || {
            dirs::config_dir()
                .map(|d| d.join(APP_DIR_NAME))
                .ok_or_else(|| {
                    Error::InvalidInput(
                        "no config directory found; pass --config and --credentials".to_string(),
                    )
                })
        };
        let config = match config {
            Some(path) => path,
            None => dir()?.join(CONFIG_FILE_NAME),
        };
        let credentials = match credentials {
            Some(path) => path,
            None => dir()?.join(CREDENTIALS_FILE_NAME),
        };
        Ok(Paths { config, credentials })
    }
}

/// Installs a stderr subscriber. Quiet unless `-v` or `RUST_LOG` is given.
pub fn setup_logging(verbose: u8) {
    use tracing_subscriber::EnvFilter;

    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();
}

/// Runs a parsed command, writing its output to stdout.
pub fn run(cli: Cli) -> Result<()> {
    let paths = Paths::resolve(cli.config, cli.credentials)?;
    let stdout = io::stdout();
    commands::run(cli.command, &paths, &mut stdout.lock())
}
