// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};

/// Output format for commands supporting structured output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

const QUICKSTART_HELP: &str = "\
Get started:
  roam login --api-base https://api.example.com --token <TOKEN>
  roam status             Show connection and queue state
  roam queue list         Show uploads waiting to be replayed";

#[derive(Parser, Debug)]
#[command(name = "roam", version)]
#[command(about = "Inspect and manage roam sync state")]
#[command(after_help = QUICKSTART_HELP)]
pub struct Cli {
    /// Engine configuration file [default: <config dir>/roam/config.toml]
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Stored credentials file [default: <config dir>/roam/credentials.toml]
    #[arg(long, global = true, value_name = "PATH")]
    pub credentials: Option<PathBuf>,

    /// Log to stderr (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Store credentials for the sync service
    Login {
        /// Base URL of the sync API
        #[arg(long)]
        api_base: String,

        /// Access token
        #[arg(long)]
        token: String,

        /// OAuth client id
        #[arg(long, default_value = "")]
        client_id: String,

        /// OAuth client secret
        #[arg(long, default_value = "")]
        client_secret: String,
    },

    /// Remove stored credentials; sync stops on next start
    Logout,

    /// Show connection, configuration and queue state
    Status {
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        output: OutputFormat,
    },

    /// Inspect the offline queue
    #[command(subcommand)]
    Queue(QueueCommand),

    /// Manage engine configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug)]
pub enum QueueCommand {
    /// List queued operations, oldest first
    List {
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        output: OutputFormat,
    },

    /// Discard every queued operation
    Clear,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective configuration as TOML
    Show,

    /// Write a configuration file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
