// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Command implementations. Each writes its report to `out`.

use std::io::Write;
use std::path::Path;

use roam_core::{QueuedOperation, SyncConfig};
use roam_sync::{load_credentials, remove_credentials, save_credentials, EngineConfig, OfflineQueue};
use serde_json::json;
use tracing::debug;

use crate::cli::{Command, ConfigCommand, OutputFormat, QueueCommand};
use crate::error::{Error, Result};
use crate::Paths;

const SUMMARY_WIDTH: usize = 60;

/// Execute a command against the files in `paths`.
pub fn run<W: Write>(command: Command, paths: &Paths, out: &mut W) -> Result<()> {
    match command {
        Command::Login { api_base, token, client_id, client_secret } => {
            login(paths, &api_base, &token, client_id, client_secret, out)
        }
        Command::Logout => logout(paths, out),
        Command::Status { output } => status(paths, output, out),
        Command::Queue(QueueCommand::List { output }) => queue_list(paths, output, out),
        Command::Queue(QueueCommand::Clear) => queue_clear(paths, out),
        Command::Config(ConfigCommand::Show) => config_show(paths, out),
        Command::Config(ConfigCommand::Init { force }) => config_init(paths, force, out),
    }
}

/// Loads the engine configuration, or defaults if the file is absent.
pub fn load_engine_config(path: &Path) -> Result<EngineConfig> {
    if path.exists() {
        Ok(EngineConfig::load(path)?)
    } else {
        debug!(path = %path.display(), "no config file, using defaults");
        Ok(EngineConfig::default())
    }
}

fn open_queue(config: &EngineConfig) -> Result<OfflineQueue> {
    let path = config.resolve_queue_path()?;
    Ok(OfflineQueue::open(&path)?)
}

fn login<W: Write>(
    paths: &Paths,
    api_base: &str,
    token: &str,
    client_id: String,
    client_secret: String,
    out: &mut W,
) -> Result<()> {
    let api_base = api_base.trim().trim_end_matches('/');
    if !(api_base.starts_with("https://") || api_base.starts_with("http://")) {
        return Err(Error::InvalidInput(format!(
            "api base must be an http(s) URL, got '{api_base}'"
        )));
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(Error::InvalidInput("token must not be empty".to_string()));
    }

    let credentials = SyncConfig {
        client_id,
        client_secret,
        ..SyncConfig::new(api_base).with_token(token)
    };
    save_credentials(&paths.credentials, &credentials)?;
    writeln!(out, "Logged in to {api_base}")?;
    Ok(())
}

fn logout<W: Write>(paths: &Paths, out: &mut W) -> Result<()> {
    if load_credentials(&paths.credentials)?.is_none() {
        writeln!(out, "Not logged in.")?;
        return Ok(());
    }
    remove_credentials(&paths.credentials)?;
    writeln!(out, "Logged out.")?;
    Ok(())
}

fn status<W: Write>(paths: &Paths, output: OutputFormat, out: &mut W) -> Result<()> {
    let config = load_engine_config(&paths.config)?;
    let credentials = load_credentials(&paths.credentials)?;
    let queue = open_queue(&config)?;
    let pending = queue.len()?;

    let connected = credentials.as_ref().is_some_and(SyncConfig::is_connected);
    let api_base = credentials.as_ref().map(|c| c.api_base.clone());
    let realtime = api_base.as_deref().map(|base| config.realtime_url(base));

    match output {
        OutputFormat::Text => {
            writeln!(out, "connected:  {}", if connected { "yes" } else { "no" })?;
            writeln!(out, "api base:   {}", api_base.as_deref().unwrap_or("-"))?;
            writeln!(out, "realtime:   {}", realtime.as_deref().unwrap_or("-"))?;
            writeln!(out, "strategy:   {}", config.merge_strategy)?;
            let data_types = if config.data_types.is_empty() {
                "(none)".to_string()
            } else {
                config.data_types.join(", ")
            };
            writeln!(out, "data types: {data_types}")?;
            writeln!(out, "queue:      {pending} pending ({})", queue.path().display())?;
        }
        OutputFormat::Json => {
            let report = json!({
                "connected": connected,
                "api_base": api_base,
                "realtime_url": realtime,
                "merge_strategy": config.merge_strategy.to_string(),
                "data_types": config.data_types,
                "queue": {
                    "path": queue.path().display().to_string(),
                    "pending": pending,
                },
            });
            writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
        }
    }
    Ok(())
}

fn queue_list<W: Write>(paths: &Paths, output: OutputFormat, out: &mut W) -> Result<()> {
    let config = load_engine_config(&paths.config)?;
    let ops = open_queue(&config)?.peek_all()?;

    match output {
        OutputFormat::Text => {
            if ops.is_empty() {
                writeln!(out, "Offline queue is empty.")?;
                return Ok(());
            }
            for op in &ops {
                writeln!(out, "{}", format_operation(op))?;
            }
        }
        OutputFormat::Json => {
            writeln!(out, "{}", serde_json::to_string_pretty(&ops)?)?;
        }
    }
    Ok(())
}

/// One-line summary: time, kind, data type, truncated payload.
pub fn format_operation(op: &QueuedOperation) -> String {
    let payload = op.data.to_string();
    let summary = if payload.chars().count() > SUMMARY_WIDTH {
        let cut: String = payload.chars().take(SUMMARY_WIDTH - 3).collect();
        format!("{cut}...")
    } else {
        payload
    };
    format!(
        "{}  {:<8}  {:<12}  {}",
        op.enqueued_at.format("%Y-%m-%d %H:%M:%S"),
        op.kind.to_string(),
        op.data_type.as_deref().unwrap_or("-"),
        summary
    )
}

fn queue_clear<W: Write>(paths: &Paths, out: &mut W) -> Result<()> {
    let config = load_engine_config(&paths.config)?;
    let mut queue = open_queue(&config)?;
    let removed = queue.len()?;
    queue.clear()?;
    let noun = if removed == 1 { "operation" } else { "operations" };
    writeln!(out, "Removed {removed} queued {noun}.")?;
    Ok(())
}

fn config_show<W: Write>(paths: &Paths, out: &mut W) -> Result<()> {
    let config = load_engine_config(&paths.config)?;
    write!(out, "{}", toml::to_string_pretty(&config)?)?;
    Ok(())
}

fn config_init<W: Write>(paths: &Paths, force: bool, out: &mut W) -> Result<()> {
    if paths.config.exists() && !force {
        return Err(Error::InvalidInput(format!(
            "{} already exists\n  hint: use --force to overwrite",
            paths.config.display()
        )));
    }
    EngineConfig::default().save(&paths.config)?;
    writeln!(out, "Wrote {}", paths.config.display())?;
    Ok(())
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
