// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! JSON Lines storage for durable, ordered records.
//!
//! One record per line, fsynced on every write. Rewrites go through a
//! sibling temp file and a rename, so a crash mid-rewrite leaves either the
//! old or the new contents, never a truncated file.
//!
//! A crash mid-append can leave a torn final line: trailing bytes with no
//! newline that do not parse. Readers skip it and [`repair_tail`] cuts it
//! off. A bad line anywhere else is corruption and stays an error.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::Result;

/// Appends a record, creating the file and its parent directory if needed.
///
/// A torn final line is removed first so the new record starts on its own
/// line.
pub fn append<T: Serialize>(path: &Path, record: &T) -> Result<()> {
    ensure_parent(path)?;
    repair_tail(path)?;
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;

    let json = serde_json::to_string(record)?;
    writeln!(file, "{json}")?;
    file.sync_all()?;

    Ok(())
}

/// Reads all records in file order.
///
/// Skips blank lines and a torn final line, and returns an empty vec if the
/// file doesn't exist.
pub fn read_all<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let (complete, tail) = split_tail(&content);
    let mut records = Vec::new();
    for line in complete.lines() {
        if line.trim().is_empty() {
            continue;
        }
        records.push(serde_json::from_str(line)?);
    }
    if let Some(Ok(record)) = tail.map(|t| serde_json::from_str::<T>(t)) {
        records.push(record);
    }

    Ok(records)
}

/// Makes the file end on a line boundary.
///
/// A final line without a newline is kept (newline added) if it is valid
/// JSON and truncated otherwise. Returns the number of bytes dropped.
pub fn repair_tail(path: &Path) -> Result<usize> {
    let mut file = match OpenOptions::new().read(true).write(true).open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e.into()),
    };
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(0);
    }
    let mut last = [0u8; 1];
    file.seek(SeekFrom::Start(len - 1))?;
    file.read_exact(&mut last)?;
    if last[0] == b'\n' {
        return Ok(0);
    }

    let mut content = Vec::new();
    file.seek(SeekFrom::Start(0))?;
    file.read_to_end(&mut content)?;
    let keep = content.iter().rposition(|b| *b == b'\n').map_or(0, |i| i + 1);
    let tail = &content[keep..];

    if serde_json::from_slice::<serde_json::Value>(tail).is_ok() {
        file.seek(SeekFrom::End(0))?;
        file.write_all(b"\n")?;
        file.sync_all()?;
        return Ok(0);
    }

    file.set_len(keep as u64)?;
    file.sync_all()?;
    Ok(tail.len())
}

/// Splits off the final line when the content does not end in a newline.
fn split_tail(content: &str) -> (&str, Option<&str>) {
    if content.is_empty() || content.ends_with('\n') {
        return (content, None);
    }
    match content.rfind('\n') {
        Some(i) => (&content[..=i], Some(&content[i + 1..])),
        None => ("", Some(content)),
    }
}

/// Atomically replaces the file contents with `records`.
pub fn rewrite<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    ensure_parent(path)?;
    let tmp = temp_path(path);

    {
        let mut writer = BufWriter::new(File::create(&tmp)?);
        for record in records {
            let json = serde_json::to_string(record)?;
            writeln!(writer, "{json}")?;
        }
        writer.flush()?;
        writer.get_ref().sync_all()?;
    }

    fs::rename(&tmp, path)?;
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
#[path = "jsonl_tests.rs"]
mod tests;
