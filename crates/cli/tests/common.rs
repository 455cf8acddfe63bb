// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

// Allow unused items: test helpers are shared across multiple test binaries,
// and not every test file uses every helper.
#![allow(dead_code)]
#![allow(unused_imports)]
#![allow(clippy::unwrap_used)]

use std::path::PathBuf;

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;

pub use predicates::prelude::*;
pub use tempfile::TempDir;

/// A temp directory holding config, credentials and queue files.
pub struct Home {
    pub dir: TempDir,
}

impl Home {
    /// Creates a home whose config points the queue into the temp dir.
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let queue = dir.path().join("queue.jsonl");
        let config = format!(
            "data_types = [\"notes\"]\nqueue_path = {:?}\n",
            queue.display().to_string()
        );
        std::fs::write(dir.path().join("config.toml"), config).unwrap();
        Home { dir }
    }

    pub fn config(&self) -> PathBuf {
        self.dir.path().join("config.toml")
    }

    pub fn credentials(&self) -> PathBuf {
        self.dir.path().join("credentials.toml")
    }

    pub fn queue(&self) -> PathBuf {
        self.dir.path().join("queue.jsonl")
    }

    /// `roam` with `--config` and `--credentials` pointed at this home.
    pub fn roam(&self) -> Command {
        let mut cmd = roam();
        cmd.arg("--config").arg(self.config()).arg("--credentials").arg(self.credentials());
        cmd
    }

    pub fn login(&self) {
        self.roam()
            .args(["login", "--api-base", "https://api.example.test", "--token", "token-1"])
            .assert()
            .success();
    }

    /// Writes raw queue lines as the engine would.
    pub fn seed_queue(&self, lines: &[&str]) {
        let mut content = lines.join("\n");
        content.push('\n');
        std::fs::write(self.queue(), content).unwrap();
    }
}

pub fn roam() -> Command {
    cargo_bin_cmd!("roam")
}
