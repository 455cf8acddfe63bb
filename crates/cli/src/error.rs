// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// Errors reported by the `roam` command.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Sync(#[from] roam_sync::Error),

    #[error(transparent)]
    Queue(#[from] roam_sync::QueueError),

    #[error("{0}")]
    InvalidInput(String),

    #[error("failed to render config: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
