// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the sync engine.

use roam_core::{ErrorKind, RemoteError};
use thiserror::Error;

use crate::queue::QueueError;
use crate::store::LocalStoreError;
use crate::transport::TransportError;

/// Errors surfaced by engine operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    LocalStore(#[from] LocalStoreError),

    #[error("offline queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("not connected: no access token")]
    NotConnected,

    #[error("sync engine has stopped")]
    EngineStopped,

    #[error(transparent)]
    Core(#[from] roam_core::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized Result type for roam-sync operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an engine failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// A remote call was rejected for credentials.
    AuthDenied,
    /// A remote resource or session is gone.
    NotFound,
    /// Retryable: network, server errors, missing credentials, channel state.
    Transient,
    /// Reading or writing local state failed.
    Local,
}

impl Error {
    /// Classifies the error.
    pub fn kind(&self) -> FailureKind {
        match self {
            Error::Remote(e) => match e.kind {
                ErrorKind::AuthDenied => FailureKind::AuthDenied,
                ErrorKind::NotFound => FailureKind::NotFound,
                ErrorKind::Transient => FailureKind::Transient,
            },
            Error::Transport(_) | Error::NotConnected | Error::EngineStopped => {
                FailureKind::Transient
            }
            Error::LocalStore(_)
            | Error::Queue(_)
            | Error::Config(_)
            | Error::Core(_)
            | Error::Io(_) => FailureKind::Local,
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
