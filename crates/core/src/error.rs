// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for roam-core operations.
//!
//! Remote failures are classified by [`ErrorKind`], which is set from the
//! status code reported by the remote client. The kind decides whether a
//! failure tears down the session or is retried later.

use std::fmt;

use thiserror::Error;

/// All possible errors that can occur in roam-core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid merge strategy: '{0}'\n  hint: valid strategies are: remote-wins, local-wins, newer-wins")]
    InvalidStrategy(String),

    #[error("invalid operation kind: '{0}'\n  hint: valid kinds are: settings, data")]
    InvalidOperationKind(String),

    #[error("data operation requires a data type")]
    MissingDataType,

    #[error("{0}")]
    InvalidInput(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for roam-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classification of a failed remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Credentials were rejected (401/403).
    AuthDenied,
    /// The addressed resource or session does not exist (404).
    NotFound,
    /// Network failure, server error, or anything unclassified.
    Transient,
}

impl ErrorKind {
    /// Classifies an HTTP-like status code.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => ErrorKind::AuthDenied,
            404 => ErrorKind::NotFound,
            _ => ErrorKind::Transient,
        }
    }

    /// Returns true if the failure ends the current device session.
    pub fn is_terminal(self) -> bool {
        matches!(self, ErrorKind::AuthDenied | ErrorKind::NotFound)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::AuthDenied => "auth denied",
            ErrorKind::NotFound => "not found",
            ErrorKind::Transient => "transient",
        };
        write!(f, "{s}")
    }
}

/// Structured error returned by every remote client call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("remote {kind} error{}: {message}", status_suffix(.status))]
pub struct RemoteError {
    /// Failure classification.
    pub kind: ErrorKind,
    /// Status code reported by the remote, if one was received.
    pub status: Option<u16>,
    /// Human-readable description.
    pub message: String,
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({s})")).unwrap_or_default()
}

impl RemoteError {
    /// Creates an error from a status code reported by the remote.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        RemoteError {
            kind: ErrorKind::from_status(status),
            status: Some(status),
            message: message.into(),
        }
    }

    /// Creates a transient error with no status (connection refused, timeout, ...).
    pub fn transient(message: impl Into<String>) -> Self {
        RemoteError {
            kind: ErrorKind::Transient,
            status: None,
            message: message.into(),
        }
    }

    /// Creates an auth-denied error.
    pub fn auth_denied(message: impl Into<String>) -> Self {
        Self::from_status(401, message)
    }

    /// Creates a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::from_status(404, message)
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
