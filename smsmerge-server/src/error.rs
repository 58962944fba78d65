// smsmerge Server - HTTP front end
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Error types for the server

use thiserror::Error;

/// Failures inside request handlers
#[derive(Error, Debug)]
pub enum ServerError {
    /// Metrics could not be rendered
    #[error("Metrics encoding error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// Rendered metrics were not valid UTF-8
    #[error("Metrics encoding error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Enqueue task panicked or was cancelled
    #[error("Enqueue task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// Engine refused the message for a reason other than shutdown
    #[error("Engine error: {0}")]
    Engine(#[from] smsmerge::EngineError),
}
