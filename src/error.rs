//! Error types for smsmerge
//!
//! This module defines the errors surfaced by the message model and the
//! aggregation engine. Delivery failures live in [`crate::delivery`] since
//! they never propagate back to producers.

use thiserror::Error;

use crate::message::{GroupKey, SIZE_LIMIT};

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Reasons a message is refused before it reaches the engine
///
/// The variants are checked in declaration order and only the first failure
/// is reported. The display strings are part of the HTTP contract.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Recipient is empty
    #[error("recipient cannot be empty")]
    EmptyRecipient,

    /// Originator is empty
    #[error("originator cannot be empty")]
    EmptyOriginator,

    /// Body is empty
    #[error("body cannot be empty")]
    EmptyBody,

    /// Body exceeds the gateway payload limit
    #[error("body cannot be larger than {} bytes", SIZE_LIMIT)]
    BodyTooLarge { size: usize },
}

/// Main error type for engine operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The dispatcher has stopped; no more messages are accepted
    #[error("engine is closed")]
    Closed,

    /// A key was signalled but the store holds no group for it
    #[error("message received but no data in store for key {0}")]
    MissingGroup(GroupKey),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The dispatcher task panicked or was aborted
    #[error("dispatcher task failed: {0}")]
    Dispatcher(String),
}
