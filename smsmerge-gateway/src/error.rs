// smsmerge Gateway - MessageBird delivery client
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Error types for the MessageBird client

use serde::Deserialize;
use smsmerge::DeliveryError;
use thiserror::Error;

/// One entry of a MessageBird `errors` array
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiError {
    /// MessageBird error code
    pub code: i64,
    /// Human-readable description
    #[serde(default)]
    pub description: String,
    /// Request parameter the error refers to
    #[serde(default)]
    pub parameter: Option<String>,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.parameter {
            Some(p) => write!(f, "{} (code {}, parameter {})", self.description, self.code, p),
            None => write!(f, "{} (code {})", self.description, self.code),
        }
    }
}

/// Error body returned with non-2xx responses
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub errors: Vec<ApiError>,
}

/// Main error type for gateway operations
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Request could not be sent or the response not read
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API answered with a non-success status
    #[error("API error (status {status}): {}", summarize(.errors))]
    Api { status: u16, errors: Vec<ApiError> },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Success response with an unexpected body
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

impl GatewayError {
    /// HTTP status of an API error
    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::Api { status, .. } => Some(*status),
            GatewayError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

fn summarize(errors: &[ApiError]) -> String {
    if errors.is_empty() {
        return "no error details".to_string();
    }
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<GatewayError> for DeliveryError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Api { status, errors } => DeliveryError::Rejected {
                status,
                reason: summarize(&errors),
            },
            GatewayError::Decode(e) => DeliveryError::InvalidResponse(e.to_string()),
            other => DeliveryError::Transport(other.to_string()),
        }
    }
}

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;
