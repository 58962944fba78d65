// smsmerge Gateway - MessageBird delivery client
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Configuration types for the MessageBird client

use std::time::Duration;

use crate::error::{GatewayError, Result};

/// Production REST endpoint
pub const DEFAULT_BASE_URL: &str = "https://rest.messagebird.com";

/// Client-level configuration
#[derive(Clone)]
pub struct GatewayConfig {
    /// API root without trailing path (default: [`DEFAULT_BASE_URL`])
    pub base_url: String,

    /// MessageBird access key
    pub access_key: String,

    /// Whole-request timeout (default: 10s)
    pub timeout: Duration,

    /// `User-Agent` sent with every request
    pub user_agent: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            access_key: String::new(),
            timeout: Duration::from_secs(10),
            user_agent: format!("smsmerge/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl GatewayConfig {
    /// Create a configuration for the production endpoint
    pub fn with_access_key(access_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            ..Default::default()
        }
    }

    /// Point the client at another API root (test servers, proxies)
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// URL of the message creation endpoint
    pub fn messages_url(&self) -> String {
        format!("{}/messages", self.base_url.trim_end_matches('/'))
    }

    /// Check the configuration before building a client
    pub fn validate(&self) -> Result<()> {
        if self.access_key.is_empty() {
            return Err(GatewayError::InvalidConfig(
                "access_key cannot be empty".to_string(),
            ));
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(GatewayError::InvalidConfig(format!(
                "base_url must be an http(s) URL, got {:?}",
                self.base_url
            )));
        }
        if self.timeout.is_zero() {
            return Err(GatewayError::InvalidConfig(
                "timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

// Keeps the access key out of logs
impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("base_url", &self.base_url)
            .field("access_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}
