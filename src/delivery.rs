//! Delivery gateway capability
//!
//! The dispatcher hands every merged batch to a [`DeliveryGateway`]. The
//! engine does not care how the payload travels; `smsmerge-gateway` provides
//! the MessageBird implementation.

use async_trait::async_trait;
use thiserror::Error;

/// Acknowledgement returned by a gateway for one accepted payload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryAck {
    /// Gateway-side message identifier, when the gateway returns one
    pub id: Option<String>,
    /// Number of recipients the gateway accepted
    pub recipients: usize,
}

impl DeliveryAck {
    /// Acknowledgement carrying a gateway identifier
    pub fn with_id(id: impl Into<String>, recipients: usize) -> Self {
        Self {
            id: Some(id.into()),
            recipients,
        }
    }
}

/// Failure to hand a payload to the gateway
///
/// Delivery errors are logged and dropped by the dispatcher; they never reach
/// producers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// The gateway answered and refused the payload
    #[error("gateway rejected payload (status {status}): {reason}")]
    Rejected { status: u16, reason: String },

    /// The gateway could not be reached or timed out
    #[error("gateway transport error: {0}")]
    Transport(String),

    /// The gateway accepted the payload but its answer was unreadable
    #[error("invalid gateway response: {0}")]
    InvalidResponse(String),
}

/// Sends one text payload from one originator
#[async_trait]
pub trait DeliveryGateway: Send + Sync {
    /// Deliver `body` from `originator` to `recipients`
    async fn send(
        &self,
        originator: &str,
        recipients: &[String],
        body: &str,
    ) -> Result<DeliveryAck, DeliveryError>;
}
