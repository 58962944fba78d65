//! # smsmerge - SMS aggregation engine
//!
//! Buffers short text messages per (recipient, originator) pair and drains
//! them periodically, merging as many as fit into one 160-byte payload.
//!
//! ## Key Features
//!
//! - **Grouping**: Messages for the same recipient from the same originator
//!   share one pending group
//! - **Greedy merging**: Oldest messages first, joined with `"\n"`
//! - **Rate limiting**: One gateway call per drain period
//! - **Back-pressure**: New groups wait while the dispatch queue is full
//!
//! ## Quick Start
//!
//! ```rust
//! use smsmerge::{merge, Message, SIZE_LIMIT};
//!
//! let msgs = vec![
//!     Message::new("acme", "31600000000", "hello").unwrap(),
//!     Message::new("acme", "31600000000", "world").unwrap(),
//! ];
//!
//! let split = merge::partition(msgs, SIZE_LIMIT);
//! let batch = split.batch.unwrap();
//! assert_eq!(batch.body, "hello\nworld");
//! assert!(split.remainder.is_empty());
//! ```
//!
//! ## Modules
//!
//! - [`message`]: Validated messages and group keys
//! - [`merge`]: Greedy payload construction
//! - [`store`]: Pending groups keyed by [`GroupKey`]
//! - [`queue`]: Bounded dispatch queue of group keys
//! - [`dispatcher`]: Periodic drain worker
//! - [`engine`]: Start, enqueue and shutdown
//! - [`delivery`]: Gateway capability
//! - [`metrics`]: Dispatch counters

// Modules
pub mod config;
pub mod delivery;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod merge;
pub mod message;
pub mod metrics;
pub mod queue;
pub mod store;

// Re-exports for convenient access
pub use config::EngineConfig;
pub use delivery::{DeliveryAck, DeliveryError, DeliveryGateway};
pub use dispatcher::{Dispatcher, DispatcherState, TickOutcome};
pub use engine::{Engine, EngineHandle};
pub use error::{EngineError, Result, ValidationError};
pub use merge::{MergedBatch, Partition};
pub use message::{GroupKey, Message, BODY_SEPARATOR, SIZE_LIMIT};
pub use metrics::{DispatchMetrics, MetricsSnapshot};
pub use queue::{dispatch_queue, KeyReceiver, KeySender};
pub use store::{AggregationStore, Insertion};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_basic_merge() {
        let msgs = vec![
            Message::new("acme", "316", "a").unwrap(),
            Message::new("acme", "316", "b").unwrap(),
        ];
        let split = merge::partition(msgs, SIZE_LIMIT);
        assert_eq!(split.accepted(), 2);
        assert_eq!(split.batch.unwrap().body, "a\nb");
    }
}
