//! Configuration types for the aggregation engine

use std::time::Duration;

use crate::error::{EngineError, Result};

/// Engine-level configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum number of keys waiting for their first drain (default: 100)
    pub queue_capacity: usize,

    /// Interval between dispatcher ticks (default: 1s)
    pub drain_period: Duration,

    /// Re-signal a key after a partial drain (default: false)
    ///
    /// When disabled, deferred messages are only sent once the key is
    /// signalled again, which only happens after the group has been fully
    /// drained and recreated.
    pub requeue_remainder: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 100,
            drain_period: Duration::from_secs(1),
            requeue_remainder: false,
        }
    }
}

impl EngineConfig {
    /// Create a configuration with a custom queue capacity
    pub fn with_queue_capacity(queue_capacity: usize) -> Self {
        Self {
            queue_capacity,
            ..Default::default()
        }
    }

    /// Create a configuration with a custom drain period
    pub fn with_drain_period(drain_period: Duration) -> Self {
        Self {
            drain_period,
            ..Default::default()
        }
    }

    /// Enable or disable remainder re-signalling
    pub fn requeue_remainder(mut self, enabled: bool) -> Self {
        self.requeue_remainder = enabled;
        self
    }

    /// Check the configuration before starting an engine
    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(EngineError::InvalidConfig(
                "queue_capacity must be at least 1".to_string(),
            ));
        }
        if self.drain_period.is_zero() {
            return Err(EngineError::InvalidConfig(
                "drain_period must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
