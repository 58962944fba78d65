//! High-level engine API
//!
//! The [`Engine`] owns the aggregation store, the dispatch queue and the
//! dispatcher task. Producers talk to it through cloneable
//! [`EngineHandle`]s.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use smsmerge::{DeliveryAck, DeliveryError, DeliveryGateway, Engine, EngineConfig, Message};
//!
//! struct Stdout;
//!
//! #[async_trait]
//! impl DeliveryGateway for Stdout {
//!     async fn send(&self, from: &str, to: &[String], body: &str)
//!         -> Result<DeliveryAck, DeliveryError>
//!     {
//!         println!("{from} -> {to:?}: {body}");
//!         Ok(DeliveryAck::default())
//!     }
//! }
//!
//! # async fn run() -> smsmerge::Result<()> {
//! let engine = Engine::start(EngineConfig::default(), Arc::new(Stdout))?;
//! let handle = engine.handle();
//!
//! handle.enqueue(Message::new("acme", "31600000000", "hello").unwrap()).await?;
//! handle.enqueue(Message::new("acme", "31600000000", "world").unwrap()).await?;
//! // One period later Stdout prints "hello\nworld" once
//!
//! engine.shutdown().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{info, trace, warn};

use crate::config::EngineConfig;
use crate::delivery::DeliveryGateway;
use crate::dispatcher::Dispatcher;
use crate::error::{EngineError, Result};
use crate::message::Message;
use crate::metrics::{DispatchMetrics, MetricsSnapshot};
use crate::queue::{dispatch_queue, KeySender};
use crate::store::{AggregationStore, Insertion};

/// Running aggregation engine
///
/// Dropping the engine without calling [`Engine::shutdown`] also stops the
/// dispatcher at its next wake-up.
pub struct Engine {
    handle: EngineHandle,
    shutdown: oneshot::Sender<()>,
    worker: JoinHandle<Result<MetricsSnapshot>>,
}

impl Engine {
    /// Validate `config` and spawn the dispatcher on the current runtime
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] if the configuration is
    /// rejected by [`EngineConfig::validate`].
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn start(config: EngineConfig, gateway: Arc<dyn DeliveryGateway>) -> Result<Self> {
        config.validate()?;

        let store = Arc::new(AggregationStore::new());
        let metrics = Arc::new(DispatchMetrics::new());
        let (signals, queue) = dispatch_queue(config.queue_capacity);

        let mut dispatcher = Dispatcher::new(
            &config,
            Arc::clone(&store),
            queue,
            gateway,
            Arc::clone(&metrics),
        );
        if config.requeue_remainder {
            dispatcher = dispatcher.with_requeue(signals.clone());
        }

        let (shutdown, shutdown_rx) = oneshot::channel();
        let worker = tokio::spawn(dispatcher.run(shutdown_rx));

        info!(
            queue_capacity = config.queue_capacity,
            requeue_remainder = config.requeue_remainder,
            "Engine started"
        );

        Ok(Self {
            handle: EngineHandle {
                store,
                signals,
                metrics,
            },
            shutdown,
            worker,
        })
    }

    /// Cloneable entry point for producers
    pub fn handle(&self) -> EngineHandle {
        self.handle.clone()
    }

    /// Shorthand for [`EngineHandle::enqueue`]
    pub async fn enqueue(&self, msg: Message) -> Result<()> {
        self.handle.enqueue(msg).await
    }

    /// Stop the dispatcher and discard everything still pending
    ///
    /// A gateway call in flight is allowed to finish first. Returns the
    /// final counters, or the error that stopped the dispatcher earlier.
    pub async fn shutdown(self) -> Result<MetricsSnapshot> {
        info!("Stopping engine...");

        // The dispatcher may already be gone after a fatal error
        let _ = self.shutdown.send(());

        let outcome = self
            .worker
            .await
            .map_err(|e| EngineError::Dispatcher(e.to_string()))?;

        let discarded = self.handle.store.clear();
        if discarded > 0 {
            warn!(discarded, "Discarding pending messages on shutdown");
        }

        outcome
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("handle", &self.handle)
            .field("finished", &self.worker.is_finished())
            .finish()
    }
}

/// Producer-side handle on a running engine
#[derive(Clone)]
pub struct EngineHandle {
    store: Arc<AggregationStore>,
    signals: KeySender,
    metrics: Arc<DispatchMetrics>,
}

impl EngineHandle {
    /// Queue a message for merging with its group
    ///
    /// Appending to an existing group only takes the store lock. Creating a
    /// group also signals the dispatcher, which waits while the dispatch
    /// queue is full.
    ///
    /// # Cancel safety
    ///
    /// Not cancel safe. Dropping the future while it waits for queue space
    /// leaves the new group unsignalled, so callers that may be cancelled
    /// should run it in its own task.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Closed`] once the engine has shut down.
    pub async fn enqueue(&self, msg: Message) -> Result<()> {
        if self.signals.is_closed() {
            return Err(EngineError::Closed);
        }

        match self.store.insert(msg) {
            Insertion::Appended => {
                self.metrics.record_enqueue(false);
                Ok(())
            }
            Insertion::Created(key) => {
                trace!(key = %key, "New pending group");
                self.metrics.record_enqueue(true);
                self.signals.push(key).await
            }
        }
    }

    /// Number of pending groups
    pub fn pending_groups(&self) -> usize {
        self.store.group_count()
    }

    /// Total pending messages across all groups
    pub fn pending_messages(&self) -> usize {
        self.store.message_count()
    }

    /// Keys waiting for their first drain
    pub fn queue_depth(&self) -> usize {
        self.signals.depth()
    }

    /// Check if the engine stopped accepting messages
    pub fn is_closed(&self) -> bool {
        self.signals.is_closed()
    }

    /// Wait until the engine stops accepting messages
    ///
    /// Resolves on shutdown and when the dispatcher stops on an error.
    pub async fn closed(&self) {
        self.signals.closed().await
    }

    /// Current counters
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

impl std::fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle")
            .field("pending_groups", &self.pending_groups())
            .field("queue_depth", &self.queue_depth())
            .field("closed", &self.is_closed())
            .finish()
    }
}
