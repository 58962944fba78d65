//! Periodic dispatcher
//!
//! The [`Dispatcher`] is the single worker that turns pending groups into
//! gateway calls. On every tick it pops at most one key, drains that key's
//! group through [`merge::partition`], writes the remainder back and sends
//! the merged payload. Failed sends are logged and dropped.
//!
//! ```text
//!   tick ──► queue.try_pop() ──► store.drain(key, partition) ──► gateway.send()
//!              │ empty                 │ remainder stays pending
//!              ▼                       ▼
//!            idle               (requeued only if enabled)
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::EngineConfig;
use crate::delivery::DeliveryGateway;
use crate::error::{EngineError, Result};
use crate::merge::{self, MergedBatch, Partition};
use crate::message::{GroupKey, Message, SIZE_LIMIT};
use crate::metrics::{DispatchMetrics, MetricsSnapshot};
use crate::queue::{KeyReceiver, KeySender};
use crate::store::AggregationStore;

/// Lifecycle of a dispatcher; `Stopped` is terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    /// Ticking and draining
    Running,
    /// Shut down, no further ticks
    Stopped,
}

/// What a single tick did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// No key was waiting
    Idle,
    /// A batch was accepted by the gateway
    Sent {
        key: GroupKey,
        parts: usize,
        deferred: usize,
    },
    /// The gateway refused the batch; its messages are gone
    Failed {
        key: GroupKey,
        parts: usize,
        deferred: usize,
    },
}

/// Single background worker draining one key per tick
pub struct Dispatcher {
    store: Arc<AggregationStore>,
    queue: KeyReceiver,
    requeue: Option<KeySender>,
    gateway: Arc<dyn DeliveryGateway>,
    metrics: Arc<DispatchMetrics>,
    period: Duration,
    state: DispatcherState,
}

impl Dispatcher {
    /// Create a dispatcher over an existing store and queue
    pub fn new(
        config: &EngineConfig,
        store: Arc<AggregationStore>,
        queue: KeyReceiver,
        gateway: Arc<dyn DeliveryGateway>,
        metrics: Arc<DispatchMetrics>,
    ) -> Self {
        Self {
            store,
            queue,
            requeue: None,
            gateway,
            metrics,
            period: config.drain_period,
            state: DispatcherState::Running,
        }
    }

    /// Re-signal keys that still hold messages after a drain
    ///
    /// Requeueing never waits: when the queue is full the remainder simply
    /// stays pending.
    pub fn with_requeue(mut self, signals: KeySender) -> Self {
        self.requeue = Some(signals);
        self
    }

    /// Current lifecycle state
    pub fn state(&self) -> DispatcherState {
        self.state
    }

    /// Tick until `shutdown` fires or its sender is dropped
    ///
    /// In-flight gateway calls are never cancelled: the shutdown signal is
    /// only observed between ticks. Returns the final counters, or the
    /// invariant violation that stopped the loop.
    pub async fn run(mut self, mut shutdown: oneshot::Receiver<()>) -> Result<MetricsSnapshot> {
        let mut ticker = time::interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            period = ?self.period,
            "Dispatcher started"
        );

        let outcome = loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break Ok(()),
                _ = ticker.tick() => {
                    if let Err(e) = self.tick().await {
                        error!(error = %e, "Dispatcher stopped on broken store invariant");
                        break Err(e);
                    }
                }
            }
        };

        self.stop();
        outcome.map(|()| self.metrics.snapshot())
    }

    fn stop(&mut self) {
        self.state = DispatcherState::Stopped;
        self.queue.close();
        info!("Stopping dispatcher...");
    }

    /// Run one tick: drain at most one key and send its batch
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Closed`] after the dispatcher stopped, and
    /// [`EngineError::MissingGroup`] when a signalled key has no group.
    pub async fn tick(&mut self) -> Result<TickOutcome> {
        if self.state == DispatcherState::Stopped {
            return Err(EngineError::Closed);
        }

        // Nothing pending yet
        let Some(key) = self.queue.try_pop() else {
            self.metrics.record_idle_tick();
            return Ok(TickOutcome::Idle);
        };

        // A stored group is never empty and every message fits SIZE_LIMIT,
        // so a present group always yields a batch.
        let (batch, deferred) = self
            .store
            .drain(&key, split_group)
            .flatten()
            .ok_or_else(|| EngineError::MissingGroup(key.clone()))?;

        self.requeue_if_pending(&key, deferred);
        Ok(self.deliver(key, batch, deferred).await)
    }

    async fn deliver(&self, key: GroupKey, batch: MergedBatch, deferred: usize) -> TickOutcome {
        let parts = batch.parts;
        let recipients = batch.recipients();

        match self
            .gateway
            .send(&batch.originator, &recipients, &batch.body)
            .await
        {
            Ok(ack) => {
                debug!(
                    key = %key,
                    parts,
                    deferred,
                    bytes = batch.body.len(),
                    id = ack.id.as_deref().unwrap_or("-"),
                    "Batch delivered"
                );
                self.metrics.record_drain(parts, deferred, true);
                TickOutcome::Sent {
                    key,
                    parts,
                    deferred,
                }
            }
            Err(e) => {
                warn!(key = %key, parts, "Error sending message - {}", e);
                self.metrics.record_drain(parts, deferred, false);
                TickOutcome::Failed {
                    key,
                    parts,
                    deferred,
                }
            }
        }
    }

    fn requeue_if_pending(&self, key: &GroupKey, deferred: usize) {
        let Some(signals) = &self.requeue else {
            return;
        };
        if deferred == 0 {
            return;
        }
        match signals.try_push(key.clone()) {
            Ok(None) => self.metrics.record_requeue(),
            Ok(Some(_)) => {
                warn!(key = %key, deferred, "Dispatch queue full, remainder stays pending")
            }
            Err(_) => {}
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("state", &self.state)
            .field("period", &self.period)
            .field("requeue", &self.requeue.is_some())
            .finish()
    }
}

fn split_group(msgs: Vec<Message>) -> (Option<(MergedBatch, usize)>, Vec<Message>) {
    let Partition { batch, remainder } = merge::partition(msgs, SIZE_LIMIT);
    let deferred = remainder.len();
    (batch.map(|b| (b, deferred)), remainder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::{DeliveryAck, DeliveryError};
    use crate::queue::dispatch_queue;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingGateway {
        calls: Mutex<Vec<(String, Vec<String>, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl DeliveryGateway for RecordingGateway {
        async fn send(
            &self,
            originator: &str,
            recipients: &[String],
            body: &str,
        ) -> std::result::Result<DeliveryAck, DeliveryError> {
            self.calls.lock().push((
                originator.to_string(),
                recipients.to_vec(),
                body.to_string(),
            ));
            if self.fail {
                Err(DeliveryError::Transport("connection refused".to_string()))
            } else {
                Ok(DeliveryAck::default())
            }
        }
    }

    struct Harness {
        store: Arc<AggregationStore>,
        signals: KeySender,
        gateway: Arc<RecordingGateway>,
        dispatcher: Dispatcher,
    }

    fn harness(config: EngineConfig, fail: bool) -> Harness {
        let store = Arc::new(AggregationStore::new());
        let (signals, queue) = dispatch_queue(config.queue_capacity);
        let gateway = Arc::new(RecordingGateway {
            fail,
            ..Default::default()
        });
        let mut dispatcher = Dispatcher::new(
            &config,
            Arc::clone(&store),
            queue,
            gateway.clone(),
            Arc::new(DispatchMetrics::new()),
        );
        if config.requeue_remainder {
            dispatcher = dispatcher.with_requeue(signals.clone());
        }
        Harness {
            store,
            signals,
            gateway,
            dispatcher,
        }
    }

    async fn enqueue(h: &Harness, body: &str) {
        let msg = Message::new("acme", "316", body).unwrap();
        if let crate::store::Insertion::Created(key) = h.store.insert(msg) {
            h.signals.push(key).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_tick_idle() {
        let mut h = harness(EngineConfig::default(), false);
        assert_eq!(h.dispatcher.tick().await.unwrap(), TickOutcome::Idle);
        assert!(h.gateway.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_tick_sends_merged_batch() {
        let mut h = harness(EngineConfig::default(), false);
        enqueue(&h, "b1").await;
        enqueue(&h, "b2").await;

        let outcome = h.dispatcher.tick().await.unwrap();
        assert!(matches!(outcome, TickOutcome::Sent { parts: 2, deferred: 0, .. }));

        let calls = h.gateway.calls.lock();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "acme");
        assert_eq!(calls[0].1, vec!["316".to_string()]);
        assert_eq!(calls[0].2, "b1\nb2");
        assert!(h.store.is_empty());
    }

    #[tokio::test]
    async fn test_tick_keeps_remainder_without_requeue() {
        let mut h = harness(EngineConfig::default(), false);
        enqueue(&h, &"*".repeat(100)).await;
        enqueue(&h, &"*".repeat(100)).await;

        let outcome = h.dispatcher.tick().await.unwrap();
        assert!(matches!(outcome, TickOutcome::Sent { parts: 1, deferred: 1, .. }));
        assert_eq!(h.store.message_count(), 1);

        // Key was not re-signalled
        assert_eq!(h.dispatcher.tick().await.unwrap(), TickOutcome::Idle);
        assert_eq!(h.gateway.calls.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_tick_requeues_remainder_when_enabled() {
        let mut h = harness(EngineConfig::default().requeue_remainder(true), false);
        enqueue(&h, &"*".repeat(100)).await;
        enqueue(&h, &"*".repeat(100)).await;

        h.dispatcher.tick().await.unwrap();
        let outcome = h.dispatcher.tick().await.unwrap();
        assert!(matches!(outcome, TickOutcome::Sent { parts: 1, deferred: 0, .. }));
        assert_eq!(h.gateway.calls.lock().len(), 2);
        assert!(h.store.is_empty());
    }

    #[tokio::test]
    async fn test_tick_gateway_failure_drops_batch() {
        let mut h = harness(EngineConfig::default(), true);
        enqueue(&h, "lost").await;

        let outcome = h.dispatcher.tick().await.unwrap();
        assert!(matches!(outcome, TickOutcome::Failed { parts: 1, .. }));
        assert!(h.store.is_empty());
        assert_eq!(h.dispatcher.state(), DispatcherState::Running);
    }

    #[tokio::test]
    async fn test_tick_missing_group_is_fatal() {
        let mut h = harness(EngineConfig::default(), false);
        let key = GroupKey::new("316", "acme");
        h.signals.push(key.clone()).await.unwrap();

        let err = h.dispatcher.tick().await.unwrap_err();
        assert_eq!(err, EngineError::MissingGroup(key));
    }

    #[tokio::test]
    async fn test_tick_never_discards_full_size_messages() {
        let mut h = harness(EngineConfig::default(), false);
        let full = "*".repeat(SIZE_LIMIT);
        enqueue(&h, &full).await;
        enqueue(&h, &full).await;

        let outcome = h.dispatcher.tick().await.unwrap();
        assert!(matches!(outcome, TickOutcome::Sent { parts: 1, deferred: 1, .. }));
        assert_eq!(h.gateway.calls.lock()[0].2, full);
        assert_eq!(h.store.message_count(), 1);

        let snap = h.dispatcher.metrics.snapshot();
        assert_eq!(snap.messages_sent + h.store.message_count() as u64, 2);
    }

    #[tokio::test]
    async fn test_tick_after_stop() {
        let mut h = harness(EngineConfig::default(), false);
        h.dispatcher.stop();
        assert_eq!(h.dispatcher.state(), DispatcherState::Stopped);
        assert_eq!(h.dispatcher.tick().await, Err(EngineError::Closed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_shutdown() {
        let h = harness(EngineConfig::default(), false);
        enqueue(&h, "hi").await;

        let (tx, rx) = oneshot::channel();
        let worker = tokio::spawn(h.dispatcher.run(rx));

        time::sleep(Duration::from_millis(1500)).await;
        tx.send(()).unwrap();
        let snapshot = worker.await.unwrap().unwrap();

        assert_eq!(snapshot.batches_sent, 1);
        assert_eq!(h.gateway.calls.lock().len(), 1);
        assert!(h.signals.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_first_tick_after_full_period() {
        let h = harness(EngineConfig::default(), false);
        enqueue(&h, "hi").await;

        let (tx, rx) = oneshot::channel();
        let worker = tokio::spawn(h.dispatcher.run(rx));

        time::sleep(Duration::from_millis(500)).await;
        assert!(h.gateway.calls.lock().is_empty());

        time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(h.gateway.calls.lock().len(), 1);

        drop(tx);
        assert!(worker.await.unwrap().is_ok());
    }
}
