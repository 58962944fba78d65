//! Engine counters
//!
//! [`DispatchMetrics`] is shared between producers and the dispatcher and
//! updated with relaxed atomics. [`MetricsSnapshot`] is a plain copy used
//! for reporting.

use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters for one engine
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    enqueued: AtomicU64,
    groups_created: AtomicU64,
    ticks: AtomicU64,
    idle_ticks: AtomicU64,
    batches_sent: AtomicU64,
    batches_failed: AtomicU64,
    messages_sent: AtomicU64,
    messages_deferred: AtomicU64,
    requeued: AtomicU64,
}

impl DispatchMetrics {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an accepted message
    pub fn record_enqueue(&self, created_group: bool) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
        if created_group {
            self.groups_created.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a tick that found no key to drain
    pub fn record_idle_tick(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
        self.idle_ticks.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the outcome of one drain
    pub fn record_drain(&self, parts: usize, deferred: usize, delivered: bool) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
        self.messages_deferred
            .fetch_add(deferred as u64, Ordering::Relaxed);
        if delivered {
            self.batches_sent.fetch_add(1, Ordering::Relaxed);
            self.messages_sent.fetch_add(parts as u64, Ordering::Relaxed);
        } else {
            self.batches_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a remainder key pushed back onto the queue
    pub fn record_requeue(&self) {
        self.requeued.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current values
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            groups_created: self.groups_created.load(Ordering::Relaxed),
            ticks: self.ticks.load(Ordering::Relaxed),
            idle_ticks: self.idle_ticks.load(Ordering::Relaxed),
            batches_sent: self.batches_sent.load(Ordering::Relaxed),
            batches_failed: self.batches_failed.load(Ordering::Relaxed),
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            messages_deferred: self.messages_deferred.load(Ordering::Relaxed),
            requeued: self.requeued.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`DispatchMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Messages accepted by `enqueue`
    pub enqueued: u64,
    /// Enqueues that created a new group
    pub groups_created: u64,
    /// Dispatcher ticks, idle or not
    pub ticks: u64,
    /// Ticks that found the queue empty
    pub idle_ticks: u64,
    /// Batches the gateway accepted
    pub batches_sent: u64,
    /// Batches the gateway refused or never answered
    pub batches_failed: u64,
    /// Messages merged into accepted batches
    pub messages_sent: u64,
    /// Messages left pending after a partial drain
    pub messages_deferred: u64,
    /// Remainder keys pushed back onto the queue
    pub requeued: u64,
}

impl MetricsSnapshot {
    /// Average number of messages merged per accepted batch
    pub fn merge_ratio(&self) -> f64 {
        if self.batches_sent == 0 {
            return 0.0;
        }
        self.messages_sent as f64 / self.batches_sent as f64
    }

    /// Fraction of ticks that drained a key (0.0 - 1.0)
    pub fn utilization(&self) -> f64 {
        if self.ticks == 0 {
            return 0.0;
        }
        (self.ticks - self.idle_ticks) as f64 / self.ticks as f64
    }

    /// Generate a human-readable report
    pub fn report(&self) -> String {
        let mut report = String::new();

        report.push_str("=== smsmerge dispatch metrics ===\n\n");
        report.push_str(&format!("Messages enqueued: {}\n", self.enqueued));
        report.push_str(&format!("Groups created: {}\n", self.groups_created));
        report.push_str(&format!(
            "Ticks: {} ({} idle, {:.1}% busy)\n",
            self.ticks,
            self.idle_ticks,
            self.utilization() * 100.0
        ));
        report.push_str(&format!(
            "Batches: {} sent, {} failed\n",
            self.batches_sent, self.batches_failed
        ));
        report.push_str(&format!(
            "Messages sent: {} ({:.2} per batch)\n",
            self.messages_sent,
            self.merge_ratio()
        ));
        report.push_str(&format!("Messages deferred: {}\n", self.messages_deferred));
        report.push_str(&format!("Remainders requeued: {}\n", self.requeued));

        report
    }
}
