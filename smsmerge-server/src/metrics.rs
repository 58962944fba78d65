// smsmerge Server - Prometheus metrics definitions
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Prometheus metrics for the smsmerge server.
//!
//! Request counters are updated by the handlers. Engine values are copied
//! from [`smsmerge::EngineHandle`] on every scrape.

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_gauge, CounterVec, Encoder, Gauge, TextEncoder,
};
use smsmerge::EngineHandle;

use crate::error::ServerError;

lazy_static! {
    // ============================================================
    // HTTP
    // ============================================================

    /// Requests to `/send` by outcome.
    pub static ref SEND_REQUESTS_TOTAL: CounterVec = register_counter_vec!(
        "smsmerge_send_requests_total",
        "Requests to /send by outcome",
        &["outcome"]
    ).unwrap();

    // ============================================================
    // Engine state
    // ============================================================

    pub static ref PENDING_GROUPS: Gauge = register_gauge!(
        "smsmerge_pending_groups",
        "Groups waiting to be drained"
    ).unwrap();

    pub static ref PENDING_MESSAGES: Gauge = register_gauge!(
        "smsmerge_pending_messages",
        "Messages waiting to be drained"
    ).unwrap();

    pub static ref QUEUE_DEPTH: Gauge = register_gauge!(
        "smsmerge_queue_depth",
        "Keys waiting in the dispatch queue"
    ).unwrap();

    // ============================================================
    // Engine counters (from MetricsSnapshot)
    // ============================================================

    pub static ref MESSAGES_ENQUEUED_TOTAL: Gauge = register_gauge!(
        "smsmerge_messages_enqueued_total",
        "Messages accepted by the engine"
    ).unwrap();

    pub static ref MESSAGES_SENT_TOTAL: Gauge = register_gauge!(
        "smsmerge_messages_sent_total",
        "Messages merged into delivered batches"
    ).unwrap();

    pub static ref MESSAGES_DEFERRED_TOTAL: Gauge = register_gauge!(
        "smsmerge_messages_deferred_total",
        "Messages left pending after a partial drain"
    ).unwrap();

    pub static ref GROUPS_CREATED_TOTAL: Gauge = register_gauge!(
        "smsmerge_groups_created_total",
        "Enqueues that created a new pending group"
    ).unwrap();

    pub static ref REQUEUED_TOTAL: Gauge = register_gauge!(
        "smsmerge_requeued_total",
        "Remainder keys pushed back onto the dispatch queue"
    ).unwrap();

    pub static ref BATCHES_SENT_TOTAL: Gauge = register_gauge!(
        "smsmerge_batches_sent_total",
        "Batches accepted by the gateway"
    ).unwrap();

    pub static ref BATCHES_FAILED_TOTAL: Gauge = register_gauge!(
        "smsmerge_batches_failed_total",
        "Batches the gateway refused"
    ).unwrap();

    pub static ref TICKS_TOTAL: Gauge = register_gauge!(
        "smsmerge_dispatcher_ticks_total",
        "Dispatcher ticks"
    ).unwrap();

    pub static ref IDLE_TICKS_TOTAL: Gauge = register_gauge!(
        "smsmerge_dispatcher_idle_ticks_total",
        "Dispatcher ticks with nothing to drain"
    ).unwrap();

    pub static ref MERGE_RATIO: Gauge = register_gauge!(
        "smsmerge_merge_ratio",
        "Average messages per delivered batch"
    ).unwrap();
}

/// Result of one `/send` request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Accepted,
    WrongMethod,
    ReadError,
    ParseError,
    Invalid,
    Unavailable,
    InternalError,
}

impl SendOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            SendOutcome::Accepted => "accepted",
            SendOutcome::WrongMethod => "wrong_method",
            SendOutcome::ReadError => "read_error",
            SendOutcome::ParseError => "parse_error",
            SendOutcome::Invalid => "invalid",
            SendOutcome::Unavailable => "unavailable",
            SendOutcome::InternalError => "internal_error",
        }
    }
}

pub fn record_send(outcome: SendOutcome) {
    SEND_REQUESTS_TOTAL
        .with_label_values(&[outcome.as_str()])
        .inc();
}

/// Copy the engine's current state into the registry
pub fn update_engine_metrics(engine: &EngineHandle) {
    PENDING_GROUPS.set(engine.pending_groups() as f64);
    PENDING_MESSAGES.set(engine.pending_messages() as f64);
    QUEUE_DEPTH.set(engine.queue_depth() as f64);

    let snap = engine.metrics();
    MESSAGES_ENQUEUED_TOTAL.set(snap.enqueued as f64);
    MESSAGES_SENT_TOTAL.set(snap.messages_sent as f64);
    MESSAGES_DEFERRED_TOTAL.set(snap.messages_deferred as f64);
    GROUPS_CREATED_TOTAL.set(snap.groups_created as f64);
    REQUEUED_TOTAL.set(snap.requeued as f64);
    BATCHES_SENT_TOTAL.set(snap.batches_sent as f64);
    BATCHES_FAILED_TOTAL.set(snap.batches_failed as f64);
    TICKS_TOTAL.set(snap.ticks as f64);
    IDLE_TICKS_TOTAL.set(snap.idle_ticks as f64);
    MERGE_RATIO.set(snap.merge_ratio());
}

/// Render every registered metric in the Prometheus text format
pub fn encode_metrics() -> Result<String, ServerError> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_labels() {
        assert_eq!(SendOutcome::Accepted.as_str(), "accepted");
        assert_eq!(SendOutcome::Unavailable.as_str(), "unavailable");
        assert_eq!(SendOutcome::InternalError.as_str(), "internal_error");
    }

    #[test]
    fn test_encode_includes_request_counter() {
        record_send(SendOutcome::ParseError);
        let text = encode_metrics().unwrap();
        assert!(text.contains("smsmerge_send_requests_total"));
        assert!(text.contains("outcome=\"parse_error\""));
    }
}
