//! Dispatch queue
//!
//! A bounded FIFO of grouping keys waiting for their first drain. Producers
//! push a key when they create its group and wait when the queue is full;
//! the dispatcher pops at most one key per tick and never waits.

use tokio::sync::mpsc::{self, error::TryRecvError, error::TrySendError};

use crate::error::{EngineError, Result};
use crate::message::GroupKey;

/// Create a dispatch queue holding at most `capacity` keys
///
/// # Panics
///
/// Panics if `capacity` is zero. [`crate::EngineConfig::validate`] rejects
/// such configurations before the engine starts.
pub fn dispatch_queue(capacity: usize) -> (KeySender, KeyReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    (KeySender { tx }, KeyReceiver { rx })
}

/// Producer side of the dispatch queue
#[derive(Debug, Clone)]
pub struct KeySender {
    tx: mpsc::Sender<GroupKey>,
}

impl KeySender {
    /// Push a key, waiting for a free slot when the queue is full
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Closed`] once the dispatcher has stopped.
    pub async fn push(&self, key: GroupKey) -> Result<()> {
        self.tx.send(key).await.map_err(|_| EngineError::Closed)
    }

    /// Push a key without waiting
    ///
    /// Returns the key back when the queue is full.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Closed`] once the dispatcher has stopped.
    pub fn try_push(&self, key: GroupKey) -> Result<Option<GroupKey>> {
        match self.tx.try_send(key) {
            Ok(()) => Ok(None),
            Err(TrySendError::Full(key)) => Ok(Some(key)),
            Err(TrySendError::Closed(_)) => Err(EngineError::Closed),
        }
    }

    /// Number of keys currently waiting
    pub fn depth(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    /// Maximum number of waiting keys
    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }

    /// Check if the consumer side is gone
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Wait until the consumer side closes
    pub async fn closed(&self) {
        self.tx.closed().await
    }
}

/// Consumer side of the dispatch queue, owned by the dispatcher
#[derive(Debug)]
pub struct KeyReceiver {
    rx: mpsc::Receiver<GroupKey>,
}

impl KeyReceiver {
    /// Pop the oldest key if one is waiting
    pub fn try_pop(&mut self) -> Option<GroupKey> {
        match self.rx.try_recv() {
            Ok(key) => Some(key),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Stop accepting new keys; keys already queued can still be popped
    pub fn close(&mut self) {
        self.rx.close();
    }
}
