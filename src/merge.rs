//! Size-bounded merging of a pending group
//!
//! [`partition`] splits the messages of one group into a batch that fits a
//! single gateway payload and a deferred remainder. Packing is greedy and
//! single-pass: messages are never reordered, and once one message does not
//! fit every later message is deferred as well.
//!
//! ```rust
//! use smsmerge::{merge, Message};
//!
//! let msgs = vec![
//!     Message::new("acme", "316", "first").unwrap(),
//!     Message::new("acme", "316", "second").unwrap(),
//! ];
//! let split = merge::partition(msgs, smsmerge::SIZE_LIMIT);
//! assert_eq!(split.batch.unwrap().body, "first\nsecond");
//! assert!(split.remainder.is_empty());
//! ```

use crate::message::{Message, BODY_SEPARATOR};

/// One gateway payload built from a pending group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedBatch {
    /// Originator shared by every merged message
    pub originator: String,
    /// Recipient shared by every merged message
    pub recipient: String,
    /// Accepted bodies joined with [`BODY_SEPARATOR`]
    pub body: String,
    /// Number of messages merged into `body`
    pub parts: usize,
}

impl MergedBatch {
    /// Recipient list in the shape the gateway expects
    pub fn recipients(&self) -> Vec<String> {
        vec![self.recipient.clone()]
    }
}

/// Result of splitting a group
#[derive(Debug, Clone, Default)]
pub struct Partition {
    /// Send-now payload, `None` when nothing fit
    pub batch: Option<MergedBatch>,
    /// Deferred messages, oldest first
    pub remainder: Vec<Message>,
}

impl Partition {
    /// Number of messages placed in the batch
    pub fn accepted(&self) -> usize {
        self.batch.as_ref().map_or(0, |b| b.parts)
    }

    /// Number of deferred messages
    pub fn deferred(&self) -> usize {
        self.remainder.len()
    }
}

/// Split `msgs` into one payload of at most `limit` body bytes and a remainder
///
/// The running total counts body bytes only; separators are not charged
/// against the limit. Originator and recipient are taken from the first
/// message.
pub fn partition(msgs: Vec<Message>, limit: usize) -> Partition {
    let Some(first) = msgs.first() else {
        return Partition::default();
    };
    let originator = first.originator().to_string();
    let recipient = first.recipient().to_string();

    let mut total = 0usize;
    let mut bodies: Vec<&str> = Vec::with_capacity(msgs.len());
    let mut accepted = vec![false; msgs.len()];

    for (i, msg) in msgs.iter().enumerate() {
        // The total grows even for deferred messages, so nothing after the
        // first overflow can slip into the batch.
        total += msg.size();
        if total <= limit {
            bodies.push(msg.body());
            accepted[i] = true;
        }
    }

    let batch = if bodies.is_empty() {
        None
    } else {
        Some(MergedBatch {
            originator,
            recipient,
            body: bodies.join(BODY_SEPARATOR),
            parts: bodies.len(),
        })
    };

    let remainder = msgs
        .into_iter()
        .zip(accepted)
        .filter_map(|(msg, taken)| (!taken).then_some(msg))
        .collect();

    Partition { batch, remainder }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::SIZE_LIMIT;

    fn msg(body: &str) -> Message {
        Message::new("acme", "31600000000", body).unwrap()
    }

    fn sized(len: usize) -> Message {
        msg(&"*".repeat(len))
    }

    #[test]
    fn test_partition_empty() {
        let split = partition(Vec::new(), SIZE_LIMIT);
        assert!(split.batch.is_none());
        assert!(split.remainder.is_empty());
        assert_eq!(split.accepted(), 0);
    }

    #[test]
    fn test_partition_single() {
        let split = partition(vec![msg("hi")], SIZE_LIMIT);
        let batch = split.batch.unwrap();
        assert_eq!(batch.body, "hi");
        assert_eq!(batch.originator, "acme");
        assert_eq!(batch.recipient, "31600000000");
        assert_eq!(batch.recipients(), vec!["31600000000".to_string()]);
        assert_eq!(batch.parts, 1);
        assert!(split.remainder.is_empty());
    }

    #[test]
    fn test_partition_merges_in_order() {
        let split = partition(vec![msg("b1"), msg("b2"), msg("b3")], SIZE_LIMIT);
        assert_eq!(split.batch.unwrap().body, "b1\nb2\nb3");
        assert!(split.remainder.is_empty());
    }

    #[test]
    fn test_partition_full_body_is_alone() {
        let split = partition(vec![sized(SIZE_LIMIT), msg("x")], SIZE_LIMIT);
        assert_eq!(split.accepted(), 1);
        assert_eq!(split.batch.unwrap().body.len(), SIZE_LIMIT);
        assert_eq!(split.remainder, vec![msg("x")]);
    }

    #[test]
    fn test_partition_greedy_two_hundreds() {
        let split = partition(vec![sized(100), sized(100)], SIZE_LIMIT);
        assert_eq!(split.accepted(), 1);
        assert_eq!(split.deferred(), 1);
        assert_eq!(split.remainder[0].size(), 100);
    }

    #[test]
    fn test_partition_no_lookahead_after_overflow() {
        // 100 fits, 100 overflows, 10 would fit but comes after the overflow
        let split = partition(vec![sized(100), sized(100), sized(10)], SIZE_LIMIT);
        assert_eq!(split.accepted(), 1);
        let deferred: Vec<usize> = split.remainder.iter().map(Message::size).collect();
        assert_eq!(deferred, vec![100, 10]);
    }

    #[test]
    fn test_partition_exact_fill() {
        let split = partition(vec![sized(80), sized(80)], SIZE_LIMIT);
        let batch = split.batch.unwrap();
        assert_eq!(batch.parts, 2);
        // Separator is not charged against the limit
        assert_eq!(batch.body.len(), SIZE_LIMIT + 1);
        assert!(split.remainder.is_empty());
    }

    #[test]
    fn test_partition_custom_limit() {
        let split = partition(vec![msg("abc"), msg("def")], 4);
        assert_eq!(split.batch.unwrap().body, "abc");
        assert_eq!(split.remainder, vec![msg("def")]);
    }

    #[test]
    fn test_partition_nothing_fits() {
        let split = partition(vec![sized(10)], 5);
        assert!(split.batch.is_none());
        assert_eq!(split.deferred(), 1);
    }
}
