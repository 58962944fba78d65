//! Message and grouping key model
//!
//! A [`Message`] is one inbound text message. Messages sharing the same
//! recipient and originator share a [`GroupKey`] and are merged together by
//! the dispatcher.

use std::fmt;

use crate::error::ValidationError;

/// Maximum body size in bytes for one gateway payload
pub const SIZE_LIMIT: usize = 160;

/// Separator placed between merged bodies
pub const BODY_SEPARATOR: &str = "\n";

/// One validated, immutable text message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    originator: String,
    recipient: String,
    body: String,
}

impl Message {
    /// Create a message, enforcing the shared validation rule
    ///
    /// # Errors
    ///
    /// Returns the first failing check, in this order: empty recipient,
    /// empty originator, empty body, body larger than [`SIZE_LIMIT`].
    pub fn new(
        originator: impl Into<String>,
        recipient: impl Into<String>,
        body: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let msg = Self {
            originator: originator.into(),
            recipient: recipient.into(),
            body: body.into(),
        };
        msg.validate()?;
        Ok(msg)
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.recipient.is_empty() {
            return Err(ValidationError::EmptyRecipient);
        }
        if self.originator.is_empty() {
            return Err(ValidationError::EmptyOriginator);
        }
        if self.body.is_empty() {
            return Err(ValidationError::EmptyBody);
        }
        if self.body.len() > SIZE_LIMIT {
            return Err(ValidationError::BodyTooLarge {
                size: self.body.len(),
            });
        }
        Ok(())
    }

    /// Sender name or number
    pub fn originator(&self) -> &str {
        &self.originator
    }

    /// Destination number
    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    /// Text content
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Body size in bytes, the unit counted against [`SIZE_LIMIT`]
    pub fn size(&self) -> usize {
        self.body.len()
    }

    /// Grouping key of this message
    pub fn key(&self) -> GroupKey {
        GroupKey::new(self.recipient.clone(), self.originator.clone())
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Message <Recipient: {:?}, Originator: {:?}, Body: {:?}>",
            self.recipient, self.originator, self.body
        )
    }
}

/// Identity of a pending group: one recipient/originator pair
///
/// Both parts are kept separately, so `("AB", "C")` and `("A", "BC")` are
/// distinct keys. The display form is length-prefixed for the same reason:
/// `<recipient length>:<recipient><originator>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupKey {
    recipient: String,
    originator: String,
}

impl GroupKey {
    /// Build a key from a recipient and an originator
    pub fn new(recipient: impl Into<String>, originator: impl Into<String>) -> Self {
        Self {
            recipient: recipient.into(),
            originator: originator.into(),
        }
    }

    /// Recipient part of the key
    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    /// Originator part of the key
    pub fn originator(&self) -> &str {
        &self.originator
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}{}",
            self.recipient.len(),
            self.recipient,
            self.originator
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_message_new() {
        let msg = Message::new("acme", "31600000000", "hello").unwrap();
        assert_eq!(msg.originator(), "acme");
        assert_eq!(msg.recipient(), "31600000000");
        assert_eq!(msg.body(), "hello");
        assert_eq!(msg.size(), 5);
    }

    #[test]
    fn test_validation_order() {
        // Everything empty: recipient is reported first
        assert_eq!(
            Message::new("", "", ""),
            Err(ValidationError::EmptyRecipient)
        );
        assert_eq!(
            Message::new("", "r", ""),
            Err(ValidationError::EmptyOriginator)
        );
        assert_eq!(Message::new("o", "r", ""), Err(ValidationError::EmptyBody));
    }

    #[test]
    fn test_body_at_limit_accepted() {
        let body = "*".repeat(SIZE_LIMIT);
        assert!(Message::new("o", "r", body).is_ok());
    }

    #[test]
    fn test_body_over_limit_rejected() {
        let body = "*".repeat(SIZE_LIMIT + 1);
        assert_eq!(
            Message::new("o", "r", body),
            Err(ValidationError::BodyTooLarge {
                size: SIZE_LIMIT + 1
            })
        );
    }

    #[test]
    fn test_size_counts_bytes() {
        // 80 two-byte characters = 160 bytes
        let body = "é".repeat(80);
        let msg = Message::new("o", "r", body).unwrap();
        assert_eq!(msg.size(), 160);
        assert!(Message::new("o", "r", "é".repeat(81)).is_err());
    }

    #[test]
    fn test_key_equality() {
        let a = Message::new("acme", "316", "one").unwrap();
        let b = Message::new("acme", "316", "two").unwrap();
        let c = Message::new("other", "316", "one").unwrap();
        assert_eq!(a.key(), b.key());
        assert_ne!(a.key(), c.key());
    }

    #[test]
    fn test_key_naive_concatenation_collision_avoided() {
        let left = GroupKey::new("AB", "C");
        let right = GroupKey::new("A", "BC");
        assert_ne!(left, right);
        assert_ne!(left.to_string(), right.to_string());

        let mut set = HashSet::new();
        set.insert(left);
        set.insert(right);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_key_display() {
        let key = GroupKey::new("316", "acme");
        assert_eq!(key.to_string(), "3:316acme");
        assert_eq!(key.recipient(), "316");
        assert_eq!(key.originator(), "acme");
    }

    #[test]
    fn test_message_display() {
        let msg = Message::new("acme", "316", "hi").unwrap();
        assert_eq!(
            msg.to_string(),
            r#"Message <Recipient: "316", Originator: "acme", Body: "hi">"#
        );
    }
}
