// smsmerge Gateway - MessageBird delivery client
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! MessageBird REST client

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use smsmerge::{DeliveryAck, DeliveryError, DeliveryGateway};
use tracing::{debug, warn};

use crate::config::GatewayConfig;
use crate::error::{ErrorBody, GatewayError, Result};

#[derive(Debug, Serialize)]
struct CreateMessage<'a> {
    originator: &'a str,
    recipients: &'a [String],
    body: &'a str,
}

/// Recipient counters of a created message
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientSummary {
    /// Recipients in the request
    #[serde(default)]
    pub total_count: usize,
    /// Recipients the message was sent to
    #[serde(default)]
    pub total_sent_count: usize,
}

/// Message resource returned by `POST /messages`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SmsMessage {
    pub id: String,
    #[serde(default)]
    pub href: String,
    #[serde(default)]
    pub recipients: RecipientSummary,
}

/// HTTP client for the MessageBird SMS API
pub struct MessageBirdClient {
    http: reqwest::Client,
    url: String,
    config: GatewayConfig,
}

impl MessageBirdClient {
    /// Validate `config` and build the underlying HTTP client
    pub fn new(config: GatewayConfig) -> Result<Self> {
        config.validate()?;

        let mut key = HeaderValue::from_str(&format!("AccessKey {}", config.access_key))
            .map_err(|_| {
                GatewayError::InvalidConfig("access_key is not a valid header value".to_string())
            })?;
        key.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, key);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            http,
            url: config.messages_url(),
            config,
        })
    }

    /// Configuration the client was built with
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Create and send one SMS
    ///
    /// # Errors
    ///
    /// [`GatewayError::Api`] for non-2xx answers, [`GatewayError::Http`] when
    /// the request fails, [`GatewayError::Decode`] for unreadable success
    /// bodies.
    #[tracing::instrument(skip_all, fields(originator = %originator, recipients = recipients.len()))]
    pub async fn create_message(
        &self,
        originator: &str,
        recipients: &[String],
        body: &str,
    ) -> Result<SmsMessage> {
        let request = CreateMessage {
            originator,
            recipients,
            body,
        };

        let resp = self.http.post(&self.url).json(&request).send().await?;
        let status = resp.status();
        let raw = resp.bytes().await?;

        if !status.is_success() {
            let errors = serde_json::from_slice::<ErrorBody>(&raw)
                .map(|b| b.errors)
                .unwrap_or_default();
            warn!(status = status.as_u16(), errors = errors.len(), "MessageBird rejected message");
            return Err(GatewayError::Api {
                status: status.as_u16(),
                errors,
            });
        }

        let message: SmsMessage = serde_json::from_slice(&raw)?;
        debug!(id = %message.id, sent = message.recipients.total_sent_count, "Message created");
        Ok(message)
    }
}

impl std::fmt::Debug for MessageBirdClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageBirdClient")
            .field("url", &self.url)
            .field("config", &self.config)
            .finish()
    }
}

#[async_trait]
impl DeliveryGateway for MessageBirdClient {
    async fn send(
        &self,
        originator: &str,
        recipients: &[String],
        body: &str,
    ) -> std::result::Result<DeliveryAck, DeliveryError> {
        let message = self.create_message(originator, recipients, body).await?;
        Ok(DeliveryAck::with_id(
            message.id,
            message.recipients.total_count,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let recipients = vec!["31600000000".to_string()];
        let request = CreateMessage {
            originator: "acme",
            recipients: &recipients,
            body: "a\nb",
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "originator": "acme",
                "recipients": ["31600000000"],
                "body": "a\nb"
            })
        );
    }

    #[test]
    fn test_response_parse() {
        let raw = r#"{
            "id": "e8077d803532c0b5937c639b60216938",
            "href": "https://rest.messagebird.com/messages/e8077d803532c0b5937c639b60216938",
            "direction": "mt",
            "originator": "acme",
            "body": "hello",
            "recipients": {"totalCount": 1, "totalSentCount": 1, "totalDeliveredCount": 0, "items": []}
        }"#;
        let msg: SmsMessage = serde_json::from_str(raw).unwrap();
        assert_eq!(msg.id, "e8077d803532c0b5937c639b60216938");
        assert_eq!(msg.recipients.total_count, 1);
        assert_eq!(msg.recipients.total_sent_count, 1);
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let result = MessageBirdClient::new(GatewayConfig::default());
        assert!(matches!(result, Err(GatewayError::InvalidConfig(_))));

        let result = MessageBirdClient::new(GatewayConfig::with_access_key("bad\nkey"));
        assert!(matches!(result, Err(GatewayError::InvalidConfig(_))));
    }
}
