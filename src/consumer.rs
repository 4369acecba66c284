//! NATS subscription for incoming scoring requests

use crate::types::request::ScoringRequest;
use anyhow::{Context, Result};
use async_nats::{Client, Subscriber};
use tracing::info;

/// Consumer receiving scoring requests from NATS
pub struct RequestConsumer {
    client: Client,
    subject: String,
}

impl RequestConsumer {
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Subscribe to the request subject
    pub async fn subscribe(&self) -> Result<Subscriber> {
        let subscriber = self
            .client
            .subscribe(self.subject.clone())
            .await
            .with_context(|| format!("Failed to subscribe to {}", self.subject))?;
        info!(subject = %self.subject, "Subscribed to scoring request subject");
        Ok(subscriber)
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }
}

/// Decode a request payload.
pub fn decode_request(payload: &[u8]) -> Result<ScoringRequest> {
    serde_json::from_slice(payload).context("Malformed scoring request payload")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_wire_request() {
        let payload = br#"{
            "userId": "u-17",
            "transactionData": {
                "amount": 150000,
                "recipientAccountNumber": "0123456789",
                "recipientBankCode": "058",
                "description": "School fees"
            },
            "userContext": {
                "ipAddress": "41.58.12.9",
                "userAgent": "Mozilla/5.0",
                "deviceFingerprint": "fp-1"
            },
            "behavioralData": {
                "sessionDuration": 900,
                "previousTransactionCount": 4,
                "avgTransactionAmount": 60000,
                "timeOfDay": 10,
                "dayOfWeek": 2
            }
        }"#;

        let request = decode_request(payload).unwrap();

        assert_eq!(request.user_id.as_deref(), Some("u-17"));
        assert_eq!(request.transaction.amount, 150_000.0);
        assert_eq!(request.transaction.narration.as_deref(), Some("School fees"));
        assert_eq!(request.behavioral.hour_of_day, 10);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_request(b"not json").is_err());
    }
}
