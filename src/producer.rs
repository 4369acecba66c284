//! NATS publisher for scoring results

use crate::types::result::ScoringResult;
use anyhow::Result;
use async_nats::Client;
use tracing::debug;

/// Producer publishing scoring results to NATS
#[derive(Clone)]
pub struct ResultProducer {
    client: Client,
    subject: String,
}

impl ResultProducer {
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Publish a result to the reply subject if given, else the result subject
    pub async fn publish(&self, result: &ScoringResult, reply: Option<&str>) -> Result<()> {
        let payload = serde_json::to_vec(result)?;
        let subject = reply.unwrap_or(&self.subject).to_string();

        self.client.publish(subject.clone(), payload.into()).await?;

        debug!(
            subject = %subject,
            session_id = %result.session_id,
            risk_score = result.risk_score,
            decision = %result.decision,
            "Published scoring result"
        );

        Ok(())
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }
}
