//! NATS producer for prediction responses

use crate::types::request::PredictionResponse;
use anyhow::Result;
use async_nats::{Client, Subject};
use tracing::debug;

/// Producer for publishing prediction responses to NATS
#[derive(Clone)]
pub struct ResponseProducer {
    client: Client,
    subject: String,
}

impl ResponseProducer {
    /// Create a new response producer
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Publish a response to the request's reply subject, or to the default
    /// response subject when the request carried none.
    pub async fn publish(&self, response: &PredictionResponse, reply: Option<Subject>) -> Result<()> {
        let payload = serde_json::to_vec(response)?;
        let subject = reply.unwrap_or_else(|| Subject::from(self.subject.as_str()));

        self.client.publish(subject.clone(), payload.into()).await?;

        debug!(
            request_id = %response.request_id,
            subject = %subject,
            accepted = response.is_accepted(),
            "Published prediction response"
        );

        Ok(())
    }

    /// Get the default subject name
    pub fn subject(&self) -> &str {
        &self.subject
    }
}
