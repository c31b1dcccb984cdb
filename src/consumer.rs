//! NATS consumer for incoming prediction requests

use crate::config::NatsConfig;
use anyhow::{Context, Result};
use async_nats::{Client, Subscriber};
use tracing::info;

/// Subscribes to the request subject, optionally as a queue-group member so
/// several service instances split the request stream.
pub struct RequestConsumer {
    client: Client,
    subject: String,
    queue_group: Option<String>,
}

impl RequestConsumer {
    pub fn new(client: Client, nats: &NatsConfig) -> Self {
        Self {
            client,
            subject: nats.request_subject.clone(),
            queue_group: nats.queue_group.clone().filter(|g| !g.trim().is_empty()),
        }
    }

    pub async fn subscribe(&self) -> Result<Subscriber> {
        let subscriber = match &self.queue_group {
            Some(group) => self
                .client
                .queue_subscribe(self.subject.clone(), group.clone())
                .await
                .with_context(|| {
                    format!("Failed to join queue group {} on {}", group, self.subject)
                })?,
            None => self
                .client
                .subscribe(self.subject.clone())
                .await
                .with_context(|| format!("Failed to subscribe to {}", self.subject))?,
        };

        info!(
            subject = %self.subject,
            queue_group = self.queue_group.as_deref().unwrap_or("-"),
            "Listening for prediction requests"
        );
        Ok(subscriber)
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn queue_group(&self) -> Option<&str> {
        self.queue_group.as_deref()
    }
}
