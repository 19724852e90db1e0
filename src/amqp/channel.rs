//! lapin-backed implementation of [`MessageChannel`]

use async_trait::async_trait;
use lapin::options::{BasicAckOptions, BasicNackOptions, BasicPublishOptions};
use lapin::{BasicProperties, Channel};
use std::sync::Arc;
use tracing::debug;

use super::MessageChannel;
use crate::error::Result;
use crate::models::{DeliveryHandle, Envelope};

/// AMQP delivery mode for messages that survive a broker restart
const PERSISTENT: u8 = 2;

/// Settles deliveries on one AMQP channel
#[derive(Clone)]
pub struct LapinChannel {
    channel: Arc<Channel>,
    queue: String,
}

impl LapinChannel {
    /// Wrap a channel that consumes from `queue`
    pub fn new(channel: Arc<Channel>, queue: impl Into<String>) -> Self {
        Self {
            channel,
            queue: queue.into(),
        }
    }
}

#[async_trait]
impl MessageChannel for LapinChannel {
    async fn ack(&self, handle: DeliveryHandle) -> Result<()> {
        self.channel
            .basic_ack(handle.tag(), BasicAckOptions::default())
            .await?;
        Ok(())
    }

    async fn nack_requeue(&self, handle: DeliveryHandle) -> Result<()> {
        self.channel
            .basic_nack(
                handle.tag(),
                BasicNackOptions {
                    requeue: true,
                    ..Default::default()
                },
            )
            .await?;
        Ok(())
    }

    async fn republish(&self, envelope: &Envelope) -> Result<()> {
        let properties = BasicProperties::default()
            .with_delivery_mode(PERSISTENT)
            .with_content_type("application/json".into())
            .with_headers(envelope.headers());

        // Default exchange routes by queue name
        self.channel
            .basic_publish(
                "",
                &self.queue,
                BasicPublishOptions::default(),
                envelope.body(),
                properties,
            )
            .await?;

        debug!(
            queue = %self.queue,
            attempt = envelope.attempt_count(),
            "Republished message"
        );
        Ok(())
    }
}
