//! Fair-dispatch consumer
//!
//! Declares the worker's durable queue and subscribes with a prefetch of
//! one, so the broker never hands this instance a second message before the
//! first one is settled.

use futures::{Stream, StreamExt};
use lapin::message::Delivery;
use lapin::options::{BasicConsumeOptions, BasicQosOptions, QueueDeclareOptions};
use lapin::types::FieldTable;
use lapin::{Channel, Consumer};
use tracing::info;

use crate::error::Result;
use crate::models::{DeliveryHandle, Envelope};

/// Unacknowledged deliveries allowed per worker instance
pub const PREFETCH_COUNT: u16 = 1;

/// Subscription to one durable queue
pub struct FairDispatchConsumer {
    consumer: Consumer,
}

impl FairDispatchConsumer {
    /// Declare `queue` as durable, set prefetch to one and start consuming
    pub async fn subscribe(channel: &Channel, queue: &str, consumer_tag: &str) -> Result<Self> {
        channel
            .queue_declare(
                queue,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;

        channel
            .basic_qos(PREFETCH_COUNT, BasicQosOptions::default())
            .await?;

        let consumer = channel
            .basic_consume(
                queue,
                consumer_tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;

        info!(
            queue,
            consumer_tag,
            prefetch_count = PREFETCH_COUNT,
            "Subscribed to durable queue"
        );

        Ok(Self { consumer })
    }

    /// Turn the subscription into a stream of handles and envelopes
    ///
    /// The stream ends once the broker closes the subscription.
    pub fn into_deliveries(self) -> impl Stream<Item = Result<(DeliveryHandle, Envelope)>> {
        self.consumer
            .map(|delivery| delivery.map(into_parts).map_err(Into::into))
    }
}

fn into_parts(delivery: Delivery) -> (DeliveryHandle, Envelope) {
    let handle = DeliveryHandle::new(delivery.delivery_tag);
    let headers = delivery.properties.headers().clone();
    let envelope = Envelope::from_parts(delivery.data, headers.as_ref());
    (handle, envelope)
}
