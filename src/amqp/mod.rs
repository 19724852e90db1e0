//! RabbitMQ integration
//!
//! This module provides:
//! - Startup connection with bounded retries
//! - A durable, prefetch-1 consumer loop
//! - Header-based retry counting
//! - The acknowledgment resolver that settles each delivery

pub mod channel;
pub mod connection;
pub mod consumer;
pub mod headers;
pub mod resolver;

pub use channel::LapinChannel;
pub use connection::{connect, BrokerSession};
pub use consumer::FairDispatchConsumer;
pub use resolver::{apply, resolve, Resolution, Settlement};

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{DeliveryHandle, Envelope};

/// The broker operations needed to settle a delivery
///
/// Acknowledging and rejecting take the handle by value: once a delivery is
/// settled its handle is gone.
#[async_trait]
pub trait MessageChannel: Send + Sync {
    /// Acknowledge and remove the delivery
    async fn ack(&self, handle: DeliveryHandle) -> Result<()>;

    /// Reject the delivery and let the broker redeliver it
    async fn nack_requeue(&self, handle: DeliveryHandle) -> Result<()>;

    /// Publish `envelope` as a new persistent message on the worker's queue
    async fn republish(&self, envelope: &Envelope) -> Result<()>;
}
