//! Broker connection manager
//!
//! Connects once at startup, retrying with a fixed delay up to a bounded
//! number of attempts. There is no reconnection after startup: a lost
//! connection ends the consumer loop and the process exits.

use lapin::{Channel, Connection, ConnectionProperties};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::retry::{retry_bounded, RetryPolicy};

const REPLY_SUCCESS: u16 = 200;

/// An open connection and the single channel the worker uses
pub struct BrokerSession {
    connection: Connection,
    channel: Arc<Channel>,
}

impl BrokerSession {
    /// The worker's channel
    pub fn channel(&self) -> Arc<Channel> {
        Arc::clone(&self.channel)
    }

    /// Close the channel, then the connection
    pub async fn close(self) -> Result<()> {
        if self.channel.status().connected() {
            if let Err(e) = self.channel.close(REPLY_SUCCESS, "worker shutdown").await {
                warn!(error = %e, "Failed to close channel cleanly");
            }
        }

        if self.connection.status().connected() {
            self.connection
                .close(REPLY_SUCCESS, "worker shutdown")
                .await?;
        }

        info!("Connection closed");
        Ok(())
    }
}

/// Connect to the broker and open a channel
///
/// `display_url` is the masked URL used in log lines.
pub async fn connect(url: &str, display_url: &str, policy: RetryPolicy) -> Result<BrokerSession> {
    let connection = retry_bounded(
        policy,
        "amqp_connect",
        |_: &lapin::Error| false,
        |attempt| {
            info!(
                url = %display_url,
                attempt,
                max_attempts = policy.max_attempts,
                "Connecting to RabbitMQ"
            );
            Connection::connect(url, ConnectionProperties::default())
        },
    )
    .await
    .map_err(|e| match e {
        Error::RetriesExhausted {
            attempts,
            last_error,
        } => Error::broker(format!(
            "Failed to connect to RabbitMQ after {} attempts: {}",
            attempts, last_error
        )),
        other => other,
    })?;

    info!(url = %display_url, "Connected to RabbitMQ");

    let channel = connection.create_channel().await?;

    Ok(BrokerSession {
        connection,
        channel: Arc::new(channel),
    })
}
