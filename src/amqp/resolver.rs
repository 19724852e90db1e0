//! Acknowledgment resolver
//!
//! [`resolve`] is a pure function of the processing outcome and the attempt
//! counter. [`apply`] carries the decision out against a [`MessageChannel`].
//!
//! | outcome   | attempt < max                  | attempt >= max   |
//! |-----------|--------------------------------|------------------|
//! | success   | ack (delivered)                | ack (delivered)  |
//! | permanent | ack (dropped)                  | ack (dropped)    |
//! | retryable | republish attempt+1, then ack  | ack (gave up)    |

use tracing::{error, info, warn};

use super::MessageChannel;
use crate::error::Result;
use crate::models::{DeliveryHandle, Envelope, ProcessingOutcome, Terminal};

/// What to do with a delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Remove the message; this delivery ends the message's life
    Ack(Terminal),

    /// Publish a copy with the counter bumped, then remove the original
    Republish { next_attempt: u32 },
}

/// What actually happened on the broker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// Acknowledged without a follow-up message
    Acked(Terminal),

    /// A retry copy was published and the original acknowledged
    Republished { next_attempt: u32 },

    /// The retry copy could not be published; the original was handed
    /// back to the broker unchanged
    Requeued,
}

impl Settlement {
    /// Terminal state when the message's retry chain ended here
    pub fn terminal(&self) -> Option<Terminal> {
        match self {
            Settlement::Acked(terminal) => Some(*terminal),
            Settlement::Republished { .. } | Settlement::Requeued => None,
        }
    }

    /// Short label for logs
    pub fn label(&self) -> &'static str {
        match self {
            Settlement::Acked(Terminal::Delivered) => "acked_delivered",
            Settlement::Acked(Terminal::Dropped) => "acked_dropped",
            Settlement::Acked(Terminal::GaveUp) => "acked_gave_up",
            Settlement::Republished { .. } => "republished",
            Settlement::Requeued => "requeued",
        }
    }
}

/// Decide how to settle a delivery
pub fn resolve(outcome: &ProcessingOutcome, attempt_count: u32, max_retries: u32) -> Resolution {
    match outcome {
        ProcessingOutcome::Success(_) => Resolution::Ack(Terminal::Delivered),
        ProcessingOutcome::PermanentFailure(_) => Resolution::Ack(Terminal::Dropped),
        ProcessingOutcome::RetryableFailure(_) if attempt_count < max_retries => {
            Resolution::Republish {
                next_attempt: attempt_count + 1,
            }
        },
        ProcessingOutcome::RetryableFailure(_) => Resolution::Ack(Terminal::GaveUp),
    }
}

/// Carry out `resolution` for the delivery identified by `handle`
///
/// The retry copy is published before the original is acknowledged, so a
/// crash in between yields a duplicate rather than a lost message. If the
/// publish fails the original is nacked with requeue instead.
pub async fn apply(
    channel: &dyn MessageChannel,
    handle: DeliveryHandle,
    envelope: &Envelope,
    resolution: Resolution,
) -> Result<Settlement> {
    match resolution {
        Resolution::Ack(terminal) => {
            channel.ack(handle).await?;
            Ok(Settlement::Acked(terminal))
        },
        Resolution::Republish { next_attempt } => {
            let retry = envelope.next_attempt();
            debug_assert_eq!(retry.attempt_count(), next_attempt);

            if let Err(e) = channel.republish(&retry).await {
                error!(
                    error = %e,
                    next_attempt,
                    "Failed to republish message for retry, requeueing original"
                );
                channel.nack_requeue(handle).await?;
                return Ok(Settlement::Requeued);
            }

            channel.ack(handle).await?;
            info!(next_attempt, "Message requeued for retry");
            Ok(Settlement::Republished { next_attempt })
        },
    }
}

/// Log the final state of a retry chain
pub(crate) fn log_terminal(terminal: Terminal, attempt_count: u32, max_retries: u32) {
    match terminal {
        Terminal::Delivered => info!(attempt = attempt_count, "Processing complete, acknowledged"),
        Terminal::Dropped => warn!(attempt = attempt_count, "Dropped unprocessable message"),
        Terminal::GaveUp => error!(
            attempt = attempt_count,
            max_retries, "Max retries exceeded, giving up"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JobResult;
    use crate::test_utils::{ChannelOp, MockChannel};
    use serde_json::json;

    const MAX: u32 = 3;

    fn retryable() -> ProcessingOutcome {
        ProcessingOutcome::RetryableFailure("downstream unavailable".to_string())
    }

    #[test]
    fn test_resolve_table() {
        let success = ProcessingOutcome::Success(JobResult::EventProcessed);
        let permanent = ProcessingOutcome::PermanentFailure("missing gameId".to_string());

        for attempt in [0, 1, MAX, MAX + 5] {
            assert_eq!(
                resolve(&success, attempt, MAX),
                Resolution::Ack(Terminal::Delivered)
            );
            assert_eq!(
                resolve(&permanent, attempt, MAX),
                Resolution::Ack(Terminal::Dropped)
            );
        }

        assert_eq!(
            resolve(&retryable(), 0, MAX),
            Resolution::Republish { next_attempt: 1 }
        );
        assert_eq!(
            resolve(&retryable(), MAX - 1, MAX),
            Resolution::Republish { next_attempt: MAX }
        );
        assert_eq!(
            resolve(&retryable(), MAX, MAX),
            Resolution::Ack(Terminal::GaveUp)
        );
        assert_eq!(
            resolve(&retryable(), MAX + 1, MAX),
            Resolution::Ack(Terminal::GaveUp)
        );
    }

    #[test]
    fn test_zero_max_retries_never_republishes() {
        assert_eq!(resolve(&retryable(), 0, 0), Resolution::Ack(Terminal::GaveUp));
    }

    #[tokio::test]
    async fn test_apply_republish_then_ack() {
        let channel = MockChannel::new();
        let envelope = Envelope::from_json(&json!({"gameId": "g1"})).with_attempt_count(1);

        let settlement = apply(
            &channel,
            DeliveryHandle::new(7),
            &envelope,
            Resolution::Republish { next_attempt: 2 },
        )
        .await
        .unwrap();

        assert_eq!(settlement, Settlement::Republished { next_attempt: 2 });
        let ops = channel.operations();
        assert_eq!(ops.len(), 2);
        match &ops[0] {
            ChannelOp::Republish(published) => {
                assert_eq!(published.attempt_count(), 2);
                assert_eq!(published.body(), envelope.body());
            },
            other => panic!("expected republish first, got {:?}", other),
        }
        assert_eq!(ops[1], ChannelOp::Ack(7));
    }

    #[tokio::test]
    async fn test_apply_requeues_when_republish_fails() {
        let channel = MockChannel::new();
        channel.fail_next_republish("channel closed");
        let envelope = Envelope::from_json(&json!({"gameId": "g1"}));

        let settlement = apply(
            &channel,
            DeliveryHandle::new(3),
            &envelope,
            Resolution::Republish { next_attempt: 1 },
        )
        .await
        .unwrap();

        assert_eq!(settlement, Settlement::Requeued);
        assert_eq!(channel.operations(), vec![ChannelOp::NackRequeue(3)]);
        assert!(settlement.terminal().is_none());
    }

    #[tokio::test]
    async fn test_apply_ack() {
        let channel = MockChannel::new();
        let envelope = Envelope::from_json(&json!({}));

        let settlement = apply(
            &channel,
            DeliveryHandle::new(1),
            &envelope,
            Resolution::Ack(Terminal::GaveUp),
        )
        .await
        .unwrap();

        assert_eq!(settlement.terminal(), Some(Terminal::GaveUp));
        assert_eq!(channel.operations(), vec![ChannelOp::Ack(1)]);
    }
}
