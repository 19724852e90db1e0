//! Worker pipeline and consumer loop
//!
//! A [`Worker`] owns everything one delivery needs: the channel to settle
//! it on, the processor and the backend notifier. Deliveries are handled
//! strictly one at a time:
//!
//! 1. decode the body into a [`Job`] (malformed input is dropped)
//! 2. process the job
//! 3. resolve and settle the delivery on the broker
//! 4. notify the backend if the retry chain ended with a terminal state

use futures::{Stream, StreamExt};
use std::future::Future;
use std::sync::Arc;
use tracing::{error, info, warn, Instrument, Span};

use crate::amqp::resolver::log_terminal;
use crate::amqp::{self, FairDispatchConsumer, LapinChannel, MessageChannel, Resolution, Settlement};
use crate::backend::{BackendNotifier, HttpBackendClient};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::logging;
use crate::models::{
    DeliveryHandle, Envelope, Job, NotificationRequest, ProcessingOutcome, ServiceKind, Terminal,
};
use crate::processor::{JobProcessor, MessageProcessor};

/// Per-process worker context
pub struct Worker {
    service: ServiceKind,
    max_retries: u32,
    channel: Arc<dyn MessageChannel>,
    processor: Arc<dyn MessageProcessor>,
    notifier: BackendNotifier,
}

impl Worker {
    /// Create a new worker
    pub fn new(
        service: ServiceKind,
        max_retries: u32,
        channel: Arc<dyn MessageChannel>,
        processor: Arc<dyn MessageProcessor>,
        notifier: BackendNotifier,
    ) -> Self {
        Self {
            service,
            max_retries,
            channel,
            processor,
            notifier,
        }
    }

    /// Run one delivery through the pipeline
    ///
    /// An error means the delivery could not be settled on the broker.
    /// Processing and notification failures never surface here.
    pub async fn handle_delivery(
        &self,
        handle: DeliveryHandle,
        envelope: Envelope,
    ) -> Result<Settlement> {
        let span = crate::delivery_span!(
            self.service.queue_name(),
            handle.tag(),
            envelope.attempt_count()
        );

        self.pipeline(handle, envelope).instrument(span).await
    }

    async fn pipeline(&self, handle: DeliveryHandle, envelope: Envelope) -> Result<Settlement> {
        let attempt = envelope.attempt_count();

        let job = match envelope
            .decode_payload()
            .and_then(|payload| Job::decode(self.service, &payload))
        {
            Ok(job) => job,
            Err(e) => {
                warn!(error = %e, "Malformed message, dropping");
                let resolution = Resolution::Ack(Terminal::Dropped);
                let settlement = amqp::apply(self.channel.as_ref(), handle, &envelope, resolution).await?;
                Span::current().record("outcome", settlement.label());
                log_terminal(Terminal::Dropped, attempt, self.max_retries);
                return Ok(settlement);
            },
        };

        Span::current().record("job_kind", job.kind());
        info!(
            entity_id = job.entity_id().unwrap_or("-"),
            "Received message"
        );

        let outcome = self.processor.process(&job).await;
        if let ProcessingOutcome::RetryableFailure(reason) | ProcessingOutcome::PermanentFailure(reason) =
            &outcome
        {
            warn!(outcome = outcome.label(), reason = %reason, "Processing failed");
        }

        let resolution = amqp::resolve(&outcome, attempt, self.max_retries);
        let settlement = amqp::apply(self.channel.as_ref(), handle, &envelope, resolution).await?;
        Span::current().record("outcome", settlement.label());

        if let Some(terminal) = settlement.terminal() {
            log_terminal(terminal, attempt, self.max_retries);
            self.notify(&job, &outcome, terminal).await;
        }

        Ok(settlement)
    }

    /// Best-effort backend update once the delivery is settled
    async fn notify(&self, job: &Job, outcome: &ProcessingOutcome, terminal: Terminal) {
        let request = match NotificationRequest::for_terminal(job, outcome, terminal) {
            Some(request) => request,
            None => return,
        };

        if let Err(e) = self.notifier.notify(&request).await {
            warn!(
                error = %e,
                terminal = %terminal,
                "Backend notification failed, message already settled"
            );
        }
    }

    /// Handle deliveries until `shutdown` resolves or the stream ends
    ///
    /// A delivery in flight when shutdown fires is abandoned unsettled, so
    /// the broker redelivers it. The stream ending means the broker
    /// connection is gone and is reported as an error.
    pub async fn consume<D, S>(&self, deliveries: D, shutdown: S) -> Result<()>
    where
        D: Stream<Item = Result<(DeliveryHandle, Envelope)>>,
        S: Future<Output = ()>,
    {
        tokio::pin!(deliveries);
        tokio::pin!(shutdown);

        info!(queue = self.service.queue_name(), "Waiting for messages");

        loop {
            let next = tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping consumer");
                    return Ok(());
                },
                next = deliveries.next() => next,
            };

            let (handle, envelope) = match next {
                Some(Ok(delivery)) => delivery,
                Some(Err(e)) => {
                    error!(error = %e, "Consumer failed");
                    return Err(e);
                },
                None => {
                    error!("Consumer stream closed by broker");
                    return Err(Error::broker("Consumer stream closed"));
                },
            };

            tokio::select! {
                _ = &mut shutdown => {
                    warn!("Shutdown requested mid-delivery, leaving message unacknowledged");
                    return Ok(());
                },
                result = self.handle_delivery(handle, envelope) => {
                    if let Err(e) = result {
                        error!(error = %e, "Failed to settle delivery");
                        return Err(e);
                    }
                },
            }
        }
    }
}

/// Run `service` until shutdown or a fatal broker error
pub async fn run(service: ServiceKind) -> Result<()> {
    let config = Config::from_env()?;
    config.validate()?;

    logging::init_tracing(&config.worker.log_level, &config.worker.environment)?;
    config.log_config(service);

    info!(
        service = %service,
        version = env!("CARGO_PKG_VERSION"),
        "Starting worker"
    );

    let processor = Arc::new(JobProcessor::from_config(&config)?);
    let client = Arc::new(HttpBackendClient::new(
        &config.backend.url,
        config.backend.timeout(service),
    )?);
    let notifier = BackendNotifier::new(client, config.backend.retry_policy());

    let session = amqp::connect(
        &config.amqp.url,
        &config.amqp.masked_url(),
        config.amqp.connect_policy(service),
    )
    .await?;

    let channel = session.channel();
    let consumer = FairDispatchConsumer::subscribe(
        &channel,
        service.queue_name(),
        &config.amqp.consumer_tag(service),
    )
    .await?;

    let worker = Worker::new(
        service,
        config.worker.max_retries,
        Arc::new(LapinChannel::new(channel, service.queue_name())),
        processor,
        notifier,
    );

    let result = worker
        .consume(consumer.into_deliveries(), shutdown_signal())
        .await;

    if let Err(e) = session.close().await {
        warn!(error = %e, "Failed to close broker connection");
    }

    match &result {
        Ok(()) => info!(service = %service, "Worker stopped"),
        Err(e) => error!(service = %service, error = %e, "Worker exited with error"),
    }
    result
}

/// Resolves on SIGINT or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received CTRL+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JobResult;
    use crate::retry::RetryPolicy;
    use crate::test_utils::{
        game_event_payload, ChannelOp, MockBackendClient, MockChannel, ScriptedProcessor,
    };
    use std::time::Duration;

    struct Harness {
        worker: Worker,
        channel: MockChannel,
        backend: MockBackendClient,
        processor: ScriptedProcessor,
    }

    fn harness(service: ServiceKind, outcome: ProcessingOutcome) -> Harness {
        let channel = MockChannel::new();
        let backend = MockBackendClient::new();
        let processor = ScriptedProcessor::new(outcome);
        let notifier = BackendNotifier::new(
            Arc::new(backend.clone()),
            RetryPolicy::new(2, Duration::ZERO),
        );

        Harness {
            worker: Worker::new(
                service,
                3,
                Arc::new(channel.clone()),
                Arc::new(processor.clone()),
                notifier,
            ),
            channel,
            backend,
            processor,
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_dropped_without_processing() {
        let h = harness(
            ServiceKind::MessageConsumer,
            ProcessingOutcome::Success(JobResult::EventProcessed),
        );

        let envelope = Envelope::from_parts(b"{not json".to_vec(), None);
        let settlement = h.worker.handle_delivery(DeliveryHandle::new(1), envelope).await.unwrap();

        assert_eq!(settlement, Settlement::Acked(Terminal::Dropped));
        assert_eq!(h.channel.operations(), vec![ChannelOp::Ack(1)]);
        assert_eq!(h.processor.calls(), 0);
        assert!(h.backend.requests().is_empty());
    }

    #[tokio::test]
    async fn test_non_object_and_non_utf8_are_dropped() {
        let h = harness(
            ServiceKind::MessageConsumer,
            ProcessingOutcome::Success(JobResult::EventProcessed),
        );

        for (tag, body) in [(1u64, b"[1,2,3]".to_vec()), (2, vec![0xff, 0xfe, 0x00])] {
            let envelope = Envelope::from_parts(body, None);
            h.worker.handle_delivery(DeliveryHandle::new(tag), envelope).await.unwrap();
        }

        assert_eq!(h.channel.acks(), vec![1, 2]);
        assert_eq!(h.processor.calls(), 0);
    }

    #[tokio::test]
    async fn test_permanent_failure_acks_without_notification() {
        let h = harness(
            ServiceKind::MessageConsumer,
            ProcessingOutcome::PermanentFailure("unsupported".to_string()),
        );

        let envelope = Envelope::from_json(&game_event_payload("g1", "update"));
        let settlement = h.worker.handle_delivery(DeliveryHandle::new(5), envelope).await.unwrap();

        assert_eq!(settlement, Settlement::Acked(Terminal::Dropped));
        assert_eq!(h.channel.operations(), vec![ChannelOp::Ack(5)]);
        assert!(h.backend.requests().is_empty());
    }

    #[tokio::test]
    async fn test_retryable_below_max_republishes_without_notification() {
        let h = harness(
            ServiceKind::MessageConsumer,
            ProcessingOutcome::RetryableFailure("timeout".to_string()),
        );

        let envelope = Envelope::from_json(&game_event_payload("g1", "create")).with_attempt_count(1);
        let settlement = h.worker.handle_delivery(DeliveryHandle::new(9), envelope).await.unwrap();

        assert_eq!(settlement, Settlement::Republished { next_attempt: 2 });
        assert_eq!(h.channel.republished()[0].attempt_count(), 2);
        assert_eq!(h.channel.acks(), vec![9]);
        assert!(h.backend.requests().is_empty());
    }

    #[tokio::test]
    async fn test_notification_failure_is_swallowed() {
        let h = harness(
            ServiceKind::MessageConsumer,
            ProcessingOutcome::Success(JobResult::EventProcessed),
        );
        h.backend.fail_next_requests(10);

        let envelope = Envelope::from_json(&game_event_payload("g1", "create"));
        let settlement = h.worker.handle_delivery(DeliveryHandle::new(2), envelope).await.unwrap();

        assert_eq!(settlement, Settlement::Acked(Terminal::Delivered));
        assert_eq!(h.channel.acks(), vec![2]);
        assert_eq!(h.backend.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_consume_ends_with_error_when_stream_closes() {
        let h = harness(
            ServiceKind::MessageConsumer,
            ProcessingOutcome::Success(JobResult::EventProcessed),
        );

        let deliveries = futures::stream::iter(vec![
            Ok((
                DeliveryHandle::new(1),
                Envelope::from_json(&game_event_payload("g1", "create")),
            )),
            Ok((
                DeliveryHandle::new(2),
                Envelope::from_json(&game_event_payload("g2", "delete")),
            )),
        ]);

        let result = h.worker.consume(deliveries, std::future::pending()).await;

        assert!(matches!(result, Err(Error::Broker(_))));
        assert_eq!(h.processor.calls(), 2);
        assert_eq!(h.channel.acks(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_consume_stops_on_shutdown() {
        let h = harness(
            ServiceKind::MessageConsumer,
            ProcessingOutcome::Success(JobResult::EventProcessed),
        );

        let deliveries = futures::stream::pending::<Result<(DeliveryHandle, Envelope)>>();
        let result = h.worker.consume(deliveries, async {}).await;

        assert!(result.is_ok());
        assert_eq!(h.processor.calls(), 0);
    }

    /// Signals when a job starts, then never finishes
    struct StalledProcessor {
        started: Arc<tokio::sync::Notify>,
    }

    #[async_trait::async_trait]
    impl MessageProcessor for StalledProcessor {
        async fn process(&self, _job: &Job) -> ProcessingOutcome {
            self.started.notify_one();
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_shutdown_mid_delivery_leaves_message_unsettled() {
        let channel = MockChannel::new();
        let backend = MockBackendClient::new();
        let started = Arc::new(tokio::sync::Notify::new());
        let worker = Worker::new(
            ServiceKind::MessageConsumer,
            3,
            Arc::new(channel.clone()),
            Arc::new(StalledProcessor {
                started: Arc::clone(&started),
            }),
            BackendNotifier::new(Arc::new(backend.clone()), RetryPolicy::new(2, Duration::ZERO)),
        );

        let deliveries = futures::stream::iter(vec![Ok((
            DeliveryHandle::new(1),
            Envelope::from_json(&game_event_payload("g1", "process")),
        ))])
        .chain(futures::stream::pending());
        let shutdown = async move { started.notified().await };

        let result = tokio::time::timeout(Duration::from_secs(5), worker.consume(deliveries, shutdown))
            .await
            .expect("consume should stop once shutdown fires");

        assert!(result.is_ok());
        assert!(channel.operations().is_empty());
        assert!(backend.requests().is_empty());
    }
}
