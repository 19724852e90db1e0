//! Test utilities for the queue workers
//!
//! Recording mocks for the broker channel, the backend and the processor,
//! plus payload fixtures.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::amqp::MessageChannel;
use crate::backend::{BackendClient, BackendResponse};
use crate::error::{Error, Result};
use crate::models::{DeliveryHandle, Envelope, Job, ProcessingOutcome};
use crate::processor::MessageProcessor;

/// A broker operation recorded by [`MockChannel`]
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelOp {
    Ack(u64),
    NackRequeue(u64),
    Republish(Envelope),
}

/// Mock implementation of MessageChannel for testing
#[derive(Debug, Clone, Default)]
pub struct MockChannel {
    operations: Arc<Mutex<Vec<ChannelOp>>>,
    republish_failure: Arc<Mutex<Option<String>>>,
}

impl MockChannel {
    /// Create a new mock channel
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next republish fail with `error_message`
    pub fn fail_next_republish(&self, error_message: &str) {
        *self.republish_failure.lock().unwrap() = Some(error_message.to_string());
    }

    /// All recorded operations, in order
    pub fn operations(&self) -> Vec<ChannelOp> {
        self.operations.lock().unwrap().clone()
    }

    /// Delivery tags that were acknowledged
    pub fn acks(&self) -> Vec<u64> {
        self.operations()
            .into_iter()
            .filter_map(|op| match op {
                ChannelOp::Ack(tag) => Some(tag),
                _ => None,
            })
            .collect()
    }

    /// Envelopes that were republished
    pub fn republished(&self) -> Vec<Envelope> {
        self.operations()
            .into_iter()
            .filter_map(|op| match op {
                ChannelOp::Republish(envelope) => Some(envelope),
                _ => None,
            })
            .collect()
    }

    fn record(&self, op: ChannelOp) {
        self.operations.lock().unwrap().push(op);
    }
}

#[async_trait]
impl MessageChannel for MockChannel {
    async fn ack(&self, handle: DeliveryHandle) -> Result<()> {
        self.record(ChannelOp::Ack(handle.tag()));
        Ok(())
    }

    async fn nack_requeue(&self, handle: DeliveryHandle) -> Result<()> {
        self.record(ChannelOp::NackRequeue(handle.tag()));
        Ok(())
    }

    async fn republish(&self, envelope: &Envelope) -> Result<()> {
        if let Some(msg) = self.republish_failure.lock().unwrap().take() {
            return Err(Error::broker(msg));
        }
        self.record(ChannelOp::Republish(envelope.clone()));
        Ok(())
    }
}

/// A request captured by [`MockBackendClient`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub path: String,
    pub body: Value,
}

/// Mock implementation of BackendClient for testing
///
/// Answers with the scripted statuses in order, then 200 once the script
/// runs out.
#[derive(Debug, Clone, Default)]
pub struct MockBackendClient {
    statuses: Arc<Mutex<VecDeque<u16>>>,
    transport_failures: Arc<Mutex<u32>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockBackendClient {
    /// Create a client that always answers 200
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a client answering with `statuses` in order
    pub fn with_statuses(statuses: &[u16]) -> Self {
        let client = Self::new();
        client.statuses.lock().unwrap().extend(statuses.iter().copied());
        client
    }

    /// Fail the next `count` requests with a transport error
    pub fn fail_next_requests(&self, count: u32) {
        *self.transport_failures.lock().unwrap() = count;
    }

    /// All requests received so far, including failed ones
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl BackendClient for MockBackendClient {
    async fn put_json(&self, segments: &[&str], body: &Value) -> Result<BackendResponse> {
        self.requests.lock().unwrap().push(RecordedRequest {
            path: format!("/{}", segments.join("/")),
            body: body.clone(),
        });

        {
            let mut failures = self.transport_failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(Error::http("connection refused"));
            }
        }

        let status = self.statuses.lock().unwrap().pop_front().unwrap_or(200);
        Ok(BackendResponse {
            status,
            body: String::new(),
        })
    }
}

/// Processor returning a fixed outcome and counting invocations
#[derive(Debug, Clone)]
pub struct ScriptedProcessor {
    outcome: ProcessingOutcome,
    jobs: Arc<Mutex<Vec<Job>>>,
}

impl ScriptedProcessor {
    /// Create a processor that always returns `outcome`
    pub fn new(outcome: ProcessingOutcome) -> Self {
        Self {
            outcome,
            jobs: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Number of times `process` was called
    pub fn calls(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }

    /// Jobs received so far
    pub fn jobs(&self) -> Vec<Job> {
        self.jobs.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageProcessor for ScriptedProcessor {
    async fn process(&self, job: &Job) -> ProcessingOutcome {
        self.jobs.lock().unwrap().push(job.clone());
        self.outcome.clone()
    }
}

/// Create a game event payload
pub fn game_event_payload(game_id: &str, action: &str) -> Value {
    json!({
        "gameId": game_id,
        "action": action,
        "gameData": {"title": "Space Invaders", "developer": "Taito"}
    })
}

/// Create an image job payload
pub fn image_payload(game_id: &str, image_url: &str) -> Value {
    json!({"gameId": game_id, "imageUrl": image_url})
}

/// Create a metadata job payload
pub fn metadata_payload(game_id: &str, title: &str) -> Value {
    json!({"gameId": game_id, "title": title, "developer": "Nintendo"})
}
