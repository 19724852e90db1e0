//! Message processor
//!
//! Runs the business logic for a decoded [`Job`] and reports a
//! [`ProcessingOutcome`]. Processors never raise: every failure is folded into
//! the outcome so the resolver can decide what happens to the delivery.

pub mod custom;
pub mod game_event;
pub mod image;
pub mod metadata;

use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::logging::Timer;
use crate::models::{Job, JobResult, ProcessingOutcome};

pub use self::image::ImageProcessor;

/// Business logic seam between the worker pipeline and the job handlers
#[async_trait]
pub trait MessageProcessor: Send + Sync {
    /// Process one job
    async fn process(&self, job: &Job) -> ProcessingOutcome;
}

/// Simulated work delays
///
/// The handlers stand in for slow external systems. Disabling latency makes
/// every pause return immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Latency {
    enabled: bool,
}

impl Latency {
    /// Create a latency simulator
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Latency simulator that never sleeps
    pub fn disabled() -> Self {
        Self::new(false)
    }

    /// Whether pauses actually sleep
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Sleep for a fixed duration
    pub async fn pause(&self, duration: Duration) {
        if self.enabled {
            tokio::time::sleep(duration).await;
        }
    }

    /// Sleep for a uniformly random number of seconds in `[min_secs, max_secs)`
    pub async fn pause_between(&self, min_secs: f64, max_secs: f64) {
        if !self.enabled {
            return;
        }

        let secs = rand::thread_rng().gen_range(min_secs..max_secs);
        info!(seconds = %format!("{:.2}", secs), "Simulating processing time");
        tokio::time::sleep(Duration::from_secs_f64(secs)).await;
    }
}

/// Production [`MessageProcessor`] dispatching on the job variant
pub struct JobProcessor {
    images: ImageProcessor,
    latency: Latency,
}

impl JobProcessor {
    /// Create a processor from explicit parts
    pub fn new(images: ImageProcessor, latency: Latency) -> Self {
        Self { images, latency }
    }

    /// Create a processor from the worker configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let images = ImageProcessor::new(
            &config.image.processed_dir,
            config.image.download_timeout(),
        )?;

        Ok(Self::new(images, Latency::new(config.worker.simulate_latency)))
    }

    /// Delay applied before a job is handled
    async fn intake_delay(&self, job: &Job) {
        match job {
            Job::Image(_) => self.latency.pause_between(1.0, 5.0).await,
            Job::GameEvent(_) => self.latency.pause(Duration::from_secs(2)).await,
            Job::Custom(_) => {},
            Job::Metadata(_) => self.latency.pause_between(2.0, 6.0).await,
        }
    }

    async fn run(&self, job: &Job) -> Result<JobResult> {
        match job {
            Job::Image(job) => self
                .images
                .process(job)
                .await
                .map(JobResult::ImagesProcessed),
            Job::GameEvent(job) => game_event::handle(job, &self.latency)
                .await
                .map(|_| JobResult::EventProcessed),
            Job::Custom(job) => custom::handle(job, &self.latency)
                .await
                .map(|_| JobResult::CustomProcessed),
            Job::Metadata(job) => metadata::enrich(job, &self.latency)
                .await
                .map(JobResult::MetadataEnriched),
        }
    }
}

#[async_trait]
impl MessageProcessor for JobProcessor {
    async fn process(&self, job: &Job) -> ProcessingOutcome {
        let timer = Timer::start(format!("process_{}", job.kind()));

        self.intake_delay(job).await;

        let outcome = match self.run(job).await {
            Ok(result) => ProcessingOutcome::Success(result),
            Err(e) => {
                warn!(
                    job_kind = job.kind(),
                    error = %e,
                    error_type = e.error_type(),
                    "Job failed"
                );
                ProcessingOutcome::from_error(&e)
            },
        };

        timer.stop();
        outcome
    }
}
