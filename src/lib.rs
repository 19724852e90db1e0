//! Queue workers
//!
//! Background workers that consume jobs from durable RabbitMQ queues,
//! process them with bounded header-counted retries and report terminal
//! results to the backend API. Three binaries share this library:
//! `image-processor`, `message-consumer` and `metadata-enricher`.

pub mod amqp;
pub mod backend;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod processor;
pub mod retry;
pub mod test_utils;
pub mod worker;

// Re-export commonly used types at the crate root
pub use config::Config;
pub use error::{Error, Result};

pub use models::{Envelope, Job, ProcessingOutcome, ServiceKind, Terminal};
pub use worker::{run, shutdown_signal, Worker};
