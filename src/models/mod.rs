//! Data models for the queue workers
//!
//! This module contains the message envelope, the decoded job variants,
//! processing outcomes and the backend notifications derived from them.

pub mod envelope;
pub mod error;
pub mod job;
pub mod notification;
pub mod outcome;
pub mod service;

// Re-export commonly used types
pub use envelope::{DeliveryHandle, Envelope};
pub use error::{ValidationError, ValidationErrorKind, ValidationResult};
pub use job::{CustomJob, GameAction, GameEventJob, ImageJob, Job, MetadataJob};
pub use notification::NotificationRequest;
pub use outcome::{EnrichedMetadata, JobResult, ProcessedImages, ProcessingOutcome, Terminal};
pub use service::ServiceKind;
