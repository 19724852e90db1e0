//! Processing outcomes and job results

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Error;

/// Paths of the images written for a game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedImages {
    pub main: String,
    pub thumbnail: String,
}

/// Metadata generated for a game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedMetadata {
    pub average_rating: f64,
    pub total_reviews: u32,
    pub difficulty_level: String,
    pub estimated_play_time: String,
    pub tags: Vec<String>,
    pub fun_fact: String,
}

/// What a successful job produced
#[derive(Debug, Clone, PartialEq)]
pub enum JobResult {
    EventProcessed,
    CustomProcessed,
    /// `None` when the game has no downloadable image
    ImagesProcessed(Option<ProcessedImages>),
    MetadataEnriched(EnrichedMetadata),
}

/// Result of running the processor on one delivery
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessingOutcome {
    /// The job completed
    Success(JobResult),

    /// The job failed in a way another attempt may fix
    RetryableFailure(String),

    /// The message can never be processed and must be dropped
    PermanentFailure(String),
}

impl ProcessingOutcome {
    /// Classify an error raised while processing a job
    ///
    /// Content errors are permanent; anything else is assumed transient.
    pub fn from_error(error: &Error) -> Self {
        if error.is_content_error() {
            ProcessingOutcome::PermanentFailure(error.to_string())
        } else {
            ProcessingOutcome::RetryableFailure(error.to_string())
        }
    }

    /// Short label for logs
    pub fn label(&self) -> &'static str {
        match self {
            ProcessingOutcome::Success(_) => "success",
            ProcessingOutcome::RetryableFailure(_) => "retryable_failure",
            ProcessingOutcome::PermanentFailure(_) => "permanent_failure",
        }
    }
}

/// How a delivery ended once it was acknowledged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminal {
    /// Processed successfully
    Delivered,
    /// Malformed or permanently invalid, dropped without retry
    Dropped,
    /// Retryable failure with no retries left
    GaveUp,
}

impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Terminal::Delivered => "delivered",
            Terminal::Dropped => "dropped",
            Terminal::GaveUp => "gave_up",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_error_classification() {
        assert!(matches!(
            ProcessingOutcome::from_error(&Error::validation("bad")),
            ProcessingOutcome::PermanentFailure(_)
        ));
        assert!(matches!(
            ProcessingOutcome::from_error(&Error::internal("boom")),
            ProcessingOutcome::RetryableFailure(_)
        ));
        assert!(matches!(
            ProcessingOutcome::from_error(&Error::http("connection reset")),
            ProcessingOutcome::RetryableFailure(_)
        ));
    }

    #[test]
    fn test_metadata_serializes_camel_case() {
        let metadata = EnrichedMetadata {
            average_rating: 4.2,
            total_reviews: 120,
            difficulty_level: "Hard".to_string(),
            estimated_play_time: "12 hours".to_string(),
            tags: vec!["Retro".to_string()],
            fun_fact: "fact".to_string(),
        };

        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(json["averageRating"], 4.2);
        assert_eq!(json["totalReviews"], 120);
        assert_eq!(json["estimatedPlayTime"], "12 hours");
    }
}
