//! Free-form custom messages

use chrono::Utc;
use std::time::Duration;
use tracing::info;

use super::Latency;
use crate::error::Result;
use crate::models::CustomJob;

const WORK_DURATION: Duration = Duration::from_secs(1);

/// Handle a custom message
pub async fn handle(job: &CustomJob, latency: &Latency) -> Result<()> {
    let timestamp = job
        .timestamp
        .clone()
        .unwrap_or_else(|| Utc::now().to_rfc3339());

    info!(message = %job.message, timestamp = %timestamp, "Processing custom message");
    latency.pause(WORK_DURATION).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_handle_without_timestamp() {
        let job = CustomJob {
            message: "ping".to_string(),
            timestamp: None,
        };
        assert!(handle(&job, &Latency::disabled()).await.is_ok());
    }
}
