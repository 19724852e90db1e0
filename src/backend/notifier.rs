//! Backend notifier
//!
//! Sends a terminal status update, retrying any non-200 answer or transport
//! error with a fixed delay. Failure here never feeds back into the message
//! retry decision: by the time we notify, the delivery is already settled.

use std::sync::Arc;
use tracing::{error, info};

use super::client::BackendClient;
use crate::error::{Error, Result};
use crate::models::NotificationRequest;
use crate::retry::{retry_bounded, RetryPolicy};

/// Best-effort status updates to the backend
#[derive(Clone)]
pub struct BackendNotifier {
    client: Arc<dyn BackendClient>,
    policy: RetryPolicy,
}

impl BackendNotifier {
    /// Create a notifier over `client`
    pub fn new(client: Arc<dyn BackendClient>, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    /// Send `request`, retrying per the policy
    pub async fn notify(&self, request: &NotificationRequest) -> Result<()> {
        let path = request.path();
        let segments = request.segments();
        let body = request.body();

        let result = retry_bounded(
            self.policy,
            "backend_notify",
            |_: &Error| false,
            |attempt| {
                let segments = &segments;
                let body = &body;
                async move {
                    let response = self.client.put_json(segments, body).await?;
                    if response.is_ok() {
                        Ok(attempt)
                    } else {
                        Err(Error::BackendStatus {
                            status: response.status,
                            body: response.body,
                        })
                    }
                }
            },
        )
        .await;

        match result {
            Ok(attempts) => {
                info!(
                    path = %path,
                    entity_id = %request.entity_id,
                    attempts,
                    "Backend updated"
                );
                Ok(())
            },
            Err(e) => {
                error!(
                    path = %path,
                    entity_id = %request.entity_id,
                    error = %e,
                    "Failed to update backend"
                );
                Err(e)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockBackendClient;
    use std::time::Duration;

    fn notifier(client: &MockBackendClient, attempts: u32) -> BackendNotifier {
        BackendNotifier::new(
            Arc::new(client.clone()),
            RetryPolicy::new(attempts, Duration::ZERO),
        )
    }

    #[tokio::test]
    async fn test_notify_first_try() {
        let client = MockBackendClient::new();
        let request = NotificationRequest::game_status("g1", "completed");

        notifier(&client, 5).notify(&request).await.unwrap();

        let calls = client.requests();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].path, "/api/games/g1/process-complete");
    }

    #[tokio::test]
    async fn test_notify_retries_until_ok() {
        let client = MockBackendClient::with_statuses(&[500, 500, 200]);
        let request = NotificationRequest::game_status("g1", "completed");

        notifier(&client, 5).notify(&request).await.unwrap();

        assert_eq!(client.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_notify_exhausts_attempts() {
        let client = MockBackendClient::with_statuses(&[503; 10]);
        let request = NotificationRequest::game_status("g1", "failed");

        let err = notifier(&client, 5).notify(&request).await.unwrap_err();

        assert!(matches!(err, Error::RetriesExhausted { attempts: 5, .. }));
        assert_eq!(client.requests().len(), 5);
    }

    #[tokio::test]
    async fn test_transport_errors_are_retried() {
        let client = MockBackendClient::new();
        client.fail_next_requests(2);
        let request = NotificationRequest::game_status("g1", "completed");

        notifier(&client, 3).notify(&request).await.unwrap();

        assert_eq!(client.requests().len(), 3);
    }
}
