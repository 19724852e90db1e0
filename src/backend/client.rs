//! HTTP transport to the backend service

use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;
use std::time::Duration;

use crate::error::{Error, Result};

/// Status and body of a backend response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendResponse {
    pub status: u16,
    pub body: String,
}

impl BackendResponse {
    /// The backend only signals success with 200
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Single-shot requests against the backend API
///
/// Implementations perform exactly one request per call; retrying is the
/// notifier's job.
#[async_trait]
pub trait BackendClient: Send + Sync {
    /// `PUT {base}/{segments...}` with a JSON body
    ///
    /// Segments are raw values; the client encodes them.
    async fn put_json(&self, segments: &[&str], body: &Value) -> Result<BackendResponse>;
}

/// reqwest-backed [`BackendClient`]
#[derive(Debug, Clone)]
pub struct HttpBackendClient {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpBackendClient {
    /// Create a client for `base_url` with a per-request timeout
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        let base_url: String = base_url.into();
        let base_url = Url::parse(&base_url)
            .map_err(|e| Error::config(format!("Invalid backend URL '{}': {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::config(format!(
                "Backend URL '{}' cannot carry a path",
                base_url
            )));
        }

        Ok(Self { client, base_url })
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    /// Full URL for `segments`, each percent-encoded as one path segment
    pub fn url_for(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::config("Backend URL cannot carry a path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[async_trait]
impl BackendClient for HttpBackendClient {
    async fn put_json(&self, segments: &[&str], body: &Value) -> Result<BackendResponse> {
        let url = self.url_for(segments)?;
        tracing::debug!(url = %url, "Sending backend request");

        let response = self.client.put(url).json(body).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();

        Ok(BackendResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_base_url_trailing_slash() {
        let client = HttpBackendClient::new("http://backend:3000/", Duration::from_secs(5)).unwrap();
        assert_eq!(client.base_url(), "http://backend:3000");
    }

    #[test]
    fn test_invalid_base_url_is_config_error() {
        let err = HttpBackendClient::new("not a url", Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = HttpBackendClient::new("mailto:ops@example.com", Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_segments_are_percent_encoded() {
        let client = HttpBackendClient::new("http://backend:3000", Duration::from_secs(5)).unwrap();
        let url = client
            .url_for(&["api", "games", "a/b?c#d", "process-complete"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://backend:3000/api/games/a%2Fb%3Fc%23d/process-complete"
        );

        let prefixed = HttpBackendClient::new("http://gw/backend/", Duration::from_secs(5)).unwrap();
        let url = prefixed.url_for(&["api", "games", "g1", "images"]).unwrap();
        assert_eq!(url.path(), "/backend/api/games/g1/images");
    }

    #[tokio::test]
    async fn test_put_json_sends_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/api/games/g1/process-complete")
            .match_header("content-type", "application/json")
            .match_body(mockito::Matcher::Json(json!({"status": "completed"})))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let client = HttpBackendClient::new(server.url(), Duration::from_secs(5)).unwrap();
        let response = client
            .put_json(
                &["api", "games", "g1", "process-complete"],
                &json!({"status": "completed"}),
            )
            .await
            .unwrap();

        assert!(response.is_ok());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_put_json_reports_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("PUT", "/api/games/g1/images")
            .with_status(500)
            .with_body("database down")
            .create_async()
            .await;

        let client = HttpBackendClient::new(server.url(), Duration::from_secs(5)).unwrap();
        let response = client
            .put_json(&["api", "games", "g1", "images"], &json!({}))
            .await
            .unwrap();

        assert_eq!(response.status, 500);
        assert_eq!(response.body, "database down");
        assert!(!response.is_ok());
    }

    #[tokio::test]
    async fn test_put_json_transport_error() {
        let client = HttpBackendClient::new("http://127.0.0.1:1", Duration::from_secs(1)).unwrap();
        let result = client
            .put_json(&["api", "games", "g1", "metadata"], &json!({}))
            .await;
        assert!(result.unwrap_err().is_retryable());
    }
}
