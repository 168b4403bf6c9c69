//! Courier HTTP Client
//!
//! A small, type-safe HTTP client for the job execution backend that outbox
//! entries are dispatched to.
//!
//! # Example
//!
//! ```no_run
//! use courier_client::ExecutionClient;
//! use courier_core::dto::submit::SubmitJobRequest;
//! use uuid::Uuid;
//!
//! #[tokio::main]
//! async fn main() -> courier_client::Result<()> {
//!     let client = ExecutionClient::new("http://localhost:9090");
//!
//!     let ack = client.submit_job(&SubmitJobRequest {
//!         idempotency_key: Uuid::new_v4(),
//!         kind: "process_documents".to_string(),
//!         arguments: serde_json::json!({ "documents": [1, 2, 3] }),
//!         correlation_id: "course-42".to_string(),
//!     }).await?;
//!
//!     println!("Enqueued job: {}", ack.job_id);
//!     Ok(())
//! }
//! ```

pub mod error;
mod jobs;

pub use error::{ClientError, Result};

use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Header carrying the idempotency key of a submission
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// HTTP client for the execution backend API
#[derive(Debug, Clone)]
pub struct ExecutionClient {
    /// Base URL of the execution backend (e.g., "http://localhost:9090")
    base_url: String,
    /// HTTP client instance
    client: Client,
}

impl ExecutionClient {
    /// Create a new execution client with reqwest defaults
    ///
    /// # Example
    /// ```
    /// use courier_client::ExecutionClient;
    ///
    /// let client = ExecutionClient::new("http://localhost:9090");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new execution client whose requests time out after `timeout`
    ///
    /// The processor imposes no timeout of its own, so production callers
    /// should prefer this constructor.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(base_url, client))
    }

    /// Create a new execution client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Get the base URL of the execution backend
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = ExecutionClient::new("http://localhost:9090");
        assert_eq!(client.base_url(), "http://localhost:9090");
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = ExecutionClient::new("http://localhost:9090/");
        assert_eq!(client.base_url(), "http://localhost:9090");
    }

    #[test]
    fn test_client_with_timeout() {
        let client = ExecutionClient::with_timeout("http://localhost:9090", Duration::from_secs(5))
            .unwrap();
        assert_eq!(client.base_url(), "http://localhost:9090");
    }
}
