//! HTTP client for the text-analysis service.
//!
//! [`HttpAnalyzer`] wraps the analysis sidecar's REST endpoint using
//! [`reqwest`]. One client can be shared across worker tasks; the
//! underlying connection pool is reused across requests.

use std::time::Duration;

use async_trait::async_trait;

use crate::analyzer::Analyzer;
use crate::api::{Analysis, AnalyzeRequest};
use crate::error::AnalysisError;

/// HTTP client for a single analysis service instance.
pub struct HttpAnalyzer {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpAnalyzer {
    /// Create a new client targeting an analysis service.
    ///
    /// * `base_url` - Base HTTP URL, e.g. `http://localhost:9090`.
    /// * `timeout`  - Per-request deadline.
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, AnalysisError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url, timeout))
    }

    /// Create a client reusing an existing [`reqwest::Client`]
    /// (useful for connection pooling across services).
    pub fn with_client(client: reqwest::Client, base_url: String, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    /// Base HTTP URL of the service.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ---- private helpers ----

    /// Fold reqwest's timeout flag into the dedicated variant so callers
    /// see the configured deadline instead of an opaque transport error.
    fn classify_transport(&self, err: reqwest::Error) -> AnalysisError {
        if err.is_timeout() {
            AnalysisError::Timeout(self.timeout)
        } else {
            AnalysisError::Request(err)
        }
    }

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or an [`AnalysisError::Api`]
    /// containing the status and body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, AnalysisError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(AnalysisError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, AnalysisError> {
        let response = Self::ensure_success(response).await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|err| AnalysisError::Decode(err.to_string()))
    }
}

#[async_trait]
impl Analyzer for HttpAnalyzer {
    async fn analyze(&self, text: &str) -> Result<Analysis, AnalysisError> {
        tracing::debug!(chars = text.len(), "requesting text analysis");

        let response = self
            .client
            .post(format!("{}/analyze", self.base_url))
            .json(&AnalyzeRequest { text })
            .send()
            .await
            .map_err(|err| self.classify_transport(err))?;

        Self::parse_response(response).await
    }
}
