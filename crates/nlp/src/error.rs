//! Error types for the analysis service boundary.

use std::time::Duration;

/// Errors from a text-analysis backend.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// The HTTP request itself failed (network, DNS, TLS, body decode).
    #[error("Analysis request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service returned a non-2xx status code.
    #[error("Analysis service error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The response body did not match the wire contract.
    #[error("Could not decode analysis response: {0}")]
    Decode(String),

    /// The request exceeded the configured deadline.
    #[error("Analysis timed out after {0:?}")]
    Timeout(Duration),
}

impl AnalysisError {
    /// True when retrying the same request may succeed.
    ///
    /// Decode failures and 4xx responses are permanent for a given
    /// input; transport faults, timeouts, 429 and 5xx are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Request(_) | Self::Timeout(_) => true,
            Self::Decode(_) => false,
            Self::Api { status, .. } => *status >= 500 || *status == 429,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_errors_retryable_only_for_server_faults() {
        let server = AnalysisError::Api {
            status: 503,
            body: String::new(),
        };
        let throttled = AnalysisError::Api {
            status: 429,
            body: String::new(),
        };
        let bad_request = AnalysisError::Api {
            status: 422,
            body: "unprocessable".into(),
        };
        assert!(server.is_retryable());
        assert!(throttled.is_retryable());
        assert!(!bad_request.is_retryable());
    }

    #[test]
    fn timeout_is_retryable() {
        assert!(AnalysisError::Timeout(Duration::from_secs(5)).is_retryable());
    }

    #[test]
    fn decode_is_permanent() {
        assert!(!AnalysisError::Decode("missing field `tokens`".into()).is_retryable());
    }
}
