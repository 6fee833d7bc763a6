//! Abstraction over text-analysis backends.

use async_trait::async_trait;

use crate::api::Analysis;
use crate::error::AnalysisError;

/// A text-analysis backend.
///
/// Takes one batch of plain text and returns tokens plus named-entity
/// spans. Implementations are shared across concurrent parse workers,
/// so they must be `Send + Sync` and cheap to call repeatedly.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Analyze one batch of text.
    async fn analyze(&self, text: &str) -> Result<Analysis, AnalysisError>;
}
