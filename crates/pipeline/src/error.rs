//! Pipeline error types.

use slugline_core::error::EngineError;
use slugline_core::types::RevisionId;

/// Errors from the parse service.
///
/// `Clone` is required because a parse result is fanned out to every
/// submitter waiting on the same content hash.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PipelineError {
    /// A fatal engine failure: unsupported format or invalid input.
    #[error("Parse failed: {0}")]
    Engine(#[from] EngineError),

    /// The requested revision is not in the store.
    #[error("Revision {0} not found")]
    RevisionNotFound(RevisionId),

    /// No scene with that key in the revision.
    #[error("Scene {key} not found in revision {revision}")]
    SceneNotFound {
        revision: RevisionId,
        key: String,
    },

    /// The service is shutting down; queued work was abandoned.
    #[error("Parse cancelled during shutdown")]
    Cancelled,
}
