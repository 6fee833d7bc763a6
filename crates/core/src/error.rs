//! Engine error taxonomy.
//!
//! Exactly one class of failure is fatal: input that cannot be turned
//! into text lines at all. Every other problem the parser encounters is
//! recorded as an [`Issue`] and returned alongside the partial result,
//! so callers always get the best structure that could be built.

use serde::{Deserialize, Serialize};

/// Fatal engine errors. These abort the parse with no partial result.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    /// The payload could not be decoded to text, or its format is
    /// recognized but not parseable by this engine.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The input violates a configured limit (e.g. size cap).
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Internal invariant violation.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Category of a non-fatal condition found during parsing or diffing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// A line's structural role could not be committed with confidence.
    /// The line is kept (role `unknown` or a review annotation) and
    /// flagged for human review.
    AmbiguousStructure,
    /// The external linguistic-analysis service was unreachable or
    /// timed out; affected spans were tagged from lexicons only.
    AnalysisUnavailable,
    /// The diff engine found multiple equally good candidate matches
    /// for a scene and refused to guess.
    SceneMatchAmbiguous,
}

impl IssueKind {
    /// String form used in logs and serialized output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AmbiguousStructure => "ambiguous_structure",
            Self::AnalysisUnavailable => "analysis_unavailable",
            Self::SceneMatchAmbiguous => "scene_match_ambiguous",
        }
    }
}

impl std::fmt::Display for IssueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-fatal condition accumulated during parsing or diffing.
///
/// Issues never interrupt processing; they travel with the structured
/// result so review tooling can surface them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub kind: IssueKind,
    /// 1-based line number, when the issue is anchored to a line.
    pub line: Option<u32>,
    /// Scene key, when the issue is anchored to a scene.
    pub scene_key: Option<String>,
    pub detail: String,
}

impl Issue {
    pub fn ambiguous_structure(line: u32, detail: impl Into<String>) -> Self {
        Self {
            kind: IssueKind::AmbiguousStructure,
            line: Some(line),
            scene_key: None,
            detail: detail.into(),
        }
    }

    pub fn analysis_unavailable(scene_key: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind: IssueKind::AnalysisUnavailable,
            line: None,
            scene_key: Some(scene_key.into()),
            detail: detail.into(),
        }
    }

    pub fn scene_match_ambiguous(scene_key: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind: IssueKind::SceneMatchAmbiguous,
            line: None,
            scene_key: Some(scene_key.into()),
            detail: detail.into(),
        }
    }
}
