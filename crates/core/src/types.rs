//! Shared identifiers and the revision-level data model.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::attribute::Character;
use crate::error::Issue;
use crate::metrics::SceneMetrics;
use crate::normalize::{RawLine, SourceFormat};
use crate::segment::Scene;
use crate::tag::Element;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Identifier of one uploaded screenplay revision (UUID v7, time-ordered).
pub type RevisionId = uuid::Uuid;

/// Stable scene identifier. Hex digest, persisted across revisions when
/// the diff engine judges two scenes to be the same.
pub type SceneKey = String;

/// Immutable snapshot of one uploaded screenplay version.
///
/// Never mutated after creation; a new upload produces a new revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptRevision {
    pub id: RevisionId,
    /// SHA-256 hex digest of the raw upload bytes.
    pub content_hash: String,
    pub format: SourceFormat,
    pub page_count: u32,
    pub created_at: Timestamp,
    /// Title-page key/value metadata (Fountain `Key: Value` block).
    pub metadata: BTreeMap<String, String>,
    /// Every decoded input line with its document coordinates.
    pub lines: Vec<RawLine>,
}

impl ScriptRevision {
    pub fn new(
        content_hash: String,
        format: SourceFormat,
        page_count: u32,
        metadata: BTreeMap<String, String>,
        lines: Vec<RawLine>,
    ) -> Self {
        Self {
            id: uuid::Uuid::now_v7(),
            content_hash,
            format,
            page_count,
            created_at: chrono::Utc::now(),
            metadata,
            lines,
        }
    }
}

/// Complete structured output of parsing one revision.
///
/// All collections are ordered deterministically: scenes in document
/// order, characters and elements sorted by their canonical keys. The
/// issues list carries every non-fatal condition hit along the way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedRevision {
    pub revision: ScriptRevision,
    pub scenes: Vec<Scene>,
    pub characters: Vec<Character>,
    pub elements: Vec<Element>,
    pub scene_metrics: Vec<SceneMetrics>,
    pub issues: Vec<Issue>,
}

impl ParsedRevision {
    /// Look up a scene by its stable key.
    pub fn scene_by_key(&self, key: &str) -> Option<&Scene> {
        self.scenes.iter().find(|s| s.key == key)
    }

    /// Structural lines that still need human review: role `unknown`
    /// or carrying a low-confidence annotation.
    pub fn unresolved_line_count(&self) -> usize {
        self.scenes
            .iter()
            .flat_map(|s| s.lines.iter())
            .filter(|l| l.role == crate::classify::LineRole::Unknown || l.review.is_some())
            .count()
    }
}
