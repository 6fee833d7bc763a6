//! Parse summaries and production breakdown reports.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use slugline_core::heading::IntExt;
use slugline_core::metrics::round1;
use slugline_core::normalize::SourceFormat;
use slugline_core::tag::ElementCategory;
use slugline_core::types::{ParsedRevision, RevisionId};

/// Counts returned to the submitter after ingest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseSummary {
    pub revision_id: RevisionId,
    pub content_hash: String,
    pub format: SourceFormat,
    pub page_count: u32,
    pub scene_count: u32,
    pub character_count: u32,
    pub element_count: u32,
    pub dialogue_lines: u32,
    pub action_lines: u32,
    /// Whole-script running time estimate in minutes, one decimal.
    pub estimated_minutes: f64,
    /// Lines still carrying role `unknown` or a review mark.
    pub unresolved_lines: u32,
    pub issue_count: u32,
}

pub fn summarize(parsed: &ParsedRevision) -> ParseSummary {
    ParseSummary {
        revision_id: parsed.revision.id,
        content_hash: parsed.revision.content_hash.clone(),
        format: parsed.revision.format,
        page_count: parsed.revision.page_count,
        scene_count: parsed.scenes.len() as u32,
        character_count: parsed.characters.len() as u32,
        element_count: parsed.elements.len() as u32,
        dialogue_lines: parsed.scenes.iter().map(|s| s.dialogue_line_count()).sum(),
        action_lines: parsed.scenes.iter().map(|s| s.action_line_count()).sum(),
        estimated_minutes: round1(
            parsed
                .scene_metrics
                .iter()
                .map(|m| m.estimated_minutes)
                .sum::<f64>(),
        ),
        unresolved_lines: parsed.unresolved_line_count() as u32,
        issue_count: parsed.issues.len() as u32,
    }
}

// ---------------------------------------------------------------------------
// Breakdown report
// ---------------------------------------------------------------------------

/// One line of the production breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakdownElement {
    pub category: ElementCategory,
    pub label: String,
    pub confidence: f64,
    /// Distinct source lines mentioning the element.
    pub occurrences: u32,
    /// Scene numbers where the element appears, in document order.
    pub scenes: Vec<String>,
}

/// Department-facing breakdown of one parsed revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakdownReport {
    pub revision_id: RevisionId,
    /// Title-page title when the document carried one.
    pub title: Option<String>,
    pub page_count: u32,
    pub scene_count: u32,
    pub interior_scenes: u32,
    pub exterior_scenes: u32,
    pub speaking_characters: u32,
    pub location_count: u32,
    pub prop_count: u32,
    /// Whole-script running time estimate in minutes, one decimal.
    pub estimated_minutes: f64,
    pub category_counts: BTreeMap<ElementCategory, u32>,
    pub elements: Vec<BreakdownElement>,
}

pub fn breakdown(parsed: &ParsedRevision) -> BreakdownReport {
    let mut interior = 0u32;
    let mut exterior = 0u32;
    for scene in &parsed.scenes {
        match scene.int_ext {
            Some(IntExt::Int) => interior += 1,
            Some(IntExt::Ext) => exterior += 1,
            Some(IntExt::IntExt) => {
                interior += 1;
                exterior += 1;
            }
            None => {}
        }
    }

    let elements: Vec<BreakdownElement> = parsed
        .elements
        .iter()
        .map(|element| BreakdownElement {
            category: element.category,
            label: element.label.clone(),
            confidence: element.confidence,
            occurrences: element.source_lines.len() as u32,
            scenes: parsed
                .scenes
                .iter()
                .filter(|scene| element.scene_keys.contains(&scene.key))
                .map(|scene| scene.number.clone())
                .collect(),
        })
        .collect();

    let mut category_counts: BTreeMap<ElementCategory, u32> = BTreeMap::new();
    for element in &parsed.elements {
        *category_counts.entry(element.category).or_insert(0) += 1;
    }

    BreakdownReport {
        revision_id: parsed.revision.id,
        title: parsed.revision.metadata.get("title").cloned(),
        page_count: parsed.revision.page_count,
        scene_count: parsed.scenes.len() as u32,
        interior_scenes: interior,
        exterior_scenes: exterior,
        speaking_characters: parsed.characters.len() as u32,
        location_count: category_counts
            .get(&ElementCategory::Location)
            .copied()
            .unwrap_or(0),
        prop_count: category_counts
            .get(&ElementCategory::Prop)
            .copied()
            .unwrap_or(0),
        estimated_minutes: round1(
            parsed
                .scene_metrics
                .iter()
                .map(|m| m.estimated_minutes)
                .sum::<f64>(),
        ),
        category_counts,
        elements,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
