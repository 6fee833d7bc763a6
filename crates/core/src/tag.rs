//! Element tagging.
//!
//! Gathers element candidates from three sources (scene headings,
//! lexicon scans, entity analysis), merges them by category and
//! case-folded label, and scores each merged element on a fixed
//! confidence ladder. Heading-derived locations are certain; lexicon
//! hits start high and analysis-only hits start low, with repeated
//! mentions on distinct lines raising either toward a shared cap.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::classify::LineRole;
use crate::config::{
    ANALYSIS_BASE_CONFIDENCE, ANALYSIS_MENTION_BOOST, HEADING_LOCATION_CONFIDENCE,
    LEXICON_BASE_CONFIDENCE, LEXICON_MENTION_BOOST, MENTION_CONFIDENCE_CAP,
};
use crate::lexicon;
use crate::metrics::round2;
use crate::segment::Scene;
use crate::types::SceneKey;

/// Production department a tagged element belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementCategory {
    Prop,
    Location,
    Wardrobe,
    Effect,
    Vehicle,
    Unknown,
}

impl ElementCategory {
    /// String representation for display, logging, and serialized output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Prop => "prop",
            Self::Location => "location",
            Self::Wardrobe => "wardrobe",
            Self::Effect => "effect",
            Self::Vehicle => "vehicle",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ElementCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Candidate source, declared in precedence order: when one element is
/// seen by several sources the highest-precedence source names it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Heading,
    Lexicon,
    Analysis,
}

/// One sighting of a potential element on one line of one scene.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementCandidate {
    pub category: ElementCategory,
    pub label: String,
    pub scene_key: SceneKey,
    pub line_number: u32,
    pub provenance: Provenance,
}

/// A merged, scored element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub category: ElementCategory,
    pub label: String,
    /// 0.0 to 1.0, rounded to two decimals.
    pub confidence: f64,
    pub scene_keys: BTreeSet<SceneKey>,
    pub source_lines: BTreeSet<u32>,
    pub provenance: Provenance,
}

/// Map an entity-analysis label onto an element category. Labels the
/// mapping does not know become `Unknown` rather than being dropped.
pub fn category_for_entity(label: &str) -> ElementCategory {
    match label {
        "PRODUCT" | "WORK_OF_ART" | "ORG" => ElementCategory::Prop,
        "GPE" | "LOC" | "FAC" => ElementCategory::Location,
        _ => ElementCategory::Unknown,
    }
}

/// Collect heading and lexicon candidates from every scene. Lexicons
/// run over action and dialogue lines; headings contribute their
/// location. Analysis candidates are appended by the caller.
pub fn collect_candidates(scenes: &[Scene]) -> Vec<ElementCandidate> {
    let mut out = Vec::new();

    for scene in scenes {
        if let Some(location) = &scene.location {
            out.push(ElementCandidate {
                category: ElementCategory::Location,
                label: location.clone(),
                scene_key: scene.key.clone(),
                line_number: scene.heading_line,
                provenance: Provenance::Heading,
            });
        }

        for line in &scene.lines {
            if !matches!(line.role, LineRole::Action | LineRole::Dialogue) {
                continue;
            }
            for hit in lexicon::scan(&line.text) {
                out.push(ElementCandidate {
                    category: hit.category,
                    label: hit.label,
                    scene_key: scene.key.clone(),
                    line_number: line.number,
                    provenance: Provenance::Lexicon,
                });
            }
        }
    }

    out
}

/// Merge candidates by category and case-folded label, score each group
/// on the confidence ladder, and return elements sorted by category and
/// label. Mentions are counted as distinct source lines per source, so
/// re-submitting the same candidate cannot inflate confidence.
pub fn merge_elements(candidates: Vec<ElementCandidate>) -> Vec<Element> {
    let mut groups: BTreeMap<(ElementCategory, String), Group> = BTreeMap::new();

    for candidate in candidates {
        let key = (candidate.category, candidate.label.to_lowercase());
        let group = groups.entry(key).or_default();
        group.absorb(candidate);
    }

    let mut elements: Vec<Element> = groups.into_values().map(Group::seal).collect();
    elements.sort_by(|a, b| {
        (a.category, a.label.to_lowercase()).cmp(&(b.category, b.label.to_lowercase()))
    });
    elements
}

/// Confidence for one source given its mention count.
fn source_confidence(provenance: Provenance, mentions: u32) -> f64 {
    let extra = mentions.saturating_sub(1) as f64;
    match provenance {
        Provenance::Heading => HEADING_LOCATION_CONFIDENCE,
        Provenance::Lexicon => {
            (LEXICON_BASE_CONFIDENCE + LEXICON_MENTION_BOOST * extra).min(MENTION_CONFIDENCE_CAP)
        }
        Provenance::Analysis => {
            (ANALYSIS_BASE_CONFIDENCE + ANALYSIS_MENTION_BOOST * extra).min(MENTION_CONFIDENCE_CAP)
        }
    }
}

#[derive(Default)]
struct Group {
    /// Label spelling from the best (provenance, arrival order) source.
    label: Option<(Provenance, String)>,
    category: Option<ElementCategory>,
    scene_keys: BTreeSet<SceneKey>,
    lines_by_source: BTreeMap<Provenance, BTreeSet<u32>>,
    source_lines: BTreeSet<u32>,
}

impl Group {
    fn absorb(&mut self, candidate: ElementCandidate) {
        match &self.label {
            Some((best, _)) if *best <= candidate.provenance => {}
            _ => self.label = Some((candidate.provenance, candidate.label)),
        }
        self.category = Some(candidate.category);
        self.scene_keys.insert(candidate.scene_key);
        self.lines_by_source
            .entry(candidate.provenance)
            .or_default()
            .insert(candidate.line_number);
        self.source_lines.insert(candidate.line_number);
    }

    fn seal(self) -> Element {
        let (provenance, label) = self.label.unwrap_or((
            Provenance::Analysis,
            String::new(),
        ));
        let confidence = self
            .lines_by_source
            .iter()
            .map(|(source, lines)| source_confidence(*source, lines.len() as u32))
            .fold(0.0_f64, f64::max);

        Element {
            category: self.category.unwrap_or(ElementCategory::Unknown),
            label,
            confidence: round2(confidence),
            scene_keys: self.scene_keys,
            source_lines: self.source_lines,
            provenance,
        }
    }
}
