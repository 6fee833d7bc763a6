//! Revision diffing.
//!
//! Matches scenes across two parsed revisions by key and by a weighted
//! similarity over heading fields and speaking cast, then reports
//! added, removed, and changed scenes plus element-set deltas. A scene
//! whose best match is tied between several candidates is never
//! guessed: it is reported as a removal plus additions alongside a
//! `SceneMatchAmbiguous` issue.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::classify::LineRole;
use crate::config::EngineConfig;
use crate::error::Issue;
use crate::hashing;
use crate::heading::{self, TimeOfDay};
use crate::segment::Scene;
use crate::tag::ElementCategory;
use crate::types::{ParsedRevision, RevisionId, SceneKey};

/// Similarity scores closer than this are a tie.
const SIMILARITY_EPSILON: f64 = 1e-9;

// ---------------------------------------------------------------------------
// Diff data model
// ---------------------------------------------------------------------------

/// How a scene or element fared between two revisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffStatus {
    Added,
    Removed,
    Changed,
    Unchanged,
}

impl DiffStatus {
    /// String representation for display, logging, and serialized output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Removed => "removed",
            Self::Changed => "changed",
            Self::Unchanged => "unchanged",
        }
    }
}

impl std::fmt::Display for DiffStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What changed inside a matched scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModificationKind {
    /// Heading text differs (location, time, or numbering).
    Heading,
    /// Body line content differs.
    Content,
    /// The set of tagged elements referencing the scene differs.
    ElementSet,
}

impl ModificationKind {
    /// String representation for display, logging, and serialized output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Heading => "heading",
            Self::Content => "content",
            Self::ElementSet => "element_set",
        }
    }
}

impl std::fmt::Display for ModificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One scene-level difference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDelta {
    pub status: DiffStatus,
    pub old_key: Option<SceneKey>,
    pub new_key: Option<SceneKey>,
    pub old_number: Option<String>,
    pub new_number: Option<String>,
    pub modifications: Vec<ModificationKind>,
    /// Dialogue volume moved beyond the configured tolerance.
    pub substantial_rewrite: bool,
    /// Match similarity for changed scenes, two decimals.
    pub similarity: Option<f64>,
    pub note: Option<String>,
}

/// One element-level difference between revisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementDelta {
    pub category: ElementCategory,
    pub label: String,
    pub status: DiffStatus,
}

/// Complete diff between two parsed revisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevisionDiff {
    pub old_revision: RevisionId,
    pub new_revision: RevisionId,
    /// Added, removed, and changed scenes; unchanged scenes are omitted.
    pub scenes: Vec<SceneDelta>,
    pub elements: Vec<ElementDelta>,
    /// New-revision scene key to the matched old-revision key, for every
    /// matched pair. Feeding this to [`apply_scene_keys`] carries scene
    /// identity forward across revisions.
    pub key_map: BTreeMap<SceneKey, SceneKey>,
    pub issues: Vec<Issue>,
}

// ---------------------------------------------------------------------------
// Similarity
// ---------------------------------------------------------------------------

/// Weighted similarity of two scenes in `0.0..=1.0`.
fn scene_similarity(old: &Scene, new: &Scene, config: &EngineConfig) -> f64 {
    let weights = &config.similarity;

    let location = match (old.location.as_deref(), new.location.as_deref()) {
        (Some(a), Some(b)) => {
            if heading::normalize_location(a) == heading::normalize_location(b) {
                1.0
            } else {
                0.0
            }
        }
        (None, None) => 0.5,
        _ => 0.0,
    };

    let time = match (old.time_of_day, new.time_of_day) {
        (TimeOfDay::Unknown, TimeOfDay::Unknown) => 0.5,
        (a, b) if a == b => 1.0,
        _ => 0.0,
    };

    let prefix = heading_prefix_score(&old.heading, &new.heading, config.heading_prefix_len);
    let cast = cast_similarity(old, new);

    let total_weight =
        weights.location + weights.time_of_day + weights.heading_prefix + weights.characters;
    if total_weight <= 0.0 {
        return 0.0;
    }
    (weights.location * location
        + weights.time_of_day * time
        + weights.heading_prefix * prefix
        + weights.characters * cast)
        / total_weight
}

/// Shared case-folded prefix over the first `n` characters, scored
/// against the longer of the two windows.
fn heading_prefix_score(old: &str, new: &str, n: usize) -> f64 {
    let a: Vec<char> = old.to_lowercase().chars().take(n).collect();
    let b: Vec<char> = new.to_lowercase().chars().take(n).collect();
    if a.is_empty() && b.is_empty() {
        return 0.5;
    }
    let denom = a.len().max(b.len());
    let common = a
        .iter()
        .zip(b.iter())
        .take_while(|(x, y)| x == y)
        .count();
    common as f64 / denom as f64
}

/// Jaccard similarity of the speaking casts.
fn cast_similarity(old: &Scene, new: &Scene) -> f64 {
    let a = speakers(old);
    let b = speakers(new);
    if a.is_empty() && b.is_empty() {
        return 0.5;
    }
    let shared = a.intersection(&b).count();
    let union = a.union(&b).count();
    if union == 0 {
        0.0
    } else {
        shared as f64 / union as f64
    }
}

fn speakers(scene: &Scene) -> BTreeSet<&str> {
    scene
        .lines
        .iter()
        .filter(|l| l.role == LineRole::CharacterCue)
        .filter_map(|l| l.speaker.as_deref())
        .collect()
}

// ---------------------------------------------------------------------------
// Matching and diffing
// ---------------------------------------------------------------------------

/// Diff two parsed revisions.
pub fn diff_revisions(
    old: &ParsedRevision,
    new: &ParsedRevision,
    config: &EngineConfig,
) -> RevisionDiff {
    let old_scenes = &old.scenes;
    let new_scenes = &new.scenes;

    let mut old_matched: Vec<Option<usize>> = vec![None; old_scenes.len()];
    let mut new_matched: Vec<Option<usize>> = vec![None; new_scenes.len()];

    // Identical keys are the same scene regardless of similarity; this
    // keeps unchanged scenes matched under any weight configuration.
    let new_by_key: BTreeMap<&str, usize> = new_scenes
        .iter()
        .enumerate()
        .map(|(j, s)| (s.key.as_str(), j))
        .collect();
    for (i, scene) in old_scenes.iter().enumerate() {
        if let Some(&j) = new_by_key.get(scene.key.as_str()) {
            old_matched[i] = Some(j);
            new_matched[j] = Some(i);
        }
    }

    // Candidate pairs above the acceptance threshold.
    let mut pairs: Vec<(usize, usize, f64)> = Vec::new();
    for (i, old_scene) in old_scenes.iter().enumerate() {
        if old_matched[i].is_some() {
            continue;
        }
        for (j, new_scene) in new_scenes.iter().enumerate() {
            if new_matched[j].is_some() {
                continue;
            }
            let similarity = scene_similarity(old_scene, new_scene, config);
            if similarity >= config.match_threshold {
                pairs.push((i, j, similarity));
            }
        }
    }

    // A side whose best similarity is tied between several partners is
    // ambiguous and sits the matching out.
    let ambiguous_old = ambiguous_sides(&pairs, old_scenes.len(), |p| (p.0, p.1));
    let ambiguous_new = ambiguous_sides(&pairs, new_scenes.len(), |p| (p.1, p.0));

    pairs.sort_by(|a, b| {
        b.2.partial_cmp(&a.2)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.cmp(&b.0))
            .then(a.1.cmp(&b.1))
    });
    let mut similarities: BTreeMap<(usize, usize), f64> = BTreeMap::new();
    for (i, j, similarity) in &pairs {
        if ambiguous_old.contains(i) || ambiguous_new.contains(j) {
            continue;
        }
        if old_matched[*i].is_some() || new_matched[*j].is_some() {
            continue;
        }
        old_matched[*i] = Some(*j);
        new_matched[*j] = Some(*i);
        similarities.insert((*i, *j), *similarity);
    }

    // Assemble deltas and the key map.
    let mut issues = Vec::new();
    let mut scene_deltas = Vec::new();
    let mut key_map = BTreeMap::new();

    let old_elements_by_scene = element_sets_by_scene(old);
    let new_elements_by_scene = element_sets_by_scene(new);

    for (i, old_scene) in old_scenes.iter().enumerate() {
        if old_matched[i].is_some() {
            continue;
        }
        let ambiguous = ambiguous_old.contains(&i);
        if ambiguous {
            issues.push(Issue::scene_match_ambiguous(
                old_scene.key.clone(),
                format!(
                    "scene {} has several equally similar counterparts; reported as removed",
                    old_scene.number
                ),
            ));
        }
        scene_deltas.push(SceneDelta {
            status: DiffStatus::Removed,
            old_key: Some(old_scene.key.clone()),
            new_key: None,
            old_number: Some(old_scene.number.clone()),
            new_number: None,
            modifications: Vec::new(),
            substantial_rewrite: false,
            similarity: None,
            note: ambiguous.then(|| "match was ambiguous".to_string()),
        });
    }

    for (j, new_scene) in new_scenes.iter().enumerate() {
        if new_matched[j].is_some() {
            continue;
        }
        let ambiguous = ambiguous_new.contains(&j);
        if ambiguous {
            issues.push(Issue::scene_match_ambiguous(
                new_scene.key.clone(),
                format!(
                    "scene {} has several equally similar counterparts; reported as added",
                    new_scene.number
                ),
            ));
        }
        scene_deltas.push(SceneDelta {
            status: DiffStatus::Added,
            old_key: None,
            new_key: Some(new_scene.key.clone()),
            old_number: None,
            new_number: Some(new_scene.number.clone()),
            modifications: Vec::new(),
            substantial_rewrite: false,
            similarity: None,
            note: ambiguous.then(|| "match was ambiguous".to_string()),
        });
    }

    for (j, new_scene) in new_scenes.iter().enumerate() {
        let Some(i) = new_matched[j] else { continue };
        let old_scene = &old_scenes[i];
        key_map.insert(new_scene.key.clone(), old_scene.key.clone());

        let mut modifications = Vec::new();
        if old_scene.heading != new_scene.heading {
            modifications.push(ModificationKind::Heading);
        }
        if content_digest(old_scene) != content_digest(new_scene) {
            modifications.push(ModificationKind::Content);
        }
        let old_set = old_elements_by_scene.get(old_scene.key.as_str());
        let new_set = new_elements_by_scene.get(new_scene.key.as_str());
        if old_set.unwrap_or(&BTreeSet::new()) != new_set.unwrap_or(&BTreeSet::new()) {
            modifications.push(ModificationKind::ElementSet);
        }

        let dialogue_delta = old_scene
            .dialogue_line_count()
            .abs_diff(new_scene.dialogue_line_count());
        let substantial_rewrite = dialogue_delta > config.rewrite_tolerance;

        if modifications.is_empty() && !substantial_rewrite {
            continue;
        }
        let similarity = similarities
            .get(&(i, j))
            .copied()
            .unwrap_or_else(|| scene_similarity(old_scene, new_scene, config));
        scene_deltas.push(SceneDelta {
            status: DiffStatus::Changed,
            old_key: Some(old_scene.key.clone()),
            new_key: Some(new_scene.key.clone()),
            old_number: Some(old_scene.number.clone()),
            new_number: Some(new_scene.number.clone()),
            modifications,
            substantial_rewrite,
            similarity: Some(crate::metrics::round2(similarity)),
            note: None,
        });
    }

    RevisionDiff {
        old_revision: old.revision.id,
        new_revision: new.revision.id,
        scenes: scene_deltas,
        elements: diff_elements(old, new),
        key_map,
        issues,
    }
}

/// Indices on one side whose top candidate similarity is shared by two
/// or more partners.
fn ambiguous_sides(
    pairs: &[(usize, usize, f64)],
    side_len: usize,
    project: impl Fn(&(usize, usize, f64)) -> (usize, usize),
) -> BTreeSet<usize> {
    let mut best: Vec<Option<f64>> = vec![None; side_len];
    let mut best_count: Vec<u32> = vec![0; side_len];

    for pair in pairs {
        let (side, _) = project(pair);
        let similarity = pair.2;
        match best[side] {
            Some(current) if similarity > current + SIMILARITY_EPSILON => {
                best[side] = Some(similarity);
                best_count[side] = 1;
            }
            Some(current) if (similarity - current).abs() <= SIMILARITY_EPSILON => {
                best_count[side] += 1;
            }
            Some(_) => {}
            None => {
                best[side] = Some(similarity);
                best_count[side] = 1;
            }
        }
    }

    (0..side_len).filter(|&i| best_count[i] >= 2).collect()
}

fn content_digest(scene: &Scene) -> String {
    let body = scene
        .lines
        .iter()
        .map(|l| l.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    hashing::sha256_hex(body.as_bytes())
}

type ElementSet = BTreeSet<(ElementCategory, String)>;

fn element_sets_by_scene(parsed: &ParsedRevision) -> BTreeMap<&str, ElementSet> {
    let mut out: BTreeMap<&str, ElementSet> = BTreeMap::new();
    for element in &parsed.elements {
        for key in &element.scene_keys {
            out.entry(key.as_str())
                .or_default()
                .insert((element.category, element.label.to_lowercase()));
        }
    }
    out
}

/// Element-level additions and removals across the whole script.
fn diff_elements(old: &ParsedRevision, new: &ParsedRevision) -> Vec<ElementDelta> {
    let old_set: BTreeMap<(ElementCategory, String), &str> = old
        .elements
        .iter()
        .map(|e| ((e.category, e.label.to_lowercase()), e.label.as_str()))
        .collect();
    let new_set: BTreeMap<(ElementCategory, String), &str> = new
        .elements
        .iter()
        .map(|e| ((e.category, e.label.to_lowercase()), e.label.as_str()))
        .collect();

    let mut deltas = Vec::new();
    for (key, label) in &new_set {
        if !old_set.contains_key(key) {
            deltas.push(ElementDelta {
                category: key.0,
                label: (*label).to_string(),
                status: DiffStatus::Added,
            });
        }
    }
    for (key, label) in &old_set {
        if !new_set.contains_key(key) {
            deltas.push(ElementDelta {
                category: key.0,
                label: (*label).to_string(),
                status: DiffStatus::Removed,
            });
        }
    }
    deltas
}

// ---------------------------------------------------------------------------
// Key continuity
// ---------------------------------------------------------------------------

/// Rewrite a parsed revision's scene keys through a diff's key map so
/// matched scenes keep their identity from the older revision. Keys
/// absent from the map are left alone, which makes a second application
/// a no-op.
pub fn apply_scene_keys(
    parsed: &ParsedRevision,
    key_map: &BTreeMap<SceneKey, SceneKey>,
) -> ParsedRevision {
    let remap = |key: &SceneKey| -> SceneKey { key_map.get(key).cloned().unwrap_or_else(|| key.clone()) };

    let mut out = parsed.clone();
    for scene in &mut out.scenes {
        scene.key = remap(&scene.key);
    }
    for element in &mut out.elements {
        element.scene_keys = element.scene_keys.iter().map(&remap).collect();
    }
    for character in &mut out.characters {
        for key in &mut character.scene_keys {
            *key = remap(key);
        }
    }
    for metrics in &mut out.scene_metrics {
        metrics.scene_key = remap(&metrics.scene_key);
    }
    out
}
