//! Parse orchestration: the staged path from raw bytes to a
//! [`ParsedRevision`].
//!
//! Every stage here is pure and sequential; the only suspension point
//! is the per-scene analysis call. A failed analysis batch degrades
//! that scene to lexicon-only tagging and records an issue instead of
//! failing the document.

use slugline_core::attribute;
use slugline_core::classify::{self, LineRole, ReviewFlag};
use slugline_core::config::EngineConfig;
use slugline_core::error::{EngineError, Issue};
use slugline_core::hashing;
use slugline_core::metrics;
use slugline_core::normalize::{self, SourceFormat};
use slugline_core::segment::{self, Scene};
use slugline_core::tag::{self, ElementCandidate, Provenance};
use slugline_core::types::{ParsedRevision, ScriptRevision};
use slugline_nlp::{Analysis, AnalysisError, Analyzer, EntityLabel};

/// One parse request. The bytes are hashed verbatim for dedup, so the
/// caller must not normalize them first.
#[derive(Debug, Clone, Copy)]
pub struct SubmitRequest<'a> {
    pub bytes: &'a [u8],
    /// Overrides format detection when set.
    pub declared_format: Option<SourceFormat>,
    /// Used for extension-based format detection.
    pub filename: Option<&'a str>,
    /// Production the upload belongs to; recorded in revision metadata.
    pub production: Option<&'a str>,
}

/// Parse one revision end to end.
///
/// Fatal failures ([`EngineError::UnsupportedFormat`], size-cap
/// validation) abort with no partial result. Everything recoverable
/// lands on the returned revision's issues list.
pub async fn parse_revision(
    analyzer: &dyn Analyzer,
    config: &EngineConfig,
    attempts: u32,
    request: SubmitRequest<'_>,
) -> Result<ParsedRevision, EngineError> {
    tracing::debug!(bytes = request.bytes.len(), "Parsing revision");

    let normalized = normalize::normalize(
        request.bytes,
        request.declared_format,
        request.filename,
        config,
    )?;
    let content_hash = hashing::sha256_hex(request.bytes);

    let (structural, mut issues) = classify::classify_lines(&normalized.lines);
    let segmented = segment::segment_scenes(normalized.format, structural);
    let mut scenes = segmented.scenes;
    let mut characters = attribute::attribute_speakers(&mut scenes);

    let mut metadata = segmented.metadata;
    if let Some(production) = request.production {
        metadata
            .entry("production".to_string())
            .or_insert_with(|| production.to_string());
    }

    // One analysis batch per scene. A batch that fails after retries
    // leaves a `None` slot; the scene keeps its lexicon tags.
    let mut analyses: Vec<Option<(SceneBatch, Analysis)>> = Vec::with_capacity(scenes.len());
    for scene in &scenes {
        let Some(batch) = scene_batch(scene) else {
            analyses.push(None);
            continue;
        };
        match analyze_with_retry(analyzer, attempts, &batch.text).await {
            Ok(analysis) => analyses.push(Some((batch, analysis))),
            Err(err) => {
                tracing::warn!(
                    scene = %scene.key,
                    error = %err,
                    "Analysis unavailable, tagging scene from lexicons only",
                );
                issues.push(Issue::analysis_unavailable(
                    scene.key.clone(),
                    err.to_string(),
                ));
                analyses.push(None);
            }
        }
    }

    resolve_possible_cues(&mut scenes, &analyses, &mut issues);

    let mut candidates = tag::collect_candidates(&scenes);
    candidates.extend(analysis_candidates(&scenes, &analyses));
    let elements = tag::merge_elements(candidates);

    let scene_metrics = metrics::compute_scene_metrics(&scenes, &elements, config);
    metrics::finalize_characters(&mut characters, &scenes, config);

    let revision = ScriptRevision::new(
        content_hash,
        normalized.format,
        normalized.page_count,
        metadata,
        normalized.lines,
    );

    tracing::info!(
        revision = %revision.id,
        scenes = scenes.len(),
        characters = characters.len(),
        elements = elements.len(),
        issues = issues.len(),
        "Parse complete",
    );

    Ok(ParsedRevision {
        revision,
        scenes,
        characters,
        elements,
        scene_metrics,
        issues,
    })
}

// ---------------------------------------------------------------------------
// Analysis batching
// ---------------------------------------------------------------------------

/// Analysis input for one scene: action and dialogue text joined by
/// newlines, plus the byte span each line occupies in it.
struct SceneBatch {
    text: String,
    /// `(start, end, line_number)` for every included line.
    spans: Vec<(usize, usize, u32)>,
}

/// Build the analysis batch for one scene. Cue, parenthetical, and
/// transition lines carry no taggable prose and are left out. Returns
/// `None` for scenes with nothing to analyze.
fn scene_batch(scene: &Scene) -> Option<SceneBatch> {
    let mut text = String::new();
    let mut spans = Vec::new();
    for line in &scene.lines {
        if !matches!(line.role, LineRole::Action | LineRole::Dialogue) {
            continue;
        }
        if !text.is_empty() {
            text.push('\n');
        }
        let start = text.len();
        text.push_str(&line.text);
        spans.push((start, text.len(), line.number));
    }
    if spans.is_empty() {
        None
    } else {
        Some(SceneBatch { text, spans })
    }
}

async fn analyze_with_retry(
    analyzer: &dyn Analyzer,
    attempts: u32,
    text: &str,
) -> Result<Analysis, AnalysisError> {
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match analyzer.analyze(text).await {
            Ok(analysis) => return Ok(analysis),
            Err(err) if attempt < attempts && err.is_retryable() => {
                tracing::debug!(attempt, error = %err, "Analysis attempt failed, retrying");
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

// ---------------------------------------------------------------------------
// Review resolution
// ---------------------------------------------------------------------------

/// Settle `PossibleCue` marks against the analysis output. A person
/// name covering the line is kept as action with a `LikelyName` mark
/// and surfaced as an issue; anything else resolves to plain action.
/// Without analysis the mark stays for human review.
fn resolve_possible_cues(
    scenes: &mut [Scene],
    analyses: &[Option<(SceneBatch, Analysis)>],
    issues: &mut Vec<Issue>,
) {
    for (scene, slot) in scenes.iter_mut().zip(analyses) {
        let Some((batch, analysis)) = slot else {
            for line in &scene.lines {
                if line.review == Some(ReviewFlag::PossibleCue) {
                    issues.push(Issue::ambiguous_structure(
                        line.number,
                        format!("'{}' is cue-shaped with no dialogue; kept for review", line.text),
                    ));
                }
            }
            continue;
        };

        for line in &mut scene.lines {
            if line.review != Some(ReviewFlag::PossibleCue) {
                continue;
            }
            let Some(&(start, end, _)) = batch
                .spans
                .iter()
                .find(|&&(_, _, number)| number == line.number)
            else {
                continue;
            };
            let named = analysis
                .entities_in(start, end)
                .any(|span| span.label == EntityLabel::Person && span.covers(start, end));
            if named {
                line.review = Some(ReviewFlag::LikelyName);
                issues.push(Issue::ambiguous_structure(
                    line.number,
                    format!("'{}' looks like a speaker name with no dialogue", line.text),
                ));
            } else {
                line.review = None;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Analysis candidates
// ---------------------------------------------------------------------------

/// Turn entity spans into element candidates. Person names feed cue
/// review and attribution, not the element list; every other label is
/// mapped through [`tag::category_for_entity`] and kept even when the
/// category comes back `unknown`.
fn analysis_candidates(
    scenes: &[Scene],
    analyses: &[Option<(SceneBatch, Analysis)>],
) -> Vec<ElementCandidate> {
    let mut out = Vec::new();
    for (scene, slot) in scenes.iter().zip(analyses) {
        let Some((batch, analysis)) = slot else {
            continue;
        };
        for span in &analysis.entities {
            if span.label == EntityLabel::Person {
                continue;
            }
            let Some(&(_, _, line_number)) = batch
                .spans
                .iter()
                .find(|&&(start, end, _)| span.start >= start && span.start < end)
            else {
                continue;
            };
            out.push(ElementCandidate {
                category: tag::category_for_entity(span.label.as_str()),
                label: span.text.clone(),
                scene_key: scene.key.clone(),
                line_number,
                provenance: Provenance::Analysis,
            });
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
