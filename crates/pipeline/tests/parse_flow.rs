//! End-to-end parse behavior through the service: structure, elements,
//! review flags, and degradation when the analysis service is down.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use slugline_core::classify::ReviewFlag;
use slugline_core::error::{EngineError, IssueKind};
use slugline_core::normalize::SourceFormat;
use slugline_core::tag::ElementCategory;
use slugline_nlp::{Analysis, AnalysisError, Analyzer, StubAnalyzer};
use slugline_pipeline::{PipelineError, SubmitRequest};

/// Fails every call and counts them, for retry and degradation checks.
struct UnavailableAnalyzer {
    calls: AtomicUsize,
}

#[async_trait]
impl Analyzer for UnavailableAnalyzer {
    async fn analyze(&self, _text: &str) -> Result<Analysis, AnalysisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(AnalysisError::Timeout(Duration::from_millis(5)))
    }
}

// ---------------------------------------------------------------------------
// Test: a two-scene script parses into scenes, characters, and elements
// ---------------------------------------------------------------------------

#[tokio::test]
async fn two_scene_script_parses_end_to_end() {
    let service = common::service_with(Arc::new(StubAnalyzer));

    let submitted = common::submit(&service, common::TWO_SCENE_SCRIPT)
        .await
        .unwrap();

    assert!(!submitted.deduplicated);
    let summary = &submitted.summary;
    assert_eq!(summary.format, SourceFormat::Fountain);
    assert_eq!(summary.scene_count, 2);
    assert_eq!(summary.character_count, 1);
    assert_eq!(summary.dialogue_lines, 2);
    assert_eq!(summary.action_lines, 2);
    assert_eq!(summary.unresolved_lines, 0);
    assert_eq!(summary.issue_count, 0);
    assert!(summary.estimated_minutes > 0.0);

    let parsed = &submitted.parsed;
    assert_eq!(parsed.characters[0].name, "ANNA");
    assert_eq!(parsed.characters[0].dialogue_lines, 2);
    for scene in &parsed.scenes {
        assert_eq!(scene.key.len(), 16);
        assert!(scene.key.chars().all(|c| c.is_ascii_hexdigit()));
    }

    // Heading locations are tagged at full confidence.
    for label in ["KITCHEN", "STREET"] {
        let element = parsed
            .elements
            .iter()
            .find(|e| e.category == ElementCategory::Location && e.label == label)
            .unwrap();
        assert_eq!(element.confidence, 1.0);
    }
    assert!(parsed.issues.is_empty());
}

// ---------------------------------------------------------------------------
// Test: headingless text falls back to one synthetic scene
// ---------------------------------------------------------------------------

#[tokio::test]
async fn headingless_text_gets_a_synthetic_scene() {
    let service = common::service_with(Arc::new(StubAnalyzer));

    let submitted = common::submit(&service, "Just prose here.\n\nMore prose follows.\n")
        .await
        .unwrap();

    assert_eq!(submitted.parsed.scenes.len(), 1);
    assert!(submitted.parsed.scenes[0].synthetic);
    assert_eq!(submitted.parsed.scenes[0].number, "1");
}

// ---------------------------------------------------------------------------
// Test: a cue-shaped line the analyzer rejects is cleared to plain action
// ---------------------------------------------------------------------------

#[tokio::test]
async fn non_name_caps_line_is_cleared_after_analysis() {
    let service = common::service_with(Arc::new(StubAnalyzer));
    let script = "INT. OFFICE - NIGHT\n\nHe types.\n\nTHE END\n";

    let submitted = common::submit(&service, script).await.unwrap();

    // "THE END" carries no person-name signal, so the flag is dropped.
    assert_eq!(submitted.summary.unresolved_lines, 0);
    assert!(submitted.parsed.issues.is_empty());
    let scene = &submitted.parsed.scenes[0];
    assert!(scene.lines.iter().all(|line| line.review.is_none()));
}

// ---------------------------------------------------------------------------
// Test: a name-shaped line with no dialogue stays flagged for review
// ---------------------------------------------------------------------------

#[tokio::test]
async fn name_without_dialogue_is_kept_for_review() {
    let service = common::service_with(Arc::new(StubAnalyzer));
    let script = "INT. OFFICE - NIGHT\n\nThe room is dark.\n\nMARLOWE\n\nEXT. STREET - DAY\n\nRain falls.\n";

    let submitted = common::submit(&service, script).await.unwrap();

    assert_eq!(submitted.summary.unresolved_lines, 1);
    let flagged = submitted.parsed.scenes[0]
        .lines
        .iter()
        .find(|line| line.review.is_some())
        .unwrap();
    assert_eq!(flagged.text, "MARLOWE");
    assert_eq!(flagged.review, Some(ReviewFlag::LikelyName));

    assert_eq!(submitted.parsed.issues.len(), 1);
    let issue = &submitted.parsed.issues[0];
    assert_eq!(issue.kind, IssueKind::AmbiguousStructure);
    assert_eq!(issue.line, Some(flagged.number));
}

// ---------------------------------------------------------------------------
// Test: analysis outage degrades to lexicons instead of failing the parse
// ---------------------------------------------------------------------------

#[tokio::test]
async fn analysis_outage_degrades_to_lexicons() {
    let analyzer = Arc::new(UnavailableAnalyzer {
        calls: AtomicUsize::new(0),
    });
    let service = common::service_with(analyzer.clone());

    let submitted = common::submit(&service, common::TWO_SCENE_SCRIPT)
        .await
        .unwrap();

    // Two scene batches, two attempts each.
    assert_eq!(analyzer.calls.load(Ordering::SeqCst), 4);

    let issues = &submitted.parsed.issues;
    assert_eq!(issues.len(), 2);
    assert!(issues
        .iter()
        .all(|issue| issue.kind == IssueKind::AnalysisUnavailable));

    // Heading and lexicon tagging still ran.
    let parsed = &submitted.parsed;
    let has = |category: ElementCategory, label: &str| {
        parsed
            .elements
            .iter()
            .any(|e| e.category == category && e.label == label)
    };
    assert!(has(ElementCategory::Location, "KITCHEN"));
    assert!(has(ElementCategory::Location, "STREET"));
    assert!(has(ElementCategory::Prop, "Knife"));
    assert!(has(ElementCategory::Vehicle, "Taxi"));
}

// ---------------------------------------------------------------------------
// Test: undecodable input is a fatal error, not a degraded parse
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unsupported_payload_is_rejected() {
    let service = common::service_with(Arc::new(StubAnalyzer));

    let result = service
        .submit(SubmitRequest {
            bytes: b"<?xml version=\"1.0\"?><FinalDraft DocumentType=\"Script\"/>",
            declared_format: None,
            filename: Some("draft.fdx"),
            production: None,
        })
        .await;

    assert_matches!(
        result,
        Err(PipelineError::Engine(EngineError::UnsupportedFormat(_)))
    );
}
