//! Full pure-pipeline integration: bytes in, structured revision out,
//! with no analysis service in the loop.

use slugline_core::attribute::attribute_speakers;
use slugline_core::classify::{classify_lines, LineRole};
use slugline_core::config::EngineConfig;
use slugline_core::hashing;
use slugline_core::heading::{IntExt, TimeOfDay};
use slugline_core::metrics::{compute_scene_metrics, finalize_characters};
use slugline_core::normalize::normalize;
use slugline_core::segment::segment_scenes;
use slugline_core::tag::{collect_candidates, merge_elements, ElementCategory, Provenance};
use slugline_core::types::{ParsedRevision, ScriptRevision};

const SCRIPT: &str = "\
Title: The Errand
Author: R. Voss

FADE IN:

INT. KITCHEN - DAY

JOHN butters toast. A kettle shrieks.

JOHN
(calling)
Mary! Kettle!

MARY
Coming.

CUT TO:

EXT. GARDEN PATH - DAY

John carries two mugs. Mary trails behind with the paper.

MARY
You forgot the sugar.

JOHN
Never.

INT. KITCHEN - NIGHT

The kettle sits cold. John reads alone.
";

/// Run every pure stage in order, the way the orchestration crate does,
/// minus the analysis-service candidates.
fn parse(text: &str) -> ParsedRevision {
    let config = EngineConfig::default();
    let normalized = normalize(text.as_bytes(), None, Some("errand.fountain"), &config).unwrap();
    let (structural, issues) = classify_lines(&normalized.lines);
    let segmented = segment_scenes(normalized.format, structural);
    let mut scenes = segmented.scenes;
    let mut characters = attribute_speakers(&mut scenes);
    let elements = merge_elements(collect_candidates(&scenes));
    let scene_metrics = compute_scene_metrics(&scenes, &elements, &config);
    finalize_characters(&mut characters, &scenes, &config);
    let revision = ScriptRevision::new(
        hashing::sha256_hex(text.as_bytes()),
        normalized.format,
        normalized.page_count,
        segmented.metadata,
        normalized.lines,
    );
    ParsedRevision {
        revision,
        scenes,
        characters,
        elements,
        scene_metrics,
        issues,
    }
}

// ---------------------------------------------------------------------------
// Test: structure, attribution, and metadata of a short screenplay
// ---------------------------------------------------------------------------

#[test]
fn short_screenplay_parses_into_a_structured_revision() {
    let parsed = parse(SCRIPT);

    assert_eq!(
        parsed.revision.metadata.get("title").map(String::as_str),
        Some("The Errand")
    );
    assert_eq!(
        parsed.revision.metadata.get("author").map(String::as_str),
        Some("R. Voss")
    );
    assert!(parsed.issues.is_empty());

    let scenes = &parsed.scenes;
    assert_eq!(scenes.len(), 3);
    assert_eq!(scenes[0].int_ext, Some(IntExt::Int));
    assert_eq!(scenes[0].location.as_deref(), Some("KITCHEN"));
    assert_eq!(scenes[0].time_of_day, TimeOfDay::Day);
    assert_eq!(scenes[1].location.as_deref(), Some("GARDEN PATH"));
    assert_eq!(scenes[2].time_of_day, TimeOfDay::Night);
    assert_eq!(
        scenes.iter().map(|s| s.number.as_str()).collect::<Vec<_>>(),
        vec!["1", "2", "3"]
    );

    // Dialogue and parentheticals carry their speaker.
    let first = &scenes[0];
    let spoken: Vec<(&str, &str)> = first
        .lines
        .iter()
        .filter(|l| l.role == LineRole::Dialogue)
        .map(|l| (l.speaker.as_deref().unwrap(), l.text.as_str()))
        .collect();
    assert_eq!(
        spoken,
        vec![("JOHN", "Mary! Kettle!"), ("MARY", "Coming.")]
    );
    let paren = first
        .lines
        .iter()
        .find(|l| l.role == LineRole::Parenthetical)
        .unwrap();
    assert_eq!(paren.speaker.as_deref(), Some("JOHN"));

    let names: Vec<&str> = parsed.characters.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["JOHN", "MARY"]);
    let john = &parsed.characters[0];
    assert_eq!(john.dialogue_lines, 2);
    assert_eq!(john.word_count, 3);
    assert_eq!(john.scene_keys.len(), 2);
}

// ---------------------------------------------------------------------------
// Test: repeated locations merge into one element across scenes
// ---------------------------------------------------------------------------

#[test]
fn heading_locations_merge_across_scenes() {
    let parsed = parse(SCRIPT);

    let locations: Vec<&str> = parsed
        .elements
        .iter()
        .filter(|e| e.category == ElementCategory::Location)
        .map(|e| e.label.as_str())
        .collect();
    assert_eq!(locations.len(), 2);
    assert!(locations.contains(&"KITCHEN"));
    assert!(locations.contains(&"GARDEN PATH"));

    let kitchen = parsed
        .elements
        .iter()
        .find(|e| e.label == "KITCHEN")
        .unwrap();
    assert_eq!(kitchen.provenance, Provenance::Heading);
    assert_eq!(kitchen.confidence, 1.0);
    // Day and night kitchen scenes share the element.
    assert!(kitchen.scene_keys.contains(&parsed.scenes[0].key));
    assert!(kitchen.scene_keys.contains(&parsed.scenes[2].key));

    // Nothing in the fixture trips the prop or effect lexicons.
    assert_eq!(parsed.elements.len(), 2);
}

// ---------------------------------------------------------------------------
// Test: metrics come back in scene order with sane ranges
// ---------------------------------------------------------------------------

#[test]
fn metrics_follow_scene_order() {
    let parsed = parse(SCRIPT);

    assert_eq!(parsed.scene_metrics.len(), parsed.scenes.len());
    for (scene, metrics) in parsed.scenes.iter().zip(&parsed.scene_metrics) {
        assert_eq!(scene.key, metrics.scene_key);
        assert!(metrics.complexity >= 0.0 && metrics.complexity <= 1.0);
        assert!(metrics.estimated_minutes > 0.0);
    }

    let first = &parsed.scene_metrics[0];
    assert_eq!(first.character_count, 2);
    assert_eq!(first.dialogue_lines, 2);
    assert_eq!(first.action_lines, 1);
    assert_eq!(first.element_count, 1);

    let last = &parsed.scene_metrics[2];
    assert_eq!(last.character_count, 0);
    assert_eq!(last.dialogue_lines, 0);
}

// ---------------------------------------------------------------------------
// Test: derived character numbers blend dialogue and presence
// ---------------------------------------------------------------------------

#[test]
fn character_numbers_blend_dialogue_and_presence() {
    let parsed = parse(SCRIPT);

    let john = parsed.characters.iter().find(|c| c.name == "JOHN").unwrap();
    let mary = parsed.characters.iter().find(|c| c.name == "MARY").unwrap();

    // Three spoken words plus one mention-only scene for John; Mary
    // speaks five words and is never mentioned without speaking.
    assert_eq!(john.screen_time_secs, 11.2);
    assert_eq!(mary.screen_time_secs, 2.0);

    // Same two scenes, one exchange in each direction per scene.
    assert_eq!(john.relationships.get("MARY"), Some(&1.0));
    assert_eq!(mary.relationships.get("JOHN"), Some(&1.0));

    for character in &parsed.characters {
        assert!(character.importance > 0.0 && character.importance <= 1.0);
    }
}

// ---------------------------------------------------------------------------
// Test: scene keys survive inserting an unrelated scene mid-document
// ---------------------------------------------------------------------------

#[test]
fn scene_keys_survive_mid_document_insertion() {
    let inserted = SCRIPT.replace(
        "CUT TO:\n\nEXT. GARDEN PATH - DAY",
        "CUT TO:\n\nINT. PANTRY - DAY\n\nShelves of jam glow in the gloom.\n\nEXT. GARDEN PATH - DAY",
    );

    let base = parse(SCRIPT);
    let grown = parse(&inserted);

    assert_eq!(grown.scenes.len(), 4);
    assert_eq!(base.scenes[0].key, grown.scenes[0].key);
    assert_eq!(base.scenes[1].key, grown.scenes[2].key);
    assert_eq!(base.scenes[2].key, grown.scenes[3].key);
    assert_eq!(grown.scenes[1].location.as_deref(), Some("PANTRY"));

    // Ordinal renumbering does not touch the keys.
    assert_eq!(grown.scenes[2].number, "3");
    assert_eq!(base.scenes[1].number, "2");
}

// ---------------------------------------------------------------------------
// Test: re-parsing identical text reproduces the structural output
// ---------------------------------------------------------------------------

#[test]
fn reparsing_identical_text_is_deterministic() {
    let first = parse(SCRIPT);
    let second = parse(SCRIPT);

    // Revision ids and timestamps are per-parse; everything derived from
    // the text itself must come out identical.
    assert_eq!(first.scenes, second.scenes);
    assert_eq!(first.elements, second.elements);
    assert_eq!(first.characters, second.characters);
    assert_eq!(first.scene_metrics, second.scene_metrics);
    assert_eq!(first.issues, second.issues);
    assert_eq!(first.revision.content_hash, second.revision.content_hash);
}
