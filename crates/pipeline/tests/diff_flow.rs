//! Revision diffing and scene-key continuity through the service.

mod common;

use std::sync::Arc;

use slugline_core::diff::{DiffStatus, ModificationKind};
use slugline_core::tag::ElementCategory;
use slugline_nlp::StubAnalyzer;

// ---------------------------------------------------------------------------
// Test: a day-to-night heading edit diffs as one changed scene
// ---------------------------------------------------------------------------

#[tokio::test]
async fn heading_edit_diffs_as_one_changed_scene() {
    let service = common::service_with(Arc::new(StubAnalyzer));
    let night = common::TWO_SCENE_SCRIPT.replace("INT. KITCHEN - DAY", "INT. KITCHEN - NIGHT");

    let old = common::submit(&service, common::TWO_SCENE_SCRIPT)
        .await
        .unwrap();
    let new = common::submit(&service, &night).await.unwrap();

    let diff = service.diff(old.revision_id, new.revision_id).await.unwrap();

    assert_eq!(diff.old_revision, old.revision_id);
    assert_eq!(diff.new_revision, new.revision_id);
    assert_eq!(diff.scenes.len(), 1);
    let delta = &diff.scenes[0];
    assert_eq!(delta.status, DiffStatus::Changed);
    assert_eq!(delta.modifications, vec![ModificationKind::Heading]);
    assert!(!delta.substantial_rewrite);

    // Same cast, same elements: nothing at the element level.
    assert!(diff.elements.is_empty());
    assert!(diff.issues.is_empty());

    // Both scenes map forward; the untouched street scene to itself.
    assert_eq!(diff.key_map.len(), 2);
    let new_key = delta.new_key.as_ref().unwrap();
    let old_key = delta.old_key.as_ref().unwrap();
    assert_ne!(new_key, old_key);
    assert_eq!(diff.key_map.get(new_key), Some(old_key));
}

// ---------------------------------------------------------------------------
// Test: diff-and-carry rewrites the stored revision onto the old keys
// ---------------------------------------------------------------------------

#[tokio::test]
async fn carry_keeps_scene_identity_across_revisions() {
    let service = common::service_with(Arc::new(StubAnalyzer));
    let night = common::TWO_SCENE_SCRIPT.replace("INT. KITCHEN - DAY", "INT. KITCHEN - NIGHT");

    let old = common::submit(&service, common::TWO_SCENE_SCRIPT)
        .await
        .unwrap();
    let new = common::submit(&service, &night).await.unwrap();

    let (diff, carried) = service
        .diff_and_carry(old.revision_id, new.revision_id)
        .await
        .unwrap();

    let old_keys: Vec<&str> = old.parsed.scenes.iter().map(|s| s.key.as_str()).collect();
    let carried_keys: Vec<&str> = carried.scenes.iter().map(|s| s.key.as_str()).collect();
    assert_eq!(carried_keys, old_keys);
    assert_eq!(diff.scenes.len(), 1);

    // Elements and characters follow the scenes onto the carried keys.
    let kitchen = carried
        .elements
        .iter()
        .find(|e| e.category == ElementCategory::Location && e.label == "KITCHEN")
        .unwrap();
    assert!(kitchen.scene_keys.contains(old_keys[0]));
    assert!(carried.characters[0]
        .scene_keys
        .iter()
        .all(|k| old_keys.contains(&k.as_str())));

    // The store now serves the carried copy.
    let stored = service.revision(new.revision_id).await.unwrap();
    assert_eq!(stored.scenes[0].key, old_keys[0]);

    // A second diff matches the kitchen scene by identical key and still
    // reports the heading change.
    let again = service.diff(old.revision_id, new.revision_id).await.unwrap();
    assert_eq!(again.scenes.len(), 1);
    let delta = &again.scenes[0];
    assert_eq!(delta.status, DiffStatus::Changed);
    assert_eq!(delta.modifications, vec![ModificationKind::Heading]);
    assert_eq!(delta.old_key, delta.new_key);
    assert!(again.issues.is_empty());
}

// ---------------------------------------------------------------------------
// Test: an appended scene is an addition with its new elements
// ---------------------------------------------------------------------------

#[tokio::test]
async fn appended_scene_reports_addition_and_new_elements() {
    let service = common::service_with(Arc::new(StubAnalyzer));
    let extended = format!(
        "{}\nINT. CELLAR - NIGHT\n\nDust hangs in the air.\n",
        common::TWO_SCENE_SCRIPT
    );

    let old = common::submit(&service, common::TWO_SCENE_SCRIPT)
        .await
        .unwrap();
    let new = common::submit(&service, &extended).await.unwrap();

    let diff = service.diff(old.revision_id, new.revision_id).await.unwrap();

    assert_eq!(diff.scenes.len(), 1);
    let delta = &diff.scenes[0];
    assert_eq!(delta.status, DiffStatus::Added);
    assert_eq!(delta.new_number.as_deref(), Some("3"));
    assert!(delta.old_key.is_none());

    assert_eq!(diff.elements.len(), 1);
    assert_eq!(diff.elements[0].status, DiffStatus::Added);
    assert_eq!(diff.elements[0].category, ElementCategory::Location);
    assert_eq!(diff.elements[0].label, "CELLAR");

    // The original two scenes kept their keys and stayed out of the diff.
    assert_eq!(diff.key_map.len(), 2);
}
