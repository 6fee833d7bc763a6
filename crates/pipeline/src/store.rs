//! In-memory revision store.
//!
//! Bounded FIFO cache indexed by revision id and content hash, with
//! scene lookups by stable key. Durable storage belongs to the storage
//! collaborator; this holds the working set for dedup, diffing, and
//! review queries.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use slugline_core::segment::Scene;
use slugline_core::types::{ParsedRevision, RevisionId};

pub struct RevisionStore {
    capacity: usize,
    /// Insertion order, oldest first.
    order: VecDeque<RevisionId>,
    by_id: HashMap<RevisionId, Arc<ParsedRevision>>,
    by_hash: HashMap<String, RevisionId>,
}

impl RevisionStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            order: VecDeque::new(),
            by_id: HashMap::new(),
            by_hash: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Insert a fresh parse, evicting the oldest revision when over
    /// capacity.
    pub fn insert(&mut self, parsed: Arc<ParsedRevision>) {
        let id = parsed.revision.id;
        let hash = parsed.revision.content_hash.clone();
        if self.by_id.insert(id, parsed).is_none() {
            self.order.push_back(id);
        }
        self.by_hash.insert(hash, id);

        while self.by_id.len() > self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            if let Some(evicted) = self.by_id.remove(&oldest) {
                self.by_hash.remove(&evicted.revision.content_hash);
                tracing::warn!(revision = %oldest, "Evicting revision from the parse store");
            }
        }
    }

    /// Swap a stored parse for a rewritten one with the same id,
    /// keeping its position in the eviction order. Unknown ids are
    /// ignored.
    pub fn replace(&mut self, parsed: Arc<ParsedRevision>) {
        if let Some(slot) = self.by_id.get_mut(&parsed.revision.id) {
            *slot = parsed;
        }
    }

    pub fn by_id(&self, id: &RevisionId) -> Option<Arc<ParsedRevision>> {
        self.by_id.get(id).cloned()
    }

    pub fn by_hash(&self, hash: &str) -> Option<Arc<ParsedRevision>> {
        self.by_hash
            .get(hash)
            .and_then(|id| self.by_id.get(id))
            .cloned()
    }

    /// Scene lookup by revision id and stable scene key.
    pub fn find_scene(&self, revision: &RevisionId, key: &str) -> Option<Scene> {
        self.by_id
            .get(revision)
            .and_then(|parsed| parsed.scene_by_key(key))
            .cloned()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use slugline_core::attribute::attribute_speakers;
    use slugline_core::classify::classify_lines;
    use slugline_core::config::EngineConfig;
    use slugline_core::hashing::sha256_hex;
    use slugline_core::normalize::normalize;
    use slugline_core::segment::segment_scenes;
    use slugline_core::types::ScriptRevision;

    use super::*;

    /// Parse the pure stages only; good enough for store bookkeeping.
    fn parsed(text: &str) -> Arc<ParsedRevision> {
        let config = EngineConfig::default();
        let normalized = normalize(text.as_bytes(), None, Some("s.fountain"), &config).unwrap();
        let (lines, issues) = classify_lines(&normalized.lines);
        let segmented = segment_scenes(normalized.format, lines);
        let mut scenes = segmented.scenes;
        let characters = attribute_speakers(&mut scenes);
        Arc::new(ParsedRevision {
            revision: ScriptRevision::new(
                sha256_hex(text.as_bytes()),
                normalized.format,
                normalized.page_count,
                segmented.metadata,
                normalized.lines,
            ),
            scenes,
            characters,
            elements: Vec::new(),
            scene_metrics: Vec::new(),
            issues,
        })
    }

    // -- lookup ----------------------------------------------------------------

    #[test]
    fn lookups_by_id_hash_and_scene_key() {
        let mut store = RevisionStore::new(8);
        let parsed = parsed("INT. KITCHEN - DAY\n\nANNA\nToast.\n");
        let id = parsed.revision.id;
        let hash = parsed.revision.content_hash.clone();
        let key = parsed.scenes[0].key.clone();
        store.insert(parsed);

        assert!(store.by_id(&id).is_some());
        assert!(store.by_hash(&hash).is_some());
        let scene = store.find_scene(&id, &key).unwrap();
        assert_eq!(scene.location.as_deref(), Some("KITCHEN"));
        assert!(store.find_scene(&id, "no-such-key").is_none());
    }

    // -- eviction ----------------------------------------------------------------

    #[test]
    fn oldest_revision_is_evicted_over_capacity() {
        let mut store = RevisionStore::new(2);
        let first = parsed("INT. A - DAY\n");
        let first_id = first.revision.id;
        let first_hash = first.revision.content_hash.clone();
        store.insert(first);
        store.insert(parsed("INT. B - DAY\n"));
        store.insert(parsed("INT. C - DAY\n"));

        assert_eq!(store.len(), 2);
        assert!(store.by_id(&first_id).is_none());
        assert!(store.by_hash(&first_hash).is_none());
    }

    // -- replace -----------------------------------------------------------------

    #[test]
    fn replace_swaps_in_place_and_ignores_unknown_ids() {
        let mut store = RevisionStore::new(2);
        let original = parsed("INT. A - DAY\n\nANNA\nHi.\n");
        let id = original.revision.id;
        store.insert(Arc::clone(&original));

        let mut rewritten = (*original).clone();
        rewritten.scenes[0].key = "carried-key".to_string();
        store.replace(Arc::new(rewritten));

        assert_eq!(store.by_id(&id).unwrap().scenes[0].key, "carried-key");
        assert_eq!(store.len(), 1);

        let stranger = parsed("INT. B - DAY\n");
        store.replace(stranger);
        assert_eq!(store.len(), 1);
    }
}
