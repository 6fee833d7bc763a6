//! Engine tunables with production defaults.
//!
//! Every literal constant of the parsing and diffing heuristics lives
//! here so deployments can tune matching behavior without forking the
//! engine. The defaults are starting points, not ground truth.

// ---------------------------------------------------------------------------
// Input limits
// ---------------------------------------------------------------------------

/// Maximum accepted input payload in bytes (10 MiB).
pub const DEFAULT_MAX_INPUT_BYTES: usize = 10 * 1024 * 1024;

/// Lines per page assumed when a document carries no explicit page breaks.
pub const DEFAULT_LINES_PER_PAGE: u32 = 55;

// ---------------------------------------------------------------------------
// Element confidence model
// ---------------------------------------------------------------------------

/// Confidence assigned to a lexicon match on first sight.
pub const LEXICON_BASE_CONFIDENCE: f64 = 0.8;
/// Confidence boost per additional lexicon mention.
pub const LEXICON_MENTION_BOOST: f64 = 0.05;
/// Starting confidence for an analysis-service candidate.
pub const ANALYSIS_BASE_CONFIDENCE: f64 = 0.4;
/// Confidence boost per additional independent analysis mention.
pub const ANALYSIS_MENTION_BOOST: f64 = 0.1;
/// Ceiling for any mention-boosted confidence.
pub const MENTION_CONFIDENCE_CAP: f64 = 0.95;
/// Confidence of a location extracted from a scene heading.
pub const HEADING_LOCATION_CONFIDENCE: f64 = 1.0;

// ---------------------------------------------------------------------------
// Diff defaults
// ---------------------------------------------------------------------------

/// Minimum similarity for two scenes to be considered the same scene.
pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.7;
/// How many leading heading characters participate in similarity.
pub const DEFAULT_HEADING_PREFIX_LEN: usize = 24;
/// Dialogue-line-count delta above which a matched scene counts as a
/// substantial rewrite.
pub const DEFAULT_REWRITE_TOLERANCE: u32 = 3;

// ---------------------------------------------------------------------------
// Screen-time defaults
// ---------------------------------------------------------------------------

/// Seconds of screen time per spoken word.
pub const DEFAULT_SECONDS_PER_WORD: f64 = 0.4;
/// Screen-time credit, in seconds, for a scene where a character is
/// present (mentioned in action) but has no dialogue.
pub const DEFAULT_PRESENCE_SECONDS: f64 = 10.0;
/// Word count at which a character's dialogue-volume factor saturates.
pub const DIALOGUE_VOLUME_WORD_CAP: f64 = 5000.0;

/// Weights for the per-scene complexity score.
///
/// Each weight scales one normalized factor of the weighted sum; the
/// action-vs-dialogue pace factor always participates with weight 1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComplexityWeights {
    /// Weight of the setting factor (interior/exterior and time-of-day).
    pub location_weight: f64,
    /// Weight of the distinct-character-count factor.
    pub character_weight: f64,
    /// Weight of the distinct-element-count factor.
    pub element_weight: f64,
}

impl Default for ComplexityWeights {
    fn default() -> Self {
        Self {
            location_weight: 1.0,
            character_weight: 1.0,
            element_weight: 1.0,
        }
    }
}

/// Weights for the scene-matching similarity function. They should sum
/// to 1.0; [`crate::diff`] normalizes by the actual sum either way.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityWeights {
    pub location: f64,
    pub time_of_day: f64,
    pub heading_prefix: f64,
    pub characters: f64,
}

impl Default for SimilarityWeights {
    fn default() -> Self {
        Self {
            location: 0.35,
            time_of_day: 0.15,
            heading_prefix: 0.2,
            characters: 0.3,
        }
    }
}

/// All engine tunables in one place.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Reject payloads larger than this many bytes.
    pub max_input_bytes: usize,
    /// Lines per page when no explicit page breaks are present.
    pub lines_per_page: u32,
    /// Scene-match acceptance threshold, `0.0..=1.0`.
    pub match_threshold: f64,
    /// Leading heading characters compared during scene matching.
    pub heading_prefix_len: usize,
    /// Dialogue-line delta that flags a substantial rewrite.
    pub rewrite_tolerance: u32,
    /// Seconds per spoken word (screen time).
    pub seconds_per_word: f64,
    /// Seconds credited per non-speaking scene presence (screen time).
    pub presence_seconds: f64,
    pub complexity: ComplexityWeights,
    pub similarity: SimilarityWeights,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
            lines_per_page: DEFAULT_LINES_PER_PAGE,
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            heading_prefix_len: DEFAULT_HEADING_PREFIX_LEN,
            rewrite_tolerance: DEFAULT_REWRITE_TOLERANCE,
            seconds_per_word: DEFAULT_SECONDS_PER_WORD,
            presence_seconds: DEFAULT_PRESENCE_SECONDS,
            complexity: ComplexityWeights::default(),
            similarity: SimilarityWeights::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_constants() {
        let config = EngineConfig::default();
        assert_eq!(config.max_input_bytes, DEFAULT_MAX_INPUT_BYTES);
        assert_eq!(config.lines_per_page, 55);
        assert_eq!(config.match_threshold, 0.7);
        assert_eq!(config.complexity.location_weight, 1.0);
        assert_eq!(config.complexity.character_weight, 1.0);
        assert_eq!(config.complexity.element_weight, 1.0);
    }

    #[test]
    fn similarity_weights_sum_to_one() {
        let weights = SimilarityWeights::default();
        let sum = weights.location + weights.time_of_day + weights.heading_prefix + weights.characters;
        assert!((sum - 1.0).abs() < 1e-9);
    }
}
