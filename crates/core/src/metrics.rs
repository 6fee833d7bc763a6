//! Scene and character metrics.
//!
//! Derives per-scene complexity and duration estimates plus
//! per-character screen time, importance, and relationship strengths
//! from the attributed scenes and tagged elements. Scores are 0-1 and
//! rounded to two decimals; durations are minutes rounded to one.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::attribute::Character;
use crate::classify::LineRole;
use crate::config::{ComplexityWeights, EngineConfig, DIALOGUE_VOLUME_WORD_CAP};
use crate::heading::{IntExt, TimeOfDay};
use crate::segment::Scene;
use crate::tag::Element;
use crate::types::SceneKey;

// ---------------------------------------------------------------------------
// Tuning constants
// ---------------------------------------------------------------------------

/// Action share of lines at or above which a scene is action-heavy.
const ACTION_HEAVY_PACE: f64 = 0.7;
/// Character and element counts normalize against this ceiling.
const COUNT_FACTOR_CAP: f64 = 10.0;
/// Complexity added per complex-location keyword hit, and its cap.
const LOCATION_KEYWORD_BOOST: f64 = 0.1;
const LOCATION_KEYWORD_BOOST_CAP: f64 = 0.5;

/// Screen seconds per dialogue line.
const DIALOGUE_SECONDS_PER_LINE: f64 = 3.0;
/// Screen seconds per action line for a trivially simple scene; scales
/// up linearly with complexity to twice this value.
const ACTION_BASE_SECONDS_PER_LINE: f64 = 5.0;
/// Scene staging overhead in minutes: base plus a per-character term,
/// both scaled by complexity.
const STAGING_BASE_MINUTES: f64 = 0.5;
const STAGING_MINUTES_PER_CHARACTER: f64 = 0.2;
/// Whole-scene slack multiplier per unit of complexity.
const COMPLEXITY_SLACK: f64 = 0.5;

/// Importance factor weights; they sum to 1.0.
const IMPORTANCE_SCENE_PRESENCE: f64 = 0.4;
const IMPORTANCE_DIALOGUE_VOLUME: f64 = 0.3;
const IMPORTANCE_RELATIONSHIP_CENTRALITY: f64 = 0.2;
const IMPORTANCE_NAME_PROMINENCE: f64 = 0.1;

/// Relationship strength blend of scene co-occurrence and dialogue
/// interaction.
const RELATIONSHIP_CO_OCCURRENCE_WEIGHT: f64 = 0.7;
const RELATIONSHIP_INTERACTION_WEIGHT: f64 = 0.3;

/// Location words that make a set harder to shoot.
static COMPLEX_LOCATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(moving|car|vehicle|boat|ship|airplane|plane|helicopter|train|subway|water|ocean|sea|lake|river|mountain|forest|jungle|desert|snow|beach|cliff|rooftop|stairs|restaurant|bar|crowd|public|stadium|theater|concert)\b",
    )
    .expect("valid regex")
});

/// Round a score to two decimals.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Round a duration to one decimal.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Derived numbers for one scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneMetrics {
    pub scene_key: SceneKey,
    /// Distinct speaking characters.
    pub character_count: u32,
    pub dialogue_lines: u32,
    pub action_lines: u32,
    /// Tagged elements referencing this scene.
    pub element_count: u32,
    pub action_heavy: bool,
    /// 0.0 to 1.0, two decimals.
    pub complexity: f64,
    /// Estimated minutes, one decimal.
    pub estimated_minutes: f64,
}

/// Compute metrics for every scene, in scene order.
pub fn compute_scene_metrics(
    scenes: &[Scene],
    elements: &[Element],
    config: &EngineConfig,
) -> Vec<SceneMetrics> {
    let mut elements_per_scene: BTreeMap<&str, u32> = BTreeMap::new();
    for element in elements {
        for key in &element.scene_keys {
            *elements_per_scene.entry(key.as_str()).or_insert(0) += 1;
        }
    }

    scenes
        .iter()
        .map(|scene| {
            let speakers: BTreeSet<&str> = scene
                .lines
                .iter()
                .filter(|l| l.role == LineRole::CharacterCue)
                .filter_map(|l| l.speaker.as_deref())
                .collect();
            let character_count = speakers.len() as u32;
            let dialogue_lines = scene.dialogue_line_count();
            let action_lines = scene.action_line_count();
            let element_count = elements_per_scene
                .get(scene.key.as_str())
                .copied()
                .unwrap_or(0);

            let total_lines = dialogue_lines + action_lines;
            let pace = if total_lines > 0 {
                action_lines as f64 / total_lines as f64
            } else {
                0.5
            };

            let complexity = complexity_score(
                scene,
                character_count,
                element_count,
                pace,
                &config.complexity,
            );
            let estimated_minutes =
                estimate_minutes(dialogue_lines, action_lines, character_count, complexity);

            SceneMetrics {
                scene_key: scene.key.clone(),
                character_count,
                dialogue_lines,
                action_lines,
                element_count,
                action_heavy: action_lines > 0 && pace >= ACTION_HEAVY_PACE,
                complexity,
                estimated_minutes,
            }
        })
        .collect()
}

/// Weighted blend of setting, character load, element load, and pace,
/// normalized so any non-negative weights land in 0-1.
fn complexity_score(
    scene: &Scene,
    characters: u32,
    elements: u32,
    pace: f64,
    weights: &ComplexityWeights,
) -> f64 {
    let setting = (location_factor(scene) + time_factor(scene.time_of_day)) / 2.0;
    let character_factor = (characters as f64 / COUNT_FACTOR_CAP).min(1.0);
    let element_factor = (elements as f64 / COUNT_FACTOR_CAP).min(1.0);

    let total_weight =
        weights.location_weight + weights.character_weight + weights.element_weight + 1.0;
    let score = (weights.location_weight * setting
        + weights.character_weight * character_factor
        + weights.element_weight * element_factor
        + pace)
        / total_weight;

    round2(score.clamp(0.0, 1.0))
}

fn location_factor(scene: &Scene) -> f64 {
    let base = match scene.int_ext {
        Some(IntExt::Int) => 0.6,
        Some(IntExt::Ext) => 0.8,
        Some(IntExt::IntExt) => 0.9,
        None => 0.5,
    };
    let boost = scene
        .location
        .as_deref()
        .map(|location| {
            let hits = COMPLEX_LOCATION_RE.find_iter(location).count() as f64;
            (hits * LOCATION_KEYWORD_BOOST).min(LOCATION_KEYWORD_BOOST_CAP)
        })
        .unwrap_or(0.0);
    (base + boost).min(1.0)
}

/// Night and low-light windows shoot slower than day.
fn time_factor(time: TimeOfDay) -> f64 {
    match time {
        TimeOfDay::Day | TimeOfDay::Afternoon => 0.5,
        TimeOfDay::Morning => 0.6,
        TimeOfDay::Evening => 0.7,
        TimeOfDay::Night | TimeOfDay::MagicHour => 1.0,
        TimeOfDay::Dawn | TimeOfDay::Dusk | TimeOfDay::Sunrise | TimeOfDay::Sunset => 0.9,
        TimeOfDay::Continuous | TimeOfDay::Later | TimeOfDay::Unknown => 0.5,
    }
}

fn estimate_minutes(dialogue_lines: u32, action_lines: u32, characters: u32, complexity: f64) -> f64 {
    let dialogue = dialogue_lines as f64 * DIALOGUE_SECONDS_PER_LINE / 60.0;
    let action = action_lines as f64 * (ACTION_BASE_SECONDS_PER_LINE * (1.0 + complexity)) / 60.0;
    let staging = (STAGING_BASE_MINUTES + STAGING_MINUTES_PER_CHARACTER * characters as f64)
        * (1.0 + complexity);
    round1((dialogue + action + staging) * (1.0 + COMPLEXITY_SLACK * complexity))
}

// ---------------------------------------------------------------------------
// Character metrics
// ---------------------------------------------------------------------------

/// Fill the derived character fields: relationship strengths first,
/// then screen time and importance (importance reads the relationship
/// count, so order matters).
pub fn finalize_characters(
    characters: &mut [Character],
    scenes: &[Scene],
    config: &EngineConfig,
) {
    compute_relationships(characters, scenes);

    let total_scenes = scenes.len();
    let total_characters = characters.len();

    for character in characters.iter_mut() {
        character.screen_time_secs = screen_time_secs(character, scenes, config);
        character.importance = importance(character, total_scenes, total_characters);
    }
}

fn compute_relationships(characters: &mut [Character], scenes: &[Scene]) {
    let names: Vec<String> = characters.iter().map(|c| c.name.clone()).collect();
    let scene_sets: Vec<BTreeSet<&str>> = characters
        .iter()
        .map(|c| c.scene_keys.iter().map(String::as_str).collect())
        .collect();
    let turns_by_scene: BTreeMap<&str, Vec<&str>> = scenes
        .iter()
        .map(|scene| (scene.key.as_str(), scene_turns(scene)))
        .collect();

    let mut strengths: Vec<(usize, usize, f64)> = Vec::new();
    for a in 0..names.len() {
        for b in a + 1..names.len() {
            let shared: Vec<&str> = scene_sets[a].intersection(&scene_sets[b]).copied().collect();
            if shared.is_empty() {
                continue;
            }
            let union_len = scene_sets[a].union(&scene_sets[b]).count();
            let co_occurrence = shared.len() as f64 / union_len as f64;

            let mut exchanges = 0u32;
            let mut possible = 0u32;
            for key in &shared {
                let Some(turns) = turns_by_scene.get(key) else {
                    continue;
                };
                for pair in turns.windows(2) {
                    if (pair[0] == names[a] && pair[1] == names[b])
                        || (pair[0] == names[b] && pair[1] == names[a])
                    {
                        exchanges += 1;
                    }
                }
                let a_turns = turns.iter().filter(|t| **t == names[a]).count() as u32;
                let b_turns = turns.iter().filter(|t| **t == names[b]).count() as u32;
                if a_turns > 0 && b_turns > 0 {
                    possible += a_turns.min(b_turns);
                }
            }
            let interaction = if possible > 0 {
                f64::from(exchanges) / f64::from(possible)
            } else {
                0.0
            };

            let strength = round2(
                RELATIONSHIP_CO_OCCURRENCE_WEIGHT * co_occurrence
                    + RELATIONSHIP_INTERACTION_WEIGHT * interaction,
            );
            if strength > 0.0 {
                strengths.push((a, b, strength));
            }
        }
    }

    for (a, b, strength) in strengths {
        characters[a].relationships.insert(names[b].clone(), strength);
        characters[b].relationships.insert(names[a].clone(), strength);
    }
}

/// Dialogue turn order for one scene: one entry per character cue.
fn scene_turns(scene: &Scene) -> Vec<&str> {
    scene
        .lines
        .iter()
        .filter(|l| l.role == LineRole::CharacterCue)
        .filter_map(|l| l.speaker.as_deref())
        .collect()
}

/// Spoken words drive screen time; scenes that only mention the
/// character in action text add a flat presence credit each.
fn screen_time_secs(character: &Character, scenes: &[Scene], config: &EngineConfig) -> f64 {
    let speaking: BTreeSet<&str> = character.scene_keys.iter().map(String::as_str).collect();
    let mentioned_only = scenes
        .iter()
        .filter(|scene| !speaking.contains(scene.key.as_str()))
        .filter(|scene| {
            scene
                .lines
                .iter()
                .filter(|l| l.role == LineRole::Action)
                .any(|l| mentions_name(&l.text, &character.name))
        })
        .count();

    round1(
        f64::from(character.word_count) * config.seconds_per_word
            + mentioned_only as f64 * config.presence_seconds,
    )
}

/// Case-insensitive whole-word search for a canonical name.
fn mentions_name(text: &str, name: &str) -> bool {
    if name.is_empty() {
        return false;
    }
    let hay = text.to_uppercase();
    let hay = hay.as_bytes();
    let needle = name.as_bytes();
    if needle.len() > hay.len() {
        return false;
    }
    for i in 0..=hay.len() - needle.len() {
        if &hay[i..i + needle.len()] != needle {
            continue;
        }
        let before_ok = i == 0 || !hay[i - 1].is_ascii_alphanumeric();
        let end = i + needle.len();
        let after_ok = end == hay.len() || !hay[end].is_ascii_alphanumeric();
        if before_ok && after_ok {
            return true;
        }
    }
    false
}

fn importance(character: &Character, total_scenes: usize, total_characters: usize) -> f64 {
    let scene_presence = if total_scenes > 0 {
        character.scene_keys.len() as f64 / total_scenes as f64
    } else {
        0.0
    };
    let dialogue_volume =
        (f64::from(character.word_count) / DIALOGUE_VOLUME_WORD_CAP).min(1.0);
    let relationship_centrality = if total_characters > 1 {
        character.relationships.len() as f64 / (total_characters - 1) as f64
    } else {
        0.0
    };
    let name_prominence = if character.scene_keys.is_empty() || total_scenes == 0 {
        0.0
    } else {
        let first = f64::from(character.first_scene_index) + 1.0;
        (1.0 - first / (total_scenes as f64 * 2.0)).max(0.0)
    };

    let score = scene_presence * IMPORTANCE_SCENE_PRESENCE
        + dialogue_volume * IMPORTANCE_DIALOGUE_VOLUME
        + relationship_centrality * IMPORTANCE_RELATIONSHIP_CENTRALITY
        + name_prominence * IMPORTANCE_NAME_PROMINENCE;

    round2(score.clamp(0.0, 1.0))
}
