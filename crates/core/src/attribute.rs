//! Speaker attribution.
//!
//! Walks each scene's lines, canonicalizes character cues, and carries
//! the active speaker forward onto dialogue and parenthetical lines.
//! The active speaker never crosses a scene boundary and is dropped by
//! any intervening action, transition, or unknown line.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::classify::LineRole;
use crate::segment::Scene;
use crate::types::SceneKey;

/// A character cue with presentation markers separated from the name.
/// `JOHN (CONT'D) ^` and `JOHN (V.O.)` both canonicalize to `JOHN`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CueName {
    pub canonical: String,
    pub continued: bool,
    pub voice_over: bool,
    pub off_screen: bool,
    pub dual: bool,
}

/// Strip dual-dialogue carets, parenthetical extensions, and trailing
/// punctuation from a cue, uppercasing what remains.
pub fn canonicalize_cue(text: &str) -> CueName {
    let mut rest = text.trim();
    let mut continued = false;
    let mut voice_over = false;
    let mut off_screen = false;
    let mut dual = false;

    if let Some(stripped) = rest.strip_suffix('^') {
        rest = stripped.trim_end();
        dual = true;
    }

    // Peel trailing extension groups; a cue may carry several.
    while rest.ends_with(')') {
        let Some(open) = rest.rfind('(') else { break };
        let ext: String = rest[open + 1..rest.len() - 1]
            .chars()
            .filter(|c| !matches!(c, '.' | '\'' | '\u{2019}' | ' '))
            .collect::<String>()
            .to_uppercase();
        match ext.as_str() {
            "CONTD" | "CONTINUED" => continued = true,
            "VO" => voice_over = true,
            "OS" | "OC" => off_screen = true,
            // Performance notes like "(into phone)" carry no identity.
            _ => {}
        }
        rest = rest[..open].trim_end();
    }

    let canonical = rest
        .trim_end_matches(['.', ':', ','])
        .trim()
        .to_uppercase();

    CueName {
        canonical,
        continued,
        voice_over,
        off_screen,
        dual,
    }
}

/// A speaking character accumulated across the whole document. The
/// derived fields (`screen_time_secs`, `importance`, `relationships`)
/// start at zero and are filled by the metrics stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    /// Canonical upper-case name.
    pub name: String,
    /// Raw cue spellings that mapped to this name.
    pub aliases: BTreeSet<String>,
    pub dialogue_lines: u32,
    pub word_count: u32,
    /// Scenes in which this character speaks, in document order.
    pub scene_keys: Vec<SceneKey>,
    /// 0-based index of the first scene with a cue for this character.
    pub first_scene_index: u32,
    pub screen_time_secs: f64,
    pub importance: f64,
    /// Co-occurrence strength per other character name, 0.0 to 1.0.
    pub relationships: BTreeMap<String, f64>,
}

impl Character {
    fn new(name: String, first_scene_index: u32) -> Self {
        Self {
            name,
            aliases: BTreeSet::new(),
            dialogue_lines: 0,
            word_count: 0,
            scene_keys: Vec::new(),
            first_scene_index,
            screen_time_secs: 0.0,
            importance: 0.0,
            relationships: BTreeMap::new(),
        }
    }

    /// Number of scenes in which this character speaks.
    pub fn scene_count(&self) -> u32 {
        self.scene_keys.len() as u32
    }
}

/// Attribute every dialogue and parenthetical line to its speaker and
/// build the character registry. Cue lines also receive their own
/// canonical speaker so downstream turn analysis does not re-parse cue
/// text. Returns characters sorted by name.
pub fn attribute_speakers(scenes: &mut [Scene]) -> Vec<Character> {
    let mut registry: BTreeMap<String, Character> = BTreeMap::new();

    for (scene_index, scene) in scenes.iter_mut().enumerate() {
        let mut current: Option<String> = None;

        for line in &mut scene.lines {
            match line.role {
                LineRole::CharacterCue => {
                    let cue = canonicalize_cue(&line.text);
                    if cue.canonical.is_empty() {
                        current = None;
                        continue;
                    }
                    let character = registry
                        .entry(cue.canonical.clone())
                        .or_insert_with(|| {
                            Character::new(cue.canonical.clone(), scene_index as u32)
                        });
                    let raw = line.text.trim();
                    if raw != cue.canonical {
                        character.aliases.insert(raw.to_string());
                    }
                    if character.scene_keys.last() != Some(&scene.key) {
                        character.scene_keys.push(scene.key.clone());
                    }
                    line.speaker = Some(cue.canonical.clone());
                    current = Some(cue.canonical);
                }
                LineRole::Dialogue => {
                    if let Some(name) = &current {
                        line.speaker = Some(name.clone());
                        if let Some(character) = registry.get_mut(name) {
                            character.dialogue_lines += 1;
                            character.word_count +=
                                line.text.split_whitespace().count() as u32;
                        }
                    }
                }
                LineRole::Parenthetical => {
                    line.speaker.clone_from(&current);
                }
                LineRole::SceneHeading
                | LineRole::Action
                | LineRole::Transition
                | LineRole::Unknown => {
                    current = None;
                }
            }
        }
    }

    registry.into_values().collect()
}
