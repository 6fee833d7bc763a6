//! Production-element lexicons.
//!
//! Curated keyword tables and shallow patterns that pull props,
//! wardrobe, vehicles, and effects out of a single line of script
//! text. These matches are deterministic and carry higher confidence
//! than entity-analysis candidates; merging and scoring happen in the
//! tagging stage.

use std::sync::LazyLock;

use regex::Regex;

use crate::tag::ElementCategory;

/// Shortest and longest phrase a pattern capture may produce.
const MIN_PHRASE_LEN: usize = 2;
const MAX_PHRASE_LEN: usize = 30;

static VEHICLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(car|truck|bus|motorcycle|bike|bicycle|suv|van|taxi|boat|ship|plane|helicopter|jet|train)s?\b",
    )
    .expect("valid regex")
});

static WEAPON_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(gun|pistol|rifle|shotgun|knife|sword|blade|revolver|grenade|bomb|holster)s?\b")
        .expect("valid regex")
});

static EFFECT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(practical effect|makeup effect|slow motion|explosion|explodes|exploding|fire|smoke|rain|storm|lightning|thunder|earthquake|crash|crashes|shatter|shatters|shattering|blood|bleeding|gunshot|shoots|shooting|fight|fighting|stunt|falls|falling|jumps|jumping|vfx|cgi|timelapse|prosthetic|animatronic|pyrotechnic)\b",
    )
    .expect("valid regex")
});

/// Handling verb followed by a capitalized phrase, the convention for
/// introducing a prop in action text.
static PROP_HANDLING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:holding|holds|carrying|carries|picks up|grabs|takes|puts down|drops|clutches|brandishes|draws|lifts|examines)\s+(?:(?:a|an|the|his|her|their)\s+)?([A-Z][A-Za-z'\-]*(?:\s+[A-Z][A-Za-z'\-]*)*)",
    )
    .expect("valid regex")
});

/// Article plus capitalized phrase followed by a placement verb.
static PROP_PLACEMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:a|an|the|A|An|The)\s+([A-Z][A-Za-z'\-]*(?:\s+[A-Z][A-Za-z'\-]*)*)\s+(?:sits|rests|lies|stands|hangs|gleams)\b",
    )
    .expect("valid regex")
});

static WARDROBE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:wearing|wears|dressed in|dons|donning|changes into)\s+(?:(?:a|an|the|his|her|their)\s+)?((?:[a-z'\-]+\s+){0,3}?(?:jacket|shirt|dress|suit|pants|skirt|hat|coat|sweater|blouse|shoes|boots|uniform|costume|outfit))s?\b",
    )
    .expect("valid regex")
});

/// Generic people words that a prop pattern must never capture.
const PROP_STOP_WORDS: &[&str] = &[
    "man", "woman", "boy", "girl", "person", "friend", "mother", "father", "child", "children",
    "people", "group", "crowd", "audience", "everyone", "anybody", "somebody", "man's", "woman's",
    "guy", "guys",
];

/// Words that end a captured capitalized phrase.
const PHRASE_CONNECTIVES: &[&str] = &[
    "a", "an", "the", "and", "or", "of", "to", "with", "at", "on", "in",
];

/// One lexicon hit on a line of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexiconMatch {
    pub category: ElementCategory,
    pub label: String,
}

/// Scan one line of script text against every lexicon. Matches are
/// deduplicated by category and case-folded label within the line.
pub fn scan(text: &str) -> Vec<LexiconMatch> {
    let mut out: Vec<LexiconMatch> = Vec::new();

    for caps in VEHICLE_RE.captures_iter(text) {
        push_unique(&mut out, ElementCategory::Vehicle, vehicle_label(&caps[1]));
    }

    for caps in WEAPON_RE.captures_iter(text) {
        push_unique(&mut out, ElementCategory::Prop, title_case(&caps[1]));
    }

    for caps in EFFECT_RE.captures_iter(text) {
        push_unique(&mut out, ElementCategory::Effect, effect_label(&caps[1]));
    }

    for caps in PROP_HANDLING_RE.captures_iter(text) {
        if let Some(label) = prop_phrase(&caps[1]) {
            push_unique(&mut out, ElementCategory::Prop, label);
        }
    }
    for caps in PROP_PLACEMENT_RE.captures_iter(text) {
        if let Some(label) = prop_phrase(&caps[1]) {
            push_unique(&mut out, ElementCategory::Prop, label);
        }
    }

    for caps in WARDROBE_RE.captures_iter(text) {
        let label = title_case(&caps[1]);
        if label.len() >= MIN_PHRASE_LEN {
            push_unique(&mut out, ElementCategory::Wardrobe, label);
        }
    }

    out
}

fn push_unique(out: &mut Vec<LexiconMatch>, category: ElementCategory, label: String) {
    let folded = label.to_lowercase();
    if !out
        .iter()
        .any(|m| m.category == category && m.label.to_lowercase() == folded)
    {
        out.push(LexiconMatch { category, label });
    }
}

/// Trim a captured capitalized phrase at the first connective word,
/// then reject generic people words and out-of-range lengths.
fn prop_phrase(capture: &str) -> Option<String> {
    let words: Vec<&str> = capture
        .split_whitespace()
        .take_while(|w| !PHRASE_CONNECTIVES.contains(&w.to_lowercase().as_str()))
        .collect();
    let first = words.first()?.to_lowercase();
    if PROP_STOP_WORDS.contains(&first.as_str()) {
        return None;
    }
    let phrase = words.join(" ");
    if phrase.len() < MIN_PHRASE_LEN || phrase.len() > MAX_PHRASE_LEN {
        return None;
    }
    Some(title_case(&phrase))
}

fn vehicle_label(keyword: &str) -> String {
    let lower = keyword.to_lowercase();
    if lower == "suv" {
        "SUV".to_string()
    } else {
        title_case(&lower)
    }
}

fn effect_label(keyword: &str) -> String {
    let lower = keyword.to_lowercase();
    if lower.ends_with("effect") {
        title_case(&lower)
    } else {
        format!("{} Effect", title_case(&lower))
    }
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(matches: &[LexiconMatch], category: ElementCategory) -> Vec<String> {
        matches
            .iter()
            .filter(|m| m.category == category)
            .map(|m| m.label.clone())
            .collect()
    }

    // -- vehicles -------------------------------------------------------------

    #[test]
    fn vehicle_keywords_match_with_plurals() {
        let matches = scan("Two cars screech past the taxi rank.");
        let vehicles = labels(&matches, ElementCategory::Vehicle);
        assert!(vehicles.contains(&"Car".to_string()));
        assert!(vehicles.contains(&"Taxi".to_string()));
    }

    #[test]
    fn suv_keeps_its_capitalization() {
        let matches = scan("A black SUV idles at the curb.");
        assert_eq!(labels(&matches, ElementCategory::Vehicle), vec!["SUV"]);
    }

    #[test]
    fn embedded_words_do_not_match() {
        let matches = scan("She adjusts her scarf and carpets the floor.");
        assert!(labels(&matches, ElementCategory::Vehicle).is_empty());
    }

    // -- weapons and props ------------------------------------------------------

    #[test]
    fn weapon_terms_become_props() {
        let matches = scan("He levels the shotgun.");
        assert_eq!(labels(&matches, ElementCategory::Prop), vec!["Shotgun"]);
    }

    #[test]
    fn handling_verb_with_capitalized_phrase_is_a_prop() {
        let matches = scan("Anna picks up the BRASS KEY and turns it over.");
        assert_eq!(labels(&matches, ElementCategory::Prop), vec!["Brass Key"]);
    }

    #[test]
    fn placement_pattern_is_a_prop() {
        let matches = scan("A Polaroid sits on the dresser.");
        assert_eq!(labels(&matches, ElementCategory::Prop), vec!["Polaroid"]);
    }

    #[test]
    fn people_words_are_never_props() {
        let matches = scan("He grabs the Man's arm.");
        assert!(labels(&matches, ElementCategory::Prop).is_empty());
    }

    // -- wardrobe ---------------------------------------------------------------

    #[test]
    fn wearing_pattern_captures_the_garment_phrase() {
        let matches = scan("She enters wearing a red leather jacket.");
        assert_eq!(
            labels(&matches, ElementCategory::Wardrobe),
            vec!["Red Leather Jacket"]
        );
    }

    #[test]
    fn garment_word_without_verb_context_is_ignored() {
        let matches = scan("The jacket question can wait.");
        assert!(labels(&matches, ElementCategory::Wardrobe).is_empty());
    }

    // -- effects ----------------------------------------------------------------

    #[test]
    fn effect_keywords_get_effect_labels() {
        let matches = scan("The explosion fills the frame with smoke.");
        let effects = labels(&matches, ElementCategory::Effect);
        assert!(effects.contains(&"Explosion Effect".to_string()));
        assert!(effects.contains(&"Smoke Effect".to_string()));
    }

    #[test]
    fn effect_suffix_is_not_doubled() {
        let matches = scan("A practical effect hides the cut.");
        assert_eq!(
            labels(&matches, ElementCategory::Effect),
            vec!["Practical Effect"]
        );
    }

    // -- dedup ------------------------------------------------------------------

    #[test]
    fn repeats_within_a_line_collapse() {
        let matches = scan("Fire spreads to more fire.");
        assert_eq!(labels(&matches, ElementCategory::Effect), vec!["Fire Effect"]);
    }
}
