//! Offline analyzer with deterministic heuristics.
//!
//! [`StubAnalyzer`] stands in when no analysis service is configured.
//! It tags tokens with a coarse part of speech and guesses entity
//! spans from capitalization shape. The guesses are crude next to a
//! real NER model, but they are deterministic, which keeps offline
//! parses and tests reproducible.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use crate::analyzer::Analyzer;
use crate::api::{Analysis, EntityLabel, EntitySpan, Token};
use crate::error::AnalysisError;

/// Words that appear uppercase in running text without naming anyone.
const CAPS_STOPLIST: &[&str] = &[
    "AN", "AND", "AT", "BUT", "CUT", "END", "FADE", "IN", "OF", "OK", "ON", "OR", "THE", "TO",
    "TV",
];

/// Trailing words that mark a capitalized run as a place name.
const PLACE_SUFFIXES: &[&str] = &[
    "Alley", "Avenue", "Bar", "Beach", "Boulevard", "Bridge", "Building", "Cafe", "Diner",
    "Drive", "Hall", "Hotel", "House", "Lane", "Park", "Plaza", "Road", "Square", "Station",
    "Street", "Tower",
];

/// Lowercase closed-class words for POS tagging.
const CLOSED_CLASS: &[&str] = &[
    "a", "an", "and", "as", "at", "but", "by", "for", "from", "in", "into", "of", "on", "or",
    "the", "to", "with",
];

static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z][A-Za-z'’.-]*").expect("valid regex"));

/// Deterministic offline analyzer.
#[derive(Debug, Clone, Copy, Default)]
pub struct StubAnalyzer;

#[async_trait]
impl Analyzer for StubAnalyzer {
    async fn analyze(&self, text: &str) -> Result<Analysis, AnalysisError> {
        Ok(analyze_text(text))
    }
}

// ---------------------------------------------------------------------------
// Heuristics
// ---------------------------------------------------------------------------

/// Capitalization shape of one word.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Shape {
    /// Two or more letters, none lowercase (`ANNA`, `O.S.`).
    Caps,
    /// Leading uppercase with lowercase after it (`Anna`).
    Cap,
    /// Everything else.
    Plain,
}

fn shape_of(word: &str) -> Shape {
    let upper = word.chars().filter(char::is_ascii_uppercase).count();
    let lower = word.chars().filter(char::is_ascii_lowercase).count();
    if lower == 0 && upper >= 2 {
        Shape::Caps
    } else if lower > 0 && word.starts_with(|c: char| c.is_ascii_uppercase()) {
        Shape::Cap
    } else {
        Shape::Plain
    }
}

fn pos_tag(word: &str) -> &'static str {
    let lower = word.to_ascii_lowercase();
    if CLOSED_CLASS.contains(&lower.as_str()) {
        "ADP"
    } else if word.starts_with(|c: char| c.is_ascii_uppercase()) {
        "PROPN"
    } else {
        "NOUN"
    }
}

/// True when only whitespace separates `start` from the text start, a
/// sentence terminator, or a line break.
fn is_sentence_start(text: &str, start: usize) -> bool {
    let head = text[..start].trim_end_matches([' ', '\t']);
    matches!(head.as_bytes().last(), None | Some(b'.' | b'!' | b'?' | b'\n'))
}

fn article_precedes(text: &str, start: usize) -> bool {
    let head = &text[..start];
    ["the ", "a ", "an "].iter().any(|art| head.ends_with(art))
}

fn label_for_run(text: &str, start: usize, run: &[&str], shape: Shape) -> Option<EntityLabel> {
    if shape == Shape::Caps {
        // Uppercase runs are speaker or intro names unless every word
        // is ordinary connective text ("THE END", "FADE TO").
        if run
            .iter()
            .all(|w| CAPS_STOPLIST.contains(&w.trim_end_matches(['.', ','])))
        {
            return None;
        }
        return Some(EntityLabel::Person);
    }
    // Single capitalized words opening a sentence are usually just
    // ordinary vocabulary.
    if run.len() == 1 && is_sentence_start(text, start) {
        return None;
    }
    let last = run
        .last()
        .map(|w| w.trim_end_matches(['.', ',', '\'', '’']))?;
    if PLACE_SUFFIXES.contains(&last) {
        return Some(EntityLabel::Loc);
    }
    if article_precedes(text, start) {
        return Some(EntityLabel::Product);
    }
    Some(EntityLabel::Person)
}

fn analyze_text(text: &str) -> Analysis {
    let words: Vec<(usize, usize, &str)> = WORD_RE
        .find_iter(text)
        .map(|m| (m.start(), m.end(), m.as_str()))
        .collect();

    let tokens = words
        .iter()
        .map(|&(start, _, word)| Token {
            text: word.to_string(),
            start,
            pos: pos_tag(word).to_string(),
        })
        .collect();

    let mut entities = Vec::new();
    let mut i = 0;
    while i < words.len() {
        let shape = shape_of(words[i].2);
        if shape == Shape::Plain {
            i += 1;
            continue;
        }
        // Grow the run over same-shaped words separated by one space.
        let mut j = i;
        while j + 1 < words.len()
            && shape_of(words[j + 1].2) == shape
            && words[j + 1].0 == words[j].1 + 1
            && text.as_bytes().get(words[j].1) == Some(&b' ')
        {
            j += 1;
        }
        let start = words[i].0;
        let mut end = words[j].1;
        // Sentence punctuation glued to the last word is not entity text.
        while end > start && matches!(text.as_bytes()[end - 1], b'.' | b',') {
            end -= 1;
        }
        let run: Vec<&str> = words[i..=j].iter().map(|w| w.2).collect();
        if let Some(label) = label_for_run(text, start, &run, shape) {
            entities.push(EntitySpan {
                label,
                text: text[start..end].to_string(),
                start,
                end,
            });
        }
        i = j + 1;
    }

    Analysis { tokens, entities }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
