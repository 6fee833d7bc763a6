//! Structural line classification.
//!
//! A line-by-line state machine assigns each non-blank line one of the
//! structural roles, with deterministic precedence when signals
//! conflict: heading, transition, parenthetical, character cue,
//! dialogue, action. Lines the machine cannot commit to become
//! `Unknown` (stray parentheticals) or carry a review annotation
//! (cue-shaped lines with no dialogue following); ambiguity is always
//! surfaced, never silently resolved.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::Issue;
use crate::heading;
use crate::normalize::{is_page_break, RawLine};

/// Longest line that can still be a character cue.
const MAX_CUE_LEN: usize = 40;
/// Longest line that can still be a transition.
const MAX_TRANSITION_LEN: usize = 30;

static TRANSITION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(FADE|CUT|DISSOLVE|SMASH|WIPE|IRIS|JUMP)\b").expect("valid regex")
});

/// Cue shape: uppercase name, optional parenthetical extension such as
/// `(V.O.)` or `(CONT'D)`, optional dual-dialogue caret.
static CUE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<name>[A-Z0-9][A-Z0-9 .'\-&]*?)(?:\s*\((?P<ext>[^)]*)\))?\s*(?P<dual>\^)?$")
        .expect("valid regex")
});

/// Structural role of a classified line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineRole {
    SceneHeading,
    CharacterCue,
    Dialogue,
    Parenthetical,
    Action,
    Transition,
    Unknown,
}

impl LineRole {
    /// String representation for display, logging, and serialized output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SceneHeading => "scene_heading",
            Self::CharacterCue => "character_cue",
            Self::Dialogue => "dialogue",
            Self::Parenthetical => "parenthetical",
            Self::Action => "action",
            Self::Transition => "transition",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for LineRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Low-confidence annotation on a line whose classification could not
/// be committed. The annotation travels with the line; it is never a
/// silent reclassification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewFlag {
    /// Cue-shaped upper-case line with no dialogue following. Pending a
    /// person-name check against the analysis service.
    PossibleCue,
    /// The analysis service confirmed a person-name signal but there is
    /// still no dialogue; kept as action for human review.
    LikelyName,
}

/// One classified line. `speaker` stays `None` until the attribution
/// stage fills it on cue, dialogue, and parenthetical lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralLine {
    /// 1-based source line number.
    pub number: u32,
    pub page: u32,
    pub indent: u16,
    pub role: LineRole,
    pub text: String,
    /// Canonical speaker name.
    pub speaker: Option<String>,
    /// Set on a character cue that opens a simultaneous dialogue track.
    pub dual: bool,
    pub review: Option<ReviewFlag>,
}

/// Components of a cue-shaped line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CueShape<'a> {
    pub name: &'a str,
    pub extension: Option<&'a str>,
    pub dual: bool,
}

/// Parse a line as a character cue shape, without the follow-up check.
pub fn cue_shape(text: &str) -> Option<CueShape<'_>> {
    if text.len() > MAX_CUE_LEN || text.starts_with('!') {
        return None;
    }
    let caps = CUE_RE.captures(text)?;
    let name = caps.name("name")?.as_str();
    // Digits alone ("42") or punctuation runs are not names.
    if !name.chars().any(|c| c.is_ascii_uppercase()) {
        return None;
    }
    Some(CueShape {
        name,
        extension: caps.name("ext").map(|m| m.as_str()),
        dual: caps.name("dual").is_some(),
    })
}

/// True for short upper-case transition lines (`CUT TO:`, `FADE OUT.`).
pub fn is_transition(text: &str) -> bool {
    if text.len() > MAX_TRANSITION_LEN || text.chars().any(|c| c.is_lowercase()) {
        return false;
    }
    TRANSITION_RE.is_match(text) || text.ends_with("TO:")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DialogueState {
    /// Outside any dialogue block.
    Normal,
    /// Directly after a character cue.
    AfterCue,
    /// Inside a dialogue block.
    InDialogue,
}

/// Classify every non-blank line. Blank lines and page-break markers
/// produce no structural line; blanks end the active dialogue block.
///
/// Returns the classified lines plus issues for lines kept as
/// `Unknown`.
pub fn classify_lines(raw: &[RawLine]) -> (Vec<StructuralLine>, Vec<Issue>) {
    let mut out = Vec::with_capacity(raw.len());
    let mut issues = Vec::new();
    let mut state = DialogueState::Normal;

    for (i, line) in raw.iter().enumerate() {
        let text = line.text.as_str();

        if text.is_empty() {
            state = DialogueState::Normal;
            continue;
        }
        if is_page_break(text) {
            continue;
        }

        let (role, stored_text, dual, review) = classify_one(text, state, raw, i);

        match role {
            LineRole::SceneHeading | LineRole::Transition => state = DialogueState::Normal,
            LineRole::CharacterCue => state = DialogueState::AfterCue,
            LineRole::Dialogue | LineRole::Parenthetical => state = DialogueState::InDialogue,
            LineRole::Action | LineRole::Unknown => state = DialogueState::Normal,
        }

        if role == LineRole::Unknown {
            issues.push(Issue::ambiguous_structure(
                line.number,
                format!("could not classify: {text:?}"),
            ));
        }

        out.push(StructuralLine {
            number: line.number,
            page: line.page,
            indent: line.indent,
            role,
            text: stored_text,
            speaker: None,
            dual,
            review,
        });
    }

    (out, issues)
}

/// Role decision for a single non-blank line.
fn classify_one(
    text: &str,
    state: DialogueState,
    raw: &[RawLine],
    index: usize,
) -> (LineRole, String, bool, Option<ReviewFlag>) {
    if heading::is_heading(text) {
        return (LineRole::SceneHeading, text.to_string(), false, None);
    }
    if is_transition(text) {
        return (LineRole::Transition, text.to_string(), false, None);
    }

    if text.starts_with('(') && text.ends_with(')') {
        return if state != DialogueState::Normal {
            (LineRole::Parenthetical, text.to_string(), false, None)
        } else {
            // A parenthetical needs a speaker context to belong to.
            (LineRole::Unknown, text.to_string(), false, None)
        };
    }

    if let Some(forced) = text.strip_prefix('!') {
        // Fountain forced action; the bang is markup, not content.
        return (LineRole::Action, forced.trim_start().to_string(), false, None);
    }

    if state == DialogueState::Normal {
        if let Some(shape) = cue_shape(text) {
            return if has_dialogue_followup(raw, index) {
                (LineRole::CharacterCue, text.to_string(), shape.dual, None)
            } else {
                // Cue-shaped but nothing speaks: keep as action and
                // surface the ambiguity for the person-name check.
                (
                    LineRole::Action,
                    text.to_string(),
                    false,
                    Some(ReviewFlag::PossibleCue),
                )
            };
        }
        return (LineRole::Action, text.to_string(), false, None);
    }

    (LineRole::Dialogue, text.to_string(), false, None)
}

/// A cue is only a cue when the immediately following line (page breaks
/// transparent) exists, is non-blank, and is not a heading/transition.
fn has_dialogue_followup(raw: &[RawLine], index: usize) -> bool {
    let mut j = index + 1;
    while j < raw.len() && is_page_break(&raw[j].text) {
        j += 1;
    }
    match raw.get(j) {
        None => false,
        Some(next) => {
            let text = next.text.as_str();
            !text.is_empty() && !heading::is_heading(text) && !is_transition(text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IssueKind;

    fn raw_lines(texts: &[&str]) -> Vec<RawLine> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| RawLine {
                number: (i + 1) as u32,
                page: 1,
                indent: t.len() as u16 - t.trim_start().len() as u16,
                text: t.trim().to_string(),
            })
            .collect()
    }

    fn roles(lines: &[StructuralLine]) -> Vec<LineRole> {
        lines.iter().map(|l| l.role).collect()
    }

    // -- headings and transitions -------------------------------------------

    #[test]
    fn headings_win_regardless_of_indentation() {
        let raw = raw_lines(&["        INT. KITCHEN - DAY"]);
        let (lines, _) = classify_lines(&raw);
        assert_eq!(lines[0].role, LineRole::SceneHeading);
    }

    #[test]
    fn uppercase_transitions_are_recognized() {
        let raw = raw_lines(&["CUT TO:", "SMASH CUT TO:", "FADE OUT."]);
        let (lines, _) = classify_lines(&raw);
        assert_eq!(
            roles(&lines),
            vec![LineRole::Transition, LineRole::Transition, LineRole::Transition]
        );
    }

    #[test]
    fn lowercase_prose_starting_with_cut_is_action() {
        let raw = raw_lines(&["Cut flowers sit in a vase."]);
        let (lines, _) = classify_lines(&raw);
        assert_eq!(lines[0].role, LineRole::Action);
    }

    // -- character cues -------------------------------------------------------

    #[test]
    fn cue_followed_by_dialogue_is_a_cue() {
        let raw = raw_lines(&["JOHN", "I can explain everything."]);
        let (lines, _) = classify_lines(&raw);
        assert_eq!(roles(&lines), vec![LineRole::CharacterCue, LineRole::Dialogue]);
    }

    #[test]
    fn cue_with_extension_and_caret() {
        let raw = raw_lines(&["MARY (V.O.) ^", "Speaking over John."]);
        let (lines, _) = classify_lines(&raw);
        assert_eq!(lines[0].role, LineRole::CharacterCue);
        assert!(lines[0].dual);
    }

    #[test]
    fn cue_shape_without_followup_becomes_flagged_action() {
        let raw = raw_lines(&["Anna stares at the door.", "", "THE END"]);
        let (lines, _) = classify_lines(&raw);
        assert_eq!(lines[1].role, LineRole::Action);
        assert_eq!(lines[1].review, Some(ReviewFlag::PossibleCue));
    }

    #[test]
    fn cue_followed_by_heading_is_not_a_cue() {
        let raw = raw_lines(&["BANG", "INT. VAULT - NIGHT"]);
        let (lines, _) = classify_lines(&raw);
        assert_eq!(lines[0].role, LineRole::Action);
        assert_eq!(lines[0].review, Some(ReviewFlag::PossibleCue));
    }

    #[test]
    fn digits_alone_are_not_a_cue() {
        let raw = raw_lines(&["42", "is painted on the door."]);
        let (lines, _) = classify_lines(&raw);
        assert_eq!(lines[0].role, LineRole::Action);
        assert_eq!(lines[0].review, None);
    }

    #[test]
    fn forced_action_bang_is_stripped() {
        let raw = raw_lines(&["!LOUD KNOCKING", "Nobody moves."]);
        let (lines, _) = classify_lines(&raw);
        assert_eq!(lines[0].role, LineRole::Action);
        assert_eq!(lines[0].text, "LOUD KNOCKING");
        assert_eq!(lines[0].review, None);
    }

    // -- dialogue blocks -------------------------------------------------------

    #[test]
    fn dialogue_continues_until_blank_line() {
        let raw = raw_lines(&["JOHN", "First line.", "Second line.", "", "He waves."]);
        let (lines, _) = classify_lines(&raw);
        assert_eq!(
            roles(&lines),
            vec![
                LineRole::CharacterCue,
                LineRole::Dialogue,
                LineRole::Dialogue,
                LineRole::Action,
            ]
        );
    }

    #[test]
    fn parenthetical_inside_dialogue_block() {
        let raw = raw_lines(&["JOHN", "(whispering)", "Not here.", "(beat)", "Not now."]);
        let (lines, _) = classify_lines(&raw);
        assert_eq!(
            roles(&lines),
            vec![
                LineRole::CharacterCue,
                LineRole::Parenthetical,
                LineRole::Dialogue,
                LineRole::Parenthetical,
                LineRole::Dialogue,
            ]
        );
    }

    #[test]
    fn stray_parenthetical_is_unknown_and_flagged() {
        let raw = raw_lines(&["He sits.", "", "(a long silence)"]);
        let (lines, issues) = classify_lines(&raw);
        assert_eq!(lines[1].role, LineRole::Unknown);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::AmbiguousStructure);
        assert_eq!(issues[0].line, Some(3));
    }

    // -- page breaks -------------------------------------------------------------

    #[test]
    fn page_breaks_produce_no_structural_line() {
        let raw = raw_lines(&["He runs.", "===", "She follows."]);
        let (lines, _) = classify_lines(&raw);
        assert_eq!(lines.len(), 2);
        assert_eq!(roles(&lines), vec![LineRole::Action, LineRole::Action]);
    }

    #[test]
    fn cue_sees_through_page_break_for_followup() {
        let raw = raw_lines(&["JOHN", "===", "Look at this."]);
        let (lines, _) = classify_lines(&raw);
        assert_eq!(lines[0].role, LineRole::CharacterCue);
        assert_eq!(lines[1].role, LineRole::Dialogue);
    }
}
