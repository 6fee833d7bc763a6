//! Scene segmentation.
//!
//! Splits the classified line stream at scene headings, assigns every
//! line to exactly one scene, and derives a stable content-addressed
//! key per scene. Documents without any heading collapse into a single
//! synthetic scene so downstream stages always have at least one scene
//! to work with.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::classify::{LineRole, StructuralLine};
use crate::hashing;
use crate::heading::{self, IntExt, TimeOfDay};
use crate::normalize::SourceFormat;

/// Fingerprint used for scenes with no heading at all.
const SYNTHETIC_FINGERPRINT: &str = "synthetic";

static TITLE_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z][A-Za-z ]*):\s*(.+)$").expect("valid regex"));

/// Title-page keys recognized at the top of a Fountain document.
const TITLE_PAGE_KEYS: &[&str] = &[
    "title",
    "credit",
    "author",
    "authors",
    "source",
    "draft date",
    "date",
    "contact",
    "copyright",
    "notes",
    "revision",
];

/// One scene with its owned lines and parsed heading fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    /// Stable content-derived key; survives reordering and insertion of
    /// unrelated scenes across revisions.
    pub key: String,
    /// Explicit `#n#` scene number when present, otherwise the 1-based
    /// ordinal as a string.
    pub number: String,
    /// Heading text with forcing dot and scene number markers removed.
    /// Empty for the synthetic scene.
    pub heading: String,
    pub int_ext: Option<IntExt>,
    pub location: Option<String>,
    pub time_of_day: TimeOfDay,
    /// Unrecognized time token kept verbatim.
    pub time_of_day_raw: Option<String>,
    /// True when the document had no headings and all content was
    /// gathered into one fallback scene.
    pub synthetic: bool,
    /// Source line number of the heading; first content line for the
    /// synthetic scene.
    pub heading_line: u32,
    pub page_start: u32,
    pub page_end: u32,
    pub lines: Vec<StructuralLine>,
}

impl Scene {
    /// Dialogue lines in this scene.
    pub fn dialogue_line_count(&self) -> u32 {
        self.lines
            .iter()
            .filter(|l| l.role == LineRole::Dialogue)
            .count() as u32
    }

    /// Action lines in this scene.
    pub fn action_line_count(&self) -> u32 {
        self.lines
            .iter()
            .filter(|l| l.role == LineRole::Action)
            .count() as u32
    }
}

/// Segmentation output: scenes in document order plus any title-page
/// metadata collected from the document head.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segmented {
    pub scenes: Vec<Scene>,
    pub metadata: BTreeMap<String, String>,
}

/// Split classified lines into scenes.
///
/// Title-page `Key: Value` lines at the top of a Fountain document are
/// lifted into metadata. Remaining preamble before the first heading
/// (e.g. `FADE IN:`) belongs to no scene and is dropped, unless the
/// document has no headings at all, in which case everything lands in a
/// single synthetic scene.
pub fn segment_scenes(format: SourceFormat, lines: Vec<StructuralLine>) -> Segmented {
    let mut metadata = BTreeMap::new();

    let mut rest: &[StructuralLine] = &lines;
    if format == SourceFormat::Fountain {
        let consumed = parse_title_page(rest, &mut metadata);
        rest = &rest[consumed..];
    }

    let has_heading = rest.iter().any(|l| l.role == LineRole::SceneHeading);
    if !has_heading {
        let scenes = if rest.is_empty() {
            Vec::new()
        } else {
            vec![synthetic_scene(rest.to_vec())]
        };
        return Segmented { scenes, metadata };
    }

    let mut drafts: Vec<SceneDraft> = Vec::new();
    for line in rest {
        if line.role == LineRole::SceneHeading {
            drafts.push(SceneDraft::open(line));
        } else if let Some(current) = drafts.last_mut() {
            current.lines.push(line.clone());
        }
        // Preamble lines before the first heading fall through.
    }

    let mut fingerprint_counts: BTreeMap<String, u32> = BTreeMap::new();
    let scenes = drafts
        .into_iter()
        .enumerate()
        .map(|(i, draft)| draft.seal(i, &mut fingerprint_counts))
        .collect();

    Segmented { scenes, metadata }
}

/// Consume leading title-page lines, returning how many were taken.
fn parse_title_page(lines: &[StructuralLine], metadata: &mut BTreeMap<String, String>) -> usize {
    let mut consumed = 0;
    for line in lines {
        if line.role != LineRole::Action {
            break;
        }
        let Some(caps) = TITLE_KEY_RE.captures(&line.text) else {
            break;
        };
        let key = caps[1].trim().to_lowercase();
        if !TITLE_PAGE_KEYS.contains(&key.as_str()) {
            break;
        }
        metadata.insert(key, caps[2].trim().to_string());
        consumed += 1;
    }
    consumed
}

fn synthetic_scene(lines: Vec<StructuralLine>) -> Scene {
    let page_start = lines.first().map(|l| l.page).unwrap_or(1);
    let page_end = lines.last().map(|l| l.page).unwrap_or(page_start);
    let heading_line = lines.first().map(|l| l.number).unwrap_or(1);
    Scene {
        key: hashing::scene_key(SYNTHETIC_FINGERPRINT, 0),
        number: "1".to_string(),
        heading: String::new(),
        int_ext: None,
        location: None,
        time_of_day: TimeOfDay::Unknown,
        time_of_day_raw: None,
        synthetic: true,
        heading_line,
        page_start,
        page_end,
        lines,
    }
}

/// Scene under construction while scanning the line stream.
struct SceneDraft {
    heading_line: StructuralLine,
    lines: Vec<StructuralLine>,
}

impl SceneDraft {
    fn open(heading_line: &StructuralLine) -> Self {
        Self {
            heading_line: heading_line.clone(),
            lines: Vec::new(),
        }
    }

    fn seal(self, index: usize, fingerprint_counts: &mut BTreeMap<String, u32>) -> Scene {
        let parts = heading::parse_heading(&self.heading_line.text);
        let fingerprint = scene_fingerprint(&parts);
        let ordinal = {
            let counter = fingerprint_counts.entry(fingerprint.clone()).or_insert(0);
            let current = *counter;
            *counter += 1;
            current
        };
        let number = parts
            .scene_number
            .clone()
            .unwrap_or_else(|| (index + 1).to_string());
        let page_start = self.heading_line.page;
        let page_end = self.lines.last().map(|l| l.page).unwrap_or(page_start);

        Scene {
            key: hashing::scene_key(&fingerprint, ordinal),
            number,
            heading: parts.text.clone(),
            int_ext: parts.int_ext,
            location: parts.location.clone(),
            time_of_day: parts.time_of_day,
            time_of_day_raw: parts.time_raw.clone(),
            synthetic: false,
            heading_line: self.heading_line.number,
            page_start,
            page_end,
            lines: self.lines,
        }
    }
}

/// Identity of a scene independent of its position in the document:
/// INT/EXT marker, normalized location, and time of day. Scenes sharing
/// a fingerprint are disambiguated by their order of appearance.
fn scene_fingerprint(parts: &heading::HeadingParts) -> String {
    let int_ext = parts.int_ext.map(|ie| ie.as_str()).unwrap_or("");
    let location = parts
        .location
        .as_deref()
        .map(heading::normalize_location)
        .unwrap_or_default();
    format!("{int_ext}|{location}|{}", parts.time_of_day.as_str())
}
