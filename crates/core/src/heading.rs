//! Scene-heading (slugline) grammar.
//!
//! Headings look like `INT. KITCHEN - DAY`: an interior/exterior token,
//! free-text location, and an optional time-of-day after the last ` - `
//! separator. The grammar is permissive: anything it cannot place is
//! kept as free text rather than dropped.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?i)(INT|EXT|I/E|INT/EXT)[./]").expect("valid regex"));

static SCENE_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#([^#]+)#").expect("valid regex"));

/// Interior/exterior flag of a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntExt {
    Int,
    Ext,
    #[serde(rename = "int_ext")]
    IntExt,
}

impl IntExt {
    /// Conventional screenplay spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Int => "INT",
            Self::Ext => "EXT",
            Self::IntExt => "INT/EXT",
        }
    }
}

impl std::fmt::Display for IntExt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Controlled time-of-day vocabulary. Unrecognized tokens map to
/// `Unknown` with the raw text preserved on the heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeOfDay {
    Day,
    Night,
    Dawn,
    Dusk,
    Morning,
    Afternoon,
    Evening,
    Sunrise,
    Sunset,
    MagicHour,
    Continuous,
    Later,
    Unknown,
}

impl TimeOfDay {
    /// Parse a heading time token. Returns `None` for tokens outside
    /// the controlled vocabulary.
    pub fn parse(token: &str) -> Option<Self> {
        let normalized = token.trim().trim_end_matches('.').to_ascii_uppercase();
        match normalized.as_str() {
            "DAY" => Some(Self::Day),
            "NIGHT" => Some(Self::Night),
            "DAWN" => Some(Self::Dawn),
            "DUSK" => Some(Self::Dusk),
            "MORNING" => Some(Self::Morning),
            "AFTERNOON" => Some(Self::Afternoon),
            "EVENING" => Some(Self::Evening),
            "SUNRISE" => Some(Self::Sunrise),
            "SUNSET" => Some(Self::Sunset),
            "MAGIC HOUR" => Some(Self::MagicHour),
            "CONTINUOUS" => Some(Self::Continuous),
            "LATER" => Some(Self::Later),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Night => "night",
            Self::Dawn => "dawn",
            Self::Dusk => "dusk",
            Self::Morning => "morning",
            Self::Afternoon => "afternoon",
            Self::Evening => "evening",
            Self::Sunrise => "sunrise",
            Self::Sunset => "sunset",
            Self::MagicHour => "magic_hour",
            Self::Continuous => "continuous",
            Self::Later => "later",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsed components of one scene heading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingParts {
    pub int_ext: Option<IntExt>,
    pub location: Option<String>,
    pub time_of_day: TimeOfDay,
    /// The trailing token when it was not in the time vocabulary.
    pub time_raw: Option<String>,
    /// Explicit `#number#` marker, when present.
    pub scene_number: Option<String>,
    /// Heading text with the number marker and force-dot stripped.
    pub text: String,
}

/// True when a line opens a scene: the `INT.`/`EXT.` prefix family,
/// regardless of indentation, or a Fountain forced heading (leading dot).
pub fn is_heading(text: &str) -> bool {
    if HEADING_RE.is_match(text) {
        return true;
    }
    // Forced heading: single leading dot (".." is an ellipsis, not a heading).
    let mut chars = text.chars();
    chars.next() == Some('.') && matches!(chars.next(), Some(c) if c != '.')
}

/// Parse a heading line into its components.
pub fn parse_heading(line: &str) -> HeadingParts {
    let mut rest = line.trim().to_string();

    let scene_number = SCENE_NUMBER_RE
        .captures(&rest)
        .map(|c| c[1].trim().to_string());
    if scene_number.is_some() {
        rest = SCENE_NUMBER_RE.replace(&rest, "").trim().to_string();
    }

    if rest.starts_with('.') && !rest.starts_with("..") {
        rest = rest[1..].trim().to_string();
    }

    let text = rest.clone();
    let (int_ext, after_prefix) = strip_int_ext(&rest);
    let (location, time_of_day, time_raw) = split_location_time(after_prefix);

    HeadingParts {
        int_ext,
        location,
        time_of_day,
        time_raw,
        scene_number,
        text,
    }
}

/// Uppercased, whitespace-collapsed location used for scene keys and
/// element deduplication.
pub fn normalize_location(location: &str) -> String {
    location
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// Strip the interior/exterior token and its `.`/`/` separator.
fn strip_int_ext(heading: &str) -> (Option<IntExt>, &str) {
    let upper = heading.to_ascii_uppercase();
    // Longest prefixes first so "INT./EXT" is not consumed as "INT".
    const PREFIXES: [(&str, IntExt); 5] = [
        ("INT./EXT", IntExt::IntExt),
        ("INT/EXT", IntExt::IntExt),
        ("I/E", IntExt::IntExt),
        ("INT", IntExt::Int),
        ("EXT", IntExt::Ext),
    ];

    for (prefix, value) in PREFIXES {
        if let Some(after) = upper.strip_prefix(prefix) {
            if matches!(after.chars().next(), Some('.') | Some('/')) {
                let rest = &heading[prefix.len() + 1..];
                return (Some(value), rest.trim_start());
            }
        }
    }
    (None, heading)
}

/// Split `LOCATION - TIME` on the last separator. An unrecognized
/// trailing token is preserved as free text with `TimeOfDay::Unknown`.
fn split_location_time(text: &str) -> (Option<String>, TimeOfDay, Option<String>) {
    let make_location = |s: &str| {
        let trimmed = s.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    };

    match text.rsplit_once(" - ") {
        Some((left, right)) => match TimeOfDay::parse(right) {
            Some(time) => (make_location(left), time, None),
            None => (
                make_location(left),
                TimeOfDay::Unknown,
                make_location(right),
            ),
        },
        None => (make_location(text), TimeOfDay::Unknown, None),
    }
}
