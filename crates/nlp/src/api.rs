//! Wire types for the text-analysis service.
//!
//! The analysis sidecar exposes a single `POST /analyze` endpoint that
//! takes raw text and returns tokens plus named-entity spans. These
//! types mirror that JSON contract, with byte offsets into the
//! submitted text so callers can map spans back onto script lines.

use serde::{Deserialize, Serialize};

/// Request body for `POST /analyze`.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeRequest<'a> {
    /// Raw text to analyze.
    pub text: &'a str,
}

/// Entity labels the analysis service emits.
///
/// The vocabulary follows the usual NER tag set. Labels outside this
/// set deserialize to [`EntityLabel::Other`] so a service upgrade
/// cannot break parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityLabel {
    /// A person or fictional character name.
    #[serde(rename = "PERSON")]
    Person,
    /// Companies, agencies, institutions.
    #[serde(rename = "ORG")]
    Org,
    /// Manufactured objects, vehicles, foods.
    #[serde(rename = "PRODUCT")]
    Product,
    /// Titles of books, songs, films.
    #[serde(rename = "WORK_OF_ART")]
    WorkOfArt,
    /// Geopolitical entities: countries, cities, states.
    #[serde(rename = "GPE")]
    Gpe,
    /// Non-GPE locations: mountains, bodies of water.
    #[serde(rename = "LOC")]
    Loc,
    /// Buildings, airports, bridges, named facilities.
    #[serde(rename = "FAC")]
    Fac,
    /// Any label outside the vocabulary above.
    #[serde(other, rename = "OTHER")]
    Other,
}

impl EntityLabel {
    /// Service-side tag string for this label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Person => "PERSON",
            Self::Org => "ORG",
            Self::Product => "PRODUCT",
            Self::WorkOfArt => "WORK_OF_ART",
            Self::Gpe => "GPE",
            Self::Loc => "LOC",
            Self::Fac => "FAC",
            Self::Other => "OTHER",
        }
    }
}

impl std::fmt::Display for EntityLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One token with its part-of-speech tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    /// Token text as it appears in the submitted string.
    pub text: String,
    /// Byte offset of the token start in the submitted string.
    pub start: usize,
    /// Universal POS tag (`PROPN`, `NOUN`, `VERB`, ...).
    pub pos: String,
}

/// One named-entity span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySpan {
    pub label: EntityLabel,
    /// Entity text as it appears in the submitted string.
    pub text: String,
    /// Byte offset of the span start.
    pub start: usize,
    /// Byte offset one past the span end.
    pub end: usize,
}

impl EntitySpan {
    /// True when this span fully covers the byte range `start..end`.
    pub fn covers(&self, start: usize, end: usize) -> bool {
        self.start <= start && end <= self.end
    }
}

/// Full analysis of one submitted text batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub tokens: Vec<Token>,
    pub entities: Vec<EntitySpan>,
}

impl Analysis {
    /// Entity spans that overlap the byte range `start..end`.
    pub fn entities_in(&self, start: usize, end: usize) -> impl Iterator<Item = &EntitySpan> {
        self.entities
            .iter()
            .filter(move |span| span.start < end && start < span.end)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
