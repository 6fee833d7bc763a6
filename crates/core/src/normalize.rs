//! Format detection and input normalization.
//!
//! Turns a raw upload payload into a canonical sequence of text lines
//! with page and indent coordinates. This is the only stage that can
//! fail the whole parse: payloads that cannot be decoded to text, and
//! formats we recognize but cannot parse, are rejected here. Odd but
//! decodable text always passes through for best-effort classification.

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::EngineError;

/// How many leading characters participate in content sniffing.
const SNIFF_WINDOW: usize = 1000;

/// Highest tolerated fraction of undecodable characters before the
/// payload is rejected as non-text.
const MAX_REPLACEMENT_RATIO: f64 = 0.2;

/// Columns counted per tab character when measuring indentation.
const TAB_WIDTH: u16 = 4;

/// Source format of an uploaded script payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    /// Fountain plain-text screenplay markup (`.fountain` / `.spmd`).
    Fountain,
    /// Unstructured plain text.
    PlainText,
    /// Text extracted from a PDF by an upstream collaborator.
    PdfDerived,
    /// Final Draft XML. Recognized by detection, not parseable here.
    FinalDraftXml,
}

impl SourceFormat {
    /// String representation for display, logging, and serialized output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fountain => "fountain",
            Self::PlainText => "plain_text",
            Self::PdfDerived => "pdf_derived",
            Self::FinalDraftXml => "final_draft_xml",
        }
    }
}

impl std::fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single decoded input line with its document coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLine {
    /// 1-based line number in the decoded document.
    pub number: u32,
    /// Estimated 1-based page number.
    pub page: u32,
    /// Leading whitespace in columns (tabs count as [`TAB_WIDTH`]).
    pub indent: u16,
    /// Line text, surrounding whitespace trimmed.
    pub text: String,
}

/// Output of normalization: canonical lines plus detected format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedScript {
    pub format: SourceFormat,
    pub page_count: u32,
    pub lines: Vec<RawLine>,
}

/// True for explicit page-break marker lines (`==`, `===`, ...).
pub fn is_page_break(text: &str) -> bool {
    text.len() >= 2 && text.bytes().all(|b| b == b'=')
}

/// Detect the source format from filename suffix and content sniffing.
///
/// A declared format always wins over detection; this is the fallback
/// when the uploader declared nothing.
pub fn detect_format(filename: Option<&str>, content: &str) -> SourceFormat {
    if let Some(name) = filename {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".fountain") || lower.ends_with(".spmd") {
            return SourceFormat::Fountain;
        }
        if lower.ends_with(".fdx") {
            return SourceFormat::FinalDraftXml;
        }
    }

    let window = &content[..content.len().min(SNIFF_WINDOW)];
    if window.contains("<?xml") && window.contains("<FinalDraft") {
        return SourceFormat::FinalDraftXml;
    }
    if (window.contains("INT.") || window.contains("EXT."))
        && (window.contains("FADE IN:") || window.contains("CUT TO:"))
    {
        return SourceFormat::Fountain;
    }

    SourceFormat::PlainText
}

/// Normalize a raw payload into canonical lines.
///
/// Fails with [`EngineError::UnsupportedFormat`] when the payload is not
/// decodable text (or is Final Draft XML) and with
/// [`EngineError::Validation`] when it exceeds the configured size cap.
pub fn normalize(
    bytes: &[u8],
    declared: Option<SourceFormat>,
    filename: Option<&str>,
    config: &EngineConfig,
) -> Result<NormalizedScript, EngineError> {
    if bytes.len() > config.max_input_bytes {
        return Err(EngineError::Validation(format!(
            "Input of {} bytes exceeds the {} byte cap",
            bytes.len(),
            config.max_input_bytes
        )));
    }

    let text = decode_text(bytes)?;
    let format = declared.unwrap_or_else(|| detect_format(filename, &text));
    if format == SourceFormat::FinalDraftXml {
        return Err(EngineError::UnsupportedFormat(
            "Final Draft XML is not parseable; export Fountain or plain text".to_string(),
        ));
    }

    let lines = split_lines(&text, config.lines_per_page);
    let page_count = lines.last().map(|l| l.page).unwrap_or(1);

    Ok(NormalizedScript {
        format,
        page_count,
        lines,
    })
}

/// Decode the payload to text, tolerating a small amount of mojibake.
fn decode_text(bytes: &[u8]) -> Result<String, EngineError> {
    if bytes.starts_with(b"%PDF-") {
        return Err(EngineError::UnsupportedFormat(
            "raw PDF payload; submit extracted text instead".to_string(),
        ));
    }
    if bytes.contains(&0) {
        return Err(EngineError::UnsupportedFormat(
            "binary payload cannot be decoded to text".to_string(),
        ));
    }

    let text = match std::str::from_utf8(bytes) {
        Ok(valid) => valid.to_string(),
        Err(_) => {
            let lossy = String::from_utf8_lossy(bytes).into_owned();
            let total = lossy.chars().count().max(1);
            let replaced = lossy.chars().filter(|c| *c == '\u{fffd}').count();
            if replaced as f64 / total as f64 > MAX_REPLACEMENT_RATIO {
                return Err(EngineError::UnsupportedFormat(
                    "payload is not decodable text".to_string(),
                ));
            }
            lossy
        }
    };

    Ok(text.strip_prefix('\u{feff}').unwrap_or(&text).to_string())
}

/// Split decoded text into coordinate-bearing lines.
///
/// Page assignment: documents carrying explicit `==` page-break markers
/// are paginated by those markers; otherwise pages are estimated from
/// the line count.
fn split_lines(text: &str, lines_per_page: u32) -> Vec<RawLine> {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");
    let mut raw: Vec<&str> = unified.split('\n').collect();
    if raw.last() == Some(&"") {
        raw.pop();
    }

    let has_breaks = raw.iter().any(|l| is_page_break(l.trim()));
    let per_page = lines_per_page.max(1);

    let mut lines = Vec::with_capacity(raw.len());
    let mut page: u32 = 1;
    for (i, original) in raw.iter().enumerate() {
        let number = (i + 1) as u32;
        let trimmed = original.trim();

        if !has_breaks {
            page = i as u32 / per_page + 1;
        }

        lines.push(RawLine {
            number,
            page,
            indent: measure_indent(original),
            text: trimmed.to_string(),
        });

        if has_breaks && is_page_break(trimmed) {
            page += 1;
        }
    }
    lines
}

/// Leading whitespace width in columns.
fn measure_indent(line: &str) -> u16 {
    let mut cols: u16 = 0;
    for c in line.chars() {
        match c {
            ' ' => cols = cols.saturating_add(1),
            '\t' => cols = cols.saturating_add(TAB_WIDTH),
            _ => break,
        }
    }
    cols
}
