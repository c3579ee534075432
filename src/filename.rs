use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::identifier::normalize_title;

/// How whitespace in a title is rendered in the saved filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WhitespaceStyle {
    Underscore,
    Hyphen,
    Space,
}

impl WhitespaceStyle {
    /// Lenient parse; anything unrecognized falls back to plain spaces.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "underscore" => WhitespaceStyle::Underscore,
            "hyphen" => WhitespaceStyle::Hyphen,
            _ => WhitespaceStyle::Space,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WhitespaceStyle::Underscore => "underscore",
            WhitespaceStyle::Hyphen => "hyphen",
            WhitespaceStyle::Space => "space",
        }
    }
}

pub fn apply_whitespace_style(text: &str, style: WhitespaceStyle) -> String {
    let re = Regex::new(r"\s+").unwrap();
    match style {
        WhitespaceStyle::Underscore => re.replace_all(text, "_").to_string(),
        WhitespaceStyle::Hyphen => re.replace_all(text, "-").to_string(),
        WhitespaceStyle::Space => text.to_string(),
    }
}

/// Derive the filename a paper should be saved under.
///
/// Falls back to `{identifier}.pdf` when no usable title is available.
/// Collisions on disk are the download host's problem, not ours.
pub fn build_filename(title: Option<&str>, identifier: &str, style: WhitespaceStyle) -> String {
    match title.and_then(normalize_title) {
        Some(normalized) => format!("{}.pdf", apply_whitespace_style(&normalized, style)),
        None => format!("{}.pdf", identifier),
    }
}
