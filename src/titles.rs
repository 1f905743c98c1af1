//! Title extraction: quoted spans in user text.

use serde::Serialize;

/// Collapse whitespace runs to a single space and trim.
pub fn preprocess(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Result of scanning a line for quoted titles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TitleScan {
    pub titles: Vec<String>,
    /// Odd number of `"` in the text; the dangling fragment is not a title.
    pub unmatched_quote: bool,
}

/// Pair double quotes left to right (no nesting) and collect what is between them.
/// Empty or blank spans are skipped.
pub fn scan_titles(text: &str) -> TitleScan {
    let parts: Vec<&str> = text.split('"').collect();
    let quotes = parts.len() - 1;
    let closed = quotes - quotes % 2;

    let titles = parts
        .iter()
        .enumerate()
        .skip(1)
        .step_by(2)
        .take(closed / 2)
        .map(|(_, s)| *s)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
        .collect();

    TitleScan {
        titles,
        unmatched_quote: quotes % 2 == 1,
    }
}

/// All titles in order of appearance.
pub fn extract_titles(text: &str) -> Vec<String> {
    scan_titles(text).titles
}
