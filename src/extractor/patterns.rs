// file: src/extractor/patterns.rs
// description: compiled regex patterns for reference and citation extraction
// reference: https://docs.rs/regex

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Section boundaries
    pub static ref REFERENCES_HEADER: Regex = Regex::new(
        r"(?im)^[ \t]*(?:\d+\.?[ \t]*)?(?:References|Bibliography|Works[ \t]+Cited|Literature[ \t]+Cited)[ \t]*:?[ \t]*$"
    ).expect("REFERENCES_HEADER regex is valid");

    pub static ref SECTION_END: Regex = Regex::new(
        r"(?im)^[ \t]*(?:(?:\d{1,2}|[A-Z])\.?[ \t]+)?(?:Appendix|Appendices|Acknowledgments|Acknowledgements|Supplementary)\b"
    ).expect("SECTION_END regex is valid");

    // Reference list entry starts
    pub static ref IEEE_ENTRY: Regex = Regex::new(
        r"(?m)^[ \t]*\[(\d{1,4})\][ \t]*"
    ).expect("IEEE_ENTRY regex is valid");

    pub static ref NUMBERED_ENTRY: Regex = Regex::new(
        r"(?m)^[ \t]*(\d{1,4})\.[ \t]+"
    ).expect("NUMBERED_ENTRY regex is valid");

    pub static ref AUTHOR_LINE_START: Regex = Regex::new(
        r"^\p{Lu}[\p{L}'\-]+(?:,[ \t]*\p{Lu}|[ \t]+\p{Lu}\.)"
    ).expect("AUTHOR_LINE_START regex is valid");

    // Reference fields
    pub static ref YEAR: Regex = Regex::new(
        r"\b((?:19|20)\d{2})[a-z]?\b"
    ).expect("YEAR regex is valid");

    pub static ref QUOTED_TITLE: Regex = Regex::new(
        "[\"\u{201C}\u{201D}]([^\"\u{201C}\u{201D}]{4,}?)[\"\u{201C}\u{201D}]"
    ).expect("QUOTED_TITLE regex is valid");

    pub static ref PAREN_YEAR: Regex = Regex::new(
        r"\(\s*(?:19|20)\d{2}[a-z]?\s*\)[.,:]?"
    ).expect("PAREN_YEAR regex is valid");

    pub static ref ACM_YEAR: Regex = Regex::new(
        r"\.\s*(?:19|20)\d{2}[a-z]?\.\s+"
    ).expect("ACM_YEAR regex is valid");

    pub static ref PERIOD_SPACE: Regex = Regex::new(
        r"[.?!]\s"
    ).expect("PERIOD_SPACE regex is valid");

    // In-text markers
    pub static ref BRACKET_MARKER: Regex = Regex::new(
        r"\[(\d{1,4}(?:[ \t]*[,\-\u{2013}][ \t]*\d{1,4})*)\]"
    ).expect("BRACKET_MARKER regex is valid");

    pub static ref AUTHOR_YEAR_PAREN: Regex = Regex::new(
        r"\((\p{Lu}[\p{L}'\-]+)(?:\s+et\s+al\.?|\s+(?:and|&)\s+\p{Lu}[\p{L}'\-]+)?,\s*((?:19|20)\d{2})[a-z]?\)"
    ).expect("AUTHOR_YEAR_PAREN regex is valid");

    pub static ref AUTHOR_YEAR_NARRATIVE: Regex = Regex::new(
        r"\b(\p{Lu}[\p{L}'\-]+)(?:\s+et\s+al\.?|\s+(?:and|&)\s+\p{Lu}[\p{L}'\-]+)?\s+\(((?:19|20)\d{2})[a-z]?\)"
    ).expect("AUTHOR_YEAR_NARRATIVE regex is valid");
}

/// Expands the inside of a bracketed marker (`1, 4`, `2-5`) into reference
/// numbers. Ranges wider than 100 are treated as noise.
pub fn expand_marker_numbers(inner: &str) -> Vec<u32> {
    let mut numbers = Vec::new();

    for part in inner.split(',') {
        let part = part.trim();
        if let Some((from, to)) = part.split_once(['-', '\u{2013}']) {
            let (Ok(from), Ok(to)) = (from.trim().parse::<u32>(), to.trim().parse::<u32>()) else {
                continue;
            };
            if from <= to && to - from <= 100 {
                numbers.extend(from..=to);
            }
        } else if let Ok(n) = part.parse::<u32>() {
            numbers.push(n);
        }
    }

    numbers
}

/// Last four-digit year in the string.
pub fn last_year(text: &str) -> Option<u16> {
    YEAR.captures_iter(text)
        .last()
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
