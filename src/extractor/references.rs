// file: src/extractor/references.rs
// description: locates the reference list and splits it into parsed entries
// reference: IEEE, numbered and author-year bibliography layouts

use crate::extractor::patterns::{
    ACM_YEAR, AUTHOR_LINE_START, IEEE_ENTRY, NUMBERED_ENTRY, PAREN_YEAR, PERIOD_SPACE,
    QUOTED_TITLE, REFERENCES_HEADER, SECTION_END, last_year,
};
use crate::models::{Citation, normalize_title};

/// Share of the text, from the end, searched when no header exists.
const FALLBACK_TAIL_FRACTION: f64 = 0.3;
/// `[n]` line starts required before the tail is treated as a reference list.
const FALLBACK_MIN_ENTRIES: usize = 3;

/// Byte ranges of the reference list within the document text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceSection {
    /// Everything before this offset is body text.
    pub body_end: usize,
    pub start: usize,
    pub end: usize,
}

impl ReferenceSection {
    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start..self.end]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawReference {
    pub number: Option<u32>,
    pub text: String,
}

/// Finds the last references header and reads until the first closing
/// section. Without a header, falls back to the tail of the document when it
/// looks like an IEEE-style list.
pub fn find_references_section(text: &str) -> Option<ReferenceSection> {
    if let Some(header) = REFERENCES_HEADER.find_iter(text).last() {
        let start = header.end();
        let end = SECTION_END
            .find(&text[start..])
            .map(|m| start + m.start())
            .unwrap_or(text.len());

        if !text[start..end].trim().is_empty() {
            return Some(ReferenceSection {
                body_end: header.start(),
                start,
                end,
            });
        }
    }

    let cutoff = (text.len() as f64 * (1.0 - FALLBACK_TAIL_FRACTION)) as usize;
    let cutoff = text
        .char_indices()
        .map(|(i, _)| i)
        .find(|&i| i >= cutoff)
        .unwrap_or(text.len());

    let tail = &text[cutoff..];
    if IEEE_ENTRY.find_iter(tail).count() >= FALLBACK_MIN_ENTRIES {
        return Some(ReferenceSection {
            body_end: cutoff,
            start: cutoff,
            end: text.len(),
        });
    }

    None
}

/// Splits a reference list, trying IEEE `[n]`, then numbered `n.`, then
/// author-line grouping.
pub fn segment_references(section: &str) -> Vec<RawReference> {
    if let Some(refs) = try_ieee(section) {
        return refs;
    }

    if let Some(refs) = try_numbered(section) {
        return refs;
    }

    group_author_lines(section)
}

fn try_ieee(section: &str) -> Option<Vec<RawReference>> {
    let caps: Vec<_> = IEEE_ENTRY.captures_iter(section).collect();
    if caps.is_empty() {
        return None;
    }

    Some(split_at_matches(section, &caps))
}

fn try_numbered(section: &str) -> Option<Vec<RawReference>> {
    let caps: Vec<_> = NUMBERED_ENTRY.captures_iter(section).collect();

    let first_numbers: Vec<u32> = caps
        .iter()
        .take(5)
        .filter_map(|c| c.get(1)?.as_str().parse().ok())
        .collect();

    if first_numbers.first() != Some(&1) {
        return None;
    }
    if !first_numbers.windows(2).all(|w| w[1] == w[0] + 1) {
        return None;
    }

    Some(split_at_matches(section, &caps))
}

fn split_at_matches(section: &str, caps: &[regex::Captures<'_>]) -> Vec<RawReference> {
    let mut refs = Vec::new();

    for (i, cap) in caps.iter().enumerate() {
        let Some(whole) = cap.get(0) else { continue };
        let end = caps
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map(|m| m.start())
            .unwrap_or(section.len());

        let text = collapse_whitespace(&section[whole.end()..end]);
        if !text.is_empty() {
            refs.push(RawReference {
                number: cap.get(1).and_then(|m| m.as_str().parse().ok()),
                text,
            });
        }
    }

    refs
}

fn group_author_lines(section: &str) -> Vec<RawReference> {
    let mut refs = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in section.lines() {
        let line = line.trim();
        if line.is_empty() {
            flush(&mut current, &mut refs);
            continue;
        }
        if AUTHOR_LINE_START.is_match(line) {
            flush(&mut current, &mut refs);
        }
        current.push(line);
    }
    flush(&mut current, &mut refs);

    refs
}

fn flush(current: &mut Vec<&str>, refs: &mut Vec<RawReference>) {
    if current.is_empty() {
        return;
    }
    let text = collapse_whitespace(&current.join(" "));
    if !text.is_empty() {
        refs.push(RawReference { number: None, text });
    }
    current.clear();
}

/// Parses one reference string. Returns the citation plus a reason when the
/// title could not be recovered.
pub fn parse_reference(document_id: &str, raw: &RawReference) -> (Citation, Option<String>) {
    let text = raw.text.as_str();
    let mut citation = Citation::new(document_id, raw.text.clone());
    citation.number = raw.number;
    citation.year = last_year(text);

    let (author_block, title) = split_author_and_title(text);
    citation.authors = split_authors(author_block);

    let title = title.map(clean_title).filter(|t| is_plausible_title(t));
    match title {
        Some(title) => {
            citation.normalized_title = Some(normalize_title(&title));
            citation.title = Some(title);
            (citation, None)
        }
        None => (citation, Some("no title could be recovered".to_string())),
    }
}

fn split_author_and_title(text: &str) -> (&str, Option<&str>) {
    if let Some(caps) = QUOTED_TITLE.captures(text)
        && let (Some(whole), Some(title)) = (caps.get(0), caps.get(1))
    {
        return (&text[..whole.start()], Some(title.as_str()));
    }

    if let Some(m) = PAREN_YEAR.find(text) {
        return (&text[..m.start()], first_sentence(&text[m.end()..]));
    }

    if let Some(m) = ACM_YEAR.find(text) {
        return (&text[..m.start() + 1], first_sentence(&text[m.end()..]));
    }

    match find_first_real_period(text) {
        Some(pos) => (&text[..pos], first_sentence(&text[pos + 1..])),
        None => ("", Some(text)),
    }
}

fn first_sentence(text: &str) -> Option<&str> {
    let text = text.trim_start_matches(|c: char| c.is_whitespace() || matches!(c, '.' | ',' | ':'));
    if text.is_empty() {
        return None;
    }

    let end = match find_first_real_period(text) {
        Some(pos) => {
            // Keep a question mark; titles end with them.
            if text[pos..].starts_with('?') { pos + 1 } else { pos }
        }
        None => text.len(),
    };
    Some(&text[..end])
}

/// Position of the first sentence-ending punctuation that does not follow an
/// author initial such as `J.`.
fn find_first_real_period(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();

    for m in PERIOD_SPACE.find_iter(text) {
        let pos = m.start();
        if pos == 0 {
            continue;
        }
        let before = bytes[pos - 1];
        if bytes[pos] == b'.'
            && before.is_ascii_uppercase()
            && (pos == 1 || !bytes[pos - 2].is_ascii_alphabetic())
        {
            continue;
        }
        return Some(pos);
    }

    None
}

fn split_authors(block: &str) -> Vec<String> {
    let block = block
        .trim()
        .trim_end_matches(|c: char| matches!(c, '.' | ',' | ';' | ':'))
        .trim();
    if block.is_empty() {
        return Vec::new();
    }

    let mut authors: Vec<String> = Vec::new();

    for group in block
        .split(';')
        .flat_map(|part| part.split(" and "))
        .flat_map(|part| part.split('&'))
    {
        for piece in group.split(',') {
            let piece = piece
                .trim()
                .trim_start_matches("and ")
                .trim_end_matches(['.', ','])
                .trim();
            let piece = piece.strip_suffix(" et al").unwrap_or(piece).trim();
            if piece.is_empty() || piece.eq_ignore_ascii_case("et al") {
                continue;
            }

            // `Smith, J.` splits into surname and initials; rejoin them.
            if is_initials(piece)
                && let Some(previous) = authors.last_mut()
                && !previous.contains(',')
                && !previous.contains(' ')
            {
                previous.push_str(", ");
                previous.push_str(piece);
                continue;
            }

            if piece.chars().any(char::is_alphabetic)
                && !piece.chars().any(|c| c.is_ascii_digit())
            {
                authors.push(piece.to_string());
            }
        }
    }

    authors
}

fn is_initials(piece: &str) -> bool {
    piece
        .split(|c: char| c == '.' || c.is_whitespace() || c == '-')
        .filter(|token| !token.is_empty())
        .all(|token| token.chars().count() == 1 && token.chars().all(char::is_uppercase))
}

fn clean_title(title: &str) -> String {
    collapse_whitespace(title)
        .trim_matches(|c: char| c.is_whitespace() || matches!(c, '.' | ',' | ';' | ':'))
        .to_string()
}

fn is_plausible_title(title: &str) -> bool {
    title.chars().filter(|c| c.is_alphabetic()).count() >= 3
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn raw(text: &str) -> RawReference {
        RawReference {
            number: None,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_find_section_uses_last_header() {
        let text = "Intro mentions References in passing.\nReferences\nfake\nBody again.\nReferences\n[1] Real entry.\nAppendix A\nExtra";
        let section = find_references_section(text).unwrap();
        assert_eq!(section.slice(text).trim(), "[1] Real entry.");
        assert!(text[..section.body_end].contains("Body again."));
    }

    #[test]
    fn test_find_section_fallback_tail() {
        let body = "Body text sentence. ".repeat(30);
        let text = format!("{}\n[1] A. One. First.\n[2] B. Two. Second.\n[3] C. Three. Third.", body);
        let section = find_references_section(&text).unwrap();
        assert!(section.slice(&text).contains("[3] C. Three"));
        assert_eq!(section.end, text.len());
    }

    #[test]
    fn test_no_section_without_header_or_entries() {
        assert!(find_references_section("Just a body with no list.").is_none());
    }

    #[test]
    fn test_segment_ieee() {
        let refs = segment_references("[1] A. Smith. First paper.\n[2] B. Jones. Second\npaper continued.\n");
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].number, Some(1));
        assert_eq!(refs[1].text, "B. Jones. Second paper continued.");
    }

    #[test]
    fn test_segment_numbered_requires_sequence_from_one() {
        let refs = segment_references("1. Smith, J. First.\n2. Doe, K. Second.\n");
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[1].number, Some(2));

        let refs = segment_references("2019. Smith, J. Not numbered.\n");
        assert!(refs.iter().all(|r| r.number.is_none()));
    }

    #[test]
    fn test_segment_author_lines() {
        let section = "Smith, J. (2020). Deep learning for cats.\nJournal of Pets.\nDoe, K. (2019). Another title. Venue.";
        let refs = segment_references(section);
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].text, "Smith, J. (2020). Deep learning for cats. Journal of Pets.");
    }

    #[test]
    fn test_parse_ieee_quoted() {
        let (citation, warning) = parse_reference(
            "doc",
            &raw("J. Smith and K. Doe, \"Graph methods for citation analysis,\" in Proc. KDD, 2020."),
        );
        assert!(warning.is_none());
        assert_eq!(citation.title.as_deref(), Some("Graph methods for citation analysis"));
        assert_eq!(citation.authors, vec!["J. Smith", "K. Doe"]);
        assert_eq!(citation.year, Some(2020));
    }

    #[test]
    fn test_parse_plain_sentence_after_authors() {
        let (citation, _) = parse_reference(
            "doc",
            &raw("J. Smith. Neural summaries of scientific text. In Proc. ACL, 2021."),
        );
        assert_eq!(
            citation.normalized_title.as_deref(),
            Some("neural summaries of scientific text")
        );
        assert_eq!(citation.first_author_surname().as_deref(), Some("smith"));
        assert_eq!(citation.year, Some(2021));
    }

    #[test]
    fn test_parse_apa_style() {
        let (citation, _) = parse_reference(
            "doc",
            &raw("Smith, J., & Doe, K. (2020). Deep learning for cats. Journal of Pets, 4(2), 1-10."),
        );
        assert_eq!(citation.title.as_deref(), Some("Deep learning for cats"));
        assert_eq!(citation.authors, vec!["Smith, J", "Doe, K"]);
        assert_eq!(citation.year, Some(2020));
    }

    #[test]
    fn test_parse_acm_style() {
        let (citation, _) = parse_reference(
            "doc",
            &raw("Ada Lovelace and Alan Turing. 2019. Sketch of the analytical engine. In Proc. X."),
        );
        assert_eq!(citation.title.as_deref(), Some("Sketch of the analytical engine"));
        assert_eq!(citation.authors, vec!["Ada Lovelace", "Alan Turing"]);
    }

    #[test]
    fn test_unparseable_reference_keeps_raw() {
        let (citation, warning) = parse_reference("doc", &raw("12-34"));
        assert!(warning.is_some());
        assert_eq!(citation.raw, "12-34");
        assert!(citation.normalized_title.is_none());
        assert!(citation.authors.is_empty());
        assert!(citation.year.is_none());
    }
}
