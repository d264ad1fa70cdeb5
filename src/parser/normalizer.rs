// file: src/parser/normalizer.rs
// description: Cleanup of raw PDF text layers before chunking
// reference: common PDF text extraction artifacts

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref HYPHENATED_BREAK: Regex =
        Regex::new(r"([a-z])-\n([a-z])").expect("HYPHENATED_BREAK regex is valid");
    static ref INNER_SPACES: Regex = Regex::new(r"[ ]{2,}").expect("INNER_SPACES regex is valid");
    static ref BLANK_RUNS: Regex = Regex::new(r"\n{3,}").expect("BLANK_RUNS regex is valid");
}

pub struct TextNormalizer;

impl TextNormalizer {
    pub fn new() -> Self {
        Self
    }

    pub fn normalize(&self, content: &str) -> String {
        let mut normalized = self.normalize_characters(content);

        normalized = self.join_hyphenated_breaks(&normalized);
        normalized = self.normalize_spacing(&normalized);
        normalized = self.normalize_line_breaks(&normalized);

        normalized.trim().to_string()
    }

    fn normalize_characters(&self, content: &str) -> String {
        let content = content.replace("\r\n", "\n").replace('\r', "\n");
        let mut result = String::with_capacity(content.len());

        for c in content.chars() {
            match c {
                '\n' => result.push('\n'),
                '\t' | '\u{00A0}' => result.push(' '),
                '\u{FB01}' => result.push_str("fi"),
                '\u{FB02}' => result.push_str("fl"),
                '\u{FB00}' => result.push_str("ff"),
                c if c.is_control() => {}
                c => result.push(c),
            }
        }

        result
    }

    fn join_hyphenated_breaks(&self, content: &str) -> String {
        HYPHENATED_BREAK.replace_all(content, "$1$2").into_owned()
    }

    fn normalize_spacing(&self, content: &str) -> String {
        content
            .lines()
            .map(|line| INNER_SPACES.replace_all(line.trim_end(), " ").into_owned())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn normalize_line_breaks(&self, content: &str) -> String {
        BLANK_RUNS.replace_all(content, "\n\n").into_owned()
    }
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new()
    }
}
