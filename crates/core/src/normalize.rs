//! Input normalization: whitespace collapsing for run text and ignore-term lists.
//!
//! Collapsing whitespace is lossy: a run containing tabs, line breaks or
//! repeated spaces comes back with single spaces. This matches how runs have
//! always been fed to the segmenter and is kept as-is.

use crate::error::Result;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

/// Regex matching any run of whitespace characters.
static WHITESPACE_COLLAPSE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Collapse every whitespace run into a single space.
///
/// Edges are collapsed too, not trimmed: a run that starts or ends with
/// whitespace keeps one space there so it still joins its neighbours.
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_COLLAPSE_REGEX.replace_all(text, " ").into_owned()
}

/// Ordered list of literal terms that must never be translated.
///
/// Terms are case-sensitive and matched as exact substrings. Empty terms are
/// dropped since they would match everywhere.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoreTerms {
    terms: Vec<String>,
}

impl IgnoreTerms {
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            terms: terms
                .into_iter()
                .map(Into::into)
                .filter(|t: &String| !t.is_empty())
                .collect(),
        }
    }

    /// Parse a newline-delimited list. Lines are trimmed and blank lines dropped;
    /// there is no quoting or escaping.
    pub fn parse(text: &str) -> Self {
        Self::new(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty()),
        )
    }

    /// Read and parse a newline-delimited ignore-terms file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::parse(&content))
    }

    pub fn as_slice(&self) -> &[String] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("Hello    world"), "Hello world");
        assert_eq!(collapse_whitespace("  Hello  "), " Hello ");
        assert_eq!(collapse_whitespace("\t\tHello\n\nworld\t"), " Hello world ");
        assert_eq!(collapse_whitespace(" world & friends"), " world & friends");
        assert_eq!(collapse_whitespace("   "), " ");
        assert_eq!(collapse_whitespace(""), "");
    }

    #[test]
    fn test_collapse_whitespace_unicode_spaces() {
        assert_eq!(collapse_whitespace("Привет\u{00A0}\u{00A0}мир"), "Привет мир");
    }

    #[test]
    fn test_parse_ignore_terms_drops_blank_lines() {
        let terms = IgnoreTerms::parse("Acme\n\n  Zorp Inc  \r\n\t\nGPU\n");
        assert_eq!(terms.as_slice(), ["Acme", "Zorp Inc", "GPU"]);
    }

    #[test]
    fn test_parse_ignore_terms_has_no_escaping() {
        let terms = IgnoreTerms::parse("\"quoted\"\n\\n");
        assert_eq!(terms.as_slice(), ["\"quoted\"", "\\n"]);
    }

    #[test]
    fn test_new_drops_empty_terms() {
        let terms = IgnoreTerms::new(vec!["", "Acme", ""]);
        assert_eq!(terms.len(), 1);
        assert!(!terms.is_empty());
        assert!(IgnoreTerms::new(Vec::<String>::new()).is_empty());
    }
}
