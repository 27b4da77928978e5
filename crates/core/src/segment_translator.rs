//! Translation of source-language segments with ignore terms carved out.

use crate::capability::Translate;
use crate::error::{Error, Result, TranslateError};
use crate::normalize::IgnoreTerms;
use aho_corasick::{AhoCorasick, MatchKind};
use std::sync::Arc;

/// Translates source-language segments, copying ignore terms through verbatim.
///
/// The segment is scanned left to right. Text before the leftmost ignore-term
/// match is translated as one chunk; the term itself is copied; scanning
/// resumes after it. When two terms start at the same position the one listed
/// first wins.
#[derive(Clone)]
pub struct SegmentTranslator {
    matcher: Option<AhoCorasick>,
    translator: Arc<dyn Translate>,
}

impl SegmentTranslator {
    pub fn new(ignore_terms: &IgnoreTerms, translator: Arc<dyn Translate>) -> Result<Self> {
        let matcher = if ignore_terms.is_empty() {
            None
        } else {
            let automaton = AhoCorasick::builder()
                .match_kind(MatchKind::LeftmostFirst)
                .build(ignore_terms.as_slice())
                .map_err(|e| Error::Config(format!("invalid ignore terms: {}", e)))?;
            Some(automaton)
        };

        Ok(Self {
            matcher,
            translator,
        })
    }

    /// Split `text` around ignore-term matches. Each piece is flagged `true`
    /// when it is an ignore term and must be copied through as-is.
    ///
    /// Runs are split this way before segmentation, so terms containing
    /// punctuation or spanning scripts ("Node.js", "C++") stay whole.
    pub fn split_protected<'t>(&self, text: &'t str) -> Vec<(&'t str, bool)> {
        let mut pieces = Vec::new();
        let mut cursor = 0;

        if let Some(matcher) = &self.matcher {
            for term in matcher.find_iter(text) {
                if term.start() > cursor {
                    pieces.push((&text[cursor..term.start()], false));
                }
                pieces.push((&text[term.start()..term.end()], true));
                cursor = term.end();
            }
        }
        if cursor < text.len() || pieces.is_empty() {
            pieces.push((&text[cursor..], false));
        }

        pieces
    }

    /// Translate one segment known to be entirely source-language text.
    pub fn translate_segment(&self, segment: &str) -> std::result::Result<String, TranslateError> {
        let mut output = String::with_capacity(segment.len());
        let mut cursor = 0;

        if let Some(matcher) = &self.matcher {
            for term in matcher.find_iter(segment) {
                self.translate_chunk(&segment[cursor..term.start()], &mut output)?;
                output.push_str(&segment[term.start()..term.end()]);
                cursor = term.end();
            }
        }
        self.translate_chunk(&segment[cursor..], &mut output)?;

        Ok(output)
    }

    /// Translate a chunk without letting the backend see its surrounding
    /// whitespace, which is re-attached verbatim.
    fn translate_chunk(
        &self,
        chunk: &str,
        output: &mut String,
    ) -> std::result::Result<(), TranslateError> {
        let body = chunk.trim();
        if body.is_empty() {
            output.push_str(chunk);
            return Ok(());
        }

        let leading = &chunk[..chunk.len() - chunk.trim_start().len()];
        let trailing = &chunk[chunk.trim_end().len()..];

        output.push_str(leading);
        output.push_str(&self.translator.translate(body)?);
        output.push_str(trailing);
        Ok(())
    }
}

impl std::fmt::Debug for SegmentTranslator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentTranslator")
            .field("ignore_terms", &self.matcher.as_ref().map_or(0, |m| m.patterns_len()))
            .finish_non_exhaustive()
    }
}
