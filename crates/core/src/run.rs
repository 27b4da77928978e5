//! Translation of a single text run.

use crate::capability::Translate;
use crate::error::{Result, TranslateError};
use crate::normalize::{collapse_whitespace, IgnoreTerms};
use crate::segment::{Alphabets, LanguageSegmenter};
use crate::segment_translator::SegmentTranslator;
use crate::types::{LanguagePair, SegmentTag, TextRun};
use std::sync::Arc;

/// Applies segmentation and segment translation to run text.
///
/// Constructed from a validated [`LanguagePair`], so the languages are always
/// bound by the time a run is translated.
#[derive(Debug, Clone)]
pub struct RunTranslator {
    pair: LanguagePair,
    segmenter: LanguageSegmenter,
    segments: SegmentTranslator,
}

impl RunTranslator {
    pub fn new(
        pair: LanguagePair,
        segmenter: LanguageSegmenter,
        ignore_terms: &IgnoreTerms,
        translator: Arc<dyn Translate>,
    ) -> Result<Self> {
        Ok(Self {
            pair,
            segmenter,
            segments: SegmentTranslator::new(ignore_terms, translator)?,
        })
    }

    /// Build a run translator using the registered alphabet of the source language.
    pub fn for_pair(
        pair: LanguagePair,
        alphabets: &Alphabets,
        ignore_terms: &IgnoreTerms,
        translator: Arc<dyn Translate>,
    ) -> Result<Self> {
        let segmenter = LanguageSegmenter::for_pair(alphabets, &pair)?;
        Self::new(pair, segmenter, ignore_terms, translator)
    }

    pub fn pair(&self) -> &LanguagePair {
        &self.pair
    }

    /// Translate run text. Whitespace is collapsed first; a leading or
    /// trailing space survives so the run still joins its neighbours.
    ///
    /// Ignore terms are carved out of the whole run before segmentation.
    pub fn translate_text(&self, text: &str) -> std::result::Result<String, TranslateError> {
        let normalized = collapse_whitespace(text);
        let mut output = String::with_capacity(normalized.len());

        for (piece, protected) in self.segments.split_protected(&normalized) {
            if protected {
                output.push_str(piece);
                continue;
            }
            for segment in self.segmenter.segment(piece) {
                match segment.tag {
                    SegmentTag::Target | SegmentTag::Punctuation => output.push_str(&segment.text),
                    SegmentTag::Source => {
                        output.push_str(&self.segments.translate_segment(&segment.text)?)
                    }
                }
            }
        }

        Ok(output)
    }

    /// Translate a run in place. Blank runs are left alone; on failure the run
    /// keeps its original text.
    ///
    /// Returns whether the run was translated.
    pub fn translate_run(&self, run: &mut TextRun) -> std::result::Result<bool, TranslateError> {
        if run.text.trim().is_empty() {
            return Ok(false);
        }
        run.text = self.translate_text(&run.text)?;
        Ok(true)
    }
}
