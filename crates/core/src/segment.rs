//! Language segmentation of run text.
//!
//! Text is tokenized into maximal runs of whitespace, word characters and
//! punctuation. Word tokens are classified by a [`ScriptClassifier`]; adjacent
//! words of the same class (and the whitespace between them) merge into one
//! segment, while punctuation always stands alone.

use crate::error::{Error, Result};
use crate::types::{LanguagePair, Segment, SegmentTag};
use regex::Regex;
use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::sync::{Arc, LazyLock};

/// Whitespace, word and punctuation tokens. Together they cover every character.
static TOKEN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\s+)|(\w+)|([^\w\s]+)").unwrap());

/// A set of characters identifying a language's script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alphabet {
    ranges: Vec<RangeInclusive<char>>,
}

impl Alphabet {
    pub fn new(ranges: Vec<RangeInclusive<char>>) -> Self {
        Self { ranges }
    }

    /// Basic Latin letters.
    pub fn latin() -> Self {
        Self::new(vec!['a'..='z', 'A'..='Z'])
    }

    /// Russian Cyrillic letters, including Ё/ё.
    pub fn russian() -> Self {
        Self::new(vec!['а'..='я', 'А'..='Я', 'ё'..='ё', 'Ё'..='Ё'])
    }

    /// Ukrainian Cyrillic letters.
    pub fn ukrainian() -> Self {
        Self::new(vec![
            'а'..='щ',
            'А'..='Щ',
            'ь'..='ь',
            'Ь'..='Ь',
            'ю'..='я',
            'Ю'..='Я',
            'є'..='є',
            'Є'..='Є',
            'і'..='ї',
            'І'..='Ї',
            'ґ'..='ґ',
            'Ґ'..='Ґ',
        ])
    }

    pub fn contains(&self, c: char) -> bool {
        self.ranges.iter().any(|r| r.contains(&c))
    }

    /// Whether any character of `text` belongs to this alphabet.
    pub fn matches(&self, text: &str) -> bool {
        text.chars().any(|c| self.contains(c))
    }
}

/// Alphabets by lower-case language code.
#[derive(Debug, Clone)]
pub struct Alphabets {
    by_language: HashMap<String, Alphabet>,
}

impl Alphabets {
    /// Alphabets for `en`, `ru` and `uk`.
    pub fn builtin() -> Self {
        let mut by_language = HashMap::new();
        by_language.insert("en".to_string(), Alphabet::latin());
        by_language.insert("ru".to_string(), Alphabet::russian());
        by_language.insert("uk".to_string(), Alphabet::ukrainian());
        Self { by_language }
    }

    /// Register or replace the alphabet of a language.
    pub fn register(&mut self, language: &str, alphabet: Alphabet) {
        self.by_language
            .insert(language.trim().to_lowercase(), alphabet);
    }

    pub fn get(&self, language: &str) -> Result<&Alphabet> {
        self.by_language
            .get(language)
            .ok_or_else(|| Error::UnknownAlphabet(language.to_string()))
    }

    /// Build the classifier for a language pair.
    pub fn classifier_for(&self, pair: &LanguagePair) -> Result<AlphabetClassifier> {
        let source = self.get(&pair.source)?.clone();
        if let Ok(target) = self.get(&pair.target) {
            if target.ranges.iter().any(|r| source.contains(*r.start())) {
                log::warn!(
                    "Alphabets of {} overlap; shared letters are treated as source text",
                    pair
                );
            }
        }
        Ok(AlphabetClassifier::new(source))
    }
}

impl Default for Alphabets {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Decides whether a word token is source- or target-language text.
pub trait ScriptClassifier: Send + Sync {
    /// Classify one word token. Must return `Source` or `Target`.
    fn classify(&self, token: &str) -> SegmentTag;
}

/// Classifies a token as source text when it contains any letter of the source
/// alphabet. Everything else, including digits and unrelated scripts, is
/// treated as target text and passed through.
#[derive(Debug, Clone)]
pub struct AlphabetClassifier {
    source: Alphabet,
}

impl AlphabetClassifier {
    pub fn new(source: Alphabet) -> Self {
        Self { source }
    }
}

impl ScriptClassifier for AlphabetClassifier {
    fn classify(&self, token: &str) -> SegmentTag {
        if self.source.matches(token) {
            SegmentTag::Source
        } else {
            SegmentTag::Target
        }
    }
}

impl<F> ScriptClassifier for F
where
    F: Fn(&str) -> SegmentTag + Send + Sync,
{
    fn classify(&self, token: &str) -> SegmentTag {
        self(token)
    }
}

/// Splits text into language-tagged segments in a single forward pass.
#[derive(Clone)]
pub struct LanguageSegmenter {
    classifier: Arc<dyn ScriptClassifier>,
}

impl LanguageSegmenter {
    pub fn new(classifier: impl ScriptClassifier + 'static) -> Self {
        Self {
            classifier: Arc::new(classifier),
        }
    }

    /// Segmenter for a language pair using registered alphabets.
    pub fn for_pair(alphabets: &Alphabets, pair: &LanguagePair) -> Result<Self> {
        Ok(Self::new(alphabets.classifier_for(pair)?))
    }

    /// Segment `text`. Concatenating the returned segments reproduces `text`.
    ///
    /// Callers normally pass whitespace-collapsed text (see
    /// [`collapse_whitespace`](crate::normalize::collapse_whitespace)).
    pub fn segment(&self, text: &str) -> Vec<Segment> {
        let mut builder = SegmentBuilder::default();

        for caps in TOKEN_REGEX.captures_iter(text) {
            if let Some(space) = caps.get(1) {
                builder.current.push_str(space.as_str());
            } else if let Some(word) = caps.get(2) {
                let tag = self.classifier.classify(word.as_str());
                if builder.tag.is_some_and(|current| current != tag) {
                    builder.flush();
                }
                builder.current.push_str(word.as_str());
                builder.tag = Some(tag);
            } else if let Some(punct) = caps.get(3) {
                builder.flush();
                builder
                    .segments
                    .push(Segment::new(punct.as_str(), SegmentTag::Punctuation));
            }
        }

        builder.finish()
    }
}

impl std::fmt::Debug for LanguageSegmenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LanguageSegmenter").finish_non_exhaustive()
    }
}

#[derive(Default)]
struct SegmentBuilder {
    segments: Vec<Segment>,
    current: String,
    tag: Option<SegmentTag>,
}

impl SegmentBuilder {
    /// Close the open segment. Whitespace with no word yet is neutral (`Target`).
    fn flush(&mut self) {
        let tag = self.tag.take().unwrap_or(SegmentTag::Target);
        if !self.current.is_empty() {
            self.segments
                .push(Segment::new(std::mem::take(&mut self.current), tag));
        }
    }

    fn finish(mut self) -> Vec<Segment> {
        self.flush();
        self.segments
    }
}
