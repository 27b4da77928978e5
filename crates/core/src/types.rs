//! Domain types: segments, language pairs, the presentation tree and fault records.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Language classification of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SegmentTag {
    /// Text in the source language; gets translated.
    Source,
    /// Text already in the target language (or neutral); passed through.
    Target,
    /// A run of punctuation; always passed through on its own.
    Punctuation,
}

/// A maximal substring of a run with a single language classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub text: String,
    pub tag: SegmentTag,
}

impl Segment {
    pub fn new(text: impl Into<String>, tag: SegmentTag) -> Self {
        Self {
            text: text.into(),
            tag,
        }
    }
}

/// Source and target language codes of a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LanguagePair {
    pub source: String,
    pub target: String,
}

impl LanguagePair {
    /// Create a validated pair. Codes are trimmed and lower-cased.
    pub fn new(source: &str, target: &str) -> Result<Self> {
        let source = source.trim().to_lowercase();
        let target = target.trim().to_lowercase();

        if source.is_empty() || target.is_empty() {
            return Err(Error::InvalidLanguagePair(
                "source and target languages must both be set".to_string(),
            ));
        }
        if source == target {
            return Err(Error::InvalidLanguagePair(format!(
                "source and target are both '{}'",
                source
            )));
        }

        Ok(Self { source, target })
    }
}

impl fmt::Display for LanguagePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.target)
    }
}

/// An entire presentation as seen by the translator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Slides in presentation order.
    pub slides: Vec<Slide>,
}

impl Document {
    pub fn new(slides: Vec<Slide>) -> Self {
        Self { slides }
    }

    /// All runs in document order.
    pub fn runs(&self) -> Vec<&TextRun> {
        let mut runs = Vec::new();
        for slide in &self.slides {
            for shape in &slide.shapes {
                shape.collect_runs(&mut runs);
            }
        }
        runs
    }

    /// Texts of all runs in document order.
    pub fn run_texts(&self) -> Vec<&str> {
        self.runs().into_iter().map(|r| r.text.as_str()).collect()
    }
}

/// A single slide.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Slide {
    /// 1-based slide number.
    pub number: usize,

    /// Container part this slide was read from (e.g. `ppt/slides/slide1.xml`).
    pub part: String,

    /// Top-level shapes in z-order.
    pub shapes: Vec<Shape>,
}

impl Slide {
    pub fn new(number: usize, part: impl Into<String>) -> Self {
        Self {
            number,
            part: part.into(),
            shapes: Vec::new(),
        }
    }

    pub fn with_shapes(mut self, shapes: Vec<Shape>) -> Self {
        self.shapes = shapes;
        self
    }

    /// Runs of this slide in document order.
    pub fn runs(&self) -> Vec<&TextRun> {
        let mut runs = Vec::new();
        for shape in &self.shapes {
            shape.collect_runs(&mut runs);
        }
        runs
    }
}

/// A shape on a slide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    /// Display name of the shape, used in fault records.
    pub name: String,
    pub kind: ShapeKind,
}

/// Group shapes contain children; leaf shapes may own a text frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ShapeKind {
    Group(Vec<Shape>),
    Leaf(Option<TextFrame>),
}

impl Shape {
    pub fn leaf(name: impl Into<String>, frame: Option<TextFrame>) -> Self {
        Self {
            name: name.into(),
            kind: ShapeKind::Leaf(frame),
        }
    }

    pub fn group(name: impl Into<String>, children: Vec<Shape>) -> Self {
        Self {
            name: name.into(),
            kind: ShapeKind::Group(children),
        }
    }

    fn collect_runs<'a>(&'a self, out: &mut Vec<&'a TextRun>) {
        match &self.kind {
            ShapeKind::Group(children) => {
                for child in children {
                    child.collect_runs(out);
                }
            }
            ShapeKind::Leaf(Some(frame)) => {
                out.extend(frame.paragraphs.iter().flat_map(|p| p.runs.iter()));
            }
            ShapeKind::Leaf(None) => {}
        }
    }
}

/// Text body of a leaf shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextFrame {
    pub paragraphs: Vec<Paragraph>,
}

impl TextFrame {
    pub fn new(paragraphs: Vec<Paragraph>) -> Self {
        Self { paragraphs }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Paragraph {
    pub runs: Vec<TextRun>,
}

impl Paragraph {
    pub fn new(runs: Vec<TextRun>) -> Self {
        Self { runs }
    }
}

/// Smallest text-bearing unit. Only `text` is ever rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRun {
    /// Position of the run within its slide part, in document order.
    pub ordinal: usize,
    pub text: String,
}

impl TextRun {
    pub fn new(ordinal: usize, text: impl Into<String>) -> Self {
        Self {
            ordinal,
            text: text.into(),
        }
    }
}

/// A failure confined to one run (or one shape, if the shape task itself died).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitFault {
    /// 1-based slide number.
    pub slide: usize,
    /// Shape path from the slide root, e.g. `Group 3/Title 1`.
    pub shape: String,
    /// Paragraph index within the text frame, if the fault is run-level.
    pub paragraph: Option<usize>,
    /// Run index within the paragraph, if the fault is run-level.
    pub run: Option<usize>,
    pub message: String,
}

impl fmt::Display for UnitFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slide {} shape '{}'", self.slide, self.shape)?;
        if let (Some(p), Some(r)) = (self.paragraph, self.run) {
            write!(f, " paragraph {} run {}", p, r)?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Aggregated unit faults of a job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultReport {
    pub faults: Vec<UnitFault>,
}

impl FaultReport {
    pub fn is_empty(&self) -> bool {
        self.faults.is_empty()
    }

    pub fn len(&self) -> usize {
        self.faults.len()
    }

    pub fn extend(&mut self, faults: impl IntoIterator<Item = UnitFault>) {
        self.faults.extend(faults);
    }

    /// Sort faults by slide, then shape, then position, so reports are stable
    /// regardless of task interleaving.
    pub fn sort(&mut self) {
        self.faults.sort_by(|a, b| {
            (a.slide, &a.shape, a.paragraph, a.run).cmp(&(b.slide, &b.shape, b.paragraph, b.run))
        });
    }
}
