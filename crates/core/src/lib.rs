//! Core of presentation translation: language segmentation, ignore-term aware
//! segment translation, and the concurrent slide/shape pipeline with progress.

pub mod capability;
pub mod config;
pub mod error;
pub mod job;
pub mod normalize;
pub mod pipeline;
pub mod progress;
pub mod run;
pub mod segment;
pub mod segment_translator;
pub mod store;
pub mod types;

pub use capability::{CallPolicy, GuardedTranslator, Translate, TranslatorRegistry};
pub use config::TranslateConfig;
pub use error::{Error, Result, TranslateError};
pub use job::{JobHandle, JobMonitor, JobReport, JobRequest, JobStatus, PresentationTranslator};
pub use normalize::{collapse_whitespace, IgnoreTerms};
pub use pipeline::{PipelineSummary, TranslationPipeline};
pub use progress::{ProgressCallback, ProgressTracker};
pub use run::RunTranslator;
pub use segment::{Alphabet, AlphabetClassifier, Alphabets, LanguageSegmenter, ScriptClassifier};
pub use segment_translator::SegmentTranslator;
pub use store::DocumentStore;
pub use types::{
    Document, FaultReport, LanguagePair, Paragraph, Segment, SegmentTag, Shape, ShapeKind, Slide,
    TextFrame, TextRun, UnitFault,
};
