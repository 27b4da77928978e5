//! Translation jobs: one request over one document, with its own progress state.

use crate::capability::{GuardedTranslator, TranslatorRegistry};
use crate::config::TranslateConfig;
use crate::error::{Error, Result};
use crate::normalize::IgnoreTerms;
use crate::pipeline::{panic_message, PipelineSummary, TranslationPipeline};
use crate::progress::ProgressTracker;
use crate::run::RunTranslator;
use crate::segment::Alphabets;
use crate::store::DocumentStore;
use crate::types::{Document, FaultReport, LanguagePair};
use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// What to translate and where to put the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    pub pair: LanguagePair,
    pub input: PathBuf,
    pub output: PathBuf,
    pub ignore_terms: IgnoreTerms,
}

/// Result of a finished job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobReport {
    pub slides: usize,
    pub translated_runs: usize,
    /// Runs (or shapes) left untranslated.
    pub faults: FaultReport,
}

impl From<PipelineSummary> for JobReport {
    fn from(summary: PipelineSummary) -> Self {
        Self {
            slides: summary.slides,
            translated_runs: summary.translated_runs,
            faults: summary.faults,
        }
    }
}

/// Point-in-time view of a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStatus {
    pub percent: u8,
    pub done: bool,
    pub faults: usize,
    /// Set when the job failed as a whole (copy, load or save).
    pub error: Option<String>,
}

#[derive(Debug)]
struct JobState {
    pair: LanguagePair,
    percent: AtomicU8,
    done: AtomicBool,
    faults: Mutex<FaultReport>,
    error: Mutex<Option<String>>,
}

/// Cloneable read-only view of a running job, for pollers.
#[derive(Debug, Clone)]
pub struct JobMonitor {
    state: Arc<JobState>,
}

impl JobMonitor {
    pub fn pair(&self) -> &LanguagePair {
        &self.state.pair
    }

    /// Completion percentage, 0..=100.
    pub fn progress(&self) -> u8 {
        self.state.percent.load(Ordering::Acquire)
    }

    /// True once every slide task has finished and the result was saved (or
    /// the job failed).
    pub fn is_done(&self) -> bool {
        self.state.done.load(Ordering::Acquire)
    }

    /// Unit faults, available once the job is done.
    pub fn faults(&self) -> FaultReport {
        self.state.faults.lock().clone()
    }

    pub fn error(&self) -> Option<String> {
        self.state.error.lock().clone()
    }

    pub fn status(&self) -> JobStatus {
        // Read `done` first so that a done status always carries final faults.
        let done = self.is_done();
        JobStatus {
            percent: self.progress(),
            done,
            faults: self.state.faults.lock().len(),
            error: self.error(),
        }
    }
}

/// Handle to a submitted job.
#[derive(Debug)]
pub struct JobHandle {
    monitor: JobMonitor,
    worker: JoinHandle<Result<JobReport>>,
}

impl JobHandle {
    pub fn monitor(&self) -> JobMonitor {
        self.monitor.clone()
    }

    pub fn progress(&self) -> u8 {
        self.monitor.progress()
    }

    pub fn is_done(&self) -> bool {
        self.monitor.is_done()
    }

    pub fn faults(&self) -> FaultReport {
        self.monitor.faults()
    }

    pub fn status(&self) -> JobStatus {
        self.monitor.status()
    }

    /// Block until the job finishes.
    pub fn wait(self) -> Result<JobReport> {
        self.worker
            .join()
            .map_err(|payload| Error::JobPanicked(panic_message(payload.as_ref())))?
    }
}

/// Entry point for translating presentations.
///
/// Holds the capability registry, the alphabets used for segmentation and one
/// pipeline shared by every job it runs.
pub struct PresentationTranslator {
    registry: TranslatorRegistry,
    alphabets: Alphabets,
    config: TranslateConfig,
    pipeline: Arc<TranslationPipeline>,
    store: Arc<dyn DocumentStore>,
}

impl PresentationTranslator {
    pub fn new(
        registry: TranslatorRegistry,
        store: Arc<dyn DocumentStore>,
        config: TranslateConfig,
    ) -> Result<Self> {
        let pipeline = TranslationPipeline::from_config(&config)?;
        Ok(Self {
            registry,
            alphabets: Alphabets::builtin(),
            config,
            pipeline: Arc::new(pipeline),
            store,
        })
    }

    pub fn with_alphabets(mut self, alphabets: Alphabets) -> Self {
        self.alphabets = alphabets;
        self
    }

    pub fn config(&self) -> &TranslateConfig {
        &self.config
    }

    pub fn registry(&self) -> &TranslatorRegistry {
        &self.registry
    }

    /// Resolve everything a job needs for a pair. All configuration errors
    /// surface here.
    pub fn prepare(&self, pair: &LanguagePair, ignore_terms: &IgnoreTerms) -> Result<RunTranslator> {
        let capability = self.registry.resolve(pair)?;
        let guarded = GuardedTranslator::new(capability, self.config.call_policy());
        RunTranslator::for_pair(pair.clone(), &self.alphabets, ignore_terms, Arc::new(guarded))
    }

    /// Translate an in-memory document synchronously.
    pub fn translate_document(
        &self,
        document: &mut Document,
        pair: &LanguagePair,
        ignore_terms: &IgnoreTerms,
        progress: &ProgressTracker,
    ) -> Result<JobReport> {
        let runs = self.prepare(pair, ignore_terms)?;
        Ok(self.pipeline.run(document, &runs, progress).into())
    }

    /// Start a job in the background.
    ///
    /// Fails immediately, before any file is touched, if the language pair is
    /// not supported or its alphabet is unknown.
    pub fn submit(
        &self,
        request: JobRequest,
        on_progress: impl Fn(u8) + Send + Sync + 'static,
    ) -> Result<JobHandle> {
        let runs = self.prepare(&request.pair, &request.ignore_terms)?;

        let state = Arc::new(JobState {
            pair: request.pair.clone(),
            percent: AtomicU8::new(0),
            done: AtomicBool::new(false),
            faults: Mutex::new(FaultReport::default()),
            error: Mutex::new(None),
        });

        let job = Job {
            store: Arc::clone(&self.store),
            pipeline: Arc::clone(&self.pipeline),
            runs,
            request,
            state: Arc::clone(&state),
        };

        let worker = thread::Builder::new()
            .name("translate-job".to_string())
            .spawn(move || job.run(on_progress))?;

        Ok(JobHandle {
            monitor: JobMonitor { state },
            worker,
        })
    }
}

impl std::fmt::Debug for PresentationTranslator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresentationTranslator")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}

struct Job {
    store: Arc<dyn DocumentStore>,
    pipeline: Arc<TranslationPipeline>,
    runs: RunTranslator,
    request: JobRequest,
    state: Arc<JobState>,
}

impl Job {
    fn run(self, on_progress: impl Fn(u8) + Send + Sync + 'static) -> Result<JobReport> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.execute(on_progress)))
            .unwrap_or_else(|payload| Err(Error::JobPanicked(panic_message(payload.as_ref()))));

        match &outcome {
            Ok(report) => {
                log::info!(
                    "Translated {} runs across {} slides into {} ({} left untranslated)",
                    report.translated_runs,
                    report.slides,
                    self.request.output.display(),
                    report.faults.len()
                );
                *self.state.faults.lock() = report.faults.clone();
            }
            Err(e) => {
                log::error!("Translation of {} failed: {}", self.request.input.display(), e);
                *self.state.error.lock() = Some(e.to_string());
            }
        }
        self.state.done.store(true, Ordering::Release);

        outcome
    }

    fn execute(&self, on_progress: impl Fn(u8) + Send + Sync + 'static) -> Result<JobReport> {
        let JobRequest { input, output, .. } = &self.request;
        log::info!(
            "Starting {} translation of {}",
            self.request.pair,
            input.display()
        );

        self.store.copy(input, output)?;
        let mut document = self.store.load(output)?;

        let state = Arc::clone(&self.state);
        let tracker = ProgressTracker::new(document.slides.len()).with_callback(move |percent| {
            state.percent.store(percent, Ordering::Release);
            on_progress(percent);
        });

        let summary = self.pipeline.run(&mut document, &self.runs, &tracker);
        self.store.save(&document, output)?;

        Ok(summary.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TranslateError;
    use crate::types::{Paragraph, Shape, Slide, TextFrame, TextRun};
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct MemoryStore {
        documents: Mutex<HashMap<PathBuf, Document>>,
        loads: AtomicUsize,
        saves: AtomicUsize,
        fail_save: bool,
    }

    impl MemoryStore {
        fn with_document(path: &str, document: Document) -> Self {
            let store = Self::default();
            store.documents.lock().insert(PathBuf::from(path), document);
            store
        }

        fn get(&self, path: &str) -> Option<Document> {
            self.documents.lock().get(Path::new(path)).cloned()
        }
    }

    impl DocumentStore for MemoryStore {
        fn copy(&self, input: &Path, output: &Path) -> Result<()> {
            let mut documents = self.documents.lock();
            let document = documents
                .get(input)
                .cloned()
                .ok_or_else(|| Error::Persistence(format!("{} not found", input.display())))?;
            documents.insert(output.to_path_buf(), document);
            Ok(())
        }

        fn load(&self, path: &Path) -> Result<Document> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            self.documents
                .lock()
                .get(path)
                .cloned()
                .ok_or_else(|| Error::Document(format!("{} not found", path.display())))
        }

        fn save(&self, document: &Document, path: &Path) -> Result<()> {
            if self.fail_save {
                return Err(Error::Persistence("disk full".to_string()));
            }
            self.saves.fetch_add(1, Ordering::SeqCst);
            self.documents
                .lock()
                .insert(path.to_path_buf(), document.clone());
            Ok(())
        }
    }

    fn deck(slides: usize) -> Document {
        Document::new(
            (1..=slides)
                .map(|n| {
                    let frame = TextFrame::new(vec![Paragraph::new(vec![
                        TextRun::new(0, format!("Part{} about Acme", n)),
                        TextRun::new(1, "Привет"),
                    ])]);
                    Slide::new(n, format!("ppt/slides/slide{}.xml", n))
                        .with_shapes(vec![Shape::group("Group", vec![Shape::leaf("Body", Some(frame))])])
                })
                .collect(),
        )
    }

    fn en_ru() -> LanguagePair {
        LanguagePair::new("en", "ru").unwrap()
    }

    fn request(pair: LanguagePair) -> JobRequest {
        JobRequest {
            pair,
            input: PathBuf::from("in.pptx"),
            output: PathBuf::from("out/translated_in.pptx"),
            ignore_terms: IgnoreTerms::parse("Acme\n"),
        }
    }

    fn translator(store: Arc<MemoryStore>) -> PresentationTranslator {
        let registry = TranslatorRegistry::new().with(en_ru(), |text: &str| {
            if text.contains("7") {
                Err(TranslateError::Backend("bad input".to_string()))
            } else {
                Ok(format!("<{}>", text))
            }
        });
        let config = TranslateConfig {
            slide_workers: 3,
            shape_workers: 2,
            max_retries: 0,
            ..Default::default()
        };
        PresentationTranslator::new(registry, store, config).unwrap()
    }

    #[test]
    fn test_submit_translates_copy_and_reports_progress() {
        let store = Arc::new(MemoryStore::with_document("in.pptx", deck(10)));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let handle = translator(store.clone())
            .submit(request(en_ru()), move |p| sink.lock().push(p))
            .unwrap();
        let monitor = handle.monitor();
        let report = handle.wait().unwrap();

        assert_eq!(report.slides, 10);
        assert_eq!(report.translated_runs, 19);
        assert_eq!(report.faults.len(), 1);
        assert_eq!(report.faults.faults[0].slide, 7);
        assert_eq!(report.faults.faults[0].shape, "Group/Body");

        let output = store.get("out/translated_in.pptx").unwrap();
        assert_eq!(output.slides[0].runs()[0].text, "<Part1 about> Acme");
        assert_eq!(output.slides[0].runs()[1].text, "Привет");
        assert_eq!(output.slides[6].runs()[0].text, "Part7 about Acme");
        assert_eq!(store.get("in.pptx"), Some(deck(10)));
        assert_eq!(store.saves.load(Ordering::SeqCst), 1);

        assert!(monitor.is_done());
        assert_eq!(monitor.progress(), 100);
        assert_eq!(monitor.faults().len(), 1);
        assert_eq!(monitor.status().error, None);
        let seen = seen.lock();
        assert_eq!(seen.len(), 10);
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(seen.last(), Some(&100));
    }

    #[test]
    fn test_unsupported_pair_fails_before_touching_document() {
        let store = Arc::new(MemoryStore::with_document("in.pptx", deck(2)));
        let pair = LanguagePair::new("ru", "en").unwrap();

        let err = translator(store.clone()).submit(request(pair), |_| {}).unwrap_err();

        assert!(matches!(err, Error::UnsupportedLanguagePair { .. }));
        assert!(err.is_configuration());
        assert_eq!(store.loads.load(Ordering::SeqCst), 0);
        assert!(store.get("out/translated_in.pptx").is_none());
        assert_eq!(store.get("in.pptx"), Some(deck(2)));
    }

    #[test]
    fn test_unknown_alphabet_fails_at_submit() {
        let store = Arc::new(MemoryStore::with_document("in.pptx", deck(1)));
        let pair = LanguagePair::new("de", "ru").unwrap();
        let registry = TranslatorRegistry::new()
            .with(pair.clone(), |text: &str| Ok::<_, TranslateError>(text.to_string()));
        let translator =
            PresentationTranslator::new(registry, store.clone(), TranslateConfig::default()).unwrap();

        let err = translator.submit(request(pair), |_| {}).unwrap_err();
        assert!(matches!(err, Error::UnknownAlphabet(ref code) if code == "de"));
        assert_eq!(store.loads.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_save_failure_is_surfaced_and_job_still_done() {
        let mut store = MemoryStore::with_document("in.pptx", deck(3));
        store.fail_save = true;
        let store = Arc::new(store);

        let handle = translator(store.clone()).submit(request(en_ru()), |_| {}).unwrap();
        let monitor = handle.monitor();
        let err = handle.wait().unwrap_err();

        assert!(matches!(err, Error::Persistence(_)));
        assert!(monitor.is_done());
        assert_eq!(monitor.error().as_deref(), Some("Persistence error: disk full"));
    }

    #[test]
    fn test_missing_input_is_persistence_error() {
        let store = Arc::new(MemoryStore::default());
        let handle = translator(store.clone()).submit(request(en_ru()), |_| {}).unwrap();
        let monitor = handle.monitor();

        assert!(matches!(handle.wait(), Err(Error::Persistence(_))));
        assert!(monitor.status().done);
        assert_eq!(store.loads.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_concurrent_jobs_track_progress_independently() {
        let store = MemoryStore::with_document("a.pptx", deck(5));
        store.documents.lock().insert(PathBuf::from("b.pptx"), deck(40));
        let store = Arc::new(store);
        let translator = translator(store.clone());

        let submit = |input: &str, output: &str| {
            let mut req = request(en_ru());
            req.input = PathBuf::from(input);
            req.output = PathBuf::from(output);
            translator.submit(req, |_| {}).unwrap()
        };
        let a = submit("a.pptx", "a_out.pptx");
        let b = submit("b.pptx", "b_out.pptx");

        let (a_monitor, b_monitor) = (a.monitor(), b.monitor());
        assert_eq!(a.wait().unwrap().slides, 5);
        assert_eq!(b.wait().unwrap().slides, 40);
        assert_eq!(a_monitor.progress(), 100);
        assert_eq!(b_monitor.progress(), 100);
        assert_eq!(store.saves.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_translate_document_in_memory() {
        let store = Arc::new(MemoryStore::default());
        let mut document = deck(2);
        let tracker = ProgressTracker::new(2);

        let report = translator(store)
            .translate_document(&mut document, &en_ru(), &IgnoreTerms::default(), &tracker)
            .unwrap();

        assert_eq!(report.translated_runs, 4);
        assert_eq!(document.slides[1].runs()[0].text, "<Part2 about Acme>");
        assert_eq!(tracker.percent(), 100);
    }
}
