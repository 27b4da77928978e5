//! Concurrent traversal of the presentation tree.
//!
//! Slides are pulled from a shared queue by a fixed number of slide workers.
//! Every slide opens a scope on one shared shape pool; group shapes spawn their
//! children into the same scope, so total shape concurrency is bounded by the
//! pool size regardless of nesting depth. A slide counts as complete only when
//! its scope has joined.

use crate::config::TranslateConfig;
use crate::error::{Error, Result};
use crate::progress::ProgressTracker;
use crate::run::RunTranslator;
use crate::types::{Document, FaultReport, Shape, ShapeKind, Slide, TextFrame, UnitFault};
use parking_lot::Mutex;
use rayon::{Scope, ThreadPool, ThreadPoolBuilder};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

/// Outcome of one pipeline pass over a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineSummary {
    pub slides: usize,
    pub translated_runs: usize,
    pub faults: FaultReport,
}

/// Bounded worker pools for translating documents.
///
/// One pipeline can serve many jobs; each job brings its own
/// [`ProgressTracker`].
pub struct TranslationPipeline {
    slide_workers: usize,
    shape_pool: ThreadPool,
}

impl TranslationPipeline {
    pub fn new(slide_workers: usize, shape_workers: usize) -> Result<Self> {
        if slide_workers == 0 || shape_workers == 0 {
            return Err(Error::Config(
                "worker counts must be at least 1".to_string(),
            ));
        }

        let shape_pool = ThreadPoolBuilder::new()
            .num_threads(shape_workers)
            .thread_name(|i| format!("shape-worker-{}", i))
            .build()
            .map_err(|e| Error::WorkerPool(e.to_string()))?;

        Ok(Self {
            slide_workers,
            shape_pool,
        })
    }

    pub fn from_config(config: &TranslateConfig) -> Result<Self> {
        config.validate()?;
        Self::new(config.slide_workers, config.shape_workers)
    }

    pub fn slide_workers(&self) -> usize {
        self.slide_workers
    }

    pub fn shape_workers(&self) -> usize {
        self.shape_pool.current_num_threads()
    }

    /// Translate every run of `document` in place.
    ///
    /// Run failures are recorded in the summary and leave the run untouched;
    /// they never stop other runs, shapes or slides.
    pub fn run(
        &self,
        document: &mut Document,
        runs: &RunTranslator,
        progress: &ProgressTracker,
    ) -> PipelineSummary {
        let slides = document.slides.len();
        let queue = Mutex::new(document.slides.iter_mut());
        let faults = Mutex::new(Vec::new());
        let translated = AtomicUsize::new(0);
        let workers = self.slide_workers.min(slides);

        log::info!(
            "Translating {} slides ({}) with {} slide workers and {} shape workers",
            slides,
            runs.pair(),
            workers,
            self.shape_workers()
        );

        thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| loop {
                    let Some(slide) = queue.lock().next() else {
                        break;
                    };
                    let ctx = TaskContext {
                        slide: slide.number,
                        runs,
                        faults: &faults,
                        translated: &translated,
                    };
                    self.translate_slide(slide, ctx);
                    let percent = progress.complete_slide();
                    log::debug!("Slide {} done ({}%)", slide.number, percent);
                });
            }
        });

        if slides == 0 {
            progress.finish();
        }

        let mut report = FaultReport {
            faults: faults.into_inner(),
        };
        report.sort();

        PipelineSummary {
            slides,
            translated_runs: translated.into_inner(),
            faults: report,
        }
    }

    /// Runs all shape tasks of a slide and returns once every one of them,
    /// including nested group children, has finished.
    fn translate_slide(&self, slide: &mut Slide, ctx: TaskContext<'_>) {
        self.shape_pool.scope(|scope| {
            for shape in slide.shapes.iter_mut() {
                scope.spawn(move |scope| visit_shape(scope, shape, String::new(), ctx));
            }
        });
    }
}

impl std::fmt::Debug for TranslationPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationPipeline")
            .field("slide_workers", &self.slide_workers)
            .field("shape_workers", &self.shape_workers())
            .finish()
    }
}

#[derive(Clone, Copy)]
struct TaskContext<'a> {
    slide: usize,
    runs: &'a RunTranslator,
    faults: &'a Mutex<Vec<UnitFault>>,
    translated: &'a AtomicUsize,
}

impl TaskContext<'_> {
    fn record(&self, fault: UnitFault) {
        log::warn!("Left untranslated: {}", fault);
        self.faults.lock().push(fault);
    }
}

/// One shape task. Panics are caught here and recorded against the shape.
fn visit_shape<'s>(scope: &Scope<'s>, shape: &'s mut Shape, parent: String, ctx: TaskContext<'s>) {
    let Shape { name, kind } = shape;
    let path = if parent.is_empty() {
        name.clone()
    } else {
        format!("{}/{}", parent, name)
    };

    let outcome = {
        let path = &path;
        panic::catch_unwind(AssertUnwindSafe(move || match { kind } {
            ShapeKind::Group(children) => {
                log::trace!("Slide {}: expanding group '{}'", ctx.slide, path);
                for child in children {
                    let parent = path.clone();
                    scope.spawn(move |scope| visit_shape(scope, child, parent, ctx));
                }
            }
            ShapeKind::Leaf(Some(frame)) => translate_frame(frame, path, ctx),
            ShapeKind::Leaf(None) => {}
        }))
    };

    if let Err(payload) = outcome {
        ctx.record(UnitFault {
            slide: ctx.slide,
            shape: path,
            paragraph: None,
            run: None,
            message: format!("shape task panicked: {}", panic_message(payload.as_ref())),
        });
    }
}

fn translate_frame(frame: &mut TextFrame, path: &str, ctx: TaskContext<'_>) {
    for (paragraph_idx, paragraph) in frame.paragraphs.iter_mut().enumerate() {
        for (run_idx, run) in paragraph.runs.iter_mut().enumerate() {
            match ctx.runs.translate_run(run) {
                Ok(true) => {
                    ctx.translated.fetch_add(1, Ordering::Relaxed);
                }
                Ok(false) => {}
                Err(e) => ctx.record(UnitFault {
                    slide: ctx.slide,
                    shape: path.to_string(),
                    paragraph: Some(paragraph_idx),
                    run: Some(run_idx),
                    message: e.to_string(),
                }),
            }
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
