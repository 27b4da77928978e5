//! Slide-completion progress for a translation job.

use parking_lot::Mutex;

/// Callback receiving the job's completion percentage (0..=100).
pub type ProgressCallback = Box<dyn Fn(u8) + Send + Sync>;

#[derive(Debug, Default)]
struct Counter {
    processed: usize,
    percent: u8,
}

/// Thread-safe slide counter reporting a monotonically increasing percentage.
///
/// The callback runs while the counter lock is held, so every observer sees a
/// non-decreasing sequence of values.
pub struct ProgressTracker {
    total: usize,
    counter: Mutex<Counter>,
    callback: Option<ProgressCallback>,
}

impl ProgressTracker {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            counter: Mutex::new(Counter::default()),
            callback: None,
        }
    }

    pub fn with_callback(mut self, callback: impl Fn(u8) + Send + Sync + 'static) -> Self {
        self.callback = Some(Box::new(callback));
        self
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn processed(&self) -> usize {
        self.counter.lock().processed
    }

    pub fn percent(&self) -> u8 {
        self.counter.lock().percent
    }

    /// Record one completed slide and return the new percentage.
    pub fn complete_slide(&self) -> u8 {
        let mut counter = self.counter.lock();
        if counter.processed >= self.total {
            log::warn!(
                "Ignoring slide completion beyond total of {} slides",
                self.total
            );
            return counter.percent;
        }

        counter.processed += 1;
        counter.percent = if counter.processed == self.total {
            100
        } else {
            (counter.processed * 100 / self.total) as u8
        };

        if let Some(callback) = &self.callback {
            callback(counter.percent);
        }
        counter.percent
    }

    /// Force 100% for a job that had nothing left to count (e.g. no slides).
    pub fn finish(&self) {
        let mut counter = self.counter.lock();
        if counter.percent == 100 {
            return;
        }
        counter.percent = 100;
        if let Some(callback) = &self.callback {
            callback(100);
        }
    }
}

impl std::fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counter = self.counter.lock();
        f.debug_struct("ProgressTracker")
            .field("total", &self.total)
            .field("processed", &counter.processed)
            .field("percent", &counter.percent)
            .finish()
    }
}
