//! Translate capabilities, the per-pair registry and the guarded call site.

use crate::error::{Error, Result, TranslateError};
use crate::types::LanguagePair;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Text-to-text translation for one fixed language pair.
///
/// Calls are blocking; a pipeline worker stays occupied for the whole call.
/// Implementations bound their own call duration (an HTTP client timeout, for
/// instance) and report an overrun as [`TranslateError::Timeout`].
pub trait Translate: Send + Sync {
    fn translate(&self, text: &str) -> std::result::Result<String, TranslateError>;
}

impl<F> Translate for F
where
    F: Fn(&str) -> std::result::Result<String, TranslateError> + Send + Sync,
{
    fn translate(&self, text: &str) -> std::result::Result<String, TranslateError> {
        self(text)
    }
}

/// Maps language pairs to translate capabilities.
#[derive(Clone, Default)]
pub struct TranslatorRegistry {
    translators: HashMap<LanguagePair, Arc<dyn Translate>>,
}

impl TranslatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the capability for a pair.
    pub fn register(&mut self, pair: LanguagePair, translator: impl Translate + 'static) {
        self.register_arc(pair, Arc::new(translator));
    }

    pub fn register_arc(&mut self, pair: LanguagePair, translator: Arc<dyn Translate>) {
        log::debug!("Registered translator for {}", pair);
        self.translators.insert(pair, translator);
    }

    pub fn with(mut self, pair: LanguagePair, translator: impl Translate + 'static) -> Self {
        self.register(pair, translator);
        self
    }

    /// Resolve the capability for a pair.
    pub fn resolve(&self, pair: &LanguagePair) -> Result<Arc<dyn Translate>> {
        self.translators
            .get(pair)
            .cloned()
            .ok_or_else(|| Error::UnsupportedLanguagePair {
                source_lang: pair.source.clone(),
                target_lang: pair.target.clone(),
            })
    }

    pub fn supports(&self, pair: &LanguagePair) -> bool {
        self.translators.contains_key(pair)
    }

    /// Registered pairs, sorted.
    pub fn pairs(&self) -> Vec<LanguagePair> {
        let mut pairs: Vec<_> = self.translators.keys().cloned().collect();
        pairs.sort_by(|a, b| (&a.source, &a.target).cmp(&(&b.source, &b.target)));
        pairs
    }
}

impl std::fmt::Debug for TranslatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslatorRegistry")
            .field("pairs", &self.pairs())
            .finish()
    }
}

/// Retry policy applied to every translate call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallPolicy {
    /// Retries after the first failed attempt.
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(4),
        }
    }
}

/// Wraps a capability with bounded retries and exponential backoff.
///
/// Attempts run one after another on the calling thread, so a worker never has
/// more than one backend call in flight. A panicking backend is reported as
/// [`TranslateError::Disconnected`].
pub struct GuardedTranslator {
    inner: Arc<dyn Translate>,
    policy: CallPolicy,
}

impl GuardedTranslator {
    pub fn new(inner: Arc<dyn Translate>, policy: CallPolicy) -> Self {
        Self { inner, policy }
    }

    fn call_once(&self, text: &str) -> std::result::Result<String, TranslateError> {
        panic::catch_unwind(AssertUnwindSafe(|| self.inner.translate(text))).unwrap_or_else(|_| {
            log::warn!("Translate backend panicked");
            Err(TranslateError::Disconnected)
        })
    }
}

impl Translate for GuardedTranslator {
    fn translate(&self, text: &str) -> std::result::Result<String, TranslateError> {
        let mut backoff = self.policy.initial_backoff;
        let mut attempt = 0;

        loop {
            match self.call_once(text) {
                Ok(translated) => return Ok(translated),
                Err(e) if attempt >= self.policy.max_retries => return Err(e),
                Err(e) => {
                    attempt += 1;
                    log::warn!(
                        "Translate attempt {} of {} failed: {}. Retrying in {:?}",
                        attempt,
                        self.policy.max_retries + 1,
                        e,
                        backoff
                    );
                    thread::sleep(backoff);
                    backoff = (backoff * 2).min(self.policy.max_backoff);
                }
            }
        }
    }
}
