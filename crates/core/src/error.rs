//! Error types for presentation translation.

use std::time::Duration;
use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Job-level errors.
///
/// Configuration errors are raised before any document is touched. Persistence
/// and document errors end a running job. Failures local to a single text run
/// never surface here; they are collected as [`UnitFault`](crate::UnitFault)s.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to read or write a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No translate capability is registered for the language pair.
    #[error("Unsupported language pair: {source_lang} -> {target_lang}")]
    UnsupportedLanguagePair {
        source_lang: String,
        target_lang: String,
    },

    /// The language pair is unset or degenerate.
    #[error("Invalid language pair: {0}")]
    InvalidLanguagePair(String),

    /// No alphabet is known for a language code, so its text cannot be classified.
    #[error("No alphabet registered for language '{0}'")]
    UnknownAlphabet(String),

    /// Invalid configuration value.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A worker pool could not be created.
    #[error("Worker pool error: {0}")]
    WorkerPool(String),

    /// Copying the source document or saving the translated one failed.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// The document container could not be read or is corrupted.
    #[error("Document error: {0}")]
    Document(String),

    /// The background job thread panicked.
    #[error("Translation job panicked: {0}")]
    JobPanicked(String),
}

impl Error {
    /// Whether this error was raised while setting up a job rather than running it.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedLanguagePair { .. }
                | Error::InvalidLanguagePair(_)
                | Error::UnknownAlphabet(_)
                | Error::Config(_)
                | Error::WorkerPool(_)
        )
    }
}

/// Errors returned by a translate capability.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranslateError {
    /// The backend rejected or failed the request.
    #[error("Translation backend error: {0}")]
    Backend(String),

    /// The call did not finish within the configured timeout.
    #[error("Translation timed out after {0:?}")]
    Timeout(Duration),

    /// The call's worker thread went away without producing a result.
    #[error("Translation call was abandoned")]
    Disconnected,
}
