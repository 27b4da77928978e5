//! Tunables for the translation pipeline and the translate call site.

use crate::capability::CallPolicy;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Pipeline and call-site settings. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslateConfig {
    /// Slides translated concurrently.
    pub slide_workers: usize,

    /// Shape tasks (at any nesting depth) running concurrently.
    pub shape_workers: usize,

    /// Per-attempt timeout of a translate call, in seconds, enforced by the
    /// backend. 0 disables it.
    pub call_timeout_secs: u64,

    /// Retries after a failed translate call.
    pub max_retries: u32,

    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            slide_workers: 8,
            shape_workers: 8,
            call_timeout_secs: 120,
            max_retries: 2,
            initial_backoff_ms: 250,
            max_backoff_ms: 4000,
        }
    }
}

impl TranslateConfig {
    pub fn validate(&self) -> Result<()> {
        if self.slide_workers == 0 {
            return Err(Error::Config("slide_workers must be at least 1".to_string()));
        }
        if self.shape_workers == 0 {
            return Err(Error::Config("shape_workers must be at least 1".to_string()));
        }
        if self.initial_backoff_ms > self.max_backoff_ms {
            return Err(Error::Config(format!(
                "initial_backoff_ms ({}) exceeds max_backoff_ms ({})",
                self.initial_backoff_ms, self.max_backoff_ms
            )));
        }
        Ok(())
    }

    /// Per-call timeout handed to translate backends. `None` when disabled.
    pub fn call_timeout(&self) -> Option<Duration> {
        (self.call_timeout_secs > 0).then(|| Duration::from_secs(self.call_timeout_secs))
    }

    pub fn call_policy(&self) -> CallPolicy {
        CallPolicy {
            max_retries: self.max_retries,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
        }
    }
}
