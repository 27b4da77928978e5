//! The seam between translation and a document container format.

use crate::error::{Error, Result};
use crate::types::Document;
use std::path::Path;

/// Loads presentation trees from a container file and writes translated runs back.
pub trait DocumentStore: Send + Sync {
    /// Put a copy of `input` at `output`; the job then works on the copy only.
    ///
    /// When both paths name the same file nothing is copied and the job
    /// translates the file in place.
    fn copy(&self, input: &Path, output: &Path) -> Result<()> {
        if same_file(input, output) {
            log::info!("{} is both input and output, translating in place", input.display());
            return Ok(());
        }
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::Persistence(format!("failed to create {}: {}", parent.display(), e))
            })?;
        }
        std::fs::copy(input, output).map_err(|e| {
            Error::Persistence(format!(
                "failed to copy {} to {}: {}",
                input.display(),
                output.display(),
                e
            ))
        })?;
        Ok(())
    }

    /// Read the slide tree of the document at `path`.
    fn load(&self, path: &Path) -> Result<Document>;

    /// Write the run texts of `document` into the file at `path`, which must be
    /// the file the document was loaded from. Called once per job.
    fn save(&self, document: &Document, path: &Path) -> Result<()>;
}

/// Whether both paths resolve to one existing file.
fn same_file(a: &Path, b: &Path) -> bool {
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
