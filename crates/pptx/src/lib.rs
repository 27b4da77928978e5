//! PPTX (Office Open XML) document store.
//!
//! Loads the shape/paragraph/run tree of every slide in presentation order and
//! writes translated run texts back, leaving run formatting and all other
//! package parts as they were.

pub mod parser;
pub mod writer;

#[cfg(test)]
mod fixtures;

pub use parser::PptxParser;
pub use writer::PptxWriter;

use ppt_translate_core::{Document, DocumentStore, Error, Result};
use std::fs::{self, File};
use std::io::{BufReader, Cursor, Read};
use std::path::Path;

/// ZIP local file header magic.
const ZIP_MAGIC: &[u8; 4] = b"PK\x03\x04";

/// [`DocumentStore`] over `.pptx` files on disk.
#[derive(Default)]
pub struct PptxStore {
    parser: PptxParser,
    writer: PptxWriter,
}

impl PptxStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for PptxStore {
    fn load(&self, path: &Path) -> Result<Document> {
        let mut file = File::open(path).map_err(|e| {
            Error::Persistence(format!("failed to open {}: {}", path.display(), e))
        })?;

        let mut magic = [0u8; 4];
        let is_zip = file.read_exact(&mut magic).is_ok() && &magic == ZIP_MAGIC;
        if !is_zip {
            return Err(Error::Document(format!(
                "{} is not a PPTX file",
                path.display()
            )));
        }

        let file = File::open(path).map_err(|e| {
            Error::Persistence(format!("failed to open {}: {}", path.display(), e))
        })?;
        let document = self.parser.parse(BufReader::new(file))?;
        log::info!(
            "Loaded {} slides from {}",
            document.slides.len(),
            path.display()
        );
        Ok(document)
    }

    fn save(&self, document: &Document, path: &Path) -> Result<()> {
        let original = fs::read(path).map_err(|e| {
            Error::Persistence(format!("failed to read {}: {}", path.display(), e))
        })?;

        let mut rewritten = Cursor::new(Vec::with_capacity(original.len()));
        self.writer
            .write(Cursor::new(original), &mut rewritten, document)?;

        fs::write(path, rewritten.into_inner()).map_err(|e| {
            Error::Persistence(format!("failed to write {}: {}", path.display(), e))
        })?;
        log::info!("Saved {}", path.display());
        Ok(())
    }
}
