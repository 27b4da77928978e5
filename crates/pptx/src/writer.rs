//! Writes translated run texts back into a PPTX package.
//!
//! Only the text content of `a:t` elements changes. Every other part of the
//! package, including run properties, is copied as it was read.

use crate::parser::local_name;
use ppt_translate_core::{Document, Error, Result};
use quick_xml::events::{BytesText, Event};
use quick_xml::{Reader, Writer};
use std::collections::HashMap;
use std::io::{Cursor, Read, Seek, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Run texts of one slide part, keyed by run ordinal.
type RunTexts<'a> = HashMap<usize, &'a str>;

/// Rewrites slide parts of a package from a translated [`Document`].
pub struct PptxWriter;

impl PptxWriter {
    pub fn new() -> Self {
        Self
    }

    /// Copy the package in `source` to `sink`, replacing run texts with the
    /// ones held by `document`.
    pub fn write<R, W>(&self, source: R, sink: W, document: &Document) -> Result<()>
    where
        R: Read + Seek,
        W: Write + Seek,
    {
        let mut archive = ZipArchive::new(source).map_err(zip_error)?;
        let parts: HashMap<&str, RunTexts<'_>> = document
            .slides
            .iter()
            .map(|slide| {
                let texts = slide
                    .runs()
                    .into_iter()
                    .map(|run| (run.ordinal, run.text.as_str()))
                    .collect();
                (slide.part.as_str(), texts)
            })
            .collect();

        let mut zip = ZipWriter::new(sink);
        let mut rewritten_parts = 0usize;

        for i in 0..archive.len() {
            let name = archive.by_index_raw(i).map_err(zip_error)?.name().to_string();

            let rewritten = match parts.get(name.as_str()) {
                Some(texts) => {
                    let mut content = String::new();
                    archive
                        .by_index(i)
                        .map_err(zip_error)?
                        .read_to_string(&mut content)
                        .map_err(|e| Error::Document(format!("Failed to read '{}': {}", name, e)))?;
                    rewrite_slide_xml(&content, texts)
                        .map_err(|e| Error::Document(format!("{}: {}", name, e)))?
                }
                None => None,
            };

            match rewritten {
                Some(xml) => {
                    let options =
                        FileOptions::default().compression_method(CompressionMethod::Deflated);
                    zip.start_file(name.as_str(), options).map_err(zip_error)?;
                    zip.write_all(xml.as_bytes()).map_err(|e| {
                        Error::Persistence(format!("Failed to write '{}': {}", name, e))
                    })?;
                    rewritten_parts += 1;
                }
                None => {
                    let file = archive.by_index_raw(i).map_err(zip_error)?;
                    zip.raw_copy_file(file).map_err(zip_error)?;
                }
            }
        }

        zip.finish().map_err(zip_error)?;
        log::debug!("Rewrote {} slide parts", rewritten_parts);
        Ok(())
    }
}

impl Default for PptxWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn zip_error(e: zip::result::ZipError) -> Error {
    Error::Document(format!("ZIP error: {}", e))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Run,
    Text,
    Other,
}

impl Tag {
    fn of(name: &[u8]) -> Self {
        match local_name(name) {
            b"r" => Tag::Run,
            b"t" => Tag::Text,
            _ => Tag::Other,
        }
    }
}

/// Replace the `a:t` content of runs whose text differs from `texts`.
///
/// Returns `None` when nothing changed. Run ordinals count every `a:r` in the
/// part, the same way the parser numbers them.
fn rewrite_slide_xml(
    xml: &str,
    texts: &RunTexts<'_>,
) -> std::result::Result<Option<String>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(false);
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    let mut run_counter = 0usize;
    let mut current_run: Option<usize> = None;
    // Replacement, original text and buffered events of the open `a:t`.
    let mut pending: Option<(&str, String, Vec<Event<'_>>)> = None;
    let mut changed = false;

    loop {
        let event = reader.read_event()?;
        let tag = match &event {
            Event::Start(e) | Event::Empty(e) => Tag::of(e.name().as_ref()),
            Event::End(e) => Tag::of(e.name().as_ref()),
            _ => Tag::Other,
        };

        if let Some((replacement, mut original, mut buffered)) = pending.take() {
            match event {
                Event::End(_) if tag == Tag::Text => {
                    if original == replacement {
                        for buffered in buffered {
                            writer.write_event(buffered)?;
                        }
                    } else {
                        writer.write_event(Event::Text(BytesText::new(replacement)))?;
                        changed = true;
                    }
                    writer.write_event(event)?;
                }
                Event::Eof => break,
                other => {
                    match &other {
                        Event::Text(e) => original.push_str(&e.unescape()?),
                        Event::CData(e) => original.push_str(&String::from_utf8_lossy(e)),
                        _ => {}
                    }
                    buffered.push(other);
                    pending = Some((replacement, original, buffered));
                }
            }
            continue;
        }

        let replacement = current_run.and_then(|ordinal| texts.get(&ordinal).copied());

        match (event, tag) {
            (event @ Event::Start(_), Tag::Run) => {
                current_run = Some(run_counter);
                run_counter += 1;
                writer.write_event(event)?;
            }
            (event @ Event::Empty(_), Tag::Run) => {
                run_counter += 1;
                writer.write_event(event)?;
            }
            (event @ Event::End(_), Tag::Run) => {
                current_run = None;
                writer.write_event(event)?;
            }
            (event @ Event::Start(_), Tag::Text) => {
                if let Some(replacement) = replacement {
                    pending = Some((replacement, String::new(), Vec::new()));
                }
                writer.write_event(event)?;
            }
            (Event::Empty(start), Tag::Text) => match replacement.filter(|t| !t.is_empty()) {
                Some(replacement) => {
                    let end = start.to_end().into_owned();
                    writer.write_event(Event::Start(start))?;
                    writer.write_event(Event::Text(BytesText::new(replacement)))?;
                    writer.write_event(Event::End(end))?;
                    changed = true;
                }
                None => writer.write_event(Event::Empty(start))?,
            },
            (Event::Eof, _) => break,
            (event, _) => writer.write_event(event)?,
        }
    }

    if !changed {
        return Ok(None);
    }
    let bytes = writer.into_inner().into_inner();
    Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(entries: &[(usize, &'static str)]) -> RunTexts<'static> {
        entries.iter().copied().collect()
    }

    #[test]
    fn test_unchanged_part_is_not_rewritten() {
        let xml = r#"<a:p><a:r><a:rPr b="1"/><a:t>Tom &amp; Jerry</a:t></a:r></a:p>"#;
        let result = rewrite_slide_xml(xml, &texts(&[(0, "Tom & Jerry")])).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_replaces_text_and_keeps_properties() {
        let xml = r#"<a:p><a:r><a:rPr lang="en-US" b="1"/><a:t>Hello</a:t></a:r><a:r><a:rPr i="1"/><a:t xml:space="preserve"> there</a:t></a:r></a:p>"#;
        let result = rewrite_slide_xml(xml, &texts(&[(0, "Привет"), (1, " there")]))
            .unwrap()
            .unwrap();
        assert_eq!(
            result,
            r#"<a:p><a:r><a:rPr lang="en-US" b="1"/><a:t>Привет</a:t></a:r><a:r><a:rPr i="1"/><a:t xml:space="preserve"> there</a:t></a:r></a:p>"#
        );
    }

    #[test]
    fn test_replacement_is_escaped() {
        let xml = r#"<a:r><a:t>x</a:t></a:r>"#;
        let result = rewrite_slide_xml(xml, &texts(&[(0, "a < b & c")]))
            .unwrap()
            .unwrap();
        assert_eq!(result, r#"<a:r><a:t>a &lt; b &amp; c</a:t></a:r>"#);
    }

    #[test]
    fn test_field_text_is_left_alone() {
        let xml = r#"<a:p><a:fld type="slidenum"><a:t>2</a:t></a:fld><a:r><a:t>one</a:t></a:r></a:p>"#;
        let result = rewrite_slide_xml(xml, &texts(&[(0, "один")]))
            .unwrap()
            .unwrap();
        assert_eq!(
            result,
            r#"<a:p><a:fld type="slidenum"><a:t>2</a:t></a:fld><a:r><a:t>один</a:t></a:r></a:p>"#
        );
    }

    #[test]
    fn test_empty_text_element_is_filled() {
        let xml = r#"<a:r><a:rPr/><a:t/></a:r>"#;
        let result = rewrite_slide_xml(xml, &texts(&[(0, "filled")]))
            .unwrap()
            .unwrap();
        assert_eq!(result, r#"<a:r><a:rPr/><a:t>filled</a:t></a:r>"#);
    }
}
