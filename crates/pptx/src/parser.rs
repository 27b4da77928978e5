//! PPTX slide-tree parser.

use ppt_translate_core::{
    Document, Error, Paragraph, Result, Shape, Slide, TextFrame, TextRun,
};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::{Read, Seek};
use zip::ZipArchive;

const SLIDE_RELATIONSHIP: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";

/// Parser for PPTX (Office Open XML) files.
pub struct PptxParser;

impl PptxParser {
    /// Create a new PPTX parser.
    pub fn new() -> Self {
        Self
    }

    /// Parse the slide trees of a PPTX file from a reader.
    pub fn parse<R: Read + Seek>(&self, reader: R) -> Result<Document> {
        let mut archive = ZipArchive::new(reader)
            .map_err(|e| Error::Document(format!("Failed to open ZIP: {}", e)))?;

        let slide_order = self.get_slide_order(&mut archive)?;
        log::debug!("Found {} slides", slide_order.len());

        let mut slides = Vec::with_capacity(slide_order.len());
        for (idx, slide_path) in slide_order.iter().enumerate() {
            let content = read_file_from_archive(&mut archive, slide_path)?;
            let shapes = parse_shape_tree(&content)
                .map_err(|e| Error::Document(format!("{}: {}", slide_path, e)))?;
            slides.push(Slide::new(idx + 1, slide_path.as_str()).with_shapes(shapes));
        }

        Ok(Document::new(slides))
    }

    /// Get the ordered list of slide part paths.
    ///
    /// The order comes from `sldIdLst` in `ppt/presentation.xml`; if that is
    /// missing, slides are ordered by the number in their relationship id or
    /// file name.
    fn get_slide_order<R: Read + Seek>(&self, archive: &mut ZipArchive<R>) -> Result<Vec<String>> {
        let rels_content = read_file_from_archive(archive, "ppt/_rels/presentation.xml.rels")?;
        let relationships = parse_slide_relationships(&rels_content)?;

        let listed = match read_file_from_archive(archive, "ppt/presentation.xml") {
            Ok(content) => parse_slide_id_list(&content)?,
            Err(e) => {
                log::warn!("Falling back to relationship order: {}", e);
                Vec::new()
            }
        };

        if !listed.is_empty() {
            let by_id: HashMap<&str, &str> = relationships
                .iter()
                .map(|(id, path)| (id.as_str(), path.as_str()))
                .collect();
            let mut order = Vec::with_capacity(listed.len());
            for id in &listed {
                match by_id.get(id.as_str()) {
                    Some(path) => order.push(path.to_string()),
                    None => log::warn!("Slide id list references unknown relationship {}", id),
                }
            }
            return Ok(order);
        }

        let mut slides: Vec<(String, Option<usize>)> = relationships
            .into_iter()
            .map(|(id, path)| {
                let order_num = extract_slide_number(&id).or_else(|| extract_slide_number(&path));
                (path, order_num)
            })
            .collect();

        slides.sort_by(|a, b| match (a.1, b.1) {
            (Some(na), Some(nb)) => na.cmp(&nb),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.0.cmp(&b.0),
        });

        Ok(slides.into_iter().map(|(path, _)| path).collect())
    }
}

impl Default for PptxParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Read a file from the ZIP archive.
pub(crate) fn read_file_from_archive<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    path: &str,
) -> Result<String> {
    let mut file = archive
        .by_name(path)
        .map_err(|e| Error::Document(format!("File not found in archive '{}': {}", path, e)))?;

    let mut content = String::new();
    file.read_to_string(&mut content)
        .map_err(|e| Error::Document(format!("Failed to read '{}': {}", path, e)))?;

    Ok(content)
}

/// `(relationship id, part path)` of every slide relationship.
fn parse_slide_relationships(xml: &str) -> Result<Vec<(String, String)>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut slides = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"Relationship" =>
            {
                let id = attribute(e, b"Id").unwrap_or_default();
                let rel_type = attribute(e, b"Type").unwrap_or_default();
                let target = attribute(e, b"Target").unwrap_or_default();

                if rel_type == SLIDE_RELATIONSHIP {
                    let full_path = match target.strip_prefix('/') {
                        Some(absolute) => absolute.to_string(),
                        None => format!("ppt/{}", target),
                    };
                    slides.push((id, full_path));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::Document(format!(
                    "Error parsing relationships: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(slides)
}

/// Relationship ids of `p:sldId` entries, in presentation order.
fn parse_slide_id_list(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut ids = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"sldId" =>
            {
                let rel_id = e
                    .attributes()
                    .flatten()
                    .find(|a| local_name(a.key.as_ref()) == b"id" && a.key.as_ref() != b"id")
                    .map(|a| String::from_utf8_lossy(&a.value).to_string());
                if let Some(rel_id) = rel_id {
                    ids.push(rel_id);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::Document(format!(
                    "Error parsing presentation.xml: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(ids)
}

/// A shape under construction while its element is open.
#[derive(Debug, Default)]
struct ShapeBuilder {
    name: Option<String>,
    group: bool,
    children: Vec<Shape>,
    frame: Option<TextFrame>,
}

impl ShapeBuilder {
    fn build(self) -> Shape {
        let name = self.name.unwrap_or_else(|| "Unnamed".to_string());
        if self.group {
            Shape::group(name, self.children)
        } else {
            Shape::leaf(name, self.frame)
        }
    }
}

/// Build the shape tree of one slide part.
///
/// Runs are numbered in document order over every `a:r` in the part; the
/// writer relies on the same numbering.
pub(crate) fn parse_shape_tree(xml: &str) -> std::result::Result<Vec<Shape>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(false);

    let mut top_level = Vec::new();
    let mut stack: Vec<ShapeBuilder> = Vec::new();
    let mut run_counter = 0usize;
    let mut current_run: Option<TextRun> = None;
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(ref e) => match local_name(e.name().as_ref()) {
                b"grpSp" => stack.push(ShapeBuilder {
                    group: true,
                    ..Default::default()
                }),
                b"sp" | b"pic" | b"cxnSp" | b"graphicFrame" => stack.push(ShapeBuilder::default()),
                b"cNvPr" => name_shape(stack.last_mut(), e),
                b"txBody" => {
                    if let Some(shape) = stack.last_mut().filter(|s| !s.group) {
                        shape.frame.get_or_insert_with(TextFrame::default);
                    }
                }
                b"p" => push_paragraph(stack.last_mut()),
                b"r" => {
                    current_run = Some(TextRun::new(run_counter, String::new()));
                    run_counter += 1;
                }
                b"t" if current_run.is_some() => in_text = true,
                _ => {}
            },
            Event::Empty(ref e) => match local_name(e.name().as_ref()) {
                b"cNvPr" => name_shape(stack.last_mut(), e),
                b"p" => push_paragraph(stack.last_mut()),
                b"r" => {
                    push_run(stack.last_mut(), TextRun::new(run_counter, String::new()));
                    run_counter += 1;
                }
                _ => {}
            },
            Event::Text(ref e) if in_text => {
                if let Some(run) = current_run.as_mut() {
                    run.text.push_str(&e.unescape()?);
                }
            }
            Event::CData(ref e) if in_text => {
                if let Some(run) = current_run.as_mut() {
                    run.text.push_str(&String::from_utf8_lossy(e));
                }
            }
            Event::End(ref e) => match local_name(e.name().as_ref()) {
                b"grpSp" | b"sp" | b"pic" | b"cxnSp" | b"graphicFrame" => {
                    if let Some(builder) = stack.pop() {
                        let shape = builder.build();
                        match stack.last_mut() {
                            Some(parent) => parent.children.push(shape),
                            None => top_level.push(shape),
                        }
                    }
                }
                b"t" => in_text = false,
                b"r" => {
                    if let Some(run) = current_run.take() {
                        push_run(stack.last_mut(), run);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(top_level)
}

fn name_shape(shape: Option<&mut ShapeBuilder>, element: &BytesStart<'_>) {
    if let Some(shape) = shape.filter(|s| s.name.is_none()) {
        shape.name = attribute(element, b"name").or_else(|| attribute(element, b"id"));
    }
}

fn push_paragraph(shape: Option<&mut ShapeBuilder>) {
    if let Some(frame) = shape.and_then(|s| s.frame.as_mut()) {
        frame.paragraphs.push(Paragraph::default());
    }
}

/// Attach a run to the open paragraph. Runs outside any text frame are dropped,
/// which leaves them untouched on save.
fn push_run(shape: Option<&mut ShapeBuilder>, run: TextRun) {
    let paragraph = shape
        .and_then(|s| s.frame.as_mut())
        .and_then(|f| f.paragraphs.last_mut());
    if let Some(paragraph) = paragraph {
        paragraph.runs.push(run);
    }
}

fn attribute(element: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .map(|a| match a.unescape_value() {
            Ok(value) => value.to_string(),
            Err(_) => String::from_utf8_lossy(&a.value).to_string(),
        })
}

/// Extract the local name from a potentially namespaced XML element name.
pub(crate) fn local_name(name: &[u8]) -> &[u8] {
    if let Some(pos) = name.iter().position(|&b| b == b':') {
        &name[pos + 1..]
    } else {
        name
    }
}

/// Extract a slide number from a string like "rId2" or "slide3.xml".
fn extract_slide_number(s: &str) -> Option<usize> {
    let s = s.trim_end_matches(".xml").trim_end_matches(".rels");

    let digits: String = s.chars().rev().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let digits: String = digits.chars().rev().collect();
    digits.parse().ok()
}
