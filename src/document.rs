/*!
 * XLIFF 1.2 document adapter.
 *
 * Reads the `trans-unit` elements of a bilingual document into segments and
 * writes translated segments back. Only the inner text of `<target>` elements
 * is rewritten; every other byte of the file is preserved.
 *
 * A unit is translatable when it has a `<target>` element of its own (possibly
 * empty or self-closing) and a plain-text `<source>`. Targets nested deeper,
 * such as the suggestions inside `<alt-trans>`, never count. Units whose source
 * carries inline markup are left untouched.
 */

use log::debug;
use quick_xml::escape::partial_escape;
use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::fmt::Display;
use std::ops::Range;

use crate::errors::DocumentError;
use crate::translation::Segment;

/// Where a unit's target text lives in the document
#[derive(Debug, Clone, PartialEq, Eq)]
enum TargetSlot {
    /// Byte range of the text between `<target ...>` and `</target>`
    Inner(Range<usize>),
    /// Byte range of a whole `<target .../>` element
    SelfClosing(Range<usize>),
}

/// A translatable unit found in the document
#[derive(Debug, Clone, PartialEq, Eq)]
struct TransUnit {
    id: String,
    source: String,
    existing_target: Option<String>,
    slot: TargetSlot,
}

/// Which child of the open unit is being read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reading {
    Nothing,
    Source,
    Target,
}

/// A `trans-unit` whose end tag has not been reached yet
#[derive(Debug)]
struct OpenUnit {
    id: String,
    offset: usize,
    // Element depth of the <trans-unit> itself
    depth: usize,
    source: Option<String>,
    inline_markup: bool,
    target_text: Option<String>,
    target_inner_start: usize,
    slot: Option<TargetSlot>,
    reading: Reading,
}

impl OpenUnit {
    fn new(id: String, offset: usize, depth: usize) -> Self {
        Self {
            id,
            offset,
            depth,
            source: None,
            inline_markup: false,
            target_text: None,
            target_inner_start: 0,
            slot: None,
            reading: Reading::Nothing,
        }
    }

    fn is_child(&self, depth: usize) -> bool {
        depth == self.depth + 1
    }

    // @handles: An element opening inside the unit
    fn open_child(&mut self, name: &[u8], depth: usize, tag: Range<usize>, empty: bool) {
        if self.reading == Reading::Source {
            self.inline_markup = true;
            return;
        }
        if !self.is_child(depth) {
            return;
        }

        match (name, empty) {
            (b"source", _) if self.source.is_none() => {
                self.source = Some(String::new());
                if !empty {
                    self.reading = Reading::Source;
                }
            }
            (b"target", false) if self.slot.is_none() && self.reading == Reading::Nothing => {
                self.target_text = Some(String::new());
                self.target_inner_start = tag.end;
                self.reading = Reading::Target;
            }
            (b"target", true) if self.slot.is_none() && self.reading == Reading::Nothing => {
                self.slot = Some(TargetSlot::SelfClosing(tag));
            }
            _ => {}
        }
    }

    // @handles: An element closing inside the unit
    fn close_child(&mut self, name: &[u8], depth: usize, tag: Range<usize>) {
        if !self.is_child(depth) {
            return;
        }
        match (name, self.reading) {
            (b"source", Reading::Source) => self.reading = Reading::Nothing,
            (b"target", Reading::Target) => {
                self.slot = Some(TargetSlot::Inner(self.target_inner_start..tag.start));
                self.reading = Reading::Nothing;
            }
            _ => {}
        }
    }

    fn push_text(&mut self, text: &str) {
        let buffer = match self.reading {
            Reading::Source => self.source.as_mut(),
            Reading::Target => self.target_text.as_mut(),
            Reading::Nothing => None,
        };
        if let Some(buffer) = buffer {
            buffer.push_str(text);
        }
    }

    // @returns: The finished unit, or None when it is not translatable
    fn finish(self) -> Result<Option<TransUnit>, DocumentError> {
        let Some(slot) = self.slot else {
            debug!("Unit '{}' has no target element, left untouched", self.id);
            return Ok(None);
        };

        let source = self.source.ok_or_else(|| DocumentError::MalformedUnit {
            offset: self.offset,
            reason: format!("unit '{}' has no source element", self.id),
        })?;

        if self.inline_markup {
            debug!("Unit '{}' has inline markup in its source, left untouched", self.id);
            return Ok(None);
        }

        let existing_target = match slot {
            TargetSlot::Inner(_) => self.target_text,
            TargetSlot::SelfClosing(_) => None,
        };

        Ok(Some(TransUnit {
            id: self.id,
            source,
            existing_target,
            slot,
        }))
    }
}

/// An XLIFF 1.2 document held in memory
#[derive(Debug, Clone)]
pub struct XliffDocument {
    content: String,
    units: Vec<TransUnit>,
    source_language: Option<String>,
    target_language: Option<String>,
    skipped_units: usize,
}

impl XliffDocument {
    /// Parse a document
    pub fn parse(content: impl Into<String>) -> Result<Self, DocumentError> {
        let content = content.into();

        let mut units = Vec::new();
        let mut skipped_units = 0;
        let mut seen_root = false;
        let mut file_languages: Option<(Option<String>, Option<String>)> = None;
        let mut open_unit: Option<OpenUnit> = None;
        let mut depth = 0usize;

        let mut reader = Reader::from_str(&content);
        reader.trim_text(false);

        loop {
            let event = reader
                .read_event()
                .map_err(|e| xml_error(e, reader.buffer_position()))?;
            let position = reader.buffer_position();

            match event {
                Event::Start(element) | Event::Empty(element) if element.local_name().as_ref() == b"trans-unit" => {
                    let tag = tag_range(&content, position);
                    if open_unit.is_some() {
                        return Err(DocumentError::MalformedUnit {
                            offset: tag.start,
                            reason: "nested trans-unit".to_string(),
                        });
                    }

                    let id = attribute(&element, "id")?.ok_or_else(|| DocumentError::MalformedUnit {
                        offset: tag.start,
                        reason: "trans-unit without id".to_string(),
                    })?;

                    if content[tag.clone()].ends_with("/>") {
                        debug!("Unit '{}' is empty, left untouched", id);
                        skipped_units += 1;
                    } else {
                        open_unit = Some(OpenUnit::new(id, tag.start, depth));
                        depth += 1;
                    }
                }
                Event::Start(element) => {
                    observe_element(&element, &mut seen_root, &mut file_languages)?;
                    if let Some(unit) = open_unit.as_mut() {
                        unit.open_child(element.local_name().as_ref(), depth, tag_range(&content, position), false);
                    }
                    depth += 1;
                }
                Event::Empty(element) => {
                    observe_element(&element, &mut seen_root, &mut file_languages)?;
                    if let Some(unit) = open_unit.as_mut() {
                        unit.open_child(element.local_name().as_ref(), depth, tag_range(&content, position), true);
                    }
                }
                Event::End(element) => {
                    depth = depth.saturating_sub(1);
                    let name = element.local_name();

                    match open_unit.take() {
                        Some(unit) if unit.depth == depth && name.as_ref() == b"trans-unit" => {
                            match unit.finish()? {
                                Some(finished) => units.push(finished),
                                None => skipped_units += 1,
                            }
                        }
                        Some(mut unit) => {
                            unit.close_child(name.as_ref(), depth, tag_range(&content, position));
                            open_unit = Some(unit);
                        }
                        None => {}
                    }
                }
                Event::Text(text) => {
                    if let Some(unit) = open_unit.as_mut().filter(|u| u.reading != Reading::Nothing) {
                        let decoded = text.unescape().map_err(|e| DocumentError::MalformedUnit {
                            offset: unit.offset,
                            reason: format!("unit '{}': {}", unit.id, e),
                        })?;
                        unit.push_text(&decoded);
                    }
                }
                Event::CData(data) => {
                    if let Some(unit) = open_unit.as_mut() {
                        unit.push_text(&String::from_utf8_lossy(&data));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !seen_root {
            return Err(DocumentError::InvalidDocument("no <xliff> root element".to_string()));
        }

        let (source_language, target_language) = file_languages.unwrap_or((None, None));

        Ok(Self {
            content,
            units,
            source_language,
            target_language,
            skipped_units,
        })
    }

    /// `source-language` attribute of the first `<file>` element
    pub fn source_language(&self) -> Option<&str> {
        self.source_language.as_deref()
    }

    /// `target-language` attribute of the first `<file>` element
    pub fn target_language(&self) -> Option<&str> {
        self.target_language.as_deref()
    }

    /// Number of translatable units
    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    /// Number of units found but not translatable
    pub fn skipped_units(&self) -> usize {
        self.skipped_units
    }

    /// Translatable units as untranslated segments, in document order
    pub fn segments(&self) -> Vec<Segment> {
        self.units
            .iter()
            .enumerate()
            .map(|(position, unit)| Segment::new(unit.id.clone(), unit.source.clone(), position))
            .collect()
    }

    /// Current target text of a unit, if it has one
    pub fn existing_target(&self, id: &str) -> Option<&str> {
        self.units
            .iter()
            .find(|unit| unit.id == id)
            .and_then(|unit| unit.existing_target.as_deref())
    }

    /// Write segment targets back into the document
    ///
    /// Segments are matched to units by position and must carry the same id.
    /// Segments without a target leave their unit unchanged. Returns the number
    /// of units written.
    pub fn apply(&mut self, segments: &[Segment]) -> Result<usize, DocumentError> {
        let mut edits: Vec<(Range<usize>, String)> = Vec::new();

        for segment in segments {
            let Some(target) = &segment.target else {
                continue;
            };

            let unit = self.units.get(segment.position).filter(|u| u.id == segment.id).ok_or_else(|| {
                DocumentError::InvalidDocument(format!(
                    "segment '{}' at position {} does not belong to this document",
                    segment.id, segment.position
                ))
            })?;

            let edit = match &unit.slot {
                TargetSlot::Inner(range) => (range.clone(), partial_escape(target.as_str()).into_owned()),
                TargetSlot::SelfClosing(span) => (span.clone(), expand_target(&self.content[span.clone()], target)?),
            };
            edits.push(edit);
        }

        // Apply back to front so earlier offsets stay valid
        edits.sort_by_key(|(range, _)| std::cmp::Reverse(range.start));
        let written = edits.len();
        for (range, replacement) in edits {
            self.content.replace_range(range, &replacement);
        }

        // Offsets are stale after editing
        *self = Self::parse(self.content.clone())?;

        Ok(written)
    }

    /// The document text
    pub fn as_str(&self) -> &str {
        &self.content
    }

    /// Consume the document, returning its text
    pub fn into_string(self) -> String {
        self.content
    }
}

// @handles: Elements outside units that carry document-level information
fn observe_element(
    element: &BytesStart,
    seen_root: &mut bool,
    file_languages: &mut Option<(Option<String>, Option<String>)>,
) -> Result<(), DocumentError> {
    match element.local_name().as_ref() {
        b"xliff" => *seen_root = true,
        b"file" if file_languages.is_none() => {
            *file_languages = Some((
                attribute(element, "source-language")?,
                attribute(element, "target-language")?,
            ));
        }
        _ => {}
    }
    Ok(())
}

/// Byte range of the tag that ends at `end`
///
/// `<` cannot appear inside a tag, so the last one before `end` opens it.
fn tag_range(content: &str, end: usize) -> Range<usize> {
    let start = content[..end].rfind('<').unwrap_or(0);
    start..end
}

fn attribute(element: &BytesStart, name: &str) -> Result<Option<String>, DocumentError> {
    let attr = element
        .try_get_attribute(name)
        .map_err(|e| DocumentError::InvalidDocument(format!("unreadable attribute '{}': {}", name, e)))?;

    match attr {
        Some(attr) => {
            let value = attr
                .unescape_value()
                .map_err(|e| DocumentError::InvalidDocument(format!("attribute '{}': {}", name, e)))?;
            Ok(Some(value.into_owned()))
        }
        None => Ok(None),
    }
}

// @returns: `<target .../>` rewritten as `<target ...>text</target>`
fn expand_target(element: &str, text: &str) -> Result<String, DocumentError> {
    let mut reader = Reader::from_str(element);
    let empty = match reader.read_event() {
        Ok(Event::Empty(empty)) => empty,
        Ok(other) => {
            return Err(DocumentError::InvalidDocument(format!(
                "expected a self-closing target, found {:?}",
                other
            )));
        }
        Err(e) => return Err(xml_error(e, 0)),
    };

    let name = String::from_utf8_lossy(empty.name().as_ref()).into_owned();
    let start = BytesStart::new(name.as_str()).with_attributes(empty.attributes().flatten());
    let end = start.to_end().into_owned();

    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Start(start)).map_err(write_error)?;
    writer
        .write_event(Event::Text(BytesText::from_escaped(partial_escape(text))))
        .map_err(write_error)?;
    writer.write_event(Event::End(end)).map_err(write_error)?;

    String::from_utf8(writer.into_inner()).map_err(|e| DocumentError::InvalidDocument(e.to_string()))
}

fn xml_error(error: impl Display, position: usize) -> DocumentError {
    DocumentError::InvalidDocument(format!("{} (near byte {})", error, position))
}

fn write_error(error: impl Display) -> DocumentError {
    DocumentError::InvalidDocument(format!("failed to write target: {}", error))
}
