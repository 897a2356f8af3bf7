//! Streaming XML helpers for the OOXML (.xlsx) parts.

use crate::error::TaskSheetError;
use quick_xml::escape::resolve_xml_entity;
use quick_xml::events::BytesRef;
use quick_xml::events::BytesStart;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::borrow::Cow;
use std::io::BufRead;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum XmlError {
    #[error("Unknown XML entity '&{0};'")]
    UnknownEntityError(String),

    #[error("Invalid character reference '&{0};'")]
    CharacterReferenceError(String),
}

/// Event reader with a reusable buffer, configured for spreadsheet parts:
/// empty elements expand to start/end pairs and text is kept verbatim.
pub(crate) struct XmlReader<R: BufRead> {
    reader: Reader<R>,
    buffer: Vec<u8>,
}

impl<R: BufRead> XmlReader<R> {
    pub(crate) fn new(source: R) -> XmlReader<R> {
        let mut reader = Reader::from_reader(source);
        let config = reader.config_mut();
        config.check_comments = false;
        config.check_end_names = false;
        config.expand_empty_elements = true;
        config.trim_text(false);
        XmlReader { reader, buffer: Vec::with_capacity(1024) }
    }

    /// Next event, `None` at end of document.
    pub(crate) fn next(&'_ mut self) -> Result<Option<Event<'_>>, TaskSheetError> {
        self.buffer.clear();
        match self.reader.read_event_into(&mut self.buffer)? {
            Event::Eof => Ok(None),
            event => Ok(Some(event)),
        }
    }
}

/// Attribute lookup on start tags.
pub(crate) trait XmlNodeHelper<'a> {
    /// Unescaped value of the attribute with the given (qualified) name.
    fn attribute(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, TaskSheetError>;

    /// Unescaped value of the first attribute whose local name matches,
    /// ignoring any namespace prefix (`r:id` matches `id`).
    fn local_attribute(&'a self, local_name: &str) -> Result<Option<Cow<'a, str>>, TaskSheetError>;
}

impl<'a> XmlNodeHelper<'a> for BytesStart<'a> {
    fn attribute(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, TaskSheetError> {
        match self.try_get_attribute(name)? {
            Some(attribute) => Ok(Some(attribute.unescape_value()?)),
            None => Ok(None),
        }
    }

    fn local_attribute(&'a self, local_name: &str) -> Result<Option<Cow<'a, str>>, TaskSheetError> {
        for attribute in self.attributes() {
            let attribute = attribute?;
            if attribute.key.local_name().as_ref() == local_name.as_bytes() {
                return Ok(Some(attribute.unescape_value()?));
            }
        }
        Ok(None)
    }
}

/// Appends the text behind an entity or character reference.
pub(crate) fn push_reference(text: &mut String, reference: &BytesRef) -> Result<(), TaskSheetError> {
    let raw = reference.xml_content()?;
    if let Some(number) = raw.strip_prefix('#') {
        let code = match number.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16),
            None => number.parse::<u32>(),
        }
        .map_err(|_| XmlError::CharacterReferenceError(raw.to_string()))?;
        let character = char::from_u32(code).ok_or_else(|| XmlError::CharacterReferenceError(raw.to_string()))?;
        text.push(character);
    } else if let Some(entity) = resolve_xml_entity(&raw) {
        text.push_str(entity);
    } else {
        Err(XmlError::UnknownEntityError(raw.to_string()))?;
    }
    Ok(())
}

/// Loops over reader events, dispatching to the given match arms and
/// ignoring everything else.
#[macro_export]
macro_rules! match_xml_events {
    ($reader:expr => { $($arms:tt)* }) => {
        while let Some(event) = $reader.next()? {
            match event {
                $($arms)*
                _ => (),
            }
        }
    };
}
