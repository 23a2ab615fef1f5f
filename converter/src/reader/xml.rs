//! Streaming XML helpers shared by the ODS and XLSX readers.

use quick_xml::escape::resolve_xml_entity;
use quick_xml::events::{BytesRef, BytesStart, BytesText, Event};
use quick_xml::Reader;
use std::borrow::Cow;
use std::io::{BufRead, BufReader, Read, Seek};
use std::str::FromStr;
use zip::result::ZipError;
use zip::read::ZipFile;
use zip::ZipArchive;

use crate::error::{ReaderError, ReaderResult};

/// Pull-based XML reader that owns its event buffer.
pub(crate) struct XmlReader<R: BufRead> {
    reader: Reader<R>,
    buffer: Vec<u8>,
}

impl<R: BufRead> XmlReader<R> {
    pub(crate) fn new(source: R) -> Self {
        let mut reader = Reader::from_reader(source);
        let config = reader.config_mut();
        config.check_comments = false;
        config.check_end_names = false;
        // <c/> and <c></c> must look the same to the state machines
        config.expand_empty_elements = true;
        config.trim_text(false);

        Self {
            reader,
            buffer: Vec::with_capacity(1024),
        }
    }

    /// Next event, or `None` at end of input.
    pub(crate) fn next(&mut self) -> ReaderResult<Option<Event<'_>>> {
        self.buffer.clear();
        match self.reader.read_event_into(&mut self.buffer)? {
            Event::Eof => Ok(None),
            event => Ok(Some(event)),
        }
    }
}

/// Attribute value of an element, unescaped.
pub(crate) fn attribute<'a>(element: &'a BytesStart<'a>, name: &str) -> ReaderResult<Option<Cow<'a, str>>> {
    match element.try_get_attribute(name)? {
        Some(attr) => Ok(Some(attr.unescape_value()?)),
        None => Ok(None),
    }
}

/// Attribute value parsed to `T`; unparseable values count as absent.
pub(crate) fn parse_attribute<T: FromStr>(element: &BytesStart<'_>, name: &str) -> ReaderResult<Option<T>> {
    Ok(attribute(element, name)?.and_then(|value| value.trim().parse().ok()))
}

/// Attribute looked up by local name, ignoring the namespace prefix.
pub(crate) fn local_attribute(element: &BytesStart<'_>, local: &[u8]) -> ReaderResult<Option<String>> {
    for result in element.attributes() {
        let attr = result?;
        if attr.key.local_name().as_ref() == local {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// Append decoded text content.
pub(crate) fn push_text(target: &mut String, text: &BytesText<'_>) -> ReaderResult<()> {
    target.push_str(&text.xml_content()?);
    Ok(())
}

/// Append an entity or character reference.
pub(crate) fn push_reference(target: &mut String, reference: &BytesRef<'_>) -> ReaderResult<()> {
    let raw = reference.xml_content()?;
    if let Some(number) = raw.strip_prefix('#') {
        let code = match number.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16),
            None => number.parse::<u32>(),
        }
        .map_err(|_| ReaderError::UnknownEntity(raw.to_string()))?;
        if let Some(character) = char::from_u32(code) {
            target.push(character);
        }
    } else if let Some(entity) = resolve_xml_entity(&raw) {
        target.push_str(entity);
    } else {
        return Err(ReaderError::UnknownEntity(raw.to_string()));
    }
    Ok(())
}

/// Open a member of a zip archive as an XML stream.
///
/// Lookup is case-insensitive and accepts backslash separators.
/// Returns `None` if the member does not exist.
pub(crate) fn zip_xml<'z, RS: Read + Seek>(
    zip: &'z mut ZipArchive<RS>,
    name: &str,
) -> ReaderResult<Option<XmlReader<BufReader<ZipFile<'z, RS>>>>> {
    let pattern = name.replace('\\', "/");
    let found = zip
        .file_names()
        .find(|candidate| pattern.eq_ignore_ascii_case(candidate))
        .map(str::to_owned);

    let Some(found) = found else {
        return Ok(None);
    };
    match zip.by_name(&found) {
        Ok(file) => Ok(Some(XmlReader::new(BufReader::new(file)))),
        Err(ZipError::FileNotFound) => Ok(None),
        Err(err) => Err(err.into()),
    }
}
