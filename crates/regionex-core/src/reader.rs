use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use quick_xml::{
    Reader,
    events::{BytesStart, Event},
};
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::walker::{Attributes, DocumentWalker, Extraction, ParseEvent, WalkError};

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("malformed XML at byte {position}: {message}")]
    Xml { position: usize, message: String },
    #[error("failed to read track document: {0}")]
    Io(String),
    #[error(transparent)]
    Walk(#[from] WalkError),
}

/// Streams `source` into `walker`, one open/close pair per element.
///
/// Returns the number of events fed. Self-closing elements produce an open
/// immediately followed by a close. Text, comments and declarations are
/// skipped.
pub fn walk_reader<R: BufRead>(
    source: R,
    walker: &mut DocumentWalker,
) -> Result<usize, DocumentError> {
    let mut reader = Reader::from_reader(source);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut fed = 0;
    loop {
        let event = reader.read_event_into(&mut buf);
        let position = reader.buffer_position();
        match event {
            Ok(Event::Start(ref element)) => {
                walker.feed(&open_event(element, position)?);
                fed += 1;
            }
            Ok(Event::Empty(ref element)) => {
                walker.feed(&open_event(element, position)?);
                walker.feed(&ParseEvent::Close);
                fed += 2;
            }
            Ok(Event::End(_)) => {
                walker.feed(&ParseEvent::Close);
                fed += 1;
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(error) => return Err(xml_error(error, position)),
        }
        buf.clear();
    }
    debug!(events = fed, "document stream consumed");
    Ok(fed)
}

/// Converts a whole document into its event sequence.
pub fn parse_events(xml: &str) -> Result<Vec<ParseEvent>, DocumentError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut events = Vec::new();
    loop {
        let event = reader.read_event();
        let position = reader.buffer_position();
        match event {
            Ok(Event::Start(ref element)) => events.push(open_event(element, position)?),
            Ok(Event::Empty(ref element)) => {
                events.push(open_event(element, position)?);
                events.push(ParseEvent::Close);
            }
            Ok(Event::End(_)) => events.push(ParseEvent::Close),
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(error) => return Err(xml_error(error, position)),
        }
    }
    Ok(events)
}

pub fn read_document<R: BufRead>(source: R) -> Result<Extraction, DocumentError> {
    let mut walker = DocumentWalker::new();
    walk_reader(source, &mut walker)?;
    Ok(walker.finish()?.into_extraction())
}

pub fn read_document_str(xml: &str) -> Result<Extraction, DocumentError> {
    read_document(xml.as_bytes())
}

#[instrument(fields(path = %path.display()))]
pub fn extract_from_path(path: &Path) -> Result<Extraction, DocumentError> {
    let file = File::open(path).map_err(|error| {
        DocumentError::Io(format!("failed to open {}: {error}", path.display()))
    })?;
    let extraction = read_document(BufReader::new(file))?;
    info!(
        regions = extraction.regions.len(),
        renamed = extraction.renamed,
        dropped = extraction.dropped,
        diagnostics = extraction.diagnostics.len(),
        "track document extracted"
    );
    Ok(extraction)
}

fn open_event(element: &BytesStart<'_>, position: usize) -> Result<ParseEvent, DocumentError> {
    let tag = String::from_utf8_lossy(element.name().as_ref()).into_owned();
    let mut attributes = Attributes::new();
    for attribute in element.attributes() {
        let attribute = attribute.map_err(|error| DocumentError::Xml {
            position,
            message: error.to_string(),
        })?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute
            .unescape_value()
            .map_err(|error| xml_error(error, position))?
            .into_owned();
        attributes.insert(key, value);
    }
    Ok(ParseEvent::Open { tag, attributes })
}

fn xml_error(error: quick_xml::Error, position: usize) -> DocumentError {
    match error {
        quick_xml::Error::Io(error) => DocumentError::Io(error.to_string()),
        other => DocumentError::Xml {
            position,
            message: other.to_string(),
        },
    }
}
