//! Streaming XML traversal shared by the GPX and TCX importers

use chrono::{DateTime, NaiveDateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Element attribute as `(local name, unescaped value)`
pub(crate) type Attribute = (String, String);

/// Callbacks driven by [`walk_xml`]. `path` holds the local names of all open
/// elements, the current element last.
pub(crate) trait XmlVisitor {
    fn start(&mut self, _path: &[String], _attributes: &[Attribute]) {}

    fn text(&mut self, _path: &[String], _text: &str) {}

    fn end(&mut self, _path: &[String]) {}
}

/// Walk `xml`, reporting elements and text to `visitor`
pub(crate) fn walk_xml<V: XmlVisitor>(xml: &str, visitor: &mut V) -> Result<(), String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut path: Vec<String> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(event)) => {
                let attributes = attributes(&event)?;
                path.push(local_name(&event));
                visitor.start(&path, &attributes);
            }
            Ok(Event::Empty(event)) => {
                let attributes = attributes(&event)?;
                path.push(local_name(&event));
                visitor.start(&path, &attributes);
                visitor.end(&path);
                path.pop();
            }
            Ok(Event::End(_)) => {
                visitor.end(&path);
                path.pop();
            }
            Ok(Event::Text(text)) => {
                let value = text.unescape().map_err(|e| e.to_string())?;
                visitor.text(&path, &value);
            }
            Ok(Event::CData(data)) => {
                let value = String::from_utf8_lossy(&data.into_inner()).into_owned();
                visitor.text(&path, value.trim());
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(format!(
                    "XML error at position {}: {}",
                    reader.buffer_position(),
                    e
                ))
            }
            _ => {}
        }
    }

    if path.is_empty() {
        Ok(())
    } else {
        Err(format!("unexpected end of document inside <{}>", path.join("/")))
    }
}

fn local_name(event: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(event.local_name().as_ref()).into_owned()
}

fn attributes(event: &BytesStart<'_>) -> Result<Vec<Attribute>, String> {
    let mut attributes = Vec::new();
    for attribute in event.attributes() {
        let attribute = attribute.map_err(|e| e.to_string())?;
        let key = String::from_utf8_lossy(attribute.key.local_name().as_ref()).into_owned();
        let value = attribute
            .unescape_value()
            .map_err(|e| e.to_string())?
            .into_owned();
        attributes.push((key, value));
    }
    Ok(attributes)
}

/// Look up an attribute by local name
pub(crate) fn attribute<'a>(attributes: &'a [Attribute], name: &str) -> Option<&'a str> {
    attributes
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

/// Whether the innermost elements of `path` are `suffix`
pub(crate) fn path_ends_with(path: &[String], suffix: &[&str]) -> bool {
    path.len() >= suffix.len()
        && path[path.len() - suffix.len()..]
            .iter()
            .zip(suffix)
            .all(|(element, expected)| element == expected)
}

/// Whether any open element is `name`
pub(crate) fn within(path: &[String], name: &str) -> bool {
    path.iter().any(|element| element == name)
}

/// Parse an ISO 8601 timestamp, assuming UTC when no offset is given
pub(crate) fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

pub(crate) fn parse_number(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
