//! Payload serialization. The queue core is payload-opaque: any type satisfying [`Codec`]
//! may be stored, but the concrete codec in scope is [`XmlCodec`], which serializes a small
//! structured-document tree ([`XmlDocument`]).

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::BadPayload;


/// Serializes and deserializes application values to and from record payloads.
///
/// Implementations must be pure and deterministic: encoding the same value twice must produce
/// the same bytes, and decoding previously-encoded bytes must reproduce an equal value.
pub trait Codec {
    /// The application value this codec encodes and decodes.
    type Value;

    /// Encodes `value` to its byte representation.
    fn to_bytes(value: &Self::Value) -> Vec<u8>;

    /// Decodes a value from exactly `bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`BadPayload`] if `bytes` is not a valid encoding of a `Value`.
    fn from_bytes(bytes: &[u8]) -> Result<Self::Value, BadPayload>;
}

/// A node in a small XML-shaped document tree: either an element (with a name, attributes, and
/// children) or a text leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element {
        name:       String,
        attributes: Vec<(String, String)>,
        children:   Vec<XmlNode>,
    },
    Text(String),
}

/// A structured document, rooted at a single [`XmlNode::Element`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    pub root: XmlNode,
}

/// A [`Codec`] for [`XmlDocument`] values, backed by `quick_xml`.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlCodec;

impl Codec for XmlCodec {
    type Value = XmlDocument;

    fn to_bytes(value: &Self::Value) -> Vec<u8> {
        let mut writer = Writer::new(Vec::new());
        write_node(&mut writer, &value.root);
        writer.into_inner()
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self::Value, BadPayload> {
        let mut reader = Reader::from_reader(bytes);
        reader.config_mut().trim_text(true);

        let root = read_node(&mut reader)?
            .ok_or_else(|| BadPayload("document has no root element".to_owned()))?;

        Ok(XmlDocument { root })
    }
}

fn write_node(writer: &mut Writer<Vec<u8>>, node: &XmlNode) {
    match node {
        XmlNode::Text(text) => {
            let _ = writer.write_event(Event::Text(BytesText::new(text)));
        }
        XmlNode::Element { name, attributes, children } => {
            let mut start = BytesStart::new(name.as_str());
            for (key, value) in attributes {
                start.push_attribute((key.as_str(), value.as_str()));
            }

            if children.is_empty() {
                let _ = writer.write_event(Event::Empty(start));
            } else {
                let _ = writer.write_event(Event::Start(start));
                for child in children {
                    write_node(writer, child);
                }
                let _ = writer.write_event(Event::End(BytesEnd::new(name.as_str())));
            }
        }
    }
}

/// Reads the next top-level node from `reader`, if any remain before EOF.
fn read_node(reader: &mut Reader<&[u8]>) -> Result<Option<XmlNode>, BadPayload> {
    loop {
        let event = reader
            .read_event()
            .map_err(|err| BadPayload(format!("malformed XML: {err}")))?;

        match event {
            Event::Eof => return Ok(None),
            Event::Start(start) => {
                let name = decode_str(start.name().as_ref())?;
                let attributes = read_attributes(&start)?;
                let children    = read_children(reader, &name)?;

                return Ok(Some(XmlNode::Element { name, attributes, children }));
            }
            Event::Empty(start) => {
                let name       = decode_str(start.name().as_ref())?;
                let attributes = read_attributes(&start)?;

                return Ok(Some(XmlNode::Element { name, attributes, children: Vec::new() }));
            }
            Event::Text(text) => {
                let text = text
                    .unescape()
                    .map_err(|err| BadPayload(format!("malformed XML text: {err}")))?;

                if !text.trim().is_empty() {
                    return Ok(Some(XmlNode::Text(text.into_owned())));
                }
            }
            Event::Comment(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
            Event::End(_) => {
                return Err(BadPayload("unexpected closing tag".to_owned()));
            }
            Event::CData(_) => {
                return Err(BadPayload("CDATA is not supported".to_owned()));
            }
        }
    }
}

fn read_children(reader: &mut Reader<&[u8]>, parent_name: &str) -> Result<Vec<XmlNode>, BadPayload> {
    let mut children = Vec::new();

    loop {
        let event = reader
            .read_event()
            .map_err(|err| BadPayload(format!("malformed XML: {err}")))?;

        match event {
            Event::End(end) => {
                let name = decode_str(end.name().as_ref())?;
                if name != parent_name {
                    return Err(BadPayload(format!(
                        "mismatched closing tag: expected `{parent_name}`, found `{name}`",
                    )));
                }
                return Ok(children);
            }
            Event::Eof => {
                return Err(BadPayload(format!("unclosed element `{parent_name}`")));
            }
            Event::Start(start) => {
                let name       = decode_str(start.name().as_ref())?;
                let attributes = read_attributes(&start)?;
                let grandchildren = read_children(reader, &name)?;
                children.push(XmlNode::Element { name, attributes, children: grandchildren });
            }
            Event::Empty(start) => {
                let name       = decode_str(start.name().as_ref())?;
                let attributes = read_attributes(&start)?;
                children.push(XmlNode::Element { name, attributes, children: Vec::new() });
            }
            Event::Text(text) => {
                let text = text
                    .unescape()
                    .map_err(|err| BadPayload(format!("malformed XML text: {err}")))?;

                if !text.trim().is_empty() {
                    children.push(XmlNode::Text(text.into_owned()));
                }
            }
            Event::Comment(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
            Event::CData(_) => {
                return Err(BadPayload("CDATA is not supported".to_owned()));
            }
        }
    }
}

fn read_attributes(start: &BytesStart<'_>) -> Result<Vec<(String, String)>, BadPayload> {
    let mut attributes = Vec::new();

    for attribute in start.attributes() {
        let attribute = attribute.map_err(|err| BadPayload(format!("malformed attribute: {err}")))?;
        let key        = decode_str(attribute.key.as_ref())?;
        let value      = attribute
            .unescape_value()
            .map_err(|err| BadPayload(format!("malformed attribute value: {err}")))?
            .into_owned();

        attributes.push((key, value));
    }

    Ok(attributes)
}

fn decode_str(bytes: &[u8]) -> Result<String, BadPayload> {
    std::str::from_utf8(bytes)
        .map(ToOwned::to_owned)
        .map_err(|err| BadPayload(format!("non-UTF-8 XML name: {err}")))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_simple_element() {
        let doc = XmlDocument {
            root: XmlNode::Element {
                name:       "message".to_owned(),
                attributes: vec![("id".to_owned(), "42".to_owned())],
                children:   vec![XmlNode::Text("hello".to_owned())],
            },
        };

        let bytes   = XmlCodec::to_bytes(&doc);
        let decoded = XmlCodec::from_bytes(&bytes).expect("round-trip should succeed");

        assert_eq!(doc, decoded);
    }

    #[test]
    fn round_trips_nested_elements() {
        let doc = XmlDocument {
            root: XmlNode::Element {
                name:       "envelope".to_owned(),
                attributes: Vec::new(),
                children:   vec![
                    XmlNode::Element {
                        name:       "header".to_owned(),
                        attributes: Vec::new(),
                        children:   Vec::new(),
                    },
                    XmlNode::Element {
                        name:       "body".to_owned(),
                        attributes: Vec::new(),
                        children:   vec![XmlNode::Text("payload".to_owned())],
                    },
                ],
            },
        };

        let bytes   = XmlCodec::to_bytes(&doc);
        let decoded = XmlCodec::from_bytes(&bytes).expect("round-trip should succeed");

        assert_eq!(doc, decoded);
    }

    #[test]
    fn rejects_truncated_document() {
        let bytes = b"<message id=\"1\">";
        assert!(XmlCodec::from_bytes(bytes).is_err());
    }

    #[test]
    fn rejects_mismatched_closing_tag() {
        let bytes = b"<a><b></c></a>";
        assert!(XmlCodec::from_bytes(bytes).is_err());
    }
}
