//! Generic XML tree parser
//!
//! Streams raw bytes through `quick-xml` into an owned tree of [`Node`]s. The
//! tree keeps element local names, attributes in document order (duplicates
//! included) and the trimmed text of each element. Comments, processing
//! instructions, the XML declaration and doctypes are dropped.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use serde::Serialize;

use crate::error::{Result, ValidationError};

/// A single attribute occurrence on an element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// One element of the parsed document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Node {
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Node>,
    /// Trimmed text runs of this element, joined with single spaces.
    pub text: String,
}

impl Node {
    pub fn local_name(&self) -> &str {
        &self.name
    }

    /// Value of the named attribute; the last occurrence wins.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .rev()
            .find(|attr| attr.name == name)
            .map(|attr| attr.value.as_str())
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Node::node_count).sum::<usize>()
    }
}

struct OpenElement {
    node: Node,
    pending_text: String,
}

impl OpenElement {
    fn new(node: Node) -> Self {
        Self {
            node,
            pending_text: String::new(),
        }
    }

    fn flush_text(&mut self) {
        let trimmed = self.pending_text.trim();
        if !trimmed.is_empty() {
            if !self.node.text.is_empty() {
                self.node.text.push(' ');
            }
            self.node.text.push_str(trimmed);
        }
        self.pending_text.clear();
    }
}

/// Parse raw XML bytes into the root [`Node`].
///
/// Returns [`ValidationError::EmptyDocument`] when there is no element content
/// at all and [`ValidationError::MalformedXml`] for tokenizer errors, unexpected
/// closing tags, a second top-level element or input that ends while elements
/// are still open.
pub fn parse_document(raw: &[u8]) -> Result<Node> {
    if raw.is_empty() {
        return Err(ValidationError::EmptyDocument);
    }

    let mut reader = Reader::from_reader(raw);
    reader.config_mut().trim_text(false);

    let mut buf = Vec::new();
    let mut stack: Vec<OpenElement> = Vec::new();
    let mut root: Option<Node> = None;

    loop {
        match reader
            .read_event_into(&mut buf)
            .map_err(|err| malformed(format!("{} at position {}", err, reader.error_position())))?
        {
            Event::Start(start) => {
                let node = node_from_start(&reader, &start)?;
                if let Some(parent) = stack.last_mut() {
                    parent.flush_text();
                } else if root.is_some() {
                    return Err(malformed(format!(
                        "multiple root elements: unexpected <{}>",
                        node.name
                    )));
                }
                stack.push(OpenElement::new(node));
            }
            Event::Empty(start) => {
                let node = node_from_start(&reader, &start)?;
                attach(&mut stack, &mut root, node)?;
            }
            Event::End(end) => {
                let name = decode(&reader, end.local_name().as_ref())?;
                let Some(mut open) = stack.pop() else {
                    return Err(malformed(format!("unexpected closing tag {:?}", name)));
                };
                if open.node.name != name {
                    return Err(malformed(format!(
                        "unexpected closing tag {:?}, expected {:?}",
                        name, open.node.name
                    )));
                }
                open.flush_text();
                attach(&mut stack, &mut root, open.node)?;
            }
            Event::Text(text) => {
                if let Some(current) = stack.last_mut() {
                    let decoded = text
                        .decode()
                        .map_err(|err| malformed(format!("text decode: {err}")))?;
                    current.pending_text.push_str(&decoded);
                }
            }
            Event::CData(cdata) => {
                if let Some(current) = stack.last_mut() {
                    let decoded = reader
                        .decoder()
                        .decode(&cdata)
                        .map_err(|err| malformed(format!("cdata decode: {err}")))?;
                    current.flush_text();
                    current.pending_text.push_str(&decoded);
                    current.flush_text();
                }
            }
            Event::GeneralRef(reference) => {
                if let Some(current) = stack.last_mut() {
                    let name = reference
                        .decode()
                        .map_err(|err| malformed(format!("entity decode: {err}")))?;
                    let escaped = format!("&{name};");
                    let resolved = quick_xml::escape::unescape(&escaped)
                        .map_err(|err| malformed(format!("entity {escaped}: {err}")))?;
                    current.pending_text.push_str(&resolved);
                }
            }
            Event::Comment(_) | Event::PI(_) => {
                if let Some(current) = stack.last_mut() {
                    current.flush_text();
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if let Some(open) = stack.last() {
        return Err(malformed(format!(
            "premature end of input: <{}> is not closed",
            open.node.name
        )));
    }

    root.ok_or(ValidationError::EmptyDocument)
}

fn attach(stack: &mut [OpenElement], root: &mut Option<Node>, node: Node) -> Result<()> {
    if let Some(parent) = stack.last_mut() {
        parent.flush_text();
        parent.node.children.push(node);
        return Ok(());
    }
    if root.is_some() {
        return Err(malformed(format!(
            "multiple root elements: unexpected <{}>",
            node.name
        )));
    }
    *root = Some(node);
    Ok(())
}

fn node_from_start(reader: &Reader<&[u8]>, start: &BytesStart<'_>) -> Result<Node> {
    let name = decode(reader, start.local_name().as_ref())?;
    let mut attributes = Vec::new();

    // duplicates are kept; each occurrence is validated on its own
    for attr in start.attributes().with_checks(false) {
        let attr = attr.map_err(|err| malformed(format!("attribute on <{name}>: {err}")))?;
        let attr_name = decode(reader, attr.key.local_name().as_ref())?;
        let value = attr
            .decode_and_unescape_value(reader.decoder())
            .map_err(|err| malformed(format!("attribute {attr_name} on <{name}>: {err}")))?;
        attributes.push(Attribute {
            name: attr_name,
            value: value.into_owned(),
        });
    }

    Ok(Node {
        name,
        attributes,
        ..Node::default()
    })
}

fn decode(reader: &Reader<&[u8]>, raw: &[u8]) -> Result<String> {
    reader
        .decoder()
        .decode(raw)
        .map(|decoded| decoded.into_owned())
        .map_err(|err| malformed(format!("name decode: {err}")))
}

fn malformed(details: String) -> ValidationError {
    ValidationError::MalformedXml { details }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_preserves_order() {
        let root = parse_document(
            br#"<VAST version="4.2" b="2" a="1"><Ad id="1"/><Error/><Ad id="2"/></VAST>"#,
        )
        .unwrap();

        assert_eq!(root.name, "VAST");
        let attr_names: Vec<_> = root.attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(attr_names, ["version", "b", "a"]);

        let child_names: Vec<_> = root.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(child_names, ["Ad", "Error", "Ad"]);
        assert_eq!(root.children[2].attribute("id"), Some("2"));
        assert_eq!(root.node_count(), 4);
    }

    #[test]
    fn test_text_runs_are_trimmed_and_joined() {
        let root = parse_document(
            b"<Impression>\n   first  <!-- note -->  second <![CDATA[ third ]]>\n</Impression>",
        )
        .unwrap();
        assert_eq!(root.text, "first second third");
    }

    #[test]
    fn test_entities_are_resolved_in_text_and_attributes() {
        let root =
            parse_document(br#"<ClickThrough id="a&amp;b">https://x.test/?a=1&amp;b=2</ClickThrough>"#)
                .unwrap();
        assert_eq!(root.attribute("id"), Some("a&b"));
        assert_eq!(root.text, "https://x.test/?a=1&b=2");
    }

    #[test]
    fn test_duplicate_attributes_are_kept() {
        let root = parse_document(br#"<Ad id="1" id="2"/>"#).unwrap();
        assert_eq!(root.attributes.len(), 2);
        assert_eq!(root.attribute("id"), Some("2"));
    }

    #[test]
    fn test_namespace_prefixes_are_stripped() {
        let root = parse_document(
            br#"<vast:VAST xmlns:vast="http://www.iab.com/VAST" version="4.2"><vast:Ad/></vast:VAST>"#,
        )
        .unwrap();
        assert_eq!(root.name, "VAST");
        assert_eq!(root.children[0].name, "Ad");
    }

    #[test]
    fn test_declaration_and_comments_are_ignored() {
        let root = parse_document(
            b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!-- lead --><VAST version=\"4.0\"/>",
        )
        .unwrap();
        assert_eq!(root.name, "VAST");
        assert!(root.children.is_empty());
    }

    #[test]
    fn test_empty_inputs() {
        assert!(matches!(
            parse_document(b""),
            Err(ValidationError::EmptyDocument)
        ));
        assert!(matches!(
            parse_document(b"   \n  "),
            Err(ValidationError::EmptyDocument)
        ));
        assert!(matches!(
            parse_document(b"<?xml version=\"1.0\"?><!-- nothing -->"),
            Err(ValidationError::EmptyDocument)
        ));
    }

    #[test]
    fn test_malformed_inputs() {
        for raw in [
            &b"<VAST><Ad></VAST>"[..],
            b"</VAST>",
            b"<VAST><Ad>",
            b"<VAST/><VAST/>",
            b"<VAST attr=unquoted/>",
        ] {
            assert!(
                matches!(
                    parse_document(raw),
                    Err(ValidationError::MalformedXml { .. })
                ),
                "expected malformed error for {:?}",
                String::from_utf8_lossy(raw)
            );
        }
    }
}
