// Pull-style XML node stream shared by every report parser

use crate::utils::FileUtils;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::io;
use std::path::Path;
use thiserror::Error;

/// Bytes read from the end of a file when looking for a closing marker
const TAIL_WINDOW: u64 = 1024;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct XmlError(String);

impl XmlError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Start tag with its attributes decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    attributes: Vec<(String, String)>,
}

impl Element {
    fn from_start(start: &BytesStart<'_>) -> Self {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
        let attributes = start
            .attributes()
            .flatten()
            .map(|attr| {
                let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
                let value = attr
                    .unescape_value()
                    .map(|v| v.into_owned())
                    .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned());
                (key, value)
            })
            .collect();
        Self { name, attributes }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn attr_string(&self, name: &str) -> Option<String> {
        self.attr(name).map(str::to_string)
    }
}

/// Simplified XML node. Empty elements arrive as `Open` followed by `Close`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Open(Element),
    Close(String),
    Text(String),
}

/// Node stream over an in-memory document
pub struct XmlStream<'a> {
    reader: Reader<&'a [u8]>,
    buf: Vec<u8>,
    pending_close: Option<String>,
}

impl<'a> XmlStream<'a> {
    pub fn new(content: &'a [u8]) -> Self {
        Self {
            reader: Reader::from_reader(content),
            buf: Vec::new(),
            pending_close: None,
        }
    }

    /// Next node, `Ok(None)` at end of input
    pub fn next_node(&mut self) -> Result<Option<Node>, XmlError> {
        if let Some(name) = self.pending_close.take() {
            return Ok(Some(Node::Close(name)));
        }

        loop {
            self.buf.clear();
            let event = self
                .reader
                .read_event_into(&mut self.buf)
                .map_err(|e| {
                    XmlError::new(format!(
                        "{} at position {}",
                        e,
                        self.reader.buffer_position()
                    ))
                })?;

            let node = match event {
                Event::Start(start) => Node::Open(Element::from_start(&start)),
                Event::Empty(start) => {
                    let element = Element::from_start(&start);
                    self.pending_close = Some(element.name.clone());
                    Node::Open(element)
                }
                Event::End(end) => {
                    Node::Close(String::from_utf8_lossy(end.local_name().as_ref()).into_owned())
                }
                Event::Text(text) => Node::Text(
                    text.unescape()
                        .map(|t| t.into_owned())
                        .unwrap_or_else(|_| String::from_utf8_lossy(&text).into_owned()),
                ),
                Event::CData(data) => Node::Text(String::from_utf8_lossy(&data).into_owned()),
                Event::Eof => return Ok(None),
                _ => continue,
            };
            return Ok(Some(node));
        }
    }
}

/// Whether the file's tail (ignoring trailing whitespace) ends with `marker`
pub fn is_report_complete(path: &Path, marker: &str) -> io::Result<bool> {
    let tail = FileUtils::read_tail(path, TAIL_WINDOW + marker.len() as u64)?;
    Ok(ends_with_marker(&tail, marker))
}

pub fn ends_with_marker(tail: &[u8], marker: &str) -> bool {
    let trimmed = tail.trim_ascii_end();
    trimmed.ends_with(marker.as_bytes())
}

/// Collapse whitespace runs into single spaces and trim
pub fn format_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lenient unsigned number parsing, 0 when absent or malformed
pub fn parse_number(value: Option<&str>) -> u32 {
    value
        .and_then(|v| v.trim().parse::<u32>().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(content: &str) -> (Vec<Node>, bool) {
        let mut stream = XmlStream::new(content.as_bytes());
        let mut nodes = Vec::new();
        loop {
            match stream.next_node() {
                Ok(Some(node)) => nodes.push(node),
                Ok(None) => return (nodes, true),
                Err(_) => return (nodes, false),
            }
        }
    }

    #[test]
    fn test_empty_element_opens_and_closes() {
        let (nodes, clean) = collect(r#"<a><b x="1"/></a>"#);
        assert!(clean);
        assert_eq!(nodes.len(), 4);
        match &nodes[1] {
            Node::Open(el) => {
                assert_eq!(el.name, "b");
                assert_eq!(el.attr("x"), Some("1"));
                assert_eq!(el.attr("y"), None);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(nodes[2], Node::Close("b".to_string()));
    }

    #[test]
    fn test_text_and_cdata_unescaped() {
        let (nodes, _) = collect("<a>x &amp; y<![CDATA[<raw>]]></a>");
        assert_eq!(nodes[1], Node::Text("x & y".to_string()));
        assert_eq!(nodes[2], Node::Text("<raw>".to_string()));
    }

    #[test]
    fn test_attribute_entities() {
        let (nodes, _) = collect(r#"<a msg="a &lt; b"/>"#);
        match &nodes[0] {
            Node::Open(el) => assert_eq!(el.attr("msg"), Some("a < b")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_marker_detection() {
        assert!(ends_with_marker(b"<pmd></pmd>\n  \n", "</pmd>"));
        assert!(!ends_with_marker(b"<pmd><file>", "</pmd>"));
        assert!(!ends_with_marker(b"", "</pmd>"));
    }

    #[test]
    fn test_format_text() {
        assert_eq!(format_text("  a\n   b\tc  "), "a b c");
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number(Some(" 42 ")), 42);
        assert_eq!(parse_number(Some("x")), 0);
        assert_eq!(parse_number(None), 0);
    }
}
