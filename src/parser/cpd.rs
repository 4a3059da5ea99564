// PMD CPD (copy/paste detector) report parser

use super::inspections::read_if_complete;
use super::xml::{Node, XmlError, XmlStream, parse_number};
use super::{ParseOutcome, ParserContext, ReportParser};
use crate::error::ReportError;
use crate::report::DuplicatesReporter;
use crate::state::{Duplicate, DuplicateFragment, ReportFile};
use crate::utils::FileUtils;
use std::sync::Arc;
use tracing::debug;

const TRAILING_TAG: &str = "</pmd-cpd>";

pub struct CpdParser {
    reporter: Arc<dyn DuplicatesReporter>,
    checkout_dir: String,
    abnormal_end: bool,
}

impl CpdParser {
    pub fn new(ctx: &ParserContext) -> Self {
        Self {
            reporter: ctx.sinks.duplicates.clone(),
            checkout_dir: ctx.checkout_dir.clone(),
            abnormal_end: false,
        }
    }

    fn collect(&self, content: &[u8]) -> Result<Vec<Duplicate>, XmlError> {
        let mut stream = XmlStream::new(content);
        let mut duplicates = Vec::new();
        let mut current: Option<(u32, u32)> = None;
        let mut places: Vec<(String, u32)> = Vec::new();
        let mut fragment: Option<String> = None;

        while let Some(node) = stream.next_node()? {
            match node {
                Node::Open(el) if el.name == "duplication" => {
                    current = Some((parse_number(el.attr("lines")), parse_number(el.attr("tokens"))));
                    places.clear();
                }
                Node::Open(el) if el.name == "file" && current.is_some() => {
                    let path = FileUtils::resolve_source_path(
                        el.attr("path").unwrap_or_default(),
                        &self.checkout_dir,
                    );
                    places.push((path, parse_number(el.attr("line"))));
                }
                Node::Open(el) if el.name == "codefragment" => fragment = Some(String::new()),
                Node::Text(t) => {
                    if let Some(buf) = fragment.as_mut() {
                        buf.push_str(&t);
                    }
                }
                Node::Close(name) if name == "duplication" => {
                    if let Some((lines, tokens)) = current.take() {
                        let code = fragment.take().unwrap_or_default();
                        duplicates.push(Duplicate {
                            hash: fragment_hash(&code),
                            tokens,
                            fragments: places
                                .drain(..)
                                .map(|(path, line)| DuplicateFragment {
                                    path,
                                    start_line: line,
                                    line_range: (line, line.saturating_add(lines)),
                                })
                                .collect(),
                        });
                    }
                }
                _ => {}
            }
        }

        Ok(duplicates)
    }
}

impl ReportParser for CpdParser {
    fn parse(&mut self, report: &ReportFile, _processed: u64) -> Result<ParseOutcome, ReportError> {
        self.abnormal_end = false;
        let Some(content) = read_if_complete(report.path(), TRAILING_TAG)? else {
            return Ok(ParseOutcome::Pending(0));
        };

        self.reporter.start_duplicates();
        let result = match self.collect(&content) {
            Ok(duplicates) => {
                debug!("{}: {} duplicate(s)", report.path().display(), duplicates.len());
                for duplicate in duplicates {
                    self.reporter.add_duplicate(duplicate);
                }
                Ok(ParseOutcome::Finished)
            }
            Err(e) => {
                self.abnormal_end = true;
                Err(ReportError::Malformed {
                    path: report.path().to_path_buf(),
                    parser: "PMD CPD",
                    reason: e.to_string(),
                })
            }
        };
        self.reporter.finish_duplicates();
        result
    }

    fn is_abnormal_end(&self) -> bool {
        self.abnormal_end
    }
}

/// Content hash of a duplicated block: 31-multiplier rolling hash over
/// the UTF-16 code units, wrapping on overflow
pub fn fragment_hash(code: &str) -> i32 {
    code.encode_utf16()
        .fold(0i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(unit as i32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ReportType;
    use crate::report::{MemorySink, Sinks};
    use crate::state::ParseEvent;
    use std::io::Write;

    #[test]
    fn test_fragment_hash() {
        assert_eq!(fragment_hash(""), 0);
        assert_eq!(fragment_hash("a"), 97);
        assert_eq!(fragment_hash("ab"), 97 * 31 + 98);
        // Wraps instead of overflowing
        let long = "x".repeat(64);
        let _ = fragment_hash(&long);
    }

    #[test]
    fn test_duplications_reported_in_one_session() {
        let content = r#"<?xml version="1.0" encoding="UTF-8"?>
<pmd-cpd>
  <duplication lines="12" tokens="75">
    <file line="10" path="/ws/src/A.java"/>
    <file line="40" path="/ws/src/B.java"/>
    <codefragment><![CDATA[int a = 1;]]></codefragment>
  </duplication>
</pmd-cpd>"#;
        let mut file = tempfile::Builder::new().suffix(".xml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        let sink = Arc::new(MemorySink::new());
        let ctx = ParserContext::new(Sinks::shared(sink.clone())).with_checkout_dir("/ws");
        let mut parser = CpdParser::new(&ctx);

        let outcome = parser
            .parse(&ReportFile::new(file.path(), ReportType::PmdCpd), 0)
            .unwrap();
        assert_eq!(outcome, ParseOutcome::Finished);
        assert_eq!(sink.duplicate_sessions(), 1);

        let events = sink.events();
        assert_eq!(events.len(), 1);
        let ParseEvent::DuplicateFound(duplicate) = &events[0] else {
            panic!("expected duplicate, got {:?}", events[0]);
        };
        assert_eq!(duplicate.tokens, 75);
        assert_eq!(duplicate.hash, fragment_hash("int a = 1;"));
        assert_eq!(duplicate.fragments[0].path, "src/A.java");
        assert_eq!(duplicate.fragments[0].line_range, (10, 22));
        assert_eq!(duplicate.fragments[1].start_line, 40);
    }

    #[test]
    fn test_line_range_saturates_on_huge_line() {
        let content = r#"<pmd-cpd>
  <duplication lines="10" tokens="5">
    <file line="4294967295" path="A.java"/>
    <file line="1" path="A.java"/>
    <codefragment>x;</codefragment>
  </duplication>
</pmd-cpd>"#;
        let mut file = tempfile::Builder::new().suffix(".xml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        let sink = Arc::new(MemorySink::new());
        let mut parser = CpdParser::new(&ParserContext::new(Sinks::shared(sink.clone())));

        let outcome = parser
            .parse(&ReportFile::new(file.path(), ReportType::PmdCpd), 0)
            .unwrap();
        assert_eq!(outcome, ParseOutcome::Finished);

        let ParseEvent::DuplicateFound(duplicate) = &sink.events()[0] else {
            panic!("expected duplicate");
        };
        assert_eq!(duplicate.fragments[0].line_range, (u32::MAX, u32::MAX));
        assert_eq!(duplicate.fragments[1].line_range, (1, 11));
    }
}
