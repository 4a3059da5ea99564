// Checkstyle XML report parser

use super::inspections::{InspectionBatch, InspectionState};
use super::xml::{Node, XmlError, XmlStream, parse_number};
use super::{ParseOutcome, ParserContext, ReportParser};
use crate::error::ReportError;
use crate::state::{Inspection, InspectionType, ReportFile, Severity, ThresholdAggregator};
use tracing::{debug, warn};

const TRAILING_TAG: &str = "</checkstyle>";

pub struct CheckstyleParser {
    state: InspectionState,
}

impl CheckstyleParser {
    pub fn new(ctx: &ParserContext) -> Self {
        Self {
            state: InspectionState::new(ctx),
        }
    }
}

impl ReportParser for CheckstyleParser {
    fn parse(&mut self, report: &ReportFile, _processed: u64) -> Result<ParseOutcome, ReportError> {
        let path = report.path().display().to_string();
        self.state
            .attempt(report, TRAILING_TAG, "Checkstyle", |state, content| {
                collect(state, content, &path)
            })
    }

    fn is_abnormal_end(&self) -> bool {
        self.state.is_abnormal_end()
    }

    fn complete_report(&mut self, report: &ReportFile) -> String {
        self.state.complete_report(report)
    }

    fn thresholds(&self) -> Option<&ThresholdAggregator> {
        Some(self.state.thresholds())
    }
}

fn severity_of(value: Option<&str>) -> Severity {
    let value = value.unwrap_or_default();
    Severity::from_name(value).unwrap_or_else(|| {
        warn!("Came across illegal severity value: {}", value);
        Severity::Info
    })
}

fn collect(
    state: &InspectionState,
    content: &[u8],
    report_path: &str,
) -> Result<InspectionBatch, XmlError> {
    let mut stream = XmlStream::new(content);
    let mut batch = InspectionBatch::new();
    let mut current_file: Option<String> = None;
    let mut exception: Option<String> = None;

    while let Some(node) = stream.next_node()? {
        match node {
            Node::Open(el) if el.name == "checkstyle" => {
                debug!(
                    "Parsing Checkstyle report of version {}",
                    el.attr("version").unwrap_or("unknown")
                );
            }
            Node::Open(el) if el.name == "file" => {
                current_file = Some(state.resolve_path(el.attr("name").unwrap_or_default()));
            }
            Node::Open(el) if el.name == "error" => {
                let Some(file_path) = current_file.clone() else {
                    warn!("Unexpected report structure: error tag comes outside file tag");
                    continue;
                };
                let source = el.attr_string("source").unwrap_or_default();
                let severity = severity_of(el.attr("severity"));
                batch.declare_type(InspectionType {
                    id: source.clone(),
                    name: source.clone(),
                    category: el.attr("severity").unwrap_or_default().to_string(),
                    description: format!("From {}", source),
                });
                batch.finding(Inspection {
                    type_id: source,
                    file_path,
                    line: parse_number(el.attr("line")),
                    message: el.attr_string("message").unwrap_or_default(),
                    severity,
                });
            }
            Node::Open(el) if el.name == "exception" => exception = Some(String::new()),
            Node::Text(t) => {
                if let Some(buf) = exception.as_mut() {
                    buf.push_str(&t);
                }
            }
            Node::Close(name) if name == "exception" => {
                if let Some(text) = exception.take() {
                    batch.error(format!("Exception in report {}\n{}", report_path, text.trim()));
                }
            }
            Node::Close(name) if name == "file" => current_file = None,
            _ => {}
        }
    }

    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ReportType;
    use crate::report::{LogEntry, MemorySink, Sinks};
    use crate::state::ParseEvent;
    use std::io::Write;
    use std::sync::Arc;

    #[test]
    fn test_errors_and_exceptions() {
        let content = r#"<?xml version="1.0"?>
<checkstyle version="8.41">
  <file name="C:\build\src\Foo.java">
    <error line="3" column="1" severity="warning" message="Missing a Javadoc comment." source="com.puppycrawl.JavadocCheck"/>
    <error line="9" severity="error" message="Line is longer than 120" source="com.puppycrawl.LineLengthCheck"/>
    <error line="11" severity="fatal" message="odd" source="com.puppycrawl.OddCheck"/>
  </file>
  <file name="C:\build\src\Bar.java">
    <exception><![CDATA[java.lang.Exception: cannot parse]]></exception>
  </file>
</checkstyle>"#;
        let mut file = tempfile::Builder::new().suffix(".xml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        let sink = Arc::new(MemorySink::new());
        let ctx = ParserContext::new(Sinks::shared(sink.clone())).with_checkout_dir("C:\\build");
        let mut parser = CheckstyleParser::new(&ctx);

        let outcome = parser
            .parse(&ReportFile::new(file.path(), ReportType::Checkstyle), 0)
            .unwrap();
        assert_eq!(outcome, ParseOutcome::Finished);

        let findings: Vec<_> = sink
            .events()
            .into_iter()
            .filter_map(|e| match e {
                ParseEvent::InspectionFound(i) => Some(i),
                _ => None,
            })
            .collect();
        assert_eq!(findings.len(), 3);
        assert_eq!(findings[0].file_path, "src/Foo.java");
        assert_eq!(findings[0].severity, Severity::Warning);
        assert_eq!(findings[1].severity, Severity::Error);
        assert_eq!(findings[2].severity, Severity::Info);

        let errors: Vec<_> = sink
            .log()
            .into_iter()
            .filter(|entry| matches!(entry, LogEntry::Error(_)))
            .collect();
        assert_eq!(errors.len(), 1);
        assert!(sink.flush_count() >= 1);
    }
}
