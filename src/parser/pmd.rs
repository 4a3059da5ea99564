// PMD XML report parser

use super::inspections::{DEFAULT_MESSAGE, InspectionBatch, InspectionState};
use super::xml::{Node, XmlError, XmlStream, format_text, parse_number};
use super::{ParseOutcome, ParserContext, ReportParser};
use crate::error::ReportError;
use crate::state::{Inspection, InspectionType, ReportFile, Severity, ThresholdAggregator};

const TRAILING_TAG: &str = "</pmd>";

pub struct PmdParser {
    state: InspectionState,
}

impl PmdParser {
    pub fn new(ctx: &ParserContext) -> Self {
        Self {
            state: InspectionState::new(ctx),
        }
    }
}

impl ReportParser for PmdParser {
    fn parse(&mut self, report: &ReportFile, _processed: u64) -> Result<ParseOutcome, ReportError> {
        self.state.attempt(report, TRAILING_TAG, "PMD", collect)
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

fn collect(state: &InspectionState, content: &[u8]) -> Result<InspectionBatch, XmlError> {
    let mut stream = XmlStream::new(content);
    let mut batch = InspectionBatch::new();
    let mut current_file = String::new();
    let mut violation: Option<Inspection> = None;
    let mut text = String::new();

    while let Some(node) = stream.next_node()? {
        match node {
            Node::Open(el) if el.name == "file" => {
                current_file = state.resolve_path(el.attr("name").unwrap_or_default());
            }
            Node::Open(el) if el.name == "violation" => {
                let rule = el.attr_string("rule").unwrap_or_default();
                let ruleset = el.attr_string("ruleset").unwrap_or_default();
                batch.declare_type(InspectionType {
                    id: rule.clone(),
                    name: rule.clone(),
                    category: ruleset.clone(),
                    description: ruleset,
                });
                violation = Some(Inspection {
                    type_id: rule,
                    file_path: current_file.clone(),
                    line: parse_number(el.attr("beginline")),
                    message: DEFAULT_MESSAGE.to_string(),
                    severity: Severity::from_priority(parse_number(el.attr("priority"))),
                });
                text.clear();
            }
            Node::Text(t) if violation.is_some() => text.push_str(&t),
            Node::Close(name) if name == "violation" => {
                if let Some(mut inspection) = violation.take() {
                    let message = format_text(&text);
                    if !message.is_empty() {
                        inspection.message = message;
                    }
                    batch.finding(inspection);
                }
                text.clear();
            }
            Node::Close(name) if name == "file" => current_file.clear(),
            _ => {}
        }
    }

    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ReportType;
    use crate::report::{MemorySink, Sinks};
    use crate::state::ParseEvent;
    use std::io::Write;
    use std::sync::Arc;

    const REPORT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<pmd version="6.55.0">
  <file name="/work/checkout/src/main/java/A.java">
    <violation beginline="12" endline="12" rule="UnusedLocalVariable" ruleset="Best Practices" priority="3">
      Avoid unused local
      variables such as 'x'.
    </violation>
    <violation beginline="20" rule="EmptyCatchBlock" ruleset="Error Prone" priority="1">Avoid empty catch blocks</violation>
    <violation beginline="30" rule="UnusedLocalVariable" ruleset="Best Practices" priority="2"></violation>
  </file>
</pmd>
"#;

    fn parse(content: &str) -> (Arc<MemorySink>, PmdParser, Result<ParseOutcome, ReportError>) {
        let mut file = tempfile::Builder::new().suffix(".xml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        let sink = Arc::new(MemorySink::new());
        let ctx = ParserContext::new(Sinks::shared(sink.clone())).with_checkout_dir("/work/checkout");
        let mut parser = PmdParser::new(&ctx);
        let result = parser.parse(&ReportFile::new(file.path(), ReportType::Pmd), 0);
        (sink, parser, result)
    }

    #[test]
    fn test_violations_reported() {
        let (sink, parser, result) = parse(REPORT);
        assert_eq!(result.unwrap(), ParseOutcome::Finished);

        let events = sink.events();
        let findings: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                ParseEvent::InspectionFound(i) => Some(i.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(findings.len(), 3);
        assert_eq!(findings[0].file_path, "src/main/java/A.java");
        assert_eq!(findings[0].line, 12);
        assert_eq!(
            findings[0].message,
            "Avoid unused local variables such as 'x'."
        );
        assert_eq!(findings[0].severity, Severity::Info);
        assert_eq!(findings[1].severity, Severity::Error);
        assert_eq!(findings[2].message, DEFAULT_MESSAGE);

        let types = events
            .iter()
            .filter(|e| matches!(e, ParseEvent::InspectionTypeDeclared(_)))
            .count();
        assert_eq!(types, 2);

        let counts = parser.thresholds().unwrap().current();
        assert_eq!((counts.errors, counts.warnings, counts.infos), (1, 1, 1));
    }

    #[test]
    fn test_waits_for_closing_tag() {
        let cut = REPORT.find("</pmd>").unwrap();
        let (sink, _, result) = parse(&REPORT[..cut]);
        assert_eq!(result.unwrap(), ParseOutcome::Pending(0));
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_broken_document_with_marker() {
        let (sink, parser, result) = parse("<pmd><file name=\"a\"></violation></pmd>");
        assert!(result.unwrap_err().is_abnormal_end());
        assert!(parser.is_abnormal_end());
        assert!(sink.events().is_empty());
    }
}
