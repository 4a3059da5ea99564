// MSTest / Visual Studio TRX parser
// The whole run is reported as a single suite.

use super::stream::{DocumentWalk, EventCursor, drive, non_empty, parse_timespan_ms};
use super::xml::{Element, Node};
use super::{ParseOutcome, ReportParser};
use crate::error::ReportError;
use crate::report::EventSink;
use crate::state::{ParseEvent, ReportFile, TestData, TestFailure};
use std::sync::Arc;

pub const DEFAULT_SUITE_NAME: &str = "MSTest";

const FAILED_OUTCOMES: [&str; 4] = ["Failed", "Error", "Timeout", "Aborted"];
const NOT_RUN_OUTCOMES: [&str; 4] = ["NotExecuted", "NotRunnable", "Inconclusive", "Pending"];

pub struct TrxParser {
    sink: Arc<dyn EventSink>,
    abnormal_end: bool,
}

impl TrxParser {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self {
            sink,
            abnormal_end: false,
        }
    }
}

impl ReportParser for TrxParser {
    fn parse(&mut self, report: &ReportFile, processed: u64) -> Result<ParseOutcome, ReportError> {
        let result = drive(report.path(), processed, self.sink.as_ref(), TrxWalk::default())?;
        self.abnormal_end = result.abnormal_end;
        Ok(result.outcome)
    }

    fn is_abnormal_end(&self) -> bool {
        self.abnormal_end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Message,
    StackTrace,
    StdOut,
    StdErr,
}

#[derive(Debug)]
struct PendingTest {
    data: TestData,
    outcome: String,
    message: Option<String>,
    stack_trace: Option<String>,
}

#[derive(Debug)]
enum Frame {
    Run,
    /// Elements outside of a result; results may sit at any depth below them
    Section,
    Test(Box<PendingTest>),
    /// `<Output>` and `<ErrorInfo>`
    TestPart,
    Text { field: Field, text: String },
    Skip,
}

#[derive(Debug, Default)]
struct TrxWalk {
    stack: Vec<Frame>,
    saw_root: bool,
    complete: bool,
}

impl TrxWalk {
    fn open(&mut self, el: Element, out: &mut EventCursor<'_>) {
        let frame = match (self.stack.last(), el.name.as_str()) {
            (None, "TestRun") => {
                self.saw_root = true;
                out.emit(ParseEvent::SuiteFound {
                    name: DEFAULT_SUITE_NAME.to_string(),
                });
                Frame::Run
            }
            (Some(Frame::Run | Frame::Section), "UnitTestResult") => {
                Frame::Test(Box::new(pending_test(&el)))
            }
            (Some(Frame::Run | Frame::Section), _) => Frame::Section,
            (Some(Frame::Test(_) | Frame::TestPart), "Output" | "ErrorInfo") => Frame::TestPart,
            (Some(Frame::Test(_) | Frame::TestPart), "Message") => text_frame(Field::Message),
            (Some(Frame::Test(_) | Frame::TestPart), "StackTrace") => text_frame(Field::StackTrace),
            (Some(Frame::Test(_) | Frame::TestPart), "StdOut") => text_frame(Field::StdOut),
            (Some(Frame::Test(_) | Frame::TestPart), "StdErr") => text_frame(Field::StdErr),
            _ => Frame::Skip,
        };
        self.stack.push(frame);
    }

    fn close(&mut self, out: &mut EventCursor<'_>) {
        let Some(frame) = self.stack.pop() else {
            return;
        };

        match frame {
            Frame::Run => {
                out.emit(ParseEvent::SuiteFinished {
                    name: DEFAULT_SUITE_NAME.to_string(),
                });
                self.complete = true;
            }
            Frame::Test(test) => out.emit(ParseEvent::TestFound(finish_test(*test))),
            Frame::Text { field, text } => {
                let owner = self.stack.iter_mut().rev().find_map(|f| match f {
                    Frame::Test(test) => Some(test),
                    _ => None,
                });
                if let Some(test) = owner {
                    let value = non_empty(&text);
                    match field {
                        Field::Message => test.message = value,
                        Field::StackTrace => test.stack_trace = value,
                        Field::StdOut => test.data.std_out = value,
                        Field::StdErr => test.data.std_err = value,
                    }
                }
            }
            Frame::Section | Frame::TestPart | Frame::Skip => {}
        }
    }
}

impl DocumentWalk for TrxWalk {
    fn on_node(&mut self, node: Node, out: &mut EventCursor<'_>) {
        match node {
            Node::Open(el) => self.open(el, out),
            Node::Close(_) => self.close(out),
            Node::Text(text) => {
                if let Some(Frame::Text { text: buf, .. }) = self.stack.last_mut() {
                    buf.push_str(&text);
                }
            }
        }
    }

    fn saw_root(&self) -> bool {
        self.saw_root
    }

    fn is_complete(&self) -> bool {
        self.complete
    }
}

fn pending_test(el: &Element) -> PendingTest {
    let mut data = TestData::new(el.attr("testName").unwrap_or_default());
    if let Some(ms) = el.attr("duration").and_then(parse_timespan_ms) {
        data.duration_ms = ms;
    }
    PendingTest {
        data,
        outcome: el.attr_string("outcome").unwrap_or_default(),
        message: None,
        stack_trace: None,
    }
}

fn finish_test(test: PendingTest) -> TestData {
    let PendingTest {
        mut data,
        outcome,
        message,
        stack_trace,
    } = test;

    data.executed = !NOT_RUN_OUTCOMES.contains(&outcome.as_str());
    if FAILED_OUTCOMES.contains(&outcome.as_str()) {
        data.failure = Some(TestFailure {
            kind: Some(outcome),
            message,
            stack_trace,
        });
    }
    data
}

fn text_frame(field: Field) -> Frame {
    Frame::Text {
        field,
        text: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ReportType;
    use crate::report::MemorySink;
    use std::io::Write;

    const RUN: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<TestRun id="1" xmlns="http://microsoft.com/schemas/VisualStudio/TeamTest/2010">
  <TestDefinitions><UnitTest name="Adds"/></TestDefinitions>
  <Results>
    <UnitTestResult testName="Adds" outcome="Passed" duration="00:00:00.0120000">
      <Output><StdOut>adding</StdOut></Output>
    </UnitTestResult>
    <UnitTestResult testName="Divides" outcome="Failed" duration="00:00:01.5000000">
      <Output>
        <ErrorInfo>
          <Message>Assert.AreEqual failed</Message>
          <StackTrace>at Calc.Divides()</StackTrace>
        </ErrorInfo>
      </Output>
    </UnitTestResult>
    <UnitTestResult testName="Later" outcome="NotExecuted"/>
  </Results>
</TestRun>"#;

    #[test]
    fn test_single_suite_with_results() {
        let mut file = tempfile::Builder::new().suffix(".trx").tempfile().unwrap();
        file.write_all(RUN.as_bytes()).unwrap();
        let sink = Arc::new(MemorySink::new());
        let mut parser = TrxParser::new(sink.clone());
        let report = ReportFile::new(file.path(), ReportType::MsTest);

        assert_eq!(parser.parse(&report, 0).unwrap(), ParseOutcome::Finished);

        let events = sink.events();
        assert_eq!(events.len(), 5);
        assert_eq!(
            events[0],
            ParseEvent::SuiteFound {
                name: "MSTest".to_string()
            }
        );

        let ParseEvent::TestFound(adds) = &events[1] else {
            panic!("expected test, got {:?}", events[1]);
        };
        assert_eq!(adds.duration_ms, 12);
        assert_eq!(adds.std_out.as_deref(), Some("adding"));

        let ParseEvent::TestFound(divides) = &events[2] else {
            panic!("expected test, got {:?}", events[2]);
        };
        let failure = divides.failure.as_ref().unwrap();
        assert_eq!(failure.kind.as_deref(), Some("Failed"));
        assert_eq!(failure.message.as_deref(), Some("Assert.AreEqual failed"));
        assert_eq!(failure.stack_trace.as_deref(), Some("at Calc.Divides()"));

        let ParseEvent::TestFound(later) = &events[3] else {
            panic!("expected test, got {:?}", events[3]);
        };
        assert!(!later.executed);
    }
}
