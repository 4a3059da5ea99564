// NUnit 2 (`<test-results>`) and NUnit 3 (`<test-run>`) parser

use super::stream::{DocumentWalk, EventCursor, drive, non_empty, parse_seconds_ms};
use super::xml::{Element, Node};
use super::{ParseOutcome, ReportParser};
use crate::error::ReportError;
use crate::report::EventSink;
use crate::state::{ParseEvent, ReportFile, TestData, TestFailure};
use std::sync::Arc;

/// Results that mean the test body never ran
const NOT_RUN_RESULTS: [&str; 5] = ["Ignored", "Skipped", "NotRunnable", "NotRun", "Inconclusive"];

pub struct NUnitParser {
    sink: Arc<dyn EventSink>,
    abnormal_end: bool,
}

impl NUnitParser {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self {
            sink,
            abnormal_end: false,
        }
    }
}

impl ReportParser for NUnitParser {
    fn parse(&mut self, report: &ReportFile, processed: u64) -> Result<ParseOutcome, ReportError> {
        let result = drive(report.path(), processed, self.sink.as_ref(), NUnitWalk::default())?;
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
    Output,
}

#[derive(Debug)]
enum Frame {
    Root,
    Suite { name: String },
    /// `<results>` between a suite and its children
    Results,
    Test { data: TestData },
    Failure { failure: TestFailure },
    Text { field: Field, text: String },
    Skip,
}

#[derive(Debug, Default)]
struct NUnitWalk {
    stack: Vec<Frame>,
    saw_root: bool,
    complete: bool,
}

impl NUnitWalk {
    fn open(&mut self, el: Element, out: &mut EventCursor<'_>) {
        let frame = match (self.stack.last(), el.name.as_str()) {
            (None, "test-results" | "test-run") => {
                self.saw_root = true;
                Frame::Root
            }
            (Some(Frame::Root | Frame::Suite { .. } | Frame::Results), "test-suite") => {
                let name = el.attr_string("name").unwrap_or_default();
                out.emit(ParseEvent::SuiteFound { name: name.clone() });
                Frame::Suite { name }
            }
            (Some(Frame::Suite { .. }), "results") => Frame::Results,
            (Some(Frame::Root | Frame::Suite { .. } | Frame::Results), "test-case") => {
                Frame::Test {
                    data: test_data(&el),
                }
            }
            (Some(Frame::Test { data }), "failure") if data.failure.is_none() => Frame::Failure {
                failure: TestFailure {
                    kind: el.attr_string("result"),
                    ..TestFailure::default()
                },
            },
            (Some(Frame::Test { .. }), "output") => text_frame(Field::Output),
            (Some(Frame::Failure { .. }), "message") => text_frame(Field::Message),
            (Some(Frame::Failure { .. }), "stack-trace") => text_frame(Field::StackTrace),
            _ => Frame::Skip,
        };
        self.stack.push(frame);
    }

    fn close(&mut self, out: &mut EventCursor<'_>) {
        let Some(frame) = self.stack.pop() else {
            return;
        };

        match frame {
            Frame::Root => self.complete = true,
            Frame::Suite { name } => out.emit(ParseEvent::SuiteFinished { name }),
            Frame::Test { data } => out.emit(ParseEvent::TestFound(data)),
            Frame::Failure { failure } => {
                if let Some(Frame::Test { data }) = self.stack.last_mut() {
                    data.failure = Some(failure);
                }
            }
            Frame::Text { field, text } => match (self.stack.last_mut(), field) {
                (Some(Frame::Failure { failure }), Field::Message) => {
                    failure.message = non_empty(&text)
                }
                (Some(Frame::Failure { failure }), Field::StackTrace) => {
                    failure.stack_trace = non_empty(&text)
                }
                (Some(Frame::Test { data }), Field::Output) => data.std_out = non_empty(&text),
                _ => {}
            },
            Frame::Results | Frame::Skip => {}
        }
    }
}

impl DocumentWalk for NUnitWalk {
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

fn test_data(el: &Element) -> TestData {
    let name = el
        .attr("fullname")
        .or_else(|| el.attr("name"))
        .unwrap_or_default();
    let mut data = TestData::new(name);

    let not_run = el
        .attr("result")
        .is_some_and(|r| NOT_RUN_RESULTS.contains(&r));
    data.executed = match el.attr("executed") {
        Some(executed) => executed.eq_ignore_ascii_case("true") && !not_run,
        None => !not_run,
    };

    if let Some(ms) = el
        .attr("time")
        .or_else(|| el.attr("duration"))
        .and_then(parse_seconds_ms)
    {
        data.duration_ms = ms;
    }
    data
}

fn text_frame(field: Field) -> Frame {
    Frame::Text {
        field,
        text: String::new(),
    }
}
