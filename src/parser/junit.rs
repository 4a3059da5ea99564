// Ant JUnit / Surefire XML parser
//
// Accepts `<testsuite>` documents and `<testsuites>` wrappers around them.

use super::stream::{
    DocumentWalk, EventCursor, drive, non_empty, parse_seconds_ms, qualified_name,
};
use super::xml::{Element, Node};
use super::{ParseOutcome, ReportParser};
use crate::error::ReportError;
use crate::report::EventSink;
use crate::state::{ParseEvent, ReportFile, TestData, TestFailure};
use std::sync::Arc;

pub struct AntJUnitParser {
    sink: Arc<dyn EventSink>,
    abnormal_end: bool,
}

impl AntJUnitParser {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self {
            sink,
            abnormal_end: false,
        }
    }
}

impl ReportParser for AntJUnitParser {
    fn parse(&mut self, report: &ReportFile, processed: u64) -> Result<ParseOutcome, ReportError> {
        let result = drive(report.path(), processed, self.sink.as_ref(), JUnitWalk::default())?;
        self.abnormal_end = result.abnormal_end;
        Ok(result.outcome)
    }

    fn is_abnormal_end(&self) -> bool {
        self.abnormal_end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Capture {
    StdOut,
    StdErr,
    Time,
}

#[derive(Debug)]
enum Frame {
    Container,
    Suite {
        name: String,
    },
    Test {
        data: TestData,
        timed_by_attribute: bool,
    },
    /// `<failure>`/`<error>`; `on_test` is false for suite-level ones
    Failure {
        on_test: bool,
        error: bool,
        failure: TestFailure,
        text: String,
    },
    Text {
        target: Capture,
        text: String,
    },
    Skip,
}

#[derive(Debug, Default)]
struct JUnitWalk {
    stack: Vec<Frame>,
    saw_root: bool,
    complete: bool,
}

impl JUnitWalk {
    fn open(&mut self, el: Element, out: &mut EventCursor<'_>) {
        let frame = match (self.stack.last_mut(), el.name.as_str()) {
            (None, "testsuites") => {
                self.saw_root = true;
                Frame::Container
            }
            (None, "testsuite") => {
                self.saw_root = true;
                open_suite(&el, out)
            }
            (Some(Frame::Container | Frame::Suite { .. }), "testsuite") => open_suite(&el, out),
            (Some(Frame::Suite { .. }), "testcase") => open_test(&el),
            (Some(Frame::Suite { .. }), "failure" | "error") => Frame::Failure {
                on_test: false,
                error: el.name == "error",
                failure: failure_header(&el),
                text: String::new(),
            },
            (Some(Frame::Test { data, .. }), "failure" | "error") if data.failure.is_none() => {
                data.failure = Some(failure_header(&el));
                Frame::Failure {
                    on_test: true,
                    error: el.name == "error",
                    failure: TestFailure::default(),
                    text: String::new(),
                }
            }
            (Some(Frame::Test { data, .. }), "skipped") => {
                data.executed = false;
                Frame::Skip
            }
            (Some(Frame::Test { .. }), "system-out") => text_frame(Capture::StdOut),
            (Some(Frame::Test { .. }), "system-err") => text_frame(Capture::StdErr),
            (Some(Frame::Test { .. }), "time") => text_frame(Capture::Time),
            _ => Frame::Skip,
        };
        self.stack.push(frame);
    }

    fn close(&mut self, out: &mut EventCursor<'_>) {
        let Some(frame) = self.stack.pop() else {
            return;
        };

        match frame {
            Frame::Container => {}
            Frame::Suite { name } => out.emit(ParseEvent::SuiteFinished { name }),
            Frame::Test { data, .. } => out.emit(ParseEvent::TestFound(data)),
            Frame::Failure {
                on_test: true,
                text,
                ..
            } => {
                if let Some(Frame::Test { data, .. }) = self.stack.last_mut()
                    && let Some(failure) = data.failure.as_mut()
                {
                    failure.stack_trace = non_empty(&text);
                }
            }
            Frame::Failure {
                on_test: false,
                error,
                mut failure,
                text,
            } => {
                failure.stack_trace = non_empty(&text);
                let suite = match self.stack.last() {
                    Some(Frame::Suite { name }) => name.clone(),
                    _ => String::new(),
                };
                out.emit(ParseEvent::SuiteFailure {
                    suite,
                    error,
                    failure,
                });
            }
            Frame::Text { target, text } => {
                if let Some(Frame::Test {
                    data,
                    timed_by_attribute,
                }) = self.stack.last_mut()
                {
                    match target {
                        Capture::StdOut => data.std_out = non_empty(&text),
                        Capture::StdErr => data.std_err = non_empty(&text),
                        Capture::Time if !*timed_by_attribute => {
                            if let Some(ms) = parse_seconds_ms(&text) {
                                data.duration_ms = ms;
                            }
                        }
                        Capture::Time => {}
                    }
                }
            }
            Frame::Skip => {}
        }

        if self.stack.is_empty() && self.saw_root {
            self.complete = true;
        }
    }
}

impl DocumentWalk for JUnitWalk {
    fn on_node(&mut self, node: Node, out: &mut EventCursor<'_>) {
        match node {
            Node::Open(el) => self.open(el, out),
            Node::Close(_) => self.close(out),
            Node::Text(text) => match self.stack.last_mut() {
                Some(Frame::Failure { text: buf, .. } | Frame::Text { text: buf, .. }) => {
                    buf.push_str(&text)
                }
                _ => {}
            },
        }
    }

    fn saw_root(&self) -> bool {
        self.saw_root
    }

    fn is_complete(&self) -> bool {
        self.complete
    }
}

fn open_suite(el: &Element, out: &mut EventCursor<'_>) -> Frame {
    let name = qualified_name(el.attr("package"), el.attr("name"));
    out.emit(ParseEvent::SuiteFound { name: name.clone() });
    Frame::Suite { name }
}

fn open_test(el: &Element) -> Frame {
    let mut data = TestData::new(qualified_name(el.attr("classname"), el.attr("name")));
    data.executed = match (el.attr("executed"), el.attr("status")) {
        (Some(executed), _) => executed.eq_ignore_ascii_case("true"),
        (None, Some(status)) => status == "run",
        (None, None) => true,
    };

    let attribute_time = el.attr("time").and_then(parse_seconds_ms);
    if let Some(ms) = attribute_time {
        data.duration_ms = ms;
    }

    Frame::Test {
        data,
        timed_by_attribute: attribute_time.is_some(),
    }
}

fn failure_header(el: &Element) -> TestFailure {
    TestFailure {
        kind: el.attr_string("type"),
        message: el.attr_string("message"),
        stack_trace: None,
    }
}

fn text_frame(target: Capture) -> Frame {
    Frame::Text {
        target,
        text: String::new(),
    }
}
