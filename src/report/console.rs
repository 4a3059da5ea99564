// Console sink - human-readable stdout output

use super::{BuildLog, DuplicatesReporter, EventSink, InspectionReporter};
use crate::state::{BuildStatus, Duplicate, Inspection, InspectionType, ParseEvent, StatusKind};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{error, warn};

/// Console sink
#[derive(Debug, Default)]
pub struct ConsoleSink {
    suite_depth: AtomicUsize,
    output_lock: Mutex<()>,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn print(&self, line: String) {
        let _guard = self.output_lock.lock();
        println!("{}", line);
    }

    fn indent(&self) -> String {
        "  ".repeat(self.suite_depth.load(Ordering::SeqCst))
    }
}

impl EventSink for ConsoleSink {
    fn emit(&self, event: ParseEvent) {
        match event {
            ParseEvent::SuiteFound { name } => {
                self.print(format!("{}📦 {}", self.indent(), name));
                self.suite_depth.fetch_add(1, Ordering::SeqCst);
            }
            ParseEvent::SuiteFinished { .. } => {
                let _ = self
                    .suite_depth
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |d| d.checked_sub(1));
            }
            ParseEvent::SuiteFailure {
                suite,
                error,
                failure,
            } => {
                let label = if error { "error" } else { "failure" };
                self.print(format!(
                    "{}❌ suite {} {}: {}",
                    self.indent(),
                    suite,
                    label,
                    failure.message.as_deref().unwrap_or("")
                ));
            }
            ParseEvent::TestFound(test) => {
                let line = match (&test.failure, test.executed) {
                    (Some(failure), _) => format!(
                        "{}❌ {} ({}ms): {}",
                        self.indent(),
                        test.name,
                        test.duration_ms,
                        failure
                            .message
                            .as_deref()
                            .or(failure.kind.as_deref())
                            .unwrap_or("failed")
                    ),
                    (None, false) => format!("{}⏭️  {} (ignored)", self.indent(), test.name),
                    (None, true) => {
                        format!("{}✅ {} ({}ms)", self.indent(), test.name, test.duration_ms)
                    }
                };
                self.print(line);
            }
            ParseEvent::InspectionFound(inspection) => self.report_inspection(inspection),
            ParseEvent::InspectionTypeDeclared(t) => self.report_inspection_type(t),
            ParseEvent::DuplicateFound(duplicate) => self.add_duplicate(duplicate),
        }
    }
}

impl InspectionReporter for ConsoleSink {
    fn report_inspection_type(&self, _inspection_type: InspectionType) {
        // Types only matter to structured consumers
    }

    fn report_inspection(&self, inspection: Inspection) {
        self.print(format!(
            "⚠️  {} {}:{} [{}] {}",
            inspection.severity,
            inspection.file_path,
            inspection.line,
            inspection.type_id,
            inspection.message
        ));
    }

    fn flush(&self) {}

    fn mark_build_as_inspections_build(&self) {}
}

impl DuplicatesReporter for ConsoleSink {
    fn start_duplicates(&self) {}

    fn add_duplicate(&self, duplicate: Duplicate) {
        let places = duplicate
            .fragments
            .iter()
            .map(|f| format!("{}:{}-{}", f.path, f.line_range.0, f.line_range.1))
            .collect::<Vec<_>>()
            .join(", ");
        self.print(format!(
            "📋 duplicate ({} tokens): {}",
            duplicate.tokens, places
        ));
    }

    fn finish_duplicates(&self) {}
}

impl BuildLog for ConsoleSink {
    fn message(&self, text: &str) {
        self.print(format!(
            "ℹ️  INFO [{}]: {}",
            chrono::Local::now().format("%H:%M:%S"),
            text
        ));
    }

    fn warning(&self, text: &str) {
        warn!("{}", text);
    }

    fn error(&self, text: &str) {
        error!("{}", text);
    }

    fn build_status(&self, status: &BuildStatus) {
        let marker = match status.status {
            StatusKind::Failure => "❌ FAILURE",
            StatusKind::Normal => "✅ SUCCESS",
        };
        self.print(format!("{}: {}", marker, status.text));
    }
}
