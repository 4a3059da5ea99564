// In-memory sink - records everything it receives

use super::{BuildLog, DuplicatesReporter, EventSink, InspectionReporter};
use crate::state::{BuildStatus, Duplicate, Inspection, InspectionType, ParseEvent};
use serde::Serialize;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Build log line recorded by [`MemorySink`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "level", content = "text", rename_all = "lowercase")]
pub enum LogEntry {
    Message(String),
    Warning(String),
    Error(String),
    Status(BuildStatus),
}

/// Sink that keeps every event and log line, in arrival order
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<ParseEvent>>,
    log: Mutex<Vec<LogEntry>>,
    inspections_build: AtomicBool,
    flushes: AtomicUsize,
    duplicate_sessions: AtomicUsize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ParseEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn log(&self) -> Vec<LogEntry> {
        self.log.lock().map(|l| l.clone()).unwrap_or_default()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.log()
            .into_iter()
            .filter_map(|entry| match entry {
                LogEntry::Warning(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn statuses(&self) -> Vec<BuildStatus> {
        self.log()
            .into_iter()
            .filter_map(|entry| match entry {
                LogEntry::Status(status) => Some(status),
                _ => None,
            })
            .collect()
    }

    pub fn is_inspections_build(&self) -> bool {
        self.inspections_build.load(Ordering::SeqCst)
    }

    pub fn flush_count(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }

    /// Number of completed start/finish duplicate sessions
    pub fn duplicate_sessions(&self) -> usize {
        self.duplicate_sessions.load(Ordering::SeqCst)
    }

    fn push_event(&self, event: ParseEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }

    fn push_log(&self, entry: LogEntry) {
        if let Ok(mut log) = self.log.lock() {
            log.push(entry);
        }
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: ParseEvent) {
        self.push_event(event);
    }
}

impl InspectionReporter for MemorySink {
    fn report_inspection_type(&self, inspection_type: InspectionType) {
        self.push_event(ParseEvent::InspectionTypeDeclared(inspection_type));
    }

    fn report_inspection(&self, inspection: Inspection) {
        self.push_event(ParseEvent::InspectionFound(inspection));
    }

    fn flush(&self) {
        self.flushes.fetch_add(1, Ordering::SeqCst);
    }

    fn mark_build_as_inspections_build(&self) {
        self.inspections_build.store(true, Ordering::SeqCst);
    }
}

impl DuplicatesReporter for MemorySink {
    fn start_duplicates(&self) {}

    fn add_duplicate(&self, duplicate: Duplicate) {
        self.push_event(ParseEvent::DuplicateFound(duplicate));
    }

    fn finish_duplicates(&self) {
        self.duplicate_sessions.fetch_add(1, Ordering::SeqCst);
    }
}

impl BuildLog for MemorySink {
    fn message(&self, text: &str) {
        self.push_log(LogEntry::Message(text.to_string()));
    }

    fn warning(&self, text: &str) {
        self.push_log(LogEntry::Warning(text.to_string()));
    }

    fn error(&self, text: &str) {
        self.push_log(LogEntry::Error(text.to_string()));
    }

    fn build_status(&self, status: &BuildStatus) {
        self.push_log(LogEntry::Status(status.clone()));
    }
}
