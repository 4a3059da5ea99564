// Report module - sinks that receive parsed events and build messages

pub mod console;
pub mod memory;
pub mod streaming;

use crate::state::{BuildStatus, Duplicate, Inspection, InspectionType, ParseEvent};
use std::sync::Arc;

pub use console::ConsoleSink;
pub use memory::{LogEntry, MemorySink};
pub use streaming::StreamingJsonSink;

/// Receives suite and test events
pub trait EventSink: Send + Sync {
    fn emit(&self, event: ParseEvent);
}

/// Receives static-analysis findings
pub trait InspectionReporter: Send + Sync {
    /// Register a finding type; callers guarantee one call per id
    fn report_inspection_type(&self, inspection_type: InspectionType);

    fn report_inspection(&self, inspection: Inspection);

    /// Called at the end of every parsed inspection report
    fn flush(&self);

    fn mark_build_as_inspections_build(&self);
}

/// Receives duplicate-code blocks
pub trait DuplicatesReporter: Send + Sync {
    fn start_duplicates(&self);

    fn add_duplicate(&self, duplicate: Duplicate);

    fn finish_duplicates(&self);
}

/// Build-facing log: per-report summaries, warnings and build status
pub trait BuildLog: Send + Sync {
    fn message(&self, text: &str);

    fn warning(&self, text: &str);

    fn error(&self, text: &str);

    fn build_status(&self, status: &BuildStatus);
}

/// Handles to every sink the pipeline writes to
#[derive(Clone)]
pub struct Sinks {
    pub events: Arc<dyn EventSink>,
    pub inspections: Arc<dyn InspectionReporter>,
    pub duplicates: Arc<dyn DuplicatesReporter>,
    pub log: Arc<dyn BuildLog>,
}

impl Sinks {
    /// Route everything into a single sink implementation
    pub fn shared<S>(sink: Arc<S>) -> Self
    where
        S: EventSink + InspectionReporter + DuplicatesReporter + BuildLog + 'static,
    {
        Self {
            events: sink.clone(),
            inspections: sink.clone(),
            duplicates: sink.clone(),
            log: sink,
        }
    }
}
