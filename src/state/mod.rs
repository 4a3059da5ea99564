// State module - report files, in-flight tasks and emitted events

pub mod event;
pub mod thresholds;

pub use event::{
    BuildStatus, Duplicate, DuplicateFragment, Inspection, InspectionType, ParseEvent, Severity,
    StatusKind, TestData, TestFailure,
};
pub use thresholds::{Counts, Limits, ThresholdAggregator, ThresholdExceeded};

use crate::parser::ReportType;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// A discovered report artifact. Never mutated after discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportFile {
    path: PathBuf,
    report_type: ReportType,
    discovered_at: DateTime<Utc>,
}

impl ReportFile {
    pub fn new(path: impl Into<PathBuf>, report_type: ReportType) -> Self {
        Self {
            path: path.into(),
            report_type,
            discovered_at: Utc::now(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn report_type(&self) -> ReportType {
        self.report_type
    }

    pub fn discovered_at(&self) -> DateTime<Utc> {
        self.discovered_at
    }
}

/// Processing state of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TaskState {
    Parsing,
    Retrying,
    Completed,
    Failed,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Mutable processing state wrapped around one report file.
///
/// Owned by the processor alone; a fresh task is the only way to reset
/// the retry counter.
#[derive(Debug)]
pub struct ReportTask {
    file: ReportFile,
    processed_events: u64,
    tries_to_parse: u32,
    state: TaskState,
}

impl ReportTask {
    pub fn new(file: ReportFile) -> Self {
        Self {
            file,
            processed_events: 0,
            tries_to_parse: 0,
            state: TaskState::Parsing,
        }
    }

    pub fn file(&self) -> &ReportFile {
        &self.file
    }

    pub fn processed_events(&self) -> u64 {
        self.processed_events
    }

    pub fn set_processed_events(&mut self, events: u64) {
        self.processed_events = events;
    }

    pub fn tries_to_parse(&self) -> u32 {
        self.tries_to_parse
    }

    /// Count one more non-terminal attempt
    pub fn parsed_once_more(&mut self) {
        self.tries_to_parse = self.tries_to_parse.saturating_add(1);
        self.state = TaskState::Retrying;
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn finish(&mut self, state: TaskState) {
        debug_assert!(state.is_terminal());
        self.state = state;
    }
}
