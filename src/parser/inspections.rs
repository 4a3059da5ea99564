// Shared plumbing for static-analysis report parsers
//
// Inspection reports are only parsed once their closing tag is on disk.
// Everything a parse produces is buffered in an `InspectionBatch` and
// handed to the sinks only when the whole document parsed cleanly.

use super::xml::{XmlError, is_report_complete};
use super::{ParseOutcome, ParserContext};
use crate::error::ReportError;
use crate::report::{BuildLog, InspectionReporter};
use crate::state::{Inspection, InspectionType, ReportFile, ThresholdAggregator};
use crate::utils::FileUtils;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Message used until a report supplies a better one
pub const DEFAULT_MESSAGE: &str = "No message";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Emission {
    Type(InspectionType),
    Finding(Inspection),
    Warning(String),
    Error(String),
}

/// Ordered output of one parse attempt
#[derive(Debug, Default)]
pub struct InspectionBatch {
    emissions: Vec<Emission>,
}

impl InspectionBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare_type(&mut self, inspection_type: InspectionType) {
        self.emissions.push(Emission::Type(inspection_type));
    }

    pub fn finding(&mut self, inspection: Inspection) {
        self.emissions.push(Emission::Finding(inspection));
    }

    pub fn warning(&mut self, text: impl Into<String>) {
        self.emissions.push(Emission::Warning(text.into()));
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.emissions.push(Emission::Error(text.into()));
    }
}

/// Read the report only when its tail carries `marker`
pub fn read_if_complete(path: &Path, marker: &str) -> Result<Option<Vec<u8>>, ReportError> {
    if !is_report_complete(path, marker).map_err(|e| ReportError::io(path, e))? {
        debug!("{} doesn't end with {} yet", path.display(), marker);
        return Ok(None);
    }
    FileUtils::read_bytes(path)
        .map(Some)
        .map_err(|e| ReportError::io(path, e))
}

/// Per-parser state shared by FindBugs, PMD and Checkstyle
pub struct InspectionState {
    reporter: Arc<dyn InspectionReporter>,
    log: Arc<dyn BuildLog>,
    checkout_dir: String,
    reported_types: HashSet<String>,
    thresholds: ThresholdAggregator,
    abnormal_end: bool,
}

impl InspectionState {
    pub fn new(ctx: &ParserContext) -> Self {
        Self {
            reporter: ctx.sinks.inspections.clone(),
            log: ctx.sinks.log.clone(),
            checkout_dir: ctx.checkout_dir.clone(),
            reported_types: HashSet::new(),
            thresholds: ThresholdAggregator::new(),
            abnormal_end: false,
        }
    }

    /// Checkout-relative, forward-slash form of a path found in a report
    pub fn resolve_path(&self, path: &str) -> String {
        FileUtils::resolve_source_path(path, &self.checkout_dir)
    }

    pub fn is_type_reported(&self, id: &str) -> bool {
        self.reported_types.contains(id)
    }

    /// Run one gated attempt: wait for `marker`, then let `collect` build
    /// a batch from the full document and commit it.
    pub fn attempt<F>(
        &mut self,
        report: &ReportFile,
        marker: &str,
        parser_name: &'static str,
        collect: F,
    ) -> Result<ParseOutcome, ReportError>
    where
        F: FnOnce(&Self, &[u8]) -> Result<InspectionBatch, XmlError>,
    {
        self.abnormal_end = false;
        let Some(content) = read_if_complete(report.path(), marker)? else {
            return Ok(ParseOutcome::Pending(0));
        };

        self.reporter.mark_build_as_inspections_build();
        let collected = collect(self, &content);
        let result = match collected {
            Ok(batch) => {
                self.commit(batch);
                Ok(ParseOutcome::Finished)
            }
            Err(e) => {
                debug!("{} is not parsable by {} parser: {}", report.path().display(), parser_name, e);
                self.abnormal_end = true;
                Err(ReportError::Malformed {
                    path: report.path().to_path_buf(),
                    parser: parser_name,
                    reason: e.to_string(),
                })
            }
        };
        self.reporter.flush();
        result
    }

    fn commit(&mut self, batch: InspectionBatch) {
        for emission in batch.emissions {
            match emission {
                Emission::Type(inspection_type) => {
                    if self.reported_types.insert(inspection_type.id.clone()) {
                        self.reporter.report_inspection_type(inspection_type);
                    }
                }
                Emission::Finding(inspection) => {
                    self.thresholds.record(inspection.severity);
                    self.reporter.report_inspection(inspection);
                }
                Emission::Warning(text) => self.log.warning(&text),
                Emission::Error(text) => self.log.error(&text),
            }
        }
    }

    pub fn is_abnormal_end(&self) -> bool {
        self.abnormal_end
    }

    pub fn complete_report(&mut self, report: &ReportFile) -> String {
        self.thresholds.complete_report(report.path())
    }

    pub fn thresholds(&self) -> &ThresholdAggregator {
        &self.thresholds
    }
}
