// Report processor - pulls discovered files from the queue and drives
// their parsers until each report is complete or given up

use crate::config::{ProcessingSettings, ReportParameters};
use crate::error::ReportError;
use crate::parser::{FormatParser, ParseOutcome, ParserContext, ReportParser, ReportType};
use crate::queue::ReportReceiver;
use crate::state::{ReportFile, ReportTask, TaskState, ThresholdAggregator};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Why a report was given up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureKind {
    Unreadable,
    Malformed,
    UnsupportedFormat,
}

impl From<&ReportError> for FailureKind {
    fn from(error: &ReportError) -> Self {
        match error {
            ReportError::Io { .. } => Self::Unreadable,
            ReportError::Malformed { .. } => Self::Malformed,
            ReportError::UnsupportedFormat { .. } => Self::UnsupportedFormat,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedReport {
    pub path: PathBuf,
    pub kind: FailureKind,
    pub tries: u32,
}

/// What the processor did during its lifetime
#[derive(Debug, Clone, Default)]
pub struct ProcessorReport {
    pub completed: Vec<PathBuf>,
    pub failed: Vec<FailedReport>,
    /// Cumulative finding counts of every completed inspection report
    pub thresholds: ThresholdAggregator,
}

pub struct ReportProcessor {
    receiver: ReportReceiver,
    watcher_finished: watch::Receiver<bool>,
    ctx: ParserContext,
    settings: ProcessingSettings,
    report_type: ReportType,
    verbose: bool,
    /// Reused for every report of the run; `None` only while an attempt
    /// runs on the blocking pool
    parser: Option<FormatParser>,
    current: Option<ReportTask>,
    report: ProcessorReport,
}

impl ReportProcessor {
    pub fn new(
        receiver: ReportReceiver,
        watcher_finished: watch::Receiver<bool>,
        ctx: ParserContext,
        settings: ProcessingSettings,
        params: &ReportParameters,
    ) -> Self {
        let parser = FormatParser::for_type(params.report_type, &ctx);
        Self {
            receiver,
            watcher_finished,
            ctx,
            settings,
            report_type: params.report_type,
            verbose: params.verbose,
            parser: Some(parser),
            current: None,
            report: ProcessorReport::default(),
        }
    }

    /// Run on the tokio runtime; the handle resolves once the queue is drained
    pub fn spawn(self) -> JoinHandle<ProcessorReport> {
        tokio::spawn(self.run())
    }

    pub async fn run(mut self) -> ProcessorReport {
        while !self.watcher_done() {
            self.process_next(self.settings.file_wait_timeout).await;
        }

        debug!("Watcher finished, draining {} queued report(s)", self.receiver.len());
        while self.current.is_some() || !self.receiver.is_empty() {
            self.process_next(self.settings.drain_wait_timeout).await;
        }

        if let Some(thresholds) = self.parser.as_ref().and_then(|p| p.thresholds()) {
            self.report.thresholds = thresholds.clone();
        }
        self.report
    }

    fn watcher_done(&self) -> bool {
        *self.watcher_finished.borrow() || self.watcher_finished.has_changed().is_err()
    }

    async fn process_next(&mut self, wait: Duration) {
        if self.current.is_none() {
            let Some(file) = self.receiver.take(wait).await else {
                return;
            };
            debug!("Processing {}", file.path().display());
            self.current = Some(ReportTask::new(file));
        }

        let Some(mut task) = self.current.take() else {
            return;
        };

        let file = task.file().clone();
        match self.attempt(&file, task.processed_events()).await {
            Ok(ParseOutcome::Finished) => self.complete(task, &file),
            Ok(ParseOutcome::Pending(marker)) => {
                task.set_processed_events(marker);
                task.parsed_once_more();

                if task.tries_to_parse() >= self.settings.tries_to_parse {
                    let error = if self.parser().is_abnormal_end() {
                        ReportError::Malformed {
                            path: file.path().to_path_buf(),
                            parser: self.report_type.display_name(),
                            reason: "document ended unexpectedly".to_string(),
                        }
                    } else {
                        ReportError::UnsupportedFormat {
                            path: file.path().to_path_buf(),
                            type_name: self.report_type.display_name(),
                        }
                    };
                    self.fail(task, &error);
                } else {
                    self.current = Some(task);
                    tokio::time::sleep(self.settings.scan_interval).await;
                }
            }
            Err(error) => self.fail(task, &error),
        }
    }

    /// One parse attempt on the blocking pool. A panicking parser is
    /// replaced and the report classified as malformed.
    async fn attempt(&mut self, file: &ReportFile, processed: u64) -> Result<ParseOutcome, ReportError> {
        let mut parser = self
            .parser
            .take()
            .unwrap_or_else(|| FormatParser::for_type(self.report_type, &self.ctx));
        let owned = file.clone();

        match tokio::task::spawn_blocking(move || {
            let result = parser.parse(&owned, processed);
            (parser, result)
        })
        .await
        {
            Ok((parser, result)) => {
                self.parser = Some(parser);
                result
            }
            Err(e) => {
                error!("Parser failed on {}: {}", file.path().display(), e);
                self.parser = Some(FormatParser::for_type(self.report_type, &self.ctx));
                Err(ReportError::Malformed {
                    path: file.path().to_path_buf(),
                    parser: self.report_type.display_name(),
                    reason: "parser aborted".to_string(),
                })
            }
        }
    }

    fn parser(&mut self) -> &mut FormatParser {
        self.parser
            .get_or_insert_with(|| FormatParser::for_type(self.report_type, &self.ctx))
    }

    fn complete(&mut self, mut task: ReportTask, file: &ReportFile) {
        let summary = self.parser().complete_report(file);

        if self.verbose {
            self.ctx.sinks.log.message(&summary);
        } else {
            debug!("{}", summary);
        }

        task.finish(TaskState::Completed);
        self.report.completed.push(file.path().to_path_buf());
    }

    fn fail(&mut self, mut task: ReportTask, error: &ReportError) {
        debug!("Giving up {}: {:?}", task.file().path().display(), FailureKind::from(error));
        self.ctx.sinks.log.warning(&error.to_string());

        task.finish(TaskState::Failed);
        self.report.failed.push(FailedReport {
            path: task.file().path().to_path_buf(),
            kind: FailureKind::from(error),
            tries: task.tries_to_parse(),
        });
    }
}
