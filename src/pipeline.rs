// Report pipeline - one watcher, queue and processor per import directive

use crate::config::{ProcessingSettings, ReportParameters};
use crate::parser::ParserContext;
use crate::processor::{ProcessorReport, ReportProcessor};
use crate::queue::report_queue;
use crate::report::Sinks;
use crate::state::{BuildStatus, ThresholdExceeded};
use crate::watcher::{DirectoryWatcher, Rules, WatcherHandle, WatcherStatus};
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Final state of a finished pipeline
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub report: ProcessorReport,
    pub watcher: WatcherStatus,
    pub exceeded: Option<ThresholdExceeded>,
}

impl PipelineOutcome {
    pub fn is_failure(&self) -> bool {
        self.exceeded.is_some()
    }
}

pub struct ReportPipeline {
    params: ReportParameters,
    sinks: Sinks,
    watcher: WatcherHandle,
    processor: JoinHandle<ProcessorReport>,
}

impl ReportPipeline {
    /// Start watching and processing. Must be called inside a tokio runtime.
    pub fn start(
        params: ReportParameters,
        rules: Arc<dyn Rules>,
        sinks: Sinks,
        settings: ProcessingSettings,
    ) -> Self {
        info!(
            "Importing {} reports from {}",
            params.report_type.display_name(),
            rules.body().replace('\n', ", ")
        );

        let (sender, receiver) = report_queue();
        let watcher = DirectoryWatcher::new(
            rules,
            &params,
            sender,
            sinks.log.clone(),
            settings.watch_interval,
        )
        .spawn();

        let ctx = ParserContext::new(sinks.clone())
            .with_checkout_dir(params.checkout_dir.clone())
            .with_findbugs_home(params.findbugs_home.clone());

        let processor = ReportProcessor::new(
            receiver,
            watcher.finished_signal(),
            ctx,
            settings,
            &params,
        )
        .spawn();

        Self {
            params,
            sinks,
            watcher,
            processor,
        }
    }

    pub fn params(&self) -> &ReportParameters {
        &self.params
    }

    /// Stop watching, drain the queue and check the limits
    pub async fn finish(self) -> Result<PipelineOutcome> {
        let watcher = self.watcher.stop().await;
        let report = self
            .processor
            .await
            .context("report processor task failed")?;

        debug!(
            "{} report(s) completed, {} failed",
            report.completed.len(),
            report.failed.len()
        );

        let exceeded = report.thresholds.evaluate(&self.params.limits);
        if let Some(exceeded) = &exceeded {
            for reason in &exceeded.reasons {
                self.sinks.log.error(reason);
            }
            self.sinks
                .log
                .build_status(&BuildStatus::failure(exceeded.summary.clone()));
        }

        Ok(PipelineOutcome {
            report,
            watcher,
            exceeded,
        })
    }
}
