// Directory watcher - periodically scans the rule paths and queues every
// newly appeared report file exactly once

pub mod rules;

pub use rules::{PathRules, Rules};

use crate::config::ReportParameters;
use crate::parser::ReportType;
use crate::queue::ReportSender;
use crate::report::BuildLog;
use crate::state::ReportFile;
use crate::utils::FileUtils;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

/// Counters of one watcher run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WatcherStatus {
    pub discovered: usize,
    pub out_of_date: usize,
    pub scans: u64,
}

pub struct DirectoryWatcher {
    rules: Arc<dyn Rules>,
    report_type: ReportType,
    sender: ReportSender,
    log: Arc<dyn BuildLog>,
    parse_out_of_date: bool,
    build_start: SystemTime,
    interval: Duration,
    seen: HashSet<PathBuf>,
    out_of_date: HashSet<PathBuf>,
    status: WatcherStatus,
}

impl DirectoryWatcher {
    pub fn new(
        rules: Arc<dyn Rules>,
        params: &ReportParameters,
        sender: ReportSender,
        log: Arc<dyn BuildLog>,
        interval: Duration,
    ) -> Self {
        Self {
            rules,
            report_type: params.report_type,
            sender,
            log,
            parse_out_of_date: params.parse_out_of_date,
            build_start: SystemTime::from(params.build_start),
            interval,
            seen: HashSet::new(),
            out_of_date: HashSet::new(),
            status: WatcherStatus::default(),
        }
    }

    /// One pass over the rules. Returns the number of files queued.
    pub fn scan(&mut self) -> usize {
        let files = self.rules.collect_files();
        self.queue_new(files)
    }

    /// Same as `scan`, with the directory walk on the blocking pool
    async fn scan_blocking(&mut self) -> usize {
        let rules = Arc::clone(&self.rules);
        match tokio::task::spawn_blocking(move || rules.collect_files()).await {
            Ok(files) => self.queue_new(files),
            Err(e) => {
                error!("Report scan failed: {}", e);
                0
            }
        }
    }

    fn queue_new(&mut self, files: Vec<PathBuf>) -> usize {
        self.status.scans += 1;
        let mut queued = 0;

        for path in files {
            if self.seen.contains(&path) || !self.is_fresh(&path) {
                continue;
            }

            info!("Found report file: {}", path.display());
            if !self.sender.push(ReportFile::new(path.clone(), self.report_type)) {
                debug!("Report queue closed, dropping {}", path.display());
                continue;
            }
            self.seen.insert(path);
            queued += 1;
        }

        self.status.discovered += queued;
        queued
    }

    fn is_fresh(&mut self, path: &Path) -> bool {
        if self.parse_out_of_date {
            return true;
        }

        match FileUtils::get_mtime(path) {
            Ok(modified) if modified >= self.build_start => true,
            Ok(_) => {
                if self.out_of_date.insert(path.to_path_buf()) {
                    self.status.out_of_date += 1;
                    debug!("{} is out of date, skipping", path.display());
                }
                false
            }
            Err(e) => {
                debug!("Cannot stat {}: {}", path.display(), e);
                false
            }
        }
    }

    pub fn status(&self) -> WatcherStatus {
        self.status
    }

    /// Start scanning in the background
    pub fn spawn(self) -> WatcherHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let (finished_tx, finished_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(stop_rx, finished_tx));

        WatcherHandle {
            stop: stop_tx,
            finished: finished_rx,
            task,
        }
    }

    async fn run(
        mut self,
        mut stop: watch::Receiver<bool>,
        finished: watch::Sender<bool>,
    ) -> WatcherStatus {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.scan_blocking().await;
                }
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                }
            }
        }

        // Files written right before the stop
        self.scan_blocking().await;

        if self.status.discovered == 0 {
            self.log.warning(&format!(
                "No reports found for paths: {}",
                self.rules.body().replace('\n', ", ")
            ));
        } else {
            debug!("Watcher discovered {} report(s)", self.status.discovered);
        }

        let _ = finished.send(true);
        self.status
    }
}

/// Control side of a running watcher
pub struct WatcherHandle {
    stop: watch::Sender<bool>,
    finished: watch::Receiver<bool>,
    task: JoinHandle<WatcherStatus>,
}

impl WatcherHandle {
    /// Signal observed by the processor; flips to `true` after the final scan
    pub fn finished_signal(&self) -> watch::Receiver<bool> {
        self.finished.clone()
    }

    /// Request the stop and wait for the final scan
    pub async fn stop(self) -> WatcherStatus {
        let _ = self.stop.send(true);
        match self.task.await {
            Ok(status) => status,
            Err(e) => {
                error!("Watcher task failed: {}", e);
                WatcherStatus::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::report_queue;
    use crate::report::MemorySink;
    use chrono::{Duration as ChronoDuration, Utc};

    fn params(parse_out_of_date: bool) -> ReportParameters {
        let mut params = ReportParameters::new(ReportType::JUnit);
        params.parse_out_of_date = parse_out_of_date;
        params
    }

    #[tokio::test]
    async fn test_each_file_queued_once() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("TEST-a.xml"), "<testsuite/>").unwrap();

        let (tx, mut rx) = report_queue();
        let rules = Arc::new(PathRules::from_paths(&[dir.path().to_path_buf()]));
        let mut watcher = DirectoryWatcher::new(
            rules,
            &params(true),
            tx,
            Arc::new(MemorySink::new()),
            Duration::from_millis(10),
        );

        assert_eq!(watcher.scan(), 1);
        assert_eq!(watcher.scan(), 0);
        std::fs::write(dir.path().join("TEST-b.xml"), "<testsuite/>").unwrap();
        assert_eq!(watcher.scan(), 1);
        assert_eq!(watcher.status().discovered, 2);
        assert_eq!(rx.len(), 2);

        let first = rx.take(Duration::from_millis(10)).await.unwrap();
        assert_eq!(first.report_type(), ReportType::JUnit);
    }

    #[tokio::test]
    async fn test_out_of_date_files_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("old.xml"), "<pmd/>").unwrap();

        let mut params = params(false);
        params.build_start = Utc::now() + ChronoDuration::hours(1);

        let (tx, rx) = report_queue();
        let rules = Arc::new(PathRules::from_paths(&[dir.path().to_path_buf()]));
        let mut watcher = DirectoryWatcher::new(
            rules,
            &params,
            tx,
            Arc::new(MemorySink::new()),
            Duration::from_millis(10),
        );

        assert_eq!(watcher.scan(), 0);
        assert_eq!(watcher.scan(), 0);
        assert_eq!(watcher.status().out_of_date, 1);
        assert!(rx.is_empty());
    }

    #[tokio::test]
    async fn test_stop_runs_final_scan_and_signals() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, rx) = report_queue();
        let sink = Arc::new(MemorySink::new());
        let rules = Arc::new(PathRules::from_paths(&[dir.path().to_path_buf()]));
        let watcher = DirectoryWatcher::new(
            rules,
            &params(true),
            tx,
            sink.clone(),
            Duration::from_secs(3600),
        );

        let handle = watcher.spawn();
        let finished = handle.finished_signal();
        tokio::time::sleep(Duration::from_millis(20)).await;
        std::fs::write(dir.path().join("late.xml"), "<pmd/>").unwrap();

        let status = handle.stop().await;
        assert!(*finished.borrow());
        assert_eq!(status.discovered, 1);
        assert_eq!(rx.len(), 1);
        assert!(sink.warnings().is_empty());
    }

    #[tokio::test]
    async fn test_nothing_found_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, _rx) = report_queue();
        let sink = Arc::new(MemorySink::new());
        let rules = Arc::new(PathRules::from_paths(&[dir.path().to_path_buf()]));
        let watcher = DirectoryWatcher::new(
            rules,
            &params(true),
            tx,
            sink.clone(),
            Duration::from_millis(10),
        );

        let status = watcher.spawn().stop().await;
        assert_eq!(status.discovered, 0);
        assert_eq!(sink.warnings().len(), 1);
        assert!(sink.warnings()[0].starts_with("No reports found"));
    }
}
