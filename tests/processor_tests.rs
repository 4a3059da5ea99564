use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use xmlreport::config::{ProcessingSettings, ReportParameters};
use xmlreport::parser::{ParserContext, ReportType};
use xmlreport::processor::{FailureKind, ProcessorReport, ReportProcessor};
use xmlreport::queue::{ReportSender, report_queue};
use xmlreport::report::{LogEntry, MemorySink, Sinks};
use xmlreport::state::{ParseEvent, ReportFile};

const COMPLETE_SUITE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<testsuite name="com.acme.CalcTest" tests="2">
  <testcase classname="com.acme.CalcTest" name="adds" time="0.01"/>
  <testcase classname="com.acme.CalcTest" name="divides" time="0.02"/>
</testsuite>
"#;

fn settings(tries_to_parse: u32) -> ProcessingSettings {
    ProcessingSettings {
        file_wait_timeout: Duration::from_millis(20),
        drain_wait_timeout: Duration::from_millis(1),
        scan_interval: Duration::from_millis(5),
        tries_to_parse,
        watch_interval: Duration::from_millis(10),
    }
}

fn processor(
    sink: &Arc<MemorySink>,
    tries: u32,
    verbose: bool,
) -> (ReportSender, watch::Sender<bool>, ReportProcessor) {
    typed_processor(sink, ReportType::JUnit, tries, verbose)
}

fn typed_processor(
    sink: &Arc<MemorySink>,
    report_type: ReportType,
    tries: u32,
    verbose: bool,
) -> (ReportSender, watch::Sender<bool>, ReportProcessor) {
    let (tx, rx) = report_queue();
    let (finished_tx, finished_rx) = watch::channel(false);
    let mut params = ReportParameters::new(report_type);
    params.verbose = verbose;
    let ctx = ParserContext::new(Sinks::shared(sink.clone()));
    let processor = ReportProcessor::new(rx, finished_rx, ctx, settings(tries), &params);
    (tx, finished_tx, processor)
}

async fn run_to_end(
    sink: &Arc<MemorySink>,
    tries: u32,
    files: Vec<ReportFile>,
) -> ProcessorReport {
    run_typed(sink, ReportType::JUnit, tries, files).await
}

async fn run_typed(
    sink: &Arc<MemorySink>,
    report_type: ReportType,
    tries: u32,
    files: Vec<ReportFile>,
) -> ProcessorReport {
    let (tx, finished, processor) = typed_processor(sink, report_type, tries, false);
    for file in files {
        tx.push(file);
    }
    finished.send(true).unwrap();
    processor.run().await
}

fn write(dir: &Path, name: &str, content: &str) -> ReportFile {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    ReportFile::new(path, ReportType::JUnit)
}

fn count(events: &[ParseEvent], pred: impl Fn(&ParseEvent) -> bool) -> usize {
    events.iter().filter(|e| pred(e)).count()
}

#[tokio::test]
async fn test_complete_report_processed_once() {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(MemorySink::new());
    let file = write(dir.path(), "TEST-calc.xml", COMPLETE_SUITE);

    let report = run_to_end(&sink, 5, vec![file.clone()]).await;

    assert_eq!(report.completed, vec![file.path().to_path_buf()]);
    assert!(report.failed.is_empty());
    let events = sink.events();
    assert_eq!(count(&events, |e| matches!(e, ParseEvent::TestFound(_))), 2);
    assert!(sink.warnings().is_empty());
}

#[tokio::test]
async fn test_truncated_report_gives_up_after_exact_cap() {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(MemorySink::new());
    let cut = COMPLETE_SUITE.find("</testsuite>").unwrap();
    let file = write(dir.path(), "TEST-cut.xml", &COMPLETE_SUITE[..cut]);

    let report = run_to_end(&sink, 3, vec![file.clone()]).await;

    assert!(report.completed.is_empty());
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].kind, FailureKind::Malformed);
    assert_eq!(report.failed[0].tries, 3);

    // Each event reached the sink once despite three attempts
    let events = sink.events();
    assert_eq!(count(&events, |e| matches!(e, ParseEvent::SuiteFound { .. })), 1);
    assert_eq!(count(&events, |e| matches!(e, ParseEvent::TestFound(_))), 2);

    assert_eq!(
        sink.warnings(),
        vec![format!(
            "{} report has unexpected finish or unsupported format",
            file.path().display()
        )]
    );
}

#[tokio::test]
async fn test_foreign_document_is_unsupported_format() {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(MemorySink::new());
    let file = write(dir.path(), "page.xml", "<html><body/></html>");

    let report = run_to_end(&sink, 2, vec![file.clone()]).await;

    assert_eq!(report.failed[0].kind, FailureKind::UnsupportedFormat);
    assert_eq!(report.failed[0].tries, 2);
    assert!(sink.events().is_empty());
    assert_eq!(
        sink.warnings(),
        vec![format!("{} is not Ant JUnit report file", file.path().display())]
    );
}

#[tokio::test]
async fn test_broken_inspection_report_fails_without_retries() {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(MemorySink::new());
    let path = dir.path().join("pmd.xml");
    std::fs::write(&path, "<pmd><file name=\"a\"></violation></pmd>").unwrap();

    let report = run_typed(&sink, ReportType::Pmd, 50, vec![ReportFile::new(&path, ReportType::Pmd)]).await;

    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].kind, FailureKind::Malformed);
    assert_eq!(report.failed[0].tries, 0);
    assert_eq!(sink.warnings().len(), 1);
}

#[tokio::test]
async fn test_missing_file_is_unreadable() {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(MemorySink::new());
    let gone = ReportFile::new(dir.path().join("gone.xml"), ReportType::JUnit);

    let report = run_to_end(&sink, 5, vec![gone]).await;

    assert_eq!(report.failed[0].kind, FailureKind::Unreadable);
    assert!(sink.warnings()[0].starts_with("failed to read report"));
}

#[tokio::test]
async fn test_report_completed_while_being_retried() {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(MemorySink::new());
    let cut = COMPLETE_SUITE.find("<testcase classname=\"com.acme.CalcTest\" name=\"divides\"").unwrap();
    let file = write(dir.path(), "TEST-growing.xml", &COMPLETE_SUITE[..cut]);

    let (tx, finished, processor) = processor(&sink, 1000, false);
    tx.push(file.clone());
    let handle = tokio::spawn(processor.run());

    tokio::time::sleep(Duration::from_millis(40)).await;
    std::fs::write(file.path(), COMPLETE_SUITE).unwrap();
    finished.send(true).unwrap();

    let report = handle.await.unwrap();
    assert_eq!(report.completed.len(), 1);
    assert!(report.failed.is_empty());

    let events = sink.events();
    assert_eq!(count(&events, |e| matches!(e, ParseEvent::SuiteFound { .. })), 1);
    assert_eq!(count(&events, |e| matches!(e, ParseEvent::TestFound(_))), 2);
    assert_eq!(count(&events, |e| matches!(e, ParseEvent::SuiteFinished { .. })), 1);
}

#[tokio::test]
async fn test_queue_drained_in_order_after_watcher_finished() {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(MemorySink::new());
    let files: Vec<_> = ["a", "b", "c"]
        .iter()
        .map(|n| write(dir.path(), &format!("TEST-{}.xml", n), COMPLETE_SUITE))
        .collect();
    let expected: Vec<_> = files.iter().map(|f| f.path().to_path_buf()).collect();

    let report = run_to_end(&sink, 5, files).await;
    assert_eq!(report.completed, expected);
}

#[tokio::test]
async fn test_dropped_watcher_counts_as_finished() {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(MemorySink::new());
    let file = write(dir.path(), "TEST-a.xml", COMPLETE_SUITE);

    let (tx, finished, processor) = processor(&sink, 5, false);
    tx.push(file);
    drop(finished);

    let report = tokio::time::timeout(Duration::from_secs(5), processor.run())
        .await
        .expect("processor must stop once the watcher is gone");
    assert_eq!(report.completed.len(), 1);
}

#[tokio::test]
async fn test_verbose_summary_goes_to_build_log() {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(MemorySink::new());
    let file = write(dir.path(), "TEST-v.xml", COMPLETE_SUITE);

    let (tx, finished, processor) = processor(&sink, 5, true);
    tx.push(file.clone());
    finished.send(true).unwrap();
    processor.run().await;

    assert!(sink.log().contains(&LogEntry::Message(format!(
        "{} report processed",
        file.path().display()
    ))));
}

const PMD_REPORT: &str = r#"<?xml version="1.0"?>
<pmd version="6.0">
  <file name="src/A.java">
    <violation beginline="3" rule="R" ruleset="Set" priority="1">Broken</violation>
  </file>
</pmd>
"#;

#[tokio::test]
async fn test_inspection_type_registered_once_per_run() {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(MemorySink::new());
    let files: Vec<_> = ["pmd-a.xml", "pmd-b.xml"]
        .iter()
        .map(|name| {
            let path = dir.path().join(name);
            std::fs::write(&path, PMD_REPORT).unwrap();
            ReportFile::new(path, ReportType::Pmd)
        })
        .collect();

    let report = run_typed(&sink, ReportType::Pmd, 5, files).await;

    assert_eq!(report.completed.len(), 2);
    let events = sink.events();
    assert_eq!(
        count(&events, |e| matches!(e, ParseEvent::InspectionTypeDeclared(t) if t.id == "R")),
        1
    );
    assert_eq!(count(&events, |e| matches!(e, ParseEvent::InspectionFound(_))), 2);
    assert_eq!(report.thresholds.total().errors, 2);
}

#[tokio::test]
async fn test_unclosed_inspection_report_gives_up_after_exact_cap() {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(MemorySink::new());
    let cut = PMD_REPORT.find("</pmd>").unwrap();
    let path = dir.path().join("pmd.xml");
    std::fs::write(&path, &PMD_REPORT[..cut]).unwrap();

    let report = run_typed(&sink, ReportType::Pmd, 4, vec![ReportFile::new(&path, ReportType::Pmd)]).await;

    assert!(report.completed.is_empty());
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].kind, FailureKind::UnsupportedFormat);
    assert_eq!(report.failed[0].tries, 4);
    assert!(sink.events().is_empty());
    assert!(!sink.is_inspections_build());
}
