// Report queue - FIFO handoff between discovery and processing

use crate::state::ReportFile;
use std::time::Duration;
use tokio::sync::mpsc;

/// Create a connected sender/receiver pair
pub fn report_queue() -> (ReportSender, ReportReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ReportSender { tx }, ReportReceiver { rx })
}

/// Producer half. Cloneable, so several producers may share one queue.
#[derive(Debug, Clone)]
pub struct ReportSender {
    tx: mpsc::UnboundedSender<ReportFile>,
}

impl ReportSender {
    /// Enqueue a file. Returns false once the consumer is gone.
    pub fn push(&self, file: ReportFile) -> bool {
        self.tx.send(file).is_ok()
    }
}

/// Consumer half
#[derive(Debug)]
pub struct ReportReceiver {
    rx: mpsc::UnboundedReceiver<ReportFile>,
}

impl ReportReceiver {
    /// Next file in FIFO order, or `None` when nothing arrived within `timeout`
    pub async fn take(&mut self, timeout: Duration) -> Option<ReportFile> {
        if let Ok(file) = self.rx.try_recv() {
            return Some(file);
        }
        match tokio::time::timeout(timeout, self.rx.recv()).await {
            Ok(file) => file,
            Err(_) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ReportType;
    use std::time::Instant;

    #[tokio::test]
    async fn test_take_is_fifo() {
        let (tx, mut rx) = report_queue();
        tx.push(ReportFile::new("a.xml", ReportType::JUnit));
        tx.push(ReportFile::new("b.xml", ReportType::JUnit));

        assert_eq!(rx.len(), 2);
        let first = rx.take(Duration::from_millis(10)).await.unwrap();
        let second = rx.take(Duration::from_millis(10)).await.unwrap();
        assert_eq!(first.path().to_str(), Some("a.xml"));
        assert_eq!(second.path().to_str(), Some("b.xml"));
        assert!(rx.is_empty());
    }

    #[tokio::test]
    async fn test_take_times_out() {
        let (_tx, mut rx) = report_queue();
        let start = Instant::now();
        assert!(rx.take(Duration::from_millis(20)).await.is_none());
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_take_after_all_senders_dropped() {
        let (tx, mut rx) = report_queue();
        tx.push(ReportFile::new("a.xml", ReportType::Pmd));
        drop(tx);
        assert!(rx.take(Duration::from_millis(5)).await.is_some());
        assert!(rx.take(Duration::from_millis(5)).await.is_none());
    }

    #[tokio::test]
    async fn test_multiple_producers() {
        let (tx, mut rx) = report_queue();
        let other = tx.clone();
        let handle = tokio::spawn(async move {
            other.push(ReportFile::new("from-task.xml", ReportType::Checkstyle));
        });
        handle.await.unwrap();
        tx.push(ReportFile::new("local.xml", ReportType::Checkstyle));

        let mut seen = Vec::new();
        while let Some(file) = rx.take(Duration::from_millis(5)).await {
            seen.push(file.path().to_path_buf());
        }
        assert_eq!(seen.len(), 2);
    }
}
