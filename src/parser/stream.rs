// Resumable event-stream driving for suite/test report formats
//
// Every attempt re-walks the document from the start. Events already
// delivered by earlier attempts are counted but not re-emitted, so the
// progress marker is simply the number of events produced so far.

use super::ParseOutcome;
use super::xml::{Node, XmlStream};
use crate::error::ReportError;
use crate::report::EventSink;
use crate::state::ParseEvent;
use crate::utils::FileUtils;
use std::path::Path;
use tracing::debug;

/// Emits events past the resume point
pub struct EventCursor<'a> {
    sink: &'a dyn EventSink,
    skip: u64,
    produced: u64,
}

impl<'a> EventCursor<'a> {
    pub fn new(sink: &'a dyn EventSink, skip: u64) -> Self {
        Self {
            sink,
            skip,
            produced: 0,
        }
    }

    pub fn emit(&mut self, event: ParseEvent) {
        self.produced += 1;
        if self.produced > self.skip {
            self.sink.emit(event);
        }
    }

    pub fn produced(&self) -> u64 {
        self.produced
    }
}

/// Per-attempt traversal state of one document
pub trait DocumentWalk {
    fn on_node(&mut self, node: Node, out: &mut EventCursor<'_>);

    /// A recognized root element was opened
    fn saw_root(&self) -> bool;

    /// The recognized root element was closed
    fn is_complete(&self) -> bool;
}

/// Result of one walk over the current file contents
pub struct WalkResult {
    pub outcome: ParseOutcome,
    pub abnormal_end: bool,
}

/// Read the file and feed it through `walk` until the root closes or the
/// readable part of the document runs out.
pub fn drive<W: DocumentWalk>(
    path: &Path,
    processed: u64,
    sink: &dyn EventSink,
    mut walk: W,
) -> Result<WalkResult, ReportError> {
    let content = FileUtils::read_bytes(path).map_err(|e| ReportError::io(path, e))?;
    let mut stream = XmlStream::new(&content);
    let mut cursor = EventCursor::new(sink, processed);

    loop {
        match stream.next_node() {
            Ok(Some(node)) => {
                walk.on_node(node, &mut cursor);
                if walk.is_complete() {
                    return Ok(WalkResult {
                        outcome: ParseOutcome::Finished,
                        abnormal_end: false,
                    });
                }
            }
            Ok(None) => break,
            Err(e) => {
                debug!("{}: stopped at {}", path.display(), e);
                break;
            }
        }
    }

    Ok(WalkResult {
        outcome: ParseOutcome::Pending(cursor.produced()),
        abnormal_end: walk.saw_root(),
    })
}

/// `prefix.name` unless the name already carries the prefix
pub fn qualified_name(prefix: Option<&str>, name: Option<&str>) -> String {
    let name = name.unwrap_or_default();
    match prefix {
        Some(p) if !p.is_empty() && name.is_empty() => p.to_string(),
        Some(p) if !p.is_empty() && !name.starts_with(p) => format!("{}.{}", p, name),
        _ => name.to_string(),
    }
}

/// Seconds (`"1.25"`, `"1,234.5"`, `"0,5"`) to milliseconds
pub fn parse_seconds_ms(value: &str) -> Option<u64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let normalized = if value.contains('.') {
        value.replace(',', "")
    } else {
        value.replace(',', ".")
    };

    let seconds = normalized.parse::<f64>().ok()?;
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }
    Some((seconds * 1000.0).round() as u64)
}

/// `hh:mm:ss.fffffff` to milliseconds
pub fn parse_timespan_ms(value: &str) -> Option<u64> {
    let mut parts = value.trim().split(':');
    let hours = parts.next()?.parse::<u64>().ok()?;
    let minutes = parts.next()?.parse::<u64>().ok()?;
    let seconds = parts.next()?.parse::<f64>().ok()?;
    if parts.next().is_some() || !seconds.is_finite() || seconds < 0.0 {
        return None;
    }
    let whole = hours
        .checked_mul(3600)?
        .checked_add(minutes.checked_mul(60)?)?
        .checked_mul(1000)?;
    let fraction = seconds * 1000.0;
    if fraction >= u64::MAX as f64 {
        return None;
    }
    whole.checked_add(fraction.round() as u64)
}

/// Trimmed text, `None` when nothing is left
pub fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
