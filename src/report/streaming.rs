// Streaming JSON sink - one JSON object per line on stdout

use super::{BuildLog, DuplicatesReporter, EventSink, InspectionReporter};
use crate::state::{BuildStatus, Duplicate, Inspection, InspectionType, ParseEvent};
use serde_json::json;
use std::io::{self, Write};

#[derive(Debug, Default)]
pub struct StreamingJsonSink;

impl StreamingJsonSink {
    pub fn new() -> Self {
        Self
    }

    fn emit_value(&self, event: &serde_json::Value) {
        let mut stdout = io::stdout().lock();
        if let Ok(s) = serde_json::to_string(event) {
            let _ = writeln!(stdout, "{}", s);
        }
        let _ = stdout.flush();
    }

    fn emit_event(&self, event: &ParseEvent) {
        if let Ok(mut value) = serde_json::to_value(event) {
            value["timestamp"] = json!(chrono::Utc::now().to_rfc3339());
            self.emit_value(&value);
        }
    }

    fn emit_log(&self, level: &str, text: &str) {
        self.emit_value(&json!({
            "event": "log",
            "level": level,
            "text": text,
            "timestamp": chrono::Utc::now().to_rfc3339()
        }));
    }
}

impl EventSink for StreamingJsonSink {
    fn emit(&self, event: ParseEvent) {
        self.emit_event(&event);
    }
}

impl InspectionReporter for StreamingJsonSink {
    fn report_inspection_type(&self, inspection_type: InspectionType) {
        self.emit_event(&ParseEvent::InspectionTypeDeclared(inspection_type));
    }

    fn report_inspection(&self, inspection: Inspection) {
        self.emit_event(&ParseEvent::InspectionFound(inspection));
    }

    fn flush(&self) {
        let _ = io::stdout().flush();
    }

    fn mark_build_as_inspections_build(&self) {
        self.emit_value(&json!({ "event": "inspectionsBuild" }));
    }
}

impl DuplicatesReporter for StreamingJsonSink {
    fn start_duplicates(&self) {
        self.emit_value(&json!({ "event": "duplicatesStart" }));
    }

    fn add_duplicate(&self, duplicate: Duplicate) {
        self.emit_event(&ParseEvent::DuplicateFound(duplicate));
    }

    fn finish_duplicates(&self) {
        self.emit_value(&json!({ "event": "duplicatesFinish" }));
    }
}

impl BuildLog for StreamingJsonSink {
    fn message(&self, text: &str) {
        self.emit_log("message", text);
    }

    fn warning(&self, text: &str) {
        self.emit_log("warning", text);
    }

    fn error(&self, text: &str) {
        self.emit_log("error", text);
    }

    fn build_status(&self, status: &BuildStatus) {
        self.emit_value(&json!({
            "event": "buildStatus",
            "status": status.status,
            "text": status.text,
            "timestamp": chrono::Utc::now().to_rfc3339()
        }));
    }
}
