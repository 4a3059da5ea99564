// Domain events produced by the report parsers

use serde::Serialize;
use std::fmt;

/// Three-level finding severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    /// Map a numeric priority (1 = highest) onto the three-level scale
    pub fn from_priority(priority: u32) -> Self {
        match priority {
            1 => Self::Error,
            2 => Self::Warning,
            _ => Self::Info,
        }
    }

    /// Map a textual severity, `None` when the value is not recognized
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "error" => Some(Self::Error),
            "warning" => Some(Self::Warning),
            "info" => Some(Self::Info),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Warning => "WARNING",
            Self::Info => "INFO",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure captured for a test or a suite
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestFailure {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub message: Option<String>,
    pub stack_trace: Option<String>,
}

/// One finished test case
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestData {
    pub name: String,
    pub duration_ms: u64,
    pub executed: bool,
    pub failure: Option<TestFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub std_out: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub std_err: Option<String>,
}

impl TestData {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            duration_ms: 0,
            executed: true,
            failure: None,
            std_out: None,
            std_err: None,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.failure.is_some()
    }
}

/// One reported finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Inspection {
    pub type_id: String,
    pub file_path: String,
    pub line: u32,
    pub message: String,
    pub severity: Severity,
}

/// Descriptive metadata of a finding type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InspectionType {
    pub id: String,
    pub name: String,
    pub category: String,
    pub description: String,
}

/// One location of a duplicated code block
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateFragment {
    pub path: String,
    pub start_line: u32,
    pub line_range: (u32, u32),
}

/// A duplicated code block and every place it occurs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Duplicate {
    pub hash: i32,
    pub tokens: u32,
    pub fragments: Vec<DuplicateFragment>,
}

/// Tagged union of everything a parser can emit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum ParseEvent {
    SuiteFound {
        name: String,
    },
    SuiteFailure {
        suite: String,
        error: bool,
        failure: TestFailure,
    },
    SuiteFinished {
        name: String,
    },
    TestFound(TestData),
    InspectionFound(Inspection),
    InspectionTypeDeclared(InspectionType),
    DuplicateFound(Duplicate),
}

/// Build status kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StatusKind {
    Normal,
    Failure,
}

/// Structured build status message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildStatus {
    pub text: String,
    pub status: StatusKind,
}

impl BuildStatus {
    pub fn failure(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            status: StatusKind::Failure,
        }
    }
}
