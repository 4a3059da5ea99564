// Error types shared across the library

use std::path::PathBuf;
use thiserror::Error;

/// Per-report failures. None of these stop the processing loop.
#[derive(Debug, Error)]
pub enum ReportError {
    /// File vanished or became unreadable between discovery and processing
    #[error("failed to read report {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Closing marker was present but the document did not parse
    #[error("{} report has unexpected finish or unsupported format", path.display())]
    Malformed {
        path: PathBuf,
        parser: &'static str,
        reason: String,
    },

    /// Document never took the expected shape within the retry budget
    #[error("{} is not {type_name} report file", path.display())]
    UnsupportedFormat {
        path: PathBuf,
        type_name: &'static str,
    },
}

impl ReportError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this failure means the document looked broken mid-stream
    pub fn is_abnormal_end(&self) -> bool {
        matches!(self, Self::Malformed { .. })
    }
}

/// Configuration-time failures
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown report type '{0}'")]
    UnknownReportType(String),

    #[error("import directive is missing the '{0}' attribute")]
    MissingAttribute(&'static str),

    #[error("invalid import directive: {0}")]
    InvalidDirective(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_message() {
        let err = ReportError::Malformed {
            path: PathBuf::from("reports/pmd.xml"),
            parser: "PMD",
            reason: "unexpected end".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "reports/pmd.xml report has unexpected finish or unsupported format"
        );
        assert!(err.is_abnormal_end());
    }

    #[test]
    fn test_unsupported_message() {
        let err = ReportError::UnsupportedFormat {
            path: PathBuf::from("out/TEST-a.xml"),
            type_name: "Ant JUnit",
        };
        assert_eq!(err.to_string(), "out/TEST-a.xml is not Ant JUnit report file");
        assert!(!err.is_abnormal_end());
    }
}
