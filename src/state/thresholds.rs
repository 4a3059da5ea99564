// Error/warning accounting and limit evaluation

use super::Severity;
use serde::Serialize;
use std::path::Path;

/// Optional maxima for the cumulative counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Limits {
    pub max_errors: Option<u32>,
    pub max_warnings: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    pub errors: u32,
    pub warnings: u32,
    pub infos: u32,
}

impl Counts {
    fn add(&mut self, severity: Severity) {
        match severity {
            Severity::Error => self.errors += 1,
            Severity::Warning => self.warnings += 1,
            Severity::Info => self.infos += 1,
        }
    }
}

/// Limits were exceeded at the end of the run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThresholdExceeded {
    pub reasons: Vec<String>,
    pub summary: String,
}

/// Per-report and cumulative finding counters
#[derive(Debug, Clone, Default)]
pub struct ThresholdAggregator {
    current: Counts,
    total: Counts,
}

impl ThresholdAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, severity: Severity) {
        self.current.add(severity);
    }

    /// Counters of the report being parsed
    pub fn current(&self) -> Counts {
        self.current
    }

    /// Counters of every completed report
    pub fn total(&self) -> Counts {
        self.total
    }

    /// Fold the per-report counters into the totals and reset them.
    ///
    /// Returns the human-readable per-report summary.
    pub fn complete_report(&mut self, path: &Path) -> String {
        let mut message = format!("{} report processed", path.display());
        if self.current.errors > 0 {
            message.push_str(&format!(": {} error(s)", self.current.errors));
        }
        if self.current.warnings > 0 {
            message.push_str(&format!(": {} warning(s)", self.current.warnings));
        }
        if self.current.infos > 0 {
            message.push_str(&format!(": {} info message(s)", self.current.infos));
        }

        self.total.errors += self.current.errors;
        self.total.warnings += self.current.warnings;
        self.total.infos += self.current.infos;
        self.current = Counts::default();

        message
    }

    /// Compare the cumulative totals against the configured limits
    pub fn evaluate(&self, limits: &Limits) -> Option<ThresholdExceeded> {
        let mut reasons = Vec::new();

        if let Some(limit) = limits.max_errors
            && self.total.errors > limit
        {
            reasons.push(format!(
                "Errors limit reached: found {} errors, limit {}",
                self.total.errors, limit
            ));
        }

        if let Some(limit) = limits.max_warnings
            && self.total.warnings > limit
        {
            reasons.push(format!(
                "Warnings limit reached: found {} warnings, limit {}",
                self.total.warnings, limit
            ));
        }

        if reasons.is_empty() {
            return None;
        }

        Some(ThresholdExceeded {
            reasons,
            summary: format!(
                "Errors: {}, warnings: {}, information: {}",
                self.total.errors, self.total.warnings, self.total.infos
            ),
        })
    }
}
