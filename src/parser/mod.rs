// Report parsers
// One parser instance per run, reused for each report in turn; the
// processor drives it through repeated attempts until a document is complete.

pub mod catalog;
pub mod checkstyle;
pub mod cpd;
pub mod findbugs;
pub mod inspections;
pub mod junit;
pub mod nunit;
pub mod pmd;
pub mod registry;
pub mod stream;
pub mod trx;
pub mod xml;

pub use catalog::PatternCatalog;
pub use checkstyle::CheckstyleParser;
pub use cpd::CpdParser;
pub use findbugs::FindBugsParser;
pub use junit::AntJUnitParser;
pub use nunit::NUnitParser;
pub use pmd::PmdParser;
pub use registry::ReportType;
pub use trx::TrxParser;

use crate::error::ReportError;
use crate::report::Sinks;
use crate::state::{ReportFile, ThresholdAggregator};
use std::path::PathBuf;

/// Result of one parse attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseOutcome {
    /// The whole document was consumed
    Finished,
    /// The document is still being written; carries the progress marker
    /// to pass back on the next attempt
    Pending(u64),
}

/// What a parser needs besides the file itself
#[derive(Clone)]
pub struct ParserContext {
    pub sinks: Sinks,
    /// Prefix stripped from source paths found inside inspection reports
    pub checkout_dir: String,
    /// FindBugs installation to load the bug-pattern catalog from
    pub findbugs_home: Option<PathBuf>,
}

impl ParserContext {
    pub fn new(sinks: Sinks) -> Self {
        Self {
            sinks,
            checkout_dir: String::new(),
            findbugs_home: None,
        }
    }

    pub fn with_checkout_dir(mut self, checkout_dir: impl Into<String>) -> Self {
        self.checkout_dir = checkout_dir.into();
        self
    }

    pub fn with_findbugs_home(mut self, home: Option<PathBuf>) -> Self {
        self.findbugs_home = home;
        self
    }
}

/// Contract shared by every report format
pub trait ReportParser: Send {
    /// Parse as much of the report as is available.
    ///
    /// `processed` is the marker returned by the previous `Pending` result
    /// (0 on the first attempt).
    fn parse(&mut self, report: &ReportFile, processed: u64) -> Result<ParseOutcome, ReportError>;

    /// Whether the last attempt ended inside a recognized document
    fn is_abnormal_end(&self) -> bool;

    /// Summary line for a finished report
    fn complete_report(&mut self, report: &ReportFile) -> String {
        format!("{} report processed", report.path().display())
    }

    /// Finding counters, for parsers that count findings
    fn thresholds(&self) -> Option<&ThresholdAggregator> {
        None
    }
}

/// Parser for one concrete report type
pub enum FormatParser {
    AntJUnit(AntJUnitParser),
    NUnit(NUnitParser),
    MsTest(TrxParser),
    FindBugs(FindBugsParser),
    Pmd(PmdParser),
    Checkstyle(CheckstyleParser),
    PmdCpd(CpdParser),
}

impl FormatParser {
    /// Build the parser registered for `report_type`
    pub fn for_type(report_type: ReportType, ctx: &ParserContext) -> Self {
        match report_type {
            ReportType::JUnit | ReportType::Surefire => {
                Self::AntJUnit(AntJUnitParser::new(ctx.sinks.events.clone()))
            }
            ReportType::NUnit => Self::NUnit(NUnitParser::new(ctx.sinks.events.clone())),
            ReportType::MsTest => Self::MsTest(TrxParser::new(ctx.sinks.events.clone())),
            ReportType::FindBugs => Self::FindBugs(FindBugsParser::new(ctx)),
            ReportType::Pmd => Self::Pmd(PmdParser::new(ctx)),
            ReportType::Checkstyle => Self::Checkstyle(CheckstyleParser::new(ctx)),
            ReportType::PmdCpd => Self::PmdCpd(CpdParser::new(ctx)),
        }
    }

    fn inner(&self) -> &dyn ReportParser {
        match self {
            Self::AntJUnit(p) => p,
            Self::NUnit(p) => p,
            Self::MsTest(p) => p,
            Self::FindBugs(p) => p,
            Self::Pmd(p) => p,
            Self::Checkstyle(p) => p,
            Self::PmdCpd(p) => p,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn ReportParser {
        match self {
            Self::AntJUnit(p) => p,
            Self::NUnit(p) => p,
            Self::MsTest(p) => p,
            Self::FindBugs(p) => p,
            Self::Pmd(p) => p,
            Self::Checkstyle(p) => p,
            Self::PmdCpd(p) => p,
        }
    }
}

impl ReportParser for FormatParser {
    fn parse(&mut self, report: &ReportFile, processed: u64) -> Result<ParseOutcome, ReportError> {
        self.inner_mut().parse(report, processed)
    }

    fn is_abnormal_end(&self) -> bool {
        self.inner().is_abnormal_end()
    }

    fn complete_report(&mut self, report: &ReportFile) -> String {
        self.inner_mut().complete_report(report)
    }

    fn thresholds(&self) -> Option<&ThresholdAggregator> {
        self.inner().thresholds()
    }
}
