// Registry of supported report types

use crate::error::ConfigError;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Supported report types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ReportType {
    #[serde(rename = "junit")]
    JUnit,
    #[serde(rename = "nunit")]
    NUnit,
    #[serde(rename = "surefire")]
    Surefire,
    #[serde(rename = "findBugs")]
    FindBugs,
    #[serde(rename = "pmd")]
    Pmd,
    #[serde(rename = "checkstyle")]
    Checkstyle,
    #[serde(rename = "pmdCpd")]
    PmdCpd,
    #[serde(rename = "mstest")]
    MsTest,
}

impl ReportType {
    pub const ALL: [ReportType; 8] = [
        Self::JUnit,
        Self::NUnit,
        Self::Surefire,
        Self::FindBugs,
        Self::Pmd,
        Self::Checkstyle,
        Self::PmdCpd,
        Self::MsTest,
    ];

    /// Identifier used in directives and on the command line
    pub fn id(self) -> &'static str {
        match self {
            Self::JUnit => "junit",
            Self::NUnit => "nunit",
            Self::Surefire => "surefire",
            Self::FindBugs => "findBugs",
            Self::Pmd => "pmd",
            Self::Checkstyle => "checkstyle",
            Self::PmdCpd => "pmdCpd",
            Self::MsTest => "mstest",
        }
    }

    /// Human-readable name
    pub fn display_name(self) -> &'static str {
        match self {
            Self::JUnit => "Ant JUnit",
            Self::NUnit => "NUnit",
            Self::Surefire => "Surefire",
            Self::FindBugs => "FindBugs",
            Self::Pmd => "PMD",
            Self::Checkstyle => "Checkstyle",
            Self::PmdCpd => "PMD CPD",
            Self::MsTest => "MSTest",
        }
    }

    pub fn is_inspection(self) -> bool {
        matches!(self, Self::FindBugs | Self::Pmd | Self::Checkstyle)
    }

    pub fn is_duplication(self) -> bool {
        matches!(self, Self::PmdCpd)
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ReportType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.id() == s)
            .ok_or_else(|| ConfigError::UnknownReportType(s.to_string()))
    }
}
