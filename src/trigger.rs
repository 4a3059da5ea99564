// Import directives read from the line-oriented control channel
//
//   ##teamcity[importData type='junit' path='build/test-results' verbose='true']

use crate::config::ReportParameters;
use crate::error::ConfigError;
use crate::parser::ReportType;
use crate::state::Limits;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::PathBuf;
use tracing::warn;

const DIRECTIVE_PREFIX: &str = "##teamcity[importData";

const ATTRIBUTE_PATTERN: &str = r"([A-Za-z][\w.-]*)\s*=\s*'((?:\|.|[^|'])*)'";

static ATTRIBUTE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(ATTRIBUTE_PATTERN).expect("invalid directive attribute regex"));

/// One `importData` request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDirective {
    pub report_type: ReportType,
    /// Rule body: one path or `+:`/`-:` rule per line
    pub path: String,
    pub verbose: bool,
    pub parse_out_of_date: bool,
    pub limits: Limits,
    pub findbugs_home: Option<String>,
}

impl ImportDirective {
    /// Parse a control line. Lines that are not import directives yield `Ok(None)`.
    pub fn parse_line(line: &str) -> Result<Option<Self>, ConfigError> {
        let line = line.trim();
        let Some(rest) = line.strip_prefix(DIRECTIVE_PREFIX) else {
            return Ok(None);
        };
        if !rest.starts_with(|c: char| c.is_whitespace() || c == ']') {
            return Ok(None);
        }

        let body = rest
            .strip_suffix(']')
            .ok_or_else(|| ConfigError::InvalidDirective(line.to_string()))?;

        let mut report_type = None;
        let mut path = None;
        let mut directive = Self {
            report_type: ReportType::JUnit,
            path: String::new(),
            verbose: false,
            parse_out_of_date: false,
            limits: Limits::default(),
            findbugs_home: None,
        };

        for caps in ATTRIBUTE_REGEX.captures_iter(body) {
            let value = unescape(&caps[2]);
            match &caps[1] {
                "type" => report_type = Some(value.parse::<ReportType>()?),
                "path" | "file" => path = Some(value),
                "verbose" => directive.verbose = parse_flag(&value),
                "parseOutOfDate" => directive.parse_out_of_date = parse_flag(&value),
                "errorLimit" => directive.limits.max_errors = parse_limit("errorLimit", &value),
                "warningLimit" => {
                    directive.limits.max_warnings = parse_limit("warningLimit", &value)
                }
                "findBugsHome" => directive.findbugs_home = Some(value),
                _ => {}
            }
        }

        directive.report_type = report_type.ok_or(ConfigError::MissingAttribute("type"))?;
        directive.path = path
            .filter(|p| !p.trim().is_empty())
            .ok_or(ConfigError::MissingAttribute("path"))?;
        Ok(Some(directive))
    }

    pub fn to_parameters(&self) -> ReportParameters {
        let mut params = ReportParameters::new(self.report_type);
        params.verbose = self.verbose;
        params.parse_out_of_date = self.parse_out_of_date;
        params.limits = self.limits;
        params.findbugs_home = self.findbugs_home.as_ref().map(PathBuf::from);
        params
    }
}

/// Undo service-message escaping
pub fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '|' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some(other @ ('\'' | '|' | '[' | ']')) => out.push(other),
            Some(other) => {
                out.push('|');
                out.push(other);
            }
            None => out.push('|'),
        }
    }
    out
}

fn parse_flag(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

fn parse_limit(name: &str, value: &str) -> Option<u32> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    match value.parse::<u32>() {
        Ok(limit) => Some(limit),
        Err(_) => {
            warn!("Ignoring {}='{}': not a number", name, value);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_directive() {
        let line = "##teamcity[importData type='findBugs' path='build/findbugs.xml' verbose='TRUE' parseOutOfDate='true' errorLimit='100' warningLimit='200']";
        let directive = ImportDirective::parse_line(line).unwrap().unwrap();
        assert_eq!(directive.report_type, ReportType::FindBugs);
        assert_eq!(directive.path, "build/findbugs.xml");
        assert!(directive.verbose);
        assert!(directive.parse_out_of_date);
        assert_eq!(directive.limits.max_errors, Some(100));
        assert_eq!(directive.limits.max_warnings, Some(200));

        let params = directive.to_parameters();
        assert_eq!(params.report_type, ReportType::FindBugs);
        assert_eq!(params.limits.max_errors, Some(100));
    }

    #[test]
    fn test_file_alias_and_escapes() {
        let line = "##teamcity[importData type='junit' file='it|'s|n+:other' unknown='x']";
        let directive = ImportDirective::parse_line(line).unwrap().unwrap();
        assert_eq!(directive.path, "it's\n+:other");
        assert!(!directive.verbose);
    }

    #[test]
    fn test_other_lines_ignored() {
        assert_eq!(ImportDirective::parse_line("compiling...").unwrap(), None);
        assert_eq!(
            ImportDirective::parse_line("##teamcity[message text='x']").unwrap(),
            None
        );
        assert_eq!(
            ImportDirective::parse_line("##teamcity[importDataX type='junit']").unwrap(),
            None
        );
    }

    #[test]
    fn test_invalid_directives() {
        assert_eq!(
            ImportDirective::parse_line("##teamcity[importData path='a']"),
            Err(ConfigError::MissingAttribute("type"))
        );
        assert_eq!(
            ImportDirective::parse_line("##teamcity[importData type='junit']"),
            Err(ConfigError::MissingAttribute("path"))
        );
        assert_eq!(
            ImportDirective::parse_line("##teamcity[importData type='xunit' path='a']"),
            Err(ConfigError::UnknownReportType("xunit".to_string()))
        );
        assert!(matches!(
            ImportDirective::parse_line("##teamcity[importData type='junit' path='a'"),
            Err(ConfigError::InvalidDirective(_))
        ));
    }

    #[test]
    fn test_bad_limit_means_no_limit() {
        let line = "##teamcity[importData type='pmd' path='a' errorLimit='lots']";
        let directive = ImportDirective::parse_line(line).unwrap().unwrap();
        assert_eq!(directive.limits.max_errors, None);
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape("a||b|[c|]|r"), "a|b[c]\r");
    }
}
